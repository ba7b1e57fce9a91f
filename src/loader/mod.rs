//! Survey dataset loading.
//!
//! Reads the combined BRFSS extract with per-cell coercion: a malformed
//! numeric cell clears that field only, a missing year or weight drops the
//! row, and every coercion and drop is counted in [`LoadStats`] so a run
//! can report exactly what it kept.

use crate::models::{
    year_from_centered, AgeGroup, Education, RaceEthnicity, Sex, StateFips, SurveyRecord, Urbanity,
};
use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Columns a survey file must carry for any analysis to run.
pub const REQUIRED_COLUMNS: [&str; 5] = [
    "_STATE",
    "year_centered",
    "URRU",
    "currentsmoker",
    "_LLCPWT",
];

/// Demographic columns used by the descriptive tables.
pub const DEMOGRAPHIC_COLUMNS: [&str; 4] = ["_AGE_G", "SEXVAR", "_RACEGR3", "_EDUCAG"];

/// Options for dataset loading.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Show a progress spinner while reading rows.
    pub show_progress: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            show_progress: true,
        }
    }
}

/// Bookkeeping from one load: what was read, kept, coerced, and dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadStats {
    /// Data rows read from the file.
    pub rows_read: usize,
    /// Rows that became survey records.
    pub rows_kept: usize,
    /// Rows dropped for a missing or non-integral `year_centered`.
    pub dropped_missing_year: usize,
    /// Rows dropped because the decoded year falls outside the extract window.
    pub dropped_out_of_range_year: usize,
    /// Rows dropped for a missing, malformed, or non-positive weight.
    pub dropped_missing_weight: usize,
    /// Malformed numeric cells cleared to missing, per column.
    pub coerced_by_column: BTreeMap<String, usize>,
}

impl LoadStats {
    /// Total rows dropped for any reason.
    pub fn rows_dropped(&self) -> usize {
        self.dropped_missing_year + self.dropped_out_of_range_year + self.dropped_missing_weight
    }

    /// Total malformed cells cleared across all columns.
    pub fn coerced_cells(&self) -> usize {
        self.coerced_by_column.values().sum()
    }

    fn note_coerced(&mut self, column: &str) {
        *self.coerced_by_column.entry(column.to_string()).or_insert(0) += 1;
    }
}

/// The loaded dataset plus its load accounting.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub records: Vec<SurveyRecord>,
    pub stats: LoadStats,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct survey years present, sorted.
    pub fn years(&self) -> Vec<u16> {
        let mut years: Vec<u16> = self.records.iter().map(|r| r.year).collect();
        years.sort_unstable();
        years.dedup();
        years
    }
}

/// One CSV row before coercion, every field still raw text.
#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(rename = "_STATE", default)]
    state: Option<String>,
    #[serde(rename = "year_centered", default)]
    year_centered: Option<String>,
    #[serde(rename = "URRU", default)]
    urru: Option<String>,
    #[serde(rename = "currentsmoker", default)]
    smoker: Option<String>,
    #[serde(rename = "_LLCPWT", default)]
    weight: Option<String>,
    #[serde(rename = "_AGE_G", default)]
    age: Option<String>,
    #[serde(rename = "SEXVAR", default)]
    sex: Option<String>,
    #[serde(rename = "_RACEGR3", default)]
    race: Option<String>,
    #[serde(rename = "_EDUCAG", default)]
    education: Option<String>,
}

/// Outcome of coercing one raw cell.
enum Cell {
    /// Empty or absent.
    Missing,
    /// Present but not a finite number.
    Bad,
    Value(f64),
}

fn parse_cell(field: &Option<String>) -> Cell {
    let raw = match field.as_deref() {
        Some(text) => text.trim(),
        None => return Cell::Missing,
    };
    if raw.is_empty() {
        return Cell::Missing;
    }
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Cell::Value(value),
        _ => Cell::Bad,
    }
}

/// Coerces a numeric cell, counting malformed text against the column.
fn numeric(field: &Option<String>, column: &str, stats: &mut LoadStats) -> Option<f64> {
    match parse_cell(field) {
        Cell::Value(value) => Some(value),
        Cell::Missing => None,
        Cell::Bad => {
            stats.note_coerced(column);
            None
        }
    }
}

/// Interprets a float as an integer code. SAS exports write codes as
/// "1.0", so the fractional check, not a strict integer parse, decides.
fn int_code(value: f64) -> Option<i64> {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}

fn convert_row(raw: &RawRow, stats: &mut LoadStats) -> Option<SurveyRecord> {
    // The year and the weight decide whether the row survives at all.
    let year = match numeric(&raw.year_centered, "year_centered", stats).and_then(int_code) {
        Some(centered) => match year_from_centered(centered as i32) {
            Some(year) => year,
            None => {
                stats.dropped_out_of_range_year += 1;
                return None;
            }
        },
        None => {
            stats.dropped_missing_year += 1;
            return None;
        }
    };

    let weight = match numeric(&raw.weight, "_LLCPWT", stats) {
        Some(w) if w > 0.0 => w,
        _ => {
            stats.dropped_missing_weight += 1;
            return None;
        }
    };

    let state = numeric(&raw.state, "_STATE", stats)
        .and_then(int_code)
        .and_then(|code| u16::try_from(code).ok())
        .map(StateFips);
    let urbanity = numeric(&raw.urru, "URRU", stats)
        .and_then(int_code)
        .and_then(Urbanity::from_code);
    let smoker = numeric(&raw.smoker, "currentsmoker", stats)
        .and_then(int_code)
        .and_then(|code| match code {
            0 => Some(false),
            1 => Some(true),
            _ => None,
        });
    let age = numeric(&raw.age, "_AGE_G", stats)
        .and_then(int_code)
        .and_then(AgeGroup::from_code);
    let sex = numeric(&raw.sex, "SEXVAR", stats)
        .and_then(int_code)
        .and_then(Sex::from_code);
    let race = numeric(&raw.race, "_RACEGR3", stats)
        .and_then(int_code)
        .and_then(RaceEthnicity::from_code);
    let education = numeric(&raw.education, "_EDUCAG", stats)
        .and_then(int_code)
        .and_then(Education::from_code);

    Some(SurveyRecord {
        year,
        weight,
        state,
        urbanity,
        smoker,
        age,
        sex,
        race,
        education,
    })
}

/// Loads the combined survey CSV into memory.
pub fn load_survey(path: &Path, options: &LoadOptions) -> Result<Dataset> {
    debug!("Loading survey data from {}", path.display());

    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open survey file: {}", path.display()))?;

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read CSV header from {}", path.display()))?
        .clone();
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .filter(|column| !headers.iter().any(|h| h == **column))
        .copied()
        .collect();
    if !missing.is_empty() {
        bail!(
            "Survey file {} is missing required columns: {}",
            path.display(),
            missing.join(", ")
        );
    }

    let progress = if options.show_progress {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {pos} rows read")
                .unwrap(),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let mut stats = LoadStats::default();
    let mut records = Vec::new();
    for result in reader.deserialize::<RawRow>() {
        let raw = result
            .with_context(|| format!("Malformed CSV record in {}", path.display()))?;
        stats.rows_read += 1;
        progress.inc(1);
        if let Some(record) = convert_row(&raw, &mut stats) {
            records.push(record);
        }
    }
    progress.finish_and_clear();

    stats.rows_kept = records.len();
    info!(
        "Loaded {} of {} rows from {}",
        stats.rows_kept,
        stats.rows_read,
        path.display()
    );
    for (column, count) in &stats.coerced_by_column {
        warn!("Coerced {} malformed cells in column {}", count, column);
    }
    if stats.rows_dropped() > 0 {
        debug!(
            "Dropped rows: {} missing year, {} out-of-range year, {} missing weight",
            stats.dropped_missing_year, stats.dropped_out_of_range_year, stats.dropped_missing_weight
        );
    }

    Ok(Dataset { records, stats })
}

/// Column presence report for one input file.
#[derive(Debug, Clone)]
pub struct VariableReport {
    pub path: PathBuf,
    /// Required columns the file is missing.
    pub missing_required: Vec<String>,
    /// Demographic columns the file is missing.
    pub missing_demographic: Vec<String>,
    /// Total columns in the header.
    pub column_count: usize,
}

impl VariableReport {
    /// True when every required column is present.
    pub fn is_satisfied(&self) -> bool {
        self.missing_required.is_empty()
    }
}

/// Checks which analysis variables a CSV header carries.
///
/// Only the header is read, so this is cheap even on multi-gigabyte files.
pub fn check_variables(path: &Path) -> Result<VariableReport> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open survey file: {}", path.display()))?;
    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read CSV header from {}", path.display()))?;

    let missing_required = REQUIRED_COLUMNS
        .iter()
        .filter(|column| !headers.iter().any(|h| h == **column))
        .map(|column| column.to_string())
        .collect();
    let missing_demographic = DEMOGRAPHIC_COLUMNS
        .iter()
        .filter(|column| !headers.iter().any(|h| h == **column))
        .map(|column| column.to_string())
        .collect();

    Ok(VariableReport {
        path: path.to_path_buf(),
        missing_required,
        missing_demographic,
        column_count: headers.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn quiet() -> LoadOptions {
        LoadOptions {
            show_progress: false,
        }
    }

    #[test]
    fn test_load_complete_rows() {
        let file = write_csv(
            "_STATE,year_centered,URRU,currentsmoker,_LLCPWT,_AGE_G,SEXVAR,_RACEGR3,_EDUCAG\n\
             1,-2,0,1,250.5,3,1,1,4\n\
             1,4,1,0,120.0,6,2,5,1\n",
        );
        let dataset = load_survey(file.path(), &quiet()).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.stats.rows_read, 2);
        assert_eq!(dataset.stats.rows_kept, 2);
        assert_eq!(dataset.stats.coerced_cells(), 0);

        let first = &dataset.records[0];
        assert_eq!(first.year, 2018);
        assert_eq!(first.weight, 250.5);
        assert_eq!(first.state, Some(StateFips(1)));
        assert_eq!(first.urbanity, Some(Urbanity::Urban));
        assert_eq!(first.smoker, Some(true));
        assert_eq!(first.age, Some(AgeGroup::Age35To44));

        assert_eq!(dataset.years(), vec![2018, 2024]);
    }

    #[test]
    fn test_float_coded_integers_decode() {
        let file = write_csv(
            "_STATE,year_centered,URRU,currentsmoker,_LLCPWT\n\
             1.0,-2.0,1.0,0.0,300.25\n",
        );
        let dataset = load_survey(file.path(), &quiet()).unwrap();
        let record = &dataset.records[0];
        assert_eq!(record.state, Some(StateFips(1)));
        assert_eq!(record.urbanity, Some(Urbanity::Rural));
        assert_eq!(record.smoker, Some(false));
    }

    #[test]
    fn test_malformed_cells_are_coerced_not_fatal() {
        let file = write_csv(
            "_STATE,year_centered,URRU,currentsmoker,_LLCPWT\n\
             abc,-2,0,1,100.0\n\
             1,-2,xx,yy,100.0\n",
        );
        let dataset = load_survey(file.path(), &quiet()).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.records[0].state, None);
        assert_eq!(dataset.records[1].urbanity, None);
        assert_eq!(dataset.records[1].smoker, None);
        assert_eq!(dataset.stats.coerced_cells(), 3);
        assert_eq!(dataset.stats.coerced_by_column.get("_STATE"), Some(&1));
        assert_eq!(dataset.stats.coerced_by_column.get("URRU"), Some(&1));
    }

    #[test]
    fn test_rows_without_year_or_weight_are_dropped() {
        let file = write_csv(
            "_STATE,year_centered,URRU,currentsmoker,_LLCPWT\n\
             1,,0,1,100.0\n\
             1,9,0,1,100.0\n\
             1,-2,0,1,\n\
             1,-2,0,1,0\n\
             1,-2,0,1,-5\n\
             1,-2,0,1,100.0\n",
        );
        let dataset = load_survey(file.path(), &quiet()).unwrap();

        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.stats.dropped_missing_year, 1);
        assert_eq!(dataset.stats.dropped_out_of_range_year, 1);
        assert_eq!(dataset.stats.dropped_missing_weight, 3);
        assert_eq!(dataset.stats.rows_dropped(), 5);
    }

    #[test]
    fn test_unknown_codes_become_missing() {
        let file = write_csv(
            "_STATE,year_centered,URRU,currentsmoker,_LLCPWT,_RACEGR3,_EDUCAG\n\
             1,0,5,7,100.0,9,9\n",
        );
        let dataset = load_survey(file.path(), &quiet()).unwrap();
        let record = &dataset.records[0];
        assert_eq!(record.urbanity, None);
        assert_eq!(record.smoker, None);
        assert_eq!(record.race, None);
        assert_eq!(record.education, None);
        // Out-of-range codes are valid numbers, not coercions.
        assert_eq!(dataset.stats.coerced_cells(), 0);
    }

    #[test]
    fn test_missing_required_column_fails() {
        let file = write_csv("_STATE,URRU,currentsmoker,_LLCPWT\n1,0,1,100.0\n");
        let err = load_survey(file.path(), &quiet()).unwrap_err();
        assert!(err.to_string().contains("year_centered"));
    }

    #[test]
    fn test_demographics_are_optional() {
        let file = write_csv(
            "_STATE,year_centered,URRU,currentsmoker,_LLCPWT\n\
             1,-2,0,1,100.0\n",
        );
        let dataset = load_survey(file.path(), &quiet()).unwrap();
        assert_eq!(dataset.records[0].age, None);
        assert_eq!(dataset.records[0].sex, None);
    }

    #[test]
    fn test_load_fixture_extract() {
        let path = Path::new(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/fixtures/sample_survey.csv"
        ));
        let dataset = load_survey(path, &quiet()).unwrap();

        assert_eq!(dataset.stats.rows_read, 16);
        assert_eq!(dataset.stats.rows_kept, 13);
        assert_eq!(dataset.stats.rows_dropped(), 3);
        assert_eq!(dataset.stats.coerced_cells(), 2);
        assert_eq!(dataset.years(), vec![2018, 2020, 2024]);
    }

    #[test]
    fn test_check_variables() {
        let file = write_csv(
            "_STATE,year_centered,URRU,currentsmoker,_LLCPWT,_AGE_G\nignored\n",
        );
        let report = check_variables(file.path()).unwrap();
        assert!(report.is_satisfied());
        assert_eq!(report.column_count, 6);
        assert_eq!(
            report.missing_demographic,
            vec!["SEXVAR", "_RACEGR3", "_EDUCAG"]
        );

        let partial = write_csv("_STATE,URRU\n1,0\n");
        let report = check_variables(partial.path()).unwrap();
        assert!(!report.is_satisfied());
        assert_eq!(
            report.missing_required,
            vec!["year_centered", "currentsmoker", "_LLCPWT"]
        );
    }
}
