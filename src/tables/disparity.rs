//! State-level rural vs urban disparity table.
//!
//! For two survey years, estimates weighted smoking prevalence with
//! confidence intervals per state and county class, the rural-to-urban
//! prevalence ratio per year, and the change in that ratio between years.
//! States are merged across years with an outer join, so a state present in
//! only one year still gets a row.

use crate::geo;
use crate::models::{StateFips, SurveyRecord, Urbanity};
use crate::stats::{tally_by, ConfidenceLevel, PrevalenceEstimate};
use crate::tables::{console_opt, csv_opt, write_csv_rows};
use anyhow::Result;
use std::collections::BTreeMap;
use std::path::Path;
use tabled::builder::Builder;
use tracing::warn;

/// Options for the disparity table.
#[derive(Debug, Clone, Copy)]
pub struct DisparityOptions {
    pub baseline_year: u16,
    pub comparison_year: u16,
    pub confidence: ConfidenceLevel,
}

/// Rural and urban estimates for one state in one year.
#[derive(Debug, Clone, Default)]
pub struct YearCells {
    pub rural: Option<PrevalenceEstimate>,
    pub urban: Option<PrevalenceEstimate>,
}

impl YearCells {
    /// Rural-to-urban prevalence ratio.
    ///
    /// `None` unless both estimates exist and urban prevalence is positive;
    /// a zero denominator yields no ratio rather than infinity.
    pub fn ratio(&self) -> Option<f64> {
        let rural = self.rural.as_ref()?.prevalence?;
        let urban = self.urban.as_ref()?.prevalence?;
        if urban > 0.0 {
            Some(rural / urban)
        } else {
            None
        }
    }

    fn cell(estimate: &Option<PrevalenceEstimate>) -> String {
        match estimate {
            Some(est) => est.display_with_interval(),
            None => "N/A".to_string(),
        }
    }

    /// Rural prevalence cell text.
    pub fn rural_cell(&self) -> String {
        Self::cell(&self.rural)
    }

    /// Urban prevalence cell text.
    pub fn urban_cell(&self) -> String {
        Self::cell(&self.urban)
    }
}

/// One state row of the disparity table.
#[derive(Debug, Clone)]
pub struct DisparityRow {
    pub state: String,
    pub baseline: YearCells,
    pub comparison: YearCells,
}

impl DisparityRow {
    /// Change in the rural-to-urban ratio between the two years.
    pub fn change_in_ratio(&self) -> Option<f64> {
        Some(self.comparison.ratio()? - self.baseline.ratio()?)
    }
}

/// The assembled disparity table.
#[derive(Debug, Clone)]
pub struct DisparityTable {
    pub baseline_year: u16,
    pub comparison_year: u16,
    pub rows: Vec<DisparityRow>,
}

impl DisparityTable {
    /// Column headers, parameterized by the two years.
    pub fn headers(&self) -> Vec<String> {
        vec![
            "State".to_string(),
            format!("Rural_Prevalence_{}_CI", self.baseline_year),
            format!("Urban_Prevalence_{}_CI", self.baseline_year),
            format!("Ratio_{}", self.baseline_year),
            format!("Rural_Prevalence_{}_CI", self.comparison_year),
            format!("Urban_Prevalence_{}_CI", self.comparison_year),
            format!("Ratio_{}", self.comparison_year),
            "Change_In_Ratio".to_string(),
        ]
    }

    fn record(&self, row: &DisparityRow, missing: &dyn Fn(Option<f64>) -> String) -> Vec<String> {
        vec![
            row.state.clone(),
            row.baseline.rural_cell(),
            row.baseline.urban_cell(),
            missing(row.baseline.ratio()),
            row.comparison.rural_cell(),
            row.comparison.urban_cell(),
            missing(row.comparison.ratio()),
            missing(row.change_in_ratio()),
        ]
    }

    /// Renders the first `limit` rows as a console table.
    pub fn render_preview(&self, limit: usize) -> String {
        let mut builder = Builder::default();
        builder.push_record(self.headers());
        for row in self.rows.iter().take(limit) {
            builder.push_record(self.record(row, &|v| console_opt(v, 4)));
        }
        builder.build().to_string()
    }

    /// Writes the full table as CSV.
    ///
    /// Ratio columns are numeric and leave missing cells empty; the
    /// prevalence columns are text and keep their `N/A` markers.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut rows = Vec::with_capacity(self.rows.len() + 1);
        rows.push(self.headers());
        for row in &self.rows {
            rows.push(self.record(row, &|v| csv_opt(v, 4)));
        }
        write_csv_rows(path, &rows)
    }
}

/// Builds the disparity table for two survey years.
pub fn build_disparity_table(
    records: &[SurveyRecord],
    options: &DisparityOptions,
) -> DisparityTable {
    let tallies = tally_by(
        records
            .iter()
            .filter(|r| r.year == options.baseline_year || r.year == options.comparison_year),
        |r| Some((r.state?, r.urbanity?, r.year)),
    );

    // Outer merge: any (state, year) cell creates the state's row.
    let mut states: BTreeMap<StateFips, (YearCells, YearCells)> = BTreeMap::new();
    for ((state, urbanity, year), tally) in tallies {
        let estimate = tally.estimate(options.confidence);
        let entry = states.entry(state).or_default();
        let cells = if year == options.baseline_year {
            &mut entry.0
        } else {
            &mut entry.1
        };
        match urbanity {
            Urbanity::Rural => cells.rural = Some(estimate),
            Urbanity::Urban => cells.urban = Some(estimate),
        }
    }

    let mut rows: Vec<DisparityRow> = states
        .into_iter()
        .map(|(fips, (baseline, comparison))| {
            let state = match geo::state_name(fips) {
                Some(name) => name.to_string(),
                None => {
                    warn!("No state name for FIPS code {}", fips);
                    format!("FIPS {}", fips)
                }
            };
            DisparityRow {
                state,
                baseline,
                comparison,
            }
        })
        .collect();
    rows.sort_by(|a, b| a.state.cmp(&b.state));

    DisparityTable {
        baseline_year: options.baseline_year,
        comparison_year: options.comparison_year,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(year: u16, weight: f64, state: u16, urbanity: Urbanity, smoker: bool) -> SurveyRecord {
        SurveyRecord {
            year,
            weight,
            state: Some(StateFips(state)),
            urbanity: Some(urbanity),
            smoker: Some(smoker),
            age: None,
            sex: None,
            race: None,
            education: None,
        }
    }

    fn options() -> DisparityOptions {
        DisparityOptions {
            baseline_year: 2018,
            comparison_year: 2024,
            confidence: ConfidenceLevel::Percent95,
        }
    }

    fn sample_records() -> Vec<SurveyRecord> {
        let mut records = Vec::new();
        // Alabama 2018: rural 50% of weight, urban 25%.
        records.push(record(2018, 1.0, 1, Urbanity::Rural, true));
        records.push(record(2018, 1.0, 1, Urbanity::Rural, false));
        records.push(record(2018, 1.0, 1, Urbanity::Urban, true));
        records.push(record(2018, 3.0, 1, Urbanity::Urban, false));
        // Alabama 2024: rural 40%, urban 10%.
        records.push(record(2024, 2.0, 1, Urbanity::Rural, true));
        records.push(record(2024, 3.0, 1, Urbanity::Rural, false));
        records.push(record(2024, 1.0, 1, Urbanity::Urban, true));
        records.push(record(2024, 9.0, 1, Urbanity::Urban, false));
        // Wyoming appears in 2024 only.
        records.push(record(2024, 1.0, 56, Urbanity::Rural, true));
        // A 2020 row must not leak into either year.
        records.push(record(2020, 100.0, 1, Urbanity::Rural, true));
        records
    }

    #[test]
    fn test_ratios_and_change() {
        let table = build_disparity_table(&sample_records(), &options());

        let alabama = &table.rows[0];
        assert_eq!(alabama.state, "Alabama");
        let base_ratio = alabama.baseline.ratio().unwrap();
        assert!((base_ratio - 2.0).abs() < 1e-9);
        let cmp_ratio = alabama.comparison.ratio().unwrap();
        assert!((cmp_ratio - 4.0).abs() < 1e-9);
        assert!((alabama.change_in_ratio().unwrap() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_outer_merge_keeps_single_year_states() {
        let table = build_disparity_table(&sample_records(), &options());
        assert_eq!(table.rows.len(), 2);

        let wyoming = &table.rows[1];
        assert_eq!(wyoming.state, "Wyoming");
        assert!(wyoming.baseline.rural.is_none());
        assert!(wyoming.comparison.rural.is_some());
        // Without an urban cell there is no ratio, so no change either.
        assert_eq!(wyoming.comparison.ratio(), None);
        assert_eq!(wyoming.change_in_ratio(), None);
        assert_eq!(wyoming.baseline.rural_cell(), "N/A");
    }

    #[test]
    fn test_zero_urban_prevalence_has_no_ratio() {
        let records = vec![
            record(2018, 1.0, 1, Urbanity::Rural, true),
            record(2018, 1.0, 1, Urbanity::Urban, false),
        ];
        let table = build_disparity_table(&records, &options());
        assert_eq!(table.rows[0].baseline.ratio(), None);
    }

    #[test]
    fn test_rows_sort_by_state_name() {
        let records = vec![
            record(2018, 1.0, 56, Urbanity::Rural, true),
            record(2018, 1.0, 1, Urbanity::Rural, true),
            record(2018, 1.0, 8, Urbanity::Rural, true),
        ];
        let table = build_disparity_table(&records, &options());
        let names: Vec<&str> = table.rows.iter().map(|r| r.state.as_str()).collect();
        assert_eq!(names, vec!["Alabama", "Colorado", "Wyoming"]);
    }

    #[test]
    fn test_headers_follow_years() {
        let table = build_disparity_table(&sample_records(), &options());
        assert_eq!(
            table.headers(),
            vec![
                "State",
                "Rural_Prevalence_2018_CI",
                "Urban_Prevalence_2018_CI",
                "Ratio_2018",
                "Rural_Prevalence_2024_CI",
                "Urban_Prevalence_2024_CI",
                "Ratio_2024",
                "Change_In_Ratio",
            ]
        );
    }

    #[test]
    fn test_csv_roundtrip_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disparity.csv");
        let table = build_disparity_table(&sample_records(), &options());
        table.write_csv(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("State,Rural_Prevalence_2018_CI"));
        let alabama = lines.next().unwrap();
        assert!(alabama.starts_with("Alabama,"));
        assert!(alabama.contains("50.0%"));
        // Wyoming's missing ratio cells stay empty in CSV.
        let wyoming = lines.next().unwrap();
        assert!(wyoming.contains("N/A"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_unknown_fips_get_placeholder_name() {
        let records = vec![record(2018, 1.0, 99, Urbanity::Rural, true)];
        let table = build_disparity_table(&records, &options());
        assert_eq!(table.rows[0].state, "FIPS 99");
    }

    #[test]
    fn test_preview_limits_rows() {
        let table = build_disparity_table(&sample_records(), &options());
        let preview = table.render_preview(1);
        assert!(preview.contains("Alabama"));
        assert!(!preview.contains("Wyoming"));
    }
}
