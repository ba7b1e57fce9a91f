//! Weighted descriptive statistics by demographic characteristic.
//!
//! For every category of every characteristic the table reports the
//! weighted sample size over all rows, the share of the total weight, the
//! weighted size of the valid-smoking subset, and the weighted smoking
//! prevalence within that subset. Categories keep codebook order with a
//! trailing `Missing` bucket, so the table doubles as a missingness audit.

use crate::models::SurveyRecord;
use crate::stats::{summarize_by, GroupSummary};
use crate::tables::write_csv_rows;
use anyhow::Result;
use std::fmt;
use std::path::Path;
use tabled::{Table, Tabled};

/// Options for the descriptives table.
#[derive(Debug, Clone, Copy)]
pub struct DescriptivesOptions {
    pub from_year: u16,
    pub through_year: u16,
}

/// Weighted totals over the whole analysis window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindowTotals {
    /// Unweighted rows in the window.
    pub rows: usize,
    /// Summed weight over all rows.
    pub weight_all: f64,
    /// Rows with a known smoking status.
    pub smoking_rows: usize,
    /// Summed weight over rows with a known smoking status.
    pub smoking_weight: f64,
}

impl WindowTotals {
    /// Rows without smoking information.
    pub fn missing_rows(&self) -> usize {
        self.rows - self.smoking_rows
    }

    /// Share of rows without smoking information, in percent.
    pub fn missing_pct(&self) -> f64 {
        if self.rows > 0 {
            self.missing_rows() as f64 / self.rows as f64 * 100.0
        } else {
            0.0
        }
    }
}

/// One category row of the combined table.
#[derive(Debug, Clone, Tabled)]
pub struct DescriptiveRow {
    #[tabled(rename = "Characteristic")]
    pub characteristic: String,
    #[tabled(rename = "Category")]
    pub category: String,
    #[tabled(rename = "Weighted sample size (all)")]
    pub weighted_all: String,
    #[tabled(rename = "Percentage (of all)")]
    pub pct_of_all: String,
    #[tabled(rename = "Weighted sample (valid smoking)")]
    pub weighted_valid: String,
    #[tabled(rename = "Smoking prevalence")]
    pub smoking_prevalence: String,
}

impl DescriptiveRow {
    fn new(characteristic: &str, category: String, summary: &GroupSummary, total_weight: f64) -> Self {
        let pct = if total_weight > 0.0 {
            summary.weight_all / total_weight * 100.0
        } else {
            0.0
        };
        // Prevalence is computed within the valid-smoking subset and stays
        // a plain 0 for categories with no valid rows.
        let prevalence = summary.smoking.proportion() * 100.0;
        Self {
            characteristic: characteristic.to_string(),
            category,
            weighted_all: format!("{:.1}", summary.weight_all),
            pct_of_all: format!("{:.2}", pct),
            weighted_valid: format!("{:.1}", summary.smoking.weight_sum),
            smoking_prevalence: format!("{:.2}", prevalence),
        }
    }
}

/// Rows for one characteristic.
#[derive(Debug, Clone)]
pub struct Section {
    pub characteristic: String,
    pub rows: Vec<DescriptiveRow>,
}

impl Section {
    /// Renders this section as a console table.
    pub fn render(&self) -> String {
        Table::new(&self.rows).to_string()
    }
}

/// The assembled descriptives report.
#[derive(Debug, Clone)]
pub struct DescriptivesReport {
    pub from_year: u16,
    pub through_year: u16,
    pub totals: WindowTotals,
    pub sections: Vec<Section>,
}

impl DescriptivesReport {
    /// Window label, e.g. `"2018-2024"`.
    pub fn window_label(&self) -> String {
        format!("{}-{}", self.from_year, self.through_year)
    }

    /// Combined CSV column headers.
    pub fn headers() -> Vec<String> {
        vec![
            "Characteristic".to_string(),
            "Category".to_string(),
            "Weighted sample size (all)".to_string(),
            "Percentage (of all)".to_string(),
            "Weighted sample (valid smoking)".to_string(),
            "Smoking prevalence".to_string(),
        ]
    }

    /// Writes all sections as one combined CSV.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut rows = vec![Self::headers()];
        for section in &self.sections {
            for row in &section.rows {
                rows.push(vec![
                    row.characteristic.clone(),
                    row.category.clone(),
                    row.weighted_all.clone(),
                    row.pct_of_all.clone(),
                    row.weighted_valid.clone(),
                    row.smoking_prevalence.clone(),
                ]);
            }
        }
        write_csv_rows(path, &rows)
    }
}

/// Builds the descriptives report for an inclusive year window.
pub fn build_descriptives(
    records: &[SurveyRecord],
    options: &DescriptivesOptions,
) -> DescriptivesReport {
    let window: Vec<&SurveyRecord> = records
        .iter()
        .filter(|r| (options.from_year..=options.through_year).contains(&r.year))
        .collect();

    let mut totals = WindowTotals::default();
    for record in &window {
        totals.rows += 1;
        totals.weight_all += record.weight;
        if record.smoker.is_some() {
            totals.smoking_rows += 1;
            totals.smoking_weight += record.weight;
        }
    }

    let sections = vec![
        section("Urban/Rural", &window, &totals, |r| r.urbanity),
        section("Age", &window, &totals, |r| r.age),
        section("Sex", &window, &totals, |r| r.sex),
        section("Race/Ethnicity", &window, &totals, |r| r.race),
        section("Education", &window, &totals, |r| r.education),
        section("Year", &window, &totals, |r| Some(r.year)),
    ];

    DescriptivesReport {
        from_year: options.from_year,
        through_year: options.through_year,
        totals,
        sections,
    }
}

fn section<C, F>(
    characteristic: &str,
    window: &[&SurveyRecord],
    totals: &WindowTotals,
    category_fn: F,
) -> Section
where
    C: Ord + fmt::Display,
    F: Fn(&SurveyRecord) -> Option<C>,
{
    let groups = summarize_by(window.iter().copied(), category_fn);
    let rows = groups
        .into_iter()
        .map(|(category, summary)| {
            DescriptiveRow::new(characteristic, category.to_string(), &summary, totals.weight_all)
        })
        .collect();
    Section {
        characteristic: characteristic.to_string(),
        rows,
    }
}
