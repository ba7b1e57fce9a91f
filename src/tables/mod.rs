//! Presentation tables: building, printing, and CSV emission.

pub mod descriptives;
pub mod disparity;

pub use descriptives::{build_descriptives, DescriptivesOptions, DescriptivesReport};
pub use disparity::{build_disparity_table, DisparityOptions, DisparityTable};

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Writes rows as CSV, creating parent directories as needed.
///
/// The first row is the header.
pub fn write_csv_rows(path: &Path, rows: &[Vec<String>]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    for row in rows {
        writer
            .write_record(row)
            .with_context(|| format!("Failed to write row to {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;
    Ok(())
}

/// Formats an optional value with fixed decimals, empty when absent.
///
/// Empty cells round-trip as missing when the CSV is read back.
pub fn csv_opt(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => String::new(),
    }
}

/// Formats an optional value with fixed decimals, `"N/A"` when absent.
pub fn console_opt(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => "N/A".to_string(),
    }
}
