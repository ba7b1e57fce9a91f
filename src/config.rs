//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.smokestat.toml` files.

use crate::models::{MAX_SURVEY_YEAR, MIN_SURVEY_YEAR};
use crate::stats::ConfidenceLevel;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Input data locations.
    #[serde(default)]
    pub data: DataConfig,

    /// Estimation settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Map rendering settings.
    #[serde(default)]
    pub map: MapConfig,

    /// Output settings.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Input data locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Base directory for relative data paths.
    #[serde(default = "default_data_dir")]
    pub dir: String,

    /// Combined multi-year survey extract (CSV).
    #[serde(default = "default_survey_csv")]
    pub survey_csv: String,

    /// State boundaries (GeoJSON FeatureCollection).
    #[serde(default = "default_atlas")]
    pub atlas: String,

    /// Per-state logistic-regression odds ratios (CSV).
    #[serde(default = "default_or_results")]
    pub or_results: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
            survey_csv: default_survey_csv(),
            atlas: default_atlas(),
            or_results: default_or_results(),
        }
    }
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_survey_csv() -> String {
    "brfss_combined.csv".to_string()
}

fn default_atlas() -> String {
    "us_states.json".to_string()
}

fn default_or_results() -> String {
    "state_or_results.csv".to_string()
}

/// Estimation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// First survey year of the comparison pair.
    #[serde(default = "default_baseline_year")]
    pub baseline_year: u16,

    /// Second survey year of the comparison pair.
    #[serde(default = "default_comparison_year")]
    pub comparison_year: u16,

    /// Confidence level in percent (90, 95, or 99).
    #[serde(default = "default_confidence_level")]
    pub confidence_level: u8,

    /// Minimum unweighted respondents for a reportable cell.
    #[serde(default = "default_min_cell_size")]
    pub min_cell_size: usize,

    /// Maximum relative standard error (percent) for a reportable cell.
    #[serde(default = "default_max_rse_pct")]
    pub max_rse_pct: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            baseline_year: default_baseline_year(),
            comparison_year: default_comparison_year(),
            confidence_level: default_confidence_level(),
            min_cell_size: default_min_cell_size(),
            max_rse_pct: default_max_rse_pct(),
        }
    }
}

fn default_baseline_year() -> u16 {
    MIN_SURVEY_YEAR
}

fn default_comparison_year() -> u16 {
    MAX_SURVEY_YEAR
}

fn default_confidence_level() -> u8 {
    95
}

fn default_min_cell_size() -> usize {
    50
}

fn default_max_rse_pct() -> f64 {
    30.0
}

/// Map rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapConfig {
    /// Figure width in pixels.
    #[serde(default = "default_map_width")]
    pub width: u32,

    /// Figure height in pixels.
    #[serde(default = "default_map_height")]
    pub height: u32,

    /// Prevalence mapped to the low end of the color scale.
    #[serde(default = "default_vmin")]
    pub vmin: f64,

    /// Prevalence mapped to the high end of the color scale.
    #[serde(default = "default_vmax")]
    pub vmax: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            width: default_map_width(),
            height: default_map_height(),
            vmin: default_vmin(),
            vmax: default_vmax(),
        }
    }
}

fn default_map_width() -> u32 {
    1600
}

fn default_map_height() -> u32 {
    1000
}

fn default_vmin() -> f64 {
    0.05
}

fn default_vmax() -> f64 {
    0.30
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for generated tables and figures.
    #[serde(default = "default_output_dir")]
    pub dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> String {
    "output".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(".smokestat.toml");

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref data_dir) = args.data {
            self.data.dir = data_dir.display().to_string();
        }
        if let Some(ref output_dir) = args.output_dir {
            self.output.dir = output_dir.display().to_string();
        }
    }

    /// Resolve a configured data file against the data directory.
    ///
    /// Absolute entries are used as-is.
    fn resolve(&self, entry: &str) -> PathBuf {
        let path = Path::new(entry);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            Path::new(&self.data.dir).join(path)
        }
    }

    /// Path to the survey extract.
    pub fn survey_path(&self) -> PathBuf {
        self.resolve(&self.data.survey_csv)
    }

    /// Path to the state boundary file.
    pub fn atlas_path(&self) -> PathBuf {
        self.resolve(&self.data.atlas)
    }

    /// Path to the odds-ratio export.
    pub fn or_results_path(&self) -> PathBuf {
        self.resolve(&self.data.or_results)
    }

    /// Confidence level as a typed value.
    pub fn confidence(&self) -> Option<ConfidenceLevel> {
        ConfidenceLevel::from_percent(self.analysis.confidence_level)
    }

    /// Validate the merged configuration.
    pub fn validate(&self) -> Result<(), String> {
        let years = MIN_SURVEY_YEAR..=MAX_SURVEY_YEAR;
        if !years.contains(&self.analysis.baseline_year) {
            return Err(format!(
                "Baseline year must be between {} and {}",
                MIN_SURVEY_YEAR, MAX_SURVEY_YEAR
            ));
        }
        if !years.contains(&self.analysis.comparison_year) {
            return Err(format!(
                "Comparison year must be between {} and {}",
                MIN_SURVEY_YEAR, MAX_SURVEY_YEAR
            ));
        }
        if self.analysis.baseline_year >= self.analysis.comparison_year {
            return Err("Baseline year must precede comparison year".to_string());
        }

        if self.confidence().is_none() {
            return Err("Confidence level must be 90, 95, or 99".to_string());
        }

        if self.analysis.min_cell_size == 0 {
            return Err("Minimum cell size must be at least 1".to_string());
        }
        if self.analysis.max_rse_pct <= 0.0 {
            return Err("Maximum RSE must be positive".to_string());
        }

        if self.map.vmin >= self.map.vmax {
            return Err("Color scale vmin must be below vmax".to_string());
        }
        if self.map.width < 400 || self.map.height < 300 {
            return Err("Map dimensions must be at least 400x300".to_string());
        }

        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.analysis.baseline_year, 2018);
        assert_eq!(config.analysis.comparison_year, 2024);
        assert_eq!(config.analysis.confidence_level, 95);
        assert_eq!(config.analysis.min_cell_size, 50);
        assert_eq!(config.map.vmin, 0.05);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[data]
dir = "inputs"
survey_csv = "pooled.csv"

[analysis]
baseline_year = 2019
comparison_year = 2023
confidence_level = 90

[map]
vmax = 0.4

[output]
dir = "results"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.data.survey_csv, "pooled.csv");
        assert_eq!(config.analysis.baseline_year, 2019);
        assert_eq!(config.analysis.confidence_level, 90);
        assert_eq!(config.map.vmax, 0.4);
        assert_eq!(config.output.dir, "results");
        // Untouched sections keep their defaults.
        assert_eq!(config.map.width, 1600);
        assert_eq!(config.analysis.max_rse_pct, 30.0);
    }

    #[test]
    fn test_path_resolution() {
        let mut config = Config::default();
        config.data.dir = "inputs".to_string();
        assert_eq!(config.survey_path(), PathBuf::from("inputs/brfss_combined.csv"));

        config.data.atlas = "/srv/geo/states.json".to_string();
        assert_eq!(config.atlas_path(), PathBuf::from("/srv/geo/states.json"));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.analysis.baseline_year = 2024;
        config.analysis.comparison_year = 2018;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.analysis.confidence_level = 85;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.map.vmin = 0.5;
        config.map.vmax = 0.2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[data]"));
        assert!(toml_str.contains("[analysis]"));
        assert!(toml_str.contains("[map]"));
        assert!(toml_str.contains("[output]"));
    }
}
