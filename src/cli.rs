//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::{MAX_SURVEY_YEAR, MIN_SURVEY_YEAR};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Smokestat - rural/urban smoking prevalence tables and maps
///
/// Computes design-weighted smoking prevalence from pooled BRFSS
/// extracts, screens estimates for reliability, and renders state-level
/// choropleth maps as SVG.
///
/// Examples:
///   smokestat disparity
///   smokestat descriptives --from 2018 --through 2024
///   smokestat prevalence-map --baseline 2018 --comparison 2024
///   smokestat or-map --results data/state_or_results.csv
///   smokestat check
///   smokestat init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Base directory for input data files
    ///
    /// Relative paths from the config file are resolved against this.
    /// Can also be set via SMOKESTAT_DATA or .smokestat.toml.
    #[arg(short, long, value_name = "DIR", env = "SMOKESTAT_DATA", global = true)]
    pub data: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .smokestat.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Directory for generated tables and figures
    #[arg(short, long, value_name = "DIR", global = true)]
    pub output_dir: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Build the rural/urban disparity table for two survey years
    Disparity {
        /// Baseline survey year
        #[arg(long, value_name = "YEAR")]
        baseline: Option<u16>,

        /// Comparison survey year
        #[arg(long, value_name = "YEAR")]
        comparison: Option<u16>,
    },

    /// Build the sample descriptives table for a year window
    Descriptives {
        /// First year of the window (inclusive)
        #[arg(long, value_name = "YEAR")]
        from: Option<u16>,

        /// Last year of the window (inclusive)
        #[arg(long, value_name = "YEAR")]
        through: Option<u16>,
    },

    /// Render the four-panel prevalence choropleth
    PrevalenceMap {
        /// Baseline survey year
        #[arg(long, value_name = "YEAR")]
        baseline: Option<u16>,

        /// Comparison survey year
        #[arg(long, value_name = "YEAR")]
        comparison: Option<u16>,

        /// Prevalence at the low end of the color scale (fraction)
        #[arg(long, value_name = "FRAC")]
        vmin: Option<f64>,

        /// Prevalence at the high end of the color scale (fraction)
        #[arg(long, value_name = "FRAC")]
        vmax: Option<f64>,

        /// State boundary file (GeoJSON), overriding the config
        #[arg(long, value_name = "FILE")]
        atlas: Option<PathBuf>,
    },

    /// Render the three-panel odds-ratio choropleth
    OrMap {
        /// Odds-ratio results file (CSV), overriding the config
        #[arg(long, value_name = "FILE")]
        results: Option<PathBuf>,

        /// State boundary file (GeoJSON), overriding the config
        #[arg(long, value_name = "FILE")]
        atlas: Option<PathBuf>,
    },

    /// Verify that the survey extract carries the required variables
    Check,

    /// Generate a default .smokestat.toml configuration file
    InitConfig,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        match &self.command {
            Command::Disparity {
                baseline,
                comparison,
            } => {
                check_year(*baseline)?;
                check_year(*comparison)?;
                if let (Some(a), Some(b)) = (baseline, comparison) {
                    if a >= b {
                        return Err("Baseline year must precede comparison year".to_string());
                    }
                }
            }
            Command::Descriptives { from, through } => {
                check_year(*from)?;
                check_year(*through)?;
                if let (Some(a), Some(b)) = (from, through) {
                    if a > b {
                        return Err("Window start must not follow window end".to_string());
                    }
                }
            }
            Command::PrevalenceMap {
                baseline,
                comparison,
                vmin,
                vmax,
                ..
            } => {
                check_year(*baseline)?;
                check_year(*comparison)?;
                if let (Some(a), Some(b)) = (baseline, comparison) {
                    if a >= b {
                        return Err("Baseline year must precede comparison year".to_string());
                    }
                }
                if let (Some(lo), Some(hi)) = (vmin, vmax) {
                    if lo >= hi {
                        return Err("Color scale vmin must be below vmax".to_string());
                    }
                }
            }
            Command::OrMap { .. } | Command::Check | Command::InitConfig => {}
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

fn check_year(year: Option<u16>) -> Result<(), String> {
    if let Some(year) = year {
        if !(MIN_SURVEY_YEAR..=MAX_SURVEY_YEAR).contains(&year) {
            return Err(format!(
                "Survey years run {} through {} (got {})",
                MIN_SURVEY_YEAR, MAX_SURVEY_YEAR, year
            ));
        }
    }
    Ok(())
}
