//! Smokestat - rural/urban smoking prevalence from pooled BRFSS extracts
//!
//! A CLI tool that computes design-weighted smoking prevalence with
//! Kish effective sample sizes, screens estimates for reliability, and
//! emits disparity tables, sample descriptives, and choropleth maps.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (missing file, malformed data, config error)
//!   2 - `check` found required survey variables missing

mod cli;
mod config;
mod geo;
mod loader;
mod map;
mod models;
mod stats;
mod tables;

use anyhow::{bail, Context, Result};
use cli::{Args, Command};
use config::Config;
use geo::StateAtlas;
use loader::LoadOptions;
use map::{OrMapOptions, PrevalenceMapOptions};
use stats::{ConfidenceLevel, ReliabilityPolicy};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tables::{DescriptivesOptions, DisparityOptions};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if matches!(args.command, Command::InitConfig) {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("Smokestat v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args) {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle init-config: generate a default .smokestat.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(".smokestat.toml");

    if path.exists() {
        eprintln!("⚠️  .smokestat.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .smokestat.toml")?;

    println!("✅ Created .smokestat.toml with default settings.");
    println!("   Edit it to point at your survey extract, atlas, and output directory.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Dispatch the subcommand. Returns the process exit code.
fn run(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    if let Err(e) = config.validate() {
        bail!("Invalid configuration: {}", e);
    }

    let confidence = config.confidence().unwrap_or_default();
    let policy = ReliabilityPolicy {
        min_respondents: config.analysis.min_cell_size,
        max_rse_pct: config.analysis.max_rse_pct,
    };

    let exit_code = match args.command.clone() {
        Command::Disparity {
            baseline,
            comparison,
        } => {
            let baseline = baseline.unwrap_or(config.analysis.baseline_year);
            let comparison = comparison.unwrap_or(config.analysis.comparison_year);
            if baseline >= comparison {
                bail!("Baseline year must precede comparison year");
            }
            run_disparity(&args, &config, baseline, comparison, confidence)?
        }
        Command::Descriptives { from, through } => {
            let from = from.unwrap_or(config.analysis.baseline_year);
            let through = through.unwrap_or(config.analysis.comparison_year);
            if from > through {
                bail!("Window start must not follow window end");
            }
            run_descriptives(&args, &config, from, through)?
        }
        Command::PrevalenceMap {
            baseline,
            comparison,
            vmin,
            vmax,
            atlas,
        } => {
            let baseline = baseline.unwrap_or(config.analysis.baseline_year);
            let comparison = comparison.unwrap_or(config.analysis.comparison_year);
            if baseline >= comparison {
                bail!("Baseline year must precede comparison year");
            }
            let options = PrevalenceMapOptions {
                baseline_year: baseline,
                comparison_year: comparison,
                vmin: vmin.unwrap_or(config.map.vmin),
                vmax: vmax.unwrap_or(config.map.vmax),
                width: config.map.width,
                height: config.map.height,
                confidence,
                policy,
            };
            if options.vmin >= options.vmax {
                bail!("Color scale vmin must be below vmax");
            }
            run_prevalence_map(&args, &config, atlas, options)?
        }
        Command::OrMap { results, atlas } => run_or_map(&args, &config, results, atlas)?,
        Command::Check => run_check(&config)?,
        Command::InitConfig => unreachable!("handled before logging"),
    };

    let duration = start_time.elapsed().as_secs_f64();
    if !args.quiet {
        println!("\n⏱  Done in {:.1}s", duration);
    }

    Ok(exit_code)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from .smokestat.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

/// Load the survey extract, printing load statistics.
fn load_dataset(args: &Args, config: &Config) -> Result<loader::Dataset> {
    let path = config.survey_path();
    println!("📥 Loading survey extract: {}", path.display());

    let options = LoadOptions {
        show_progress: !args.quiet,
    };
    let dataset = loader::load_survey(&path, &options)?;

    println!(
        "   {} rows kept, {} dropped, {} cells coerced to missing",
        dataset.stats.rows_kept,
        dataset.stats.rows_dropped(),
        dataset.stats.coerced_cells()
    );
    if dataset.is_empty() {
        warn!("No usable rows in {}", path.display());
    } else {
        debug!("{} records across survey years {:?}", dataset.len(), dataset.years());
    }
    Ok(dataset)
}

/// Load the state boundary atlas.
fn load_atlas(config: &Config, override_path: Option<PathBuf>) -> Result<StateAtlas> {
    let path = override_path.unwrap_or_else(|| config.atlas_path());
    info!("Loading state boundaries from {}", path.display());
    let atlas = StateAtlas::load(&path)?;
    debug!("Atlas carries {} state shapes", atlas.len());
    Ok(atlas)
}

fn tables_dir(config: &Config) -> PathBuf {
    Path::new(&config.output.dir).join("tables")
}

fn figures_dir(config: &Config) -> PathBuf {
    Path::new(&config.output.dir).join("figures")
}

/// Build and save the rural/urban disparity table.
fn run_disparity(
    args: &Args,
    config: &Config,
    baseline: u16,
    comparison: u16,
    confidence: ConfidenceLevel,
) -> Result<i32> {
    let dataset = load_dataset(args, config)?;

    println!(
        "🧮 Estimating rural/urban prevalence for {} and {}...",
        baseline, comparison
    );
    let options = DisparityOptions {
        baseline_year: baseline,
        comparison_year: comparison,
        confidence,
    };
    let table = tables::build_disparity_table(&dataset.records, &options);
    info!("Disparity table covers {} states", table.rows.len());

    if !args.quiet {
        println!("\n{}", table.render_preview(12));
    }

    let out = tables_dir(config).join(format!("state_disparity_{}_{}.csv", baseline, comparison));
    table.write_csv(&out)?;
    println!("\n✅ Disparity table saved to: {}", out.display());
    Ok(0)
}

/// Build and save the sample descriptives table.
fn run_descriptives(args: &Args, config: &Config, from: u16, through: u16) -> Result<i32> {
    let dataset = load_dataset(args, config)?;

    println!("🧮 Summarizing sample composition for {}-{}...", from, through);
    let options = DescriptivesOptions {
        from_year: from,
        through_year: through,
    };
    let report = tables::build_descriptives(&dataset.records, &options);

    println!(
        "   {} respondents in window ({:.0} weighted)",
        report.totals.rows, report.totals.weight_all
    );
    println!(
        "   {} with known smoking status ({:.0} weighted), {:.1}% missing",
        report.totals.smoking_rows,
        report.totals.smoking_weight,
        report.totals.missing_pct()
    );

    if !args.quiet {
        for section in &report.sections {
            println!("\n{}\n{}", section.characteristic, section.render());
        }
    }

    let out = tables_dir(config).join(format!("descriptives_{}_{}.csv", from, through));
    report.write_csv(&out)?;
    println!("\n✅ Descriptives table saved to: {}", out.display());
    Ok(0)
}

/// Render the four-panel prevalence choropleth.
fn run_prevalence_map(
    args: &Args,
    config: &Config,
    atlas_override: Option<PathBuf>,
    options: PrevalenceMapOptions,
) -> Result<i32> {
    let dataset = load_dataset(args, config)?;
    let atlas = load_atlas(config, atlas_override)?;

    println!(
        "🗺️  Rendering prevalence panels for {} and {}...",
        options.baseline_year, options.comparison_year
    );
    let out = figures_dir(config).join(format!(
        "prevalence_map_{}_{}.svg",
        options.baseline_year, options.comparison_year
    ));
    let quality = map::render_prevalence_map(&dataset.records, &atlas, &out, &options)
        .context("Failed to render prevalence map")?;

    for panel in &quality {
        println!("   {}", panel.summary());
    }
    println!("\n✅ Prevalence map saved to: {}", out.display());
    Ok(0)
}

/// Render the three-panel odds-ratio choropleth.
fn run_or_map(
    args: &Args,
    config: &Config,
    results_override: Option<PathBuf>,
    atlas_override: Option<PathBuf>,
) -> Result<i32> {
    let results_path = results_override.unwrap_or_else(|| config.or_results_path());
    println!("📥 Loading odds-ratio results: {}", results_path.display());
    let results = map::load_or_results(&results_path)?;
    println!("   {} state rows loaded", results.len());

    let atlas = load_atlas(config, atlas_override)?;

    println!("🗺️  Rendering odds-ratio panels...");
    let out = figures_dir(config).join("rural_or_map.svg");
    let or_options = OrMapOptions {
        width: config.map.width,
        height: config.map.height,
    };
    let report = map::render_or_map(&results, &atlas, &out, &or_options)
        .context("Failed to render odds-ratio map")?;

    if !args.quiet {
        for listing in &report.models {
            println!("\n{}: states with significant OR < 1.0:", listing.model);
            if listing.states.is_empty() {
                println!("  None");
            } else {
                for entry in &listing.states {
                    println!(
                        "  {}: OR = {:.3}, p = {:.4}",
                        entry.state, entry.odds_ratio, entry.p_value
                    );
                }
            }
        }
    }

    println!("\n✅ Odds-ratio map saved to: {}", out.display());
    Ok(0)
}

/// Verify the survey extract carries the required variables.
fn run_check(config: &Config) -> Result<i32> {
    let path = config.survey_path();
    println!("🔍 Checking survey variables in: {}", path.display());

    let report = loader::check_variables(&path)?;
    println!("   {} columns in header", report.column_count);

    if !report.missing_demographic.is_empty() {
        println!(
            "   ⚠️  Missing demographic columns (tables will show them as Missing): {}",
            report.missing_demographic.join(", ")
        );
    }

    if report.is_satisfied() {
        println!("\n✅ All required variables present.");
        Ok(0)
    } else {
        eprintln!(
            "\n⛔ {} is missing required columns: {}. Failing (exit code 2).",
            report.path.display(),
            report.missing_required.join(", ")
        );
        Ok(2)
    }
}
