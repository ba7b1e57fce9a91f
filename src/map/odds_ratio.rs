//! Rural-vs-urban odds-ratio choropleth.
//!
//! Consumes the per-state logistic-regression export (three adjustment
//! models per state) and renders one panel per model, bucketing each state
//! by odds-ratio magnitude and significance. States absent from the export
//! were dropped upstream for small rural samples and get their own bucket.

use crate::geo::{self, StateAtlas};
use crate::map::canvas::{draw_legend, draw_panel, draw_title, PanelRect};
use crate::map::RenderError;
use anyhow::{Context, Result};
use plotters::prelude::*;
use plotters_svg::SVGBackend;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Significance cutoff for the bucket rules.
const ALPHA: f64 = 0.05;

/// Model titles in panel order.
pub const MODEL_TITLES: [&str; 3] = ["Model 1", "Model 2", "Model 3a"];

/// Odds ratio and p-value for one state under one model.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ModelResult {
    pub odds_ratio: Option<f64>,
    pub p_value: Option<f64>,
}

/// All model results for one state.
#[derive(Debug, Clone, PartialEq)]
pub struct StateOrResult {
    /// Canonical state name.
    pub state: String,
    pub models: [ModelResult; 3],
}

/// Fill bucket for one state under one model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrBucket {
    /// State missing from the export entirely.
    SmallRuralSample,
    /// Estimate missing or not significant at the 5% level.
    NonSignificant,
    BelowUnity,
    ModestOr,
    ElevatedOr,
    HighOr,
}

impl OrBucket {
    /// Legend label.
    pub fn label(&self) -> &'static str {
        match self {
            OrBucket::SmallRuralSample => "Rural sample size: n < 50",
            OrBucket::NonSignificant => "Non-significant",
            OrBucket::BelowUnity => "OR < 1.0",
            OrBucket::ModestOr => "OR ≤ 1.25",
            OrBucket::ElevatedOr => "1.25 < OR < 1.50",
            OrBucket::HighOr => "OR ≥ 1.50",
        }
    }

    /// Map fill.
    pub fn color(&self) -> RGBColor {
        match self {
            OrBucket::SmallRuralSample => RGBColor(0x96, 0x96, 0x96),
            OrBucket::NonSignificant => RGBColor(0xd9, 0xd9, 0xd9),
            OrBucket::BelowUnity => RGBColor(0xfe, 0xe0, 0x90),
            OrBucket::ModestOr => RGBColor(0xa6, 0xbd, 0xdb),
            OrBucket::ElevatedOr => RGBColor(0x36, 0x90, 0xc0),
            OrBucket::HighOr => RGBColor(0x03, 0x4e, 0x7b),
        }
    }
}

/// Buckets one model result.
pub fn classify(result: Option<&ModelResult>) -> OrBucket {
    let result = match result {
        Some(result) => result,
        None => return OrBucket::SmallRuralSample,
    };
    let (or, p) = match (result.odds_ratio, result.p_value) {
        (Some(or), Some(p)) => (or, p),
        _ => return OrBucket::NonSignificant,
    };
    if p >= ALPHA {
        OrBucket::NonSignificant
    } else if or < 1.0 {
        OrBucket::BelowUnity
    } else if or <= 1.25 {
        OrBucket::ModestOr
    } else if or < 1.50 {
        OrBucket::ElevatedOr
    } else {
        OrBucket::HighOr
    }
}

/// Parses a p-value cell.
///
/// Handles censored values like `"<0.001"` and scientific notation;
/// anything unparseable becomes missing.
pub fn parse_p_value(raw: &str) -> Option<f64> {
    let text = raw.trim();
    let text = match text.strip_prefix('<') {
        Some(rest) => rest.trim(),
        None => text,
    };
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[derive(Debug, Deserialize)]
struct RawOrRow {
    #[serde(rename = "State_Name")]
    state_name: String,
    #[serde(rename = "OR_Model1", default)]
    or_model1: Option<String>,
    #[serde(rename = "PValue_Model1", default)]
    p_model1: Option<String>,
    #[serde(rename = "OR_Model2", default)]
    or_model2: Option<String>,
    #[serde(rename = "PValue_Model2", default)]
    p_model2: Option<String>,
    #[serde(rename = "OR_Model3", default)]
    or_model3: Option<String>,
    #[serde(rename = "PValue_Model3", default)]
    p_model3: Option<String>,
}

fn parse_or_cell(field: &Option<String>) -> Option<f64> {
    field
        .as_deref()?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

fn parse_p_cell(field: &Option<String>) -> Option<f64> {
    parse_p_value(field.as_deref()?)
}

/// Loads the odds-ratio export, canonicalizing state names.
pub fn load_or_results(path: &Path) -> Result<Vec<StateOrResult>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open odds-ratio file: {}", path.display()))?;
    let mut results = Vec::new();
    for row in reader.deserialize::<RawOrRow>() {
        let raw: RawOrRow = row
            .with_context(|| format!("Malformed CSV record in {}", path.display()))?;
        let models = [
            ModelResult {
                odds_ratio: parse_or_cell(&raw.or_model1),
                p_value: parse_p_cell(&raw.p_model1),
            },
            ModelResult {
                odds_ratio: parse_or_cell(&raw.or_model2),
                p_value: parse_p_cell(&raw.p_model2),
            },
            ModelResult {
                odds_ratio: parse_or_cell(&raw.or_model3),
                p_value: parse_p_cell(&raw.p_model3),
            },
        ];
        results.push(StateOrResult {
            state: geo::canonical_name(raw.state_name.trim()),
            models,
        });
    }
    Ok(results)
}

/// Options for the odds-ratio map.
#[derive(Debug, Clone, Copy)]
pub struct OrMapOptions {
    pub width: u32,
    pub height: u32,
}

impl Default for OrMapOptions {
    fn default() -> Self {
        Self {
            width: 1600,
            height: 1000,
        }
    }
}

/// A significant protective state under one model.
#[derive(Debug, Clone, PartialEq)]
pub struct SignificantState {
    pub state: String,
    pub odds_ratio: f64,
    pub p_value: f64,
}

/// Significant `OR < 1.0` states for one model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelListing {
    pub model: &'static str,
    pub states: Vec<SignificantState>,
}

/// What the odds-ratio map reports back for the console.
#[derive(Debug, Clone, PartialEq)]
pub struct OrMapReport {
    pub models: Vec<ModelListing>,
}

fn model_fills(
    results: &[StateOrResult],
    atlas: &StateAtlas,
    model_index: usize,
) -> HashMap<String, RGBColor> {
    let by_state: HashMap<&str, &StateOrResult> =
        results.iter().map(|r| (r.state.as_str(), r)).collect();
    let mut fills = HashMap::new();
    for shape in atlas.shapes() {
        let result = by_state
            .get(shape.name.as_str())
            .map(|r| &r.models[model_index]);
        fills.insert(shape.name.clone(), classify(result).color());
    }
    fills
}

/// Renders the three-panel odds-ratio map to an SVG file.
pub fn render_or_map(
    results: &[StateOrResult],
    atlas: &StateAtlas,
    path: &Path,
    options: &OrMapOptions,
) -> Result<OrMapReport, RenderError> {
    if atlas.is_empty() {
        return Err(RenderError::InvalidData(
            "atlas contains no states".to_string(),
        ));
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let width = options.width as i32;
    let height = options.height as i32;
    let top = 56;
    let gap = 14;
    let title_gap = 26;
    let half_w = (width - gap) / 2;
    let half_h = (height - top - gap - 40) / 2;

    let panels = [
        PanelRect::new(0, top, half_w, half_h - title_gap),
        PanelRect::new(half_w + gap, top, half_w, half_h - title_gap),
        // Model 3a spans the bottom row, leaving room for the legend.
        PanelRect::new(
            0,
            top + half_h + gap,
            width * 3 / 5,
            half_h - title_gap,
        ),
    ];

    let canvas = SVGBackend::new(path, (options.width, options.height)).into_drawing_area();
    canvas.fill(&WHITE).map_err(RenderError::draw)?;

    draw_title(
        &canvas,
        &PanelRect::new(0, 8, width, 0),
        "Rural vs urban smoking: adjusted odds ratios by state",
        26.0,
    )?;

    for (i, rect) in panels.iter().enumerate() {
        let title_rect = PanelRect::new(rect.x, rect.y - title_gap + 4, rect.width, 0);
        draw_title(&canvas, &title_rect, MODEL_TITLES[i], 20.0)?;
        let fills = model_fills(results, atlas, i);
        draw_panel(&canvas, atlas, rect, &fills)?;
    }

    // Legend in the free lower-right corner, strongest bucket first.
    let legend_buckets = [
        OrBucket::HighOr,
        OrBucket::ElevatedOr,
        OrBucket::ModestOr,
        OrBucket::BelowUnity,
        OrBucket::NonSignificant,
        OrBucket::SmallRuralSample,
    ];
    let entries: Vec<(String, RGBColor)> = legend_buckets
        .iter()
        .map(|b| (b.label().to_string(), b.color()))
        .collect();
    let legend_x = panels[2].x + panels[2].width + 60;
    let legend_y = panels[2].y + panels[2].height / 2 - 80;
    draw_legend(&canvas, legend_x, legend_y, &entries, 16.0)?;

    canvas.present().map_err(RenderError::draw)?;

    let mut report = OrMapReport { models: Vec::new() };
    for (i, title) in MODEL_TITLES.iter().enumerate() {
        let mut states: Vec<SignificantState> = results
            .iter()
            .filter(|r| r.state != "Nationwide")
            .filter_map(|r| {
                let model = &r.models[i];
                match (model.odds_ratio, model.p_value) {
                    (Some(or), Some(p)) if p < ALPHA && or < 1.0 => Some(SignificantState {
                        state: r.state.clone(),
                        odds_ratio: or,
                        p_value: p,
                    }),
                    _ => None,
                }
            })
            .collect();
        states.sort_by(|a, b| a.state.cmp(&b.state));
        report.models.push(ModelListing {
            model: title,
            states,
        });
    }
    Ok(report)
}
