//! Rural/urban smoking-prevalence choropleth.
//!
//! A 2x2 figure: columns are the two survey years, rows are rural and
//! urban counties. Estimates failing the reliability screen render in the
//! missing fill, and per-panel counts of reliable versus excluded states
//! come back to the caller for the console summary.

use crate::geo::{self, StateAtlas};
use crate::map::canvas::{
    draw_colorbar, draw_footnote, draw_panel, draw_row_label, draw_title, PanelRect,
};
use crate::map::color::ramp_color;
use crate::map::RenderError;
use crate::models::{StateFips, SurveyRecord, Urbanity};
use crate::stats::{tally_by, ConfidenceLevel, ReliabilityPolicy, WeightedTally};
use chrono::Local;
use plotters::prelude::*;
use plotters_svg::SVGBackend;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Options for the prevalence map.
#[derive(Debug, Clone, Copy)]
pub struct PrevalenceMapOptions {
    pub baseline_year: u16,
    pub comparison_year: u16,
    /// Low end of the color scale, as a proportion.
    pub vmin: f64,
    /// High end of the color scale, as a proportion.
    pub vmax: f64,
    pub width: u32,
    pub height: u32,
    pub confidence: ConfidenceLevel,
    pub policy: ReliabilityPolicy,
}

impl Default for PrevalenceMapOptions {
    fn default() -> Self {
        Self {
            baseline_year: 2018,
            comparison_year: 2024,
            vmin: 0.05,
            vmax: 0.30,
            width: 1600,
            height: 1000,
            confidence: ConfidenceLevel::default(),
            policy: ReliabilityPolicy::default(),
        }
    }
}

/// Reliability accounting for one panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelQuality {
    pub year: u16,
    pub urbanity: Urbanity,
    /// Mapped states whose estimate passed the reliability screen.
    pub reliable: usize,
    /// Mapped states with any estimate for this panel.
    pub total: usize,
}

impl PanelQuality {
    pub fn excluded(&self) -> usize {
        self.total - self.reliable
    }

    /// One console line, e.g.
    /// `2018 Rural: 38/44 states with reliable estimates (6 excluded)`.
    pub fn summary(&self) -> String {
        format!(
            "{} {}: {}/{} states with reliable estimates ({} excluded)",
            self.year,
            self.urbanity,
            self.reliable,
            self.total,
            self.excluded()
        )
    }
}

type CellTallies = HashMap<(StateFips, Urbanity, u16), WeightedTally>;

fn panel_fills(
    tallies: &CellTallies,
    atlas: &StateAtlas,
    year: u16,
    urbanity: Urbanity,
    options: &PrevalenceMapOptions,
) -> (HashMap<String, RGBColor>, PanelQuality) {
    let mut fills = HashMap::new();
    let mut quality = PanelQuality {
        year,
        urbanity,
        reliable: 0,
        total: 0,
    };

    for ((state, cell_urbanity, cell_year), tally) in tallies {
        if *cell_year != year || *cell_urbanity != urbanity {
            continue;
        }
        let name = match geo::state_name(*state) {
            Some(name) => name,
            None => {
                warn!("No state name for FIPS code {}, cell not mapped", state);
                continue;
            }
        };
        if atlas.get(name).is_none() {
            debug!("{} has no boundary in the atlas, cell not mapped", name);
            continue;
        }

        quality.total += 1;
        let estimate = tally.estimate(options.confidence);
        if let Some(prevalence) = options.policy.screened_prevalence(&estimate) {
            quality.reliable += 1;
            fills.insert(
                name.to_string(),
                ramp_color(prevalence, options.vmin, options.vmax),
            );
        }
    }

    (fills, quality)
}

/// Renders the prevalence map to an SVG file.
///
/// Returns the per-panel quality counts in print order: baseline rural,
/// baseline urban, comparison rural, comparison urban.
pub fn render_prevalence_map(
    records: &[SurveyRecord],
    atlas: &StateAtlas,
    path: &Path,
    options: &PrevalenceMapOptions,
) -> Result<Vec<PanelQuality>, RenderError> {
    if atlas.is_empty() {
        return Err(RenderError::InvalidData(
            "atlas contains no states".to_string(),
        ));
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tallies: CellTallies = tally_by(
        records
            .iter()
            .filter(|r| r.year == options.baseline_year || r.year == options.comparison_year),
        |r| Some((r.state?, r.urbanity?, r.year)),
    );

    let width = options.width as i32;
    let height = options.height as i32;
    let left = 48;
    let top = 56;
    let bottom = 130;
    let gap = 12;
    let panel_w = (width - left - gap) / 2;
    let panel_h = (height - top - bottom - gap) / 2;
    let panel = |col: i32, row: i32| {
        PanelRect::new(
            left + col * (panel_w + gap),
            top + row * (panel_h + gap),
            panel_w,
            panel_h,
        )
    };

    let canvas = SVGBackend::new(path, (options.width, options.height)).into_drawing_area();
    canvas.fill(&WHITE).map_err(RenderError::draw)?;

    let years = [options.baseline_year, options.comparison_year];
    let rows = [Urbanity::Rural, Urbanity::Urban];

    for (col, year) in years.iter().enumerate() {
        let rect = panel(col as i32, 0);
        let title_rect = PanelRect::new(rect.x, 10, rect.width, 0);
        draw_title(&canvas, &title_rect, &year.to_string(), 30.0)?;
    }
    for (row, urbanity) in rows.iter().enumerate() {
        let rect = panel(0, row as i32);
        draw_row_label(&canvas, left / 2, rect.center_y(), &urbanity.to_string(), 24.0)?;
    }

    let mut qualities = Vec::with_capacity(4);
    for (col, year) in years.iter().enumerate() {
        for (row, urbanity) in rows.iter().enumerate() {
            let (fills, quality) = panel_fills(&tallies, atlas, *year, *urbanity, options);
            draw_panel(&canvas, atlas, &panel(col as i32, row as i32), &fills)?;
            qualities.push(quality);
        }
    }

    let bar_w = width * 2 / 5;
    let bar = PanelRect::new((width - bar_w) / 2, height - bottom + 45, bar_w, 16);
    draw_colorbar(
        &canvas,
        &bar,
        options.vmin,
        options.vmax,
        "Current smoking prevalence",
    )?;

    let note = format!("Source: BRFSS. Generated {}", Local::now().format("%Y-%m-%d"));
    draw_footnote(&canvas, 10, height - 8, &note)?;

    canvas.present().map_err(RenderError::draw)?;
    Ok(qualities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::StateAtlas;
    use crate::map::color::ramp_sample;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TWO_STATE_ATLAS: &str = r#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "properties": {"name": "Colorado"},
         "geometry": {"type": "Polygon", "coordinates":
            [[[-109.0, 41.0], [-102.0, 41.0], [-102.0, 37.0], [-109.0, 37.0], [-109.0, 41.0]]]}},
        {"type": "Feature", "properties": {"name": "Kansas"},
         "geometry": {"type": "Polygon", "coordinates":
            [[[-102.0, 40.0], [-94.6, 40.0], [-94.6, 37.0], [-102.0, 37.0], [-102.0, 40.0]]]}}
    ]}"#;

    fn atlas() -> StateAtlas {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(TWO_STATE_ATLAS.as_bytes()).unwrap();
        StateAtlas::load(file.path()).unwrap()
    }

    fn cell_records(year: u16, state: u16, urbanity: Urbanity, n: usize, cases: usize) -> Vec<SurveyRecord> {
        (0..n)
            .map(|i| SurveyRecord {
                year,
                weight: 1.0,
                state: Some(StateFips(state)),
                urbanity: Some(urbanity),
                smoker: Some(i < cases),
                age: None,
                sex: None,
                race: None,
                education: None,
            })
            .collect()
    }

    #[test]
    fn test_panel_fills_screen_and_color() {
        // Colorado rural: 100 respondents at 15% smoking, reliable.
        let mut records = cell_records(2018, 8, Urbanity::Rural, 100, 15);
        // Kansas rural: 10 respondents, below the floor.
        records.extend(cell_records(2018, 20, Urbanity::Rural, 10, 3));
        // Guam rural: plenty of data but no shape in this atlas.
        records.extend(cell_records(2018, 66, Urbanity::Rural, 100, 20));

        let options = PrevalenceMapOptions::default();
        let tallies: CellTallies = tally_by(records.iter(), |r| {
            Some((r.state?, r.urbanity?, r.year))
        });
        let (fills, quality) = panel_fills(&tallies, &atlas(), 2018, Urbanity::Rural, &options);

        assert_eq!(quality.year, 2018);
        assert_eq!(quality.urbanity, Urbanity::Rural);
        assert_eq!(quality.total, 2);
        assert_eq!(quality.reliable, 1);
        assert_eq!(quality.excluded(), 1);

        // 15% on a 5%..30% scale sits at t = 0.4.
        assert_eq!(fills.get("Colorado"), Some(&ramp_sample(0.4)));
        assert_eq!(fills.get("Kansas"), None);
        assert_eq!(fills.get("Guam"), None);
    }

    #[test]
    fn test_panel_fills_ignore_other_cells() {
        let mut records = cell_records(2018, 8, Urbanity::Rural, 100, 15);
        records.extend(cell_records(2018, 8, Urbanity::Urban, 100, 15));
        records.extend(cell_records(2024, 8, Urbanity::Rural, 100, 15));

        let tallies: CellTallies = tally_by(records.iter(), |r| {
            Some((r.state?, r.urbanity?, r.year))
        });
        let options = PrevalenceMapOptions::default();
        let (_, quality) = panel_fills(&tallies, &atlas(), 2018, Urbanity::Rural, &options);
        assert_eq!(quality.total, 1);
    }

    #[test]
    fn test_render_writes_svg_and_reports_quality() {
        let mut records = cell_records(2018, 8, Urbanity::Rural, 80, 12);
        records.extend(cell_records(2018, 8, Urbanity::Urban, 80, 10));
        records.extend(cell_records(2024, 8, Urbanity::Rural, 80, 8));
        records.extend(cell_records(2024, 8, Urbanity::Urban, 80, 6));
        records.extend(cell_records(2018, 20, Urbanity::Rural, 6, 1));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("figures").join("map.svg");
        let options = PrevalenceMapOptions {
            width: 800,
            height: 500,
            ..Default::default()
        };
        let qualities =
            render_prevalence_map(&records, &atlas(), &path, &options).unwrap();

        assert_eq!(qualities.len(), 4);
        assert_eq!(
            qualities[0].summary(),
            "2018 Rural: 1/2 states with reliable estimates (1 excluded)"
        );
        assert_eq!(qualities[1].summary(), "2018 Urban: 1/1 states with reliable estimates (0 excluded)");
        assert_eq!(qualities[2].year, 2024);
        assert_eq!(qualities[2].urbanity, Urbanity::Rural);

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("2018"));
        assert!(svg.contains("2024"));
        assert!(svg.contains("Current smoking prevalence"));
    }

    #[test]
    fn test_empty_atlas_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{"type": "FeatureCollection", "features": []}"#)
            .unwrap();
        let empty = StateAtlas::load(file.path()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.svg");
        let err = render_prevalence_map(&[], &empty, &path, &PrevalenceMapOptions::default())
            .unwrap_err();
        assert!(matches!(err, RenderError::InvalidData(_)));
    }
}
