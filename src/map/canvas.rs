//! Shared choropleth canvas: pixel layout, projection, and polygon drawing.
//!
//! Panels are laid out in absolute pixel coordinates on one SVG drawing
//! area. The projection is a plain equirectangular fit, so the math stays
//! unit testable without a backend. Alaska and Hawaii render as insets in
//! the lower-left corner of each panel, the usual US choropleth layout.

use crate::geo::{Bounds, StateAtlas, StateShape};
use crate::map::color::{ramp_sample, MISSING_FILL, OUTLINE};
use crate::map::RenderError;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::FontTransform;
use plotters_svg::SVGBackend;
use std::collections::HashMap;

/// Font family used across all figures.
pub const FONT: &str = "sans-serif";

/// Drawing area alias for the SVG backend.
pub type SvgCanvas<'a> = DrawingArea<SVGBackend<'a>, Shift>;

const ALASKA: &str = "Alaska";
const HAWAII: &str = "Hawaii";

fn is_continental(name: &str) -> bool {
    name != ALASKA && name != HAWAII && name != "Puerto Rico"
}

/// Aleutian islands cross the antimeridian; wrap them west of it.
fn wrap_lon(lon: f64) -> f64 {
    if lon > 0.0 {
        lon - 360.0
    } else {
        lon
    }
}

/// Pixel-space rectangle on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl PanelRect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Sub-rectangle by fractions of this rect, measured from the top-left.
    pub fn inset(&self, fx: f64, fy: f64, fw: f64, fh: f64) -> PanelRect {
        PanelRect {
            x: self.x + (self.width as f64 * fx).round() as i32,
            y: self.y + (self.height as f64 * fy).round() as i32,
            width: (self.width as f64 * fw).round() as i32,
            height: (self.height as f64 * fh).round() as i32,
        }
    }

    pub fn center_x(&self) -> i32 {
        self.x + self.width / 2
    }

    pub fn center_y(&self) -> i32 {
        self.y + self.height / 2
    }
}

/// Equirectangular lon/lat projection fitted to a pixel rectangle.
///
/// The tighter axis decides the scale; the drawn extent is centered on the
/// other axis, which keeps shapes from stretching.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    scale: f64,
    min_lon: f64,
    max_lat: f64,
    offset_x: f64,
    offset_y: f64,
}

impl Projection {
    /// Fits the bounds into the rect, leaving `margin` as a fraction of the
    /// rect free on every side.
    pub fn fit(bounds: &Bounds, rect: &PanelRect, margin: f64) -> Projection {
        let usable_w = rect.width as f64 * (1.0 - 2.0 * margin);
        let usable_h = rect.height as f64 * (1.0 - 2.0 * margin);
        let lon_span = bounds.width().max(f64::EPSILON);
        let lat_span = bounds.height().max(f64::EPSILON);
        let scale = (usable_w / lon_span).min(usable_h / lat_span);
        let drawn_w = lon_span * scale;
        let drawn_h = lat_span * scale;
        Projection {
            scale,
            min_lon: bounds.min_lon,
            max_lat: bounds.max_lat,
            offset_x: rect.x as f64 + (rect.width as f64 - drawn_w) / 2.0,
            offset_y: rect.y as f64 + (rect.height as f64 - drawn_h) / 2.0,
        }
    }

    /// Projects one lon/lat point to pixel coordinates, north up.
    pub fn apply(&self, lon: f64, lat: f64) -> (i32, i32) {
        let x = self.offset_x + (lon - self.min_lon) * self.scale;
        let y = self.offset_y + (self.max_lat - lat) * self.scale;
        (x.round() as i32, y.round() as i32)
    }
}

/// Draws one choropleth panel with Alaska and Hawaii insets.
///
/// Fills are looked up by state name; states without an entry get the
/// missing fill.
pub fn draw_panel(
    canvas: &SvgCanvas<'_>,
    atlas: &StateAtlas,
    rect: &PanelRect,
    fills: &HashMap<String, RGBColor>,
) -> Result<(), RenderError> {
    let bounds = atlas
        .bounds_where(is_continental)
        .ok_or_else(|| RenderError::InvalidData("atlas has no continental states".to_string()))?;
    let projection = Projection::fit(&bounds, rect, 0.02);

    for shape in atlas.shapes() {
        if !is_continental(&shape.name) {
            continue;
        }
        draw_rings(canvas, shape, fills, |lon, lat| projection.apply(lon, lat))?;
    }

    if let Some(alaska) = atlas.get(ALASKA) {
        draw_state_inset(canvas, alaska, &rect.inset(0.01, 0.68, 0.30, 0.30), fills)?;
    }
    if let Some(hawaii) = atlas.get(HAWAII) {
        draw_state_inset(canvas, hawaii, &rect.inset(0.33, 0.76, 0.18, 0.22), fills)?;
    }
    Ok(())
}

fn draw_state_inset(
    canvas: &SvgCanvas<'_>,
    shape: &StateShape,
    rect: &PanelRect,
    fills: &HashMap<String, RGBColor>,
) -> Result<(), RenderError> {
    let mut bounds: Option<Bounds> = None;
    for ring in &shape.rings {
        for &(lon, lat) in ring {
            let lon = wrap_lon(lon);
            match bounds.as_mut() {
                Some(b) => b.expand(lon, lat),
                None => bounds = Some(Bounds::point(lon, lat)),
            }
        }
    }
    let bounds = bounds
        .ok_or_else(|| RenderError::InvalidData(format!("{} has no geometry", shape.name)))?;
    let projection = Projection::fit(&bounds, rect, 0.05);
    draw_rings(canvas, shape, fills, |lon, lat| {
        projection.apply(wrap_lon(lon), lat)
    })
}

fn draw_rings<P>(
    canvas: &SvgCanvas<'_>,
    shape: &StateShape,
    fills: &HashMap<String, RGBColor>,
    project: P,
) -> Result<(), RenderError>
where
    P: Fn(f64, f64) -> (i32, i32),
{
    let fill = fills
        .get(shape.name.as_str())
        .copied()
        .unwrap_or(MISSING_FILL);
    for ring in &shape.rings {
        if ring.len() < 3 {
            continue;
        }
        let points: Vec<(i32, i32)> = ring.iter().map(|&(lon, lat)| project(lon, lat)).collect();
        canvas
            .draw(&Polygon::new(points.clone(), fill.filled()))
            .map_err(RenderError::draw)?;
        let mut outline = points;
        outline.push(outline[0]);
        canvas
            .draw(&PathElement::new(outline, OUTLINE.stroke_width(1)))
            .map_err(RenderError::draw)?;
    }
    Ok(())
}

/// Draws text centered on the top edge of a rect.
pub fn draw_title(
    canvas: &SvgCanvas<'_>,
    rect: &PanelRect,
    text: &str,
    size: f64,
) -> Result<(), RenderError> {
    let style = (FONT, size)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Top));
    canvas
        .draw(&Text::new(text.to_string(), (rect.center_x(), rect.y), style))
        .map_err(RenderError::draw)
}

/// Draws a vertical label, rotated to read bottom-to-top, centered at
/// (`x`, `y_center`).
pub fn draw_row_label(
    canvas: &SvgCanvas<'_>,
    x: i32,
    y_center: i32,
    text: &str,
    size: f64,
) -> Result<(), RenderError> {
    let style = (FONT, size)
        .into_font()
        .transform(FontTransform::Rotate270)
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Center));
    canvas
        .draw(&Text::new(text.to_string(), (x, y_center), style))
        .map_err(RenderError::draw)
}

/// Draws a horizontal color ramp with percent ticks and a caption below.
pub fn draw_colorbar(
    canvas: &SvgCanvas<'_>,
    rect: &PanelRect,
    vmin: f64,
    vmax: f64,
    caption: &str,
) -> Result<(), RenderError> {
    let columns = rect.width.max(1);
    for px in 0..columns {
        let t = px as f64 / (columns - 1).max(1) as f64;
        canvas
            .draw(&Rectangle::new(
                [
                    (rect.x + px, rect.y),
                    (rect.x + px + 1, rect.y + rect.height),
                ],
                ramp_sample(t).filled(),
            ))
            .map_err(RenderError::draw)?;
    }
    canvas
        .draw(&Rectangle::new(
            [
                (rect.x, rect.y),
                (rect.x + rect.width, rect.y + rect.height),
            ],
            BLACK.stroke_width(1),
        ))
        .map_err(RenderError::draw)?;

    let ticks = 5;
    for i in 0..=ticks {
        let t = i as f64 / ticks as f64;
        let value = vmin + (vmax - vmin) * t;
        let x = rect.x + (rect.width as f64 * t).round() as i32;
        canvas
            .draw(&PathElement::new(
                vec![(x, rect.y + rect.height), (x, rect.y + rect.height + 5)],
                BLACK.stroke_width(1),
            ))
            .map_err(RenderError::draw)?;
        let style = (FONT, 14.0)
            .into_font()
            .color(&BLACK)
            .pos(Pos::new(HPos::Center, VPos::Top));
        canvas
            .draw(&Text::new(
                format!("{:.0}%", value * 100.0),
                (x, rect.y + rect.height + 7),
                style,
            ))
            .map_err(RenderError::draw)?;
    }

    let style = (FONT, 16.0)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Top));
    canvas
        .draw(&Text::new(
            caption.to_string(),
            (rect.center_x(), rect.y + rect.height + 26),
            style,
        ))
        .map_err(RenderError::draw)
}

/// Draws a swatch legend downward from (`x`, `y`).
pub fn draw_legend(
    canvas: &SvgCanvas<'_>,
    x: i32,
    y: i32,
    entries: &[(String, RGBColor)],
    size: f64,
) -> Result<(), RenderError> {
    const ROW: i32 = 26;
    const SWATCH: i32 = 18;
    for (i, (label, color)) in entries.iter().enumerate() {
        let top = y + i as i32 * ROW;
        canvas
            .draw(&Rectangle::new(
                [(x, top), (x + SWATCH, top + SWATCH)],
                color.filled(),
            ))
            .map_err(RenderError::draw)?;
        canvas
            .draw(&Rectangle::new(
                [(x, top), (x + SWATCH, top + SWATCH)],
                BLACK.stroke_width(1),
            ))
            .map_err(RenderError::draw)?;
        let style = (FONT, size)
            .into_font()
            .color(&BLACK)
            .pos(Pos::new(HPos::Left, VPos::Center));
        canvas
            .draw(&Text::new(
                label.clone(),
                (x + SWATCH + 8, top + SWATCH / 2),
                style,
            ))
            .map_err(RenderError::draw)?;
    }
    Ok(())
}

/// Draws a small grey note anchored to the bottom-left corner.
pub fn draw_footnote(
    canvas: &SvgCanvas<'_>,
    x: i32,
    y: i32,
    text: &str,
) -> Result<(), RenderError> {
    let grey = RGBColor(100, 100, 100);
    let style = (FONT, 12.0)
        .into_font()
        .color(&grey)
        .pos(Pos::new(HPos::Left, VPos::Bottom));
    canvas
        .draw(&Text::new(text.to_string(), (x, y), style))
        .map_err(RenderError::draw)
}
