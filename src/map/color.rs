//! Color handling for choropleth fills.

use plotters::style::RGBColor;

/// Outline color for state borders (0.8 grey).
pub const OUTLINE: RGBColor = RGBColor(204, 204, 204);

/// Fill for states without a plottable value (lightgrey).
pub const MISSING_FILL: RGBColor = RGBColor(211, 211, 211);

/// ColorBrewer RdYlGn anchors reversed, so low values read green and high
/// values read red.
const RDYLGN_REVERSED: [(u8, u8, u8); 11] = [
    (0x00, 0x68, 0x37),
    (0x1a, 0x98, 0x50),
    (0x66, 0xbd, 0x63),
    (0xa6, 0xd9, 0x6a),
    (0xd9, 0xef, 0x8b),
    (0xff, 0xff, 0xbf),
    (0xfe, 0xe0, 0x8b),
    (0xfd, 0xae, 0x61),
    (0xf4, 0x6d, 0x43),
    (0xd7, 0x30, 0x27),
    (0xa5, 0x00, 0x26),
];

/// Samples the reversed RdYlGn ramp at `t` in [0, 1].
///
/// Values outside the range clamp to the end colors.
pub fn ramp_sample(t: f64) -> RGBColor {
    let t = t.clamp(0.0, 1.0);
    let steps = (RDYLGN_REVERSED.len() - 1) as f64;
    let position = t * steps;
    let low = position.floor() as usize;
    if low + 1 >= RDYLGN_REVERSED.len() {
        let (r, g, b) = RDYLGN_REVERSED[RDYLGN_REVERSED.len() - 1];
        return RGBColor(r, g, b);
    }
    let frac = position - low as f64;
    let (r0, g0, b0) = RDYLGN_REVERSED[low];
    let (r1, g1, b1) = RDYLGN_REVERSED[low + 1];
    let lerp = |a: u8, b: u8| -> u8 { (a as f64 + (b as f64 - a as f64) * frac).round() as u8 };
    RGBColor(lerp(r0, r1), lerp(g0, g1), lerp(b0, b1))
}

/// Maps a value in [vmin, vmax] onto the ramp.
pub fn ramp_color(value: f64, vmin: f64, vmax: f64) -> RGBColor {
    if vmax <= vmin {
        return ramp_sample(0.0);
    }
    ramp_sample((value - vmin) / (vmax - vmin))
}
