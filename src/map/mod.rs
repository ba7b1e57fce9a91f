//! Choropleth rendering: shared canvas plumbing and the two map products.

pub mod canvas;
pub mod color;
pub mod odds_ratio;
pub mod prevalence;

pub use odds_ratio::{load_or_results, render_or_map, OrMapOptions, OrMapReport};
pub use prevalence::{render_prevalence_map, PanelQuality, PrevalenceMapOptions};

use thiserror::Error;

/// Errors from figure rendering.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to draw on the canvas: {0}")]
    Draw(String),
    #[error("Failed to save figure: {0}")]
    FileSave(#[from] std::io::Error),
    #[error("Invalid map data: {0}")]
    InvalidData(String),
}

impl RenderError {
    /// Wraps a plotters drawing error, which is generic over the backend.
    pub(crate) fn draw<E: std::fmt::Display>(err: E) -> Self {
        RenderError::Draw(err.to_string())
    }
}
