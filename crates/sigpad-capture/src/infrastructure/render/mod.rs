//! Rendering infrastructure.
//!
//! The capture pipeline draws reconstructed segments onto a persistent
//! rendering surface which doubles as the export source: what accumulated on
//! the surface at finish time is exactly what the raster contains.  The
//! [`RenderSink`] trait is the seam between the capture controller and the
//! concrete surface, so tests can substitute a recording sink.

pub mod raster;

pub use raster::RasterSurface;

use sigpad_core::Segment;
use thiserror::Error;

/// Error type for rendering and export operations.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The raster could not be encoded.
    #[error("raster encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Raster output format for [`RenderSink::export`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Png,
    /// JPEG with an encoder quality in `1..=100`.
    Jpeg { quality: u8 },
}

/// A 2-D drawing surface accepting segment draw commands.
pub trait RenderSink: Send {
    /// Draws one line segment in canvas coordinates.
    fn draw_segment(&mut self, segment: &Segment);

    /// Wipes the whole surface back to the background colour.
    fn clear(&mut self);

    /// Encodes the current surface content.  Pure with respect to surface
    /// state: exporting twice yields identical bytes.
    fn export(&self, format: ExportFormat) -> Result<Vec<u8>, RenderError>;
}
