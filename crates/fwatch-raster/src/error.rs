//! Error types for the raster crate.

use thiserror::Error;

/// Errors that can occur when reading, recoloring or writing rasters.
#[derive(Debug, Error)]
pub enum RasterError {
    /// I/O error reading or writing a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TIFF decoding or encoding error.
    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// The TIFF color layout is not one we can rewrite band by band.
    #[error("Unsupported color layout: {0}")]
    UnsupportedLayout(String),

    /// Sample type other than u8, u16, i16 or f32.
    #[error("Unsupported TIFF sample type: {0}")]
    UnsupportedSampleType(String),

    /// Sample buffer length does not match width x height x bands.
    #[error("Sample buffer holds {actual} values, expected {expected}")]
    SampleCount {
        /// Values required by the raster shape.
        expected: usize,
        /// Values actually supplied.
        actual: usize,
    },

    /// Operation needs more bands than the raster has.
    #[error("Raster has {available} band(s), {required} required")]
    TooFewBands {
        /// Bands the operation needs.
        required: usize,
        /// Bands present in the raster.
        available: usize,
    },

    /// Band index out of range.
    #[error("Band {band} out of range (raster has {bands} bands)")]
    BandOutOfRange {
        /// Requested zero-based band index.
        band: usize,
        /// Number of bands in the raster.
        bands: usize,
    },
}
