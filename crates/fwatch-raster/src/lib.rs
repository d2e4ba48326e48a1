//! # fwatch-raster
//!
//! Raster plumbing for the best-tile pipeline.
//!
//! This crate provides:
//! - [`Raster`]: a multi-band GeoTIFF image (Byte, UInt16, Int16 or Float32
//!   samples, up to [`MAX_BANDS`] bands) that can be read, recolored band by
//!   band and written back with its georeferencing tags intact
//! - [`RasterTools`]: the crop and merge operations the pipeline delegates to
//!   an external library, with [`GdalTools`] running the GDAL command-line
//!   utilities
//!
//! ## Example
//!
//! ```no_run
//! use fwatch_raster::Raster;
//!
//! let mut tile = Raster::from_file("tmpHeat_n0/42.tif")?;
//! tile.fill_bands(&[0, 0, 153])?;
//! tile.write_to_file("tmpHeat_n0/42.tif")?;
//! # Ok::<(), fwatch_raster::RasterError>(())
//! ```

mod error;
mod raster;
mod tools;

pub use error::RasterError;
pub use raster::{GeoReference, Raster, Samples, MAX_BANDS};
pub use tools::{
    has_tif_extension, list_tiffs, CropWindow, GdalTools, RasterTools, ToolStatus,
    DEFAULT_GDAL_MERGE, DEFAULT_GDAL_TRANSLATE,
};

/// Result type for raster operations.
pub type Result<T> = std::result::Result<T, RasterError>;
