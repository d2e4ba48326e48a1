//! External raster tools used to crop and merge GeoTIFF files.
//!
//! Cropping and mosaicking are delegated to GDAL's command-line utilities:
//!
//! - `gdal_translate -projwin <ulx> <uly> <lrx> <lry> <src> <dst>`
//! - `gdal_merge.py [-init "<r> <g> <b>"] -o <dst> <inputs...>`
//!
//! Exit codes are reported back as a [`ToolStatus`] but never turned into
//! errors; callers decide what a missing output means.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Default executable for cropping.
pub const DEFAULT_GDAL_TRANSLATE: &str = "gdal_translate";

/// Default executable for mosaicking.
pub const DEFAULT_GDAL_MERGE: &str = "gdal_merge.py";

/// Crop window in upper-left / lower-right order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropWindow {
    /// Upper-left X (west edge).
    pub ulx: f64,
    /// Upper-left Y (north edge).
    pub uly: f64,
    /// Lower-right X (east edge).
    pub lrx: f64,
    /// Lower-right Y (south edge).
    pub lry: f64,
}

impl CropWindow {
    /// Build a window from axis bounds.
    pub fn from_bounds(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            ulx: min_x,
            uly: max_y,
            lrx: max_x,
            lry: min_y,
        }
    }

    /// Arguments for `gdal_translate -projwin`.
    pub fn projwin_args(&self) -> [String; 5] {
        [
            "-projwin".to_string(),
            self.ulx.to_string(),
            self.uly.to_string(),
            self.lrx.to_string(),
            self.lry.to_string(),
        ]
    }
}

/// Outcome of one external tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolStatus {
    /// The tool exited with status 0.
    Succeeded,
    /// The tool ran and exited unsuccessfully (`None` when killed by a signal).
    Failed(Option<i32>),
    /// The tool could not be launched at all.
    NotStarted(String),
}

impl ToolStatus {
    /// Whether the tool exited successfully.
    pub fn success(&self) -> bool {
        matches!(self, ToolStatus::Succeeded)
    }
}

/// Raster operations the best-tile pipeline delegates to an external library.
pub trait RasterTools {
    /// Crop `source` to `window`, writing `output`.
    fn crop(&self, window: &CropWindow, source: &Path, output: &Path) -> ToolStatus;

    /// Merge `inputs` into `output`, filling uncovered area with `fill` if given.
    fn merge(&self, inputs: &[PathBuf], output: &Path, fill: Option<[u8; 3]>) -> ToolStatus;
}

/// [`RasterTools`] backed by the GDAL command-line utilities.
#[derive(Debug, Clone)]
pub struct GdalTools {
    translate: PathBuf,
    merge: PathBuf,
}

impl Default for GdalTools {
    fn default() -> Self {
        Self::new(DEFAULT_GDAL_TRANSLATE, DEFAULT_GDAL_MERGE)
    }
}

impl GdalTools {
    /// Use the given executables for cropping and merging.
    pub fn new<T: Into<PathBuf>, M: Into<PathBuf>>(translate: T, merge: M) -> Self {
        Self {
            translate: translate.into(),
            merge: merge.into(),
        }
    }

    /// Build the crop command without running it.
    pub fn crop_command(&self, window: &CropWindow, source: &Path, output: &Path) -> Command {
        let mut cmd = Command::new(&self.translate);
        cmd.args(window.projwin_args()).arg(source).arg(output);
        cmd
    }

    /// Build the merge command without running it.
    pub fn merge_command(&self, inputs: &[PathBuf], output: &Path, fill: Option<[u8; 3]>) -> Command {
        let mut cmd = Command::new(&self.merge);
        if let Some([r, g, b]) = fill {
            cmd.arg("-init").arg(format!("{} {} {}", r, g, b));
        }
        cmd.arg("-o").arg(output).args(inputs);
        cmd
    }
}

impl RasterTools for GdalTools {
    fn crop(&self, window: &CropWindow, source: &Path, output: &Path) -> ToolStatus {
        run(self.crop_command(window, source, output))
    }

    fn merge(&self, inputs: &[PathBuf], output: &Path, fill: Option<[u8; 3]>) -> ToolStatus {
        run(self.merge_command(inputs, output, fill))
    }
}

/// Run a command to completion, inheriting stdio.
fn run(mut cmd: Command) -> ToolStatus {
    debug!(command = ?cmd, "running raster tool");
    match cmd.status() {
        Ok(status) if status.success() => ToolStatus::Succeeded,
        Ok(status) => ToolStatus::Failed(status.code()),
        Err(e) => ToolStatus::NotStarted(e.to_string()),
    }
}

/// List the `.tif` files directly inside `dir`, sorted by name.
pub fn list_tiffs<P: AsRef<Path>>(dir: P) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && has_tif_extension(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Whether the path ends in `.tif`, ignoring case.
pub fn has_tif_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("tif"))
        .unwrap_or(false)
}
