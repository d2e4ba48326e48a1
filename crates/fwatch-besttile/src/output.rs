//! Output naming, archival copies and housekeeping of the destination directory.
//!
//! [`BEST_INFO_FILE`] holds one line per selected completed task, in task
//! order: `min_x min_y max_x max_y`, separated by single spaces. The extent
//! is normalized first, so `min` never exceeds `max` whatever corner order
//! the server sent. Numbers use the shortest decimal form that reads back to
//! the same value, with no trailing `.0`:
//!
//! ```text
//! -60 -6 -59 -5
//! -59.5 -5.5 -58.5 -4.5
//! ```

use chrono::{DateTime, TimeZone};
use fwatch_raster::has_tif_extension;
use fwatch_survey::Extent;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::info;

/// Format of the suffix on archival copies, e.g. `2012-10-05_14h07`.
pub const ARCHIVE_STAMP_FORMAT: &str = "%Y-%m-%d_%Hh%M";

/// File listing the extent of every selected completed task.
pub const BEST_INFO_FILE: &str = "bestInfo.txt";

/// Background fill for uncovered mosaic area.
pub const MOSAIC_FILL: [u8; 3] = [200, 200, 200];

/// Which tasks a run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Only tasks the server marks completed.
    Completed,
    /// Every task.
    All,
}

impl Scope {
    /// Name fragment used in output files.
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Completed => "completed",
            Scope::All => "all",
        }
    }
}

/// One merged output of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Product {
    /// The winning tiles themselves.
    Mosaic,
    /// Winning vote count encoding.
    Intensity,
    /// Agreement ratio color ramp.
    Heat,
}

impl Product {
    /// All products, in processing order.
    pub const ALL: [Product; 3] = [Product::Mosaic, Product::Intensity, Product::Heat];

    /// Lower-case product name.
    pub fn as_str(self) -> &'static str {
        match self {
            Product::Mosaic => "mosaic",
            Product::Intensity => "intensity",
            Product::Heat => "heat",
        }
    }

    /// Per-threshold working directory name, e.g. `tmpHeat_n5`.
    pub fn work_dir_name(self, min_answers: u32) -> String {
        let name = match self {
            Product::Mosaic => "Mosaic",
            Product::Intensity => "Intensity",
            Product::Heat => "Heat",
        };
        format!("tmp{}_n{}", name, min_answers)
    }

    /// Output stem, e.g. `mosaicall_n10` or `heatcompleted`.
    pub fn output_stem(self, scope: Scope, min_answers: u32) -> String {
        if min_answers == 0 {
            format!("{}{}", self.as_str(), scope.as_str())
        } else {
            format!("{}{}_n{}", self.as_str(), scope.as_str(), min_answers)
        }
    }

    /// Background fill passed to the merge tool.
    pub fn fill(self) -> Option<[u8; 3]> {
        match self {
            Product::Mosaic => Some(MOSAIC_FILL),
            Product::Intensity | Product::Heat => None,
        }
    }
}

/// Archival suffix for a point in time.
pub fn archive_stamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format(ARCHIVE_STAMP_FORMAT).to_string()
}

/// Path of the archival copy of `stem` inside `dir`.
pub fn archive_path(dir: &Path, stem: &str, stamp: &str) -> PathBuf {
    dir.join(format!("{}_{}.tif", stem, stamp))
}

/// Writer for [`BEST_INFO_FILE`], one extent per line.
pub struct BestInfoWriter {
    out: BufWriter<File>,
}

impl BestInfoWriter {
    /// Create (truncating) the listing inside `dest_dir`.
    pub fn create(dest_dir: &Path) -> io::Result<Self> {
        let file = File::create(dest_dir.join(BEST_INFO_FILE))?;
        Ok(Self {
            out: BufWriter::new(file),
        })
    }

    /// Append one normalized extent as `min_x min_y max_x max_y`.
    pub fn record(&mut self, extent: &Extent) -> io::Result<()> {
        writeln!(self.out, "{}", extent)
    }

    /// Flush buffered lines to disk.
    pub fn finish(mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Delete `.tif` files directly in `dir` last modified more than `max_age` before `now`.
///
/// Returns the removed paths.
pub fn remove_stale_rasters(dir: &Path, max_age: Duration, now: SystemTime) -> io::Result<Vec<PathBuf>> {
    let cutoff = now.checked_sub(max_age).unwrap_or(SystemTime::UNIX_EPOCH);
    let mut removed = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !has_tif_extension(&path) {
            continue;
        }
        let metadata = entry.metadata()?;
        if metadata.is_file() && metadata.modified()? < cutoff {
            fs::remove_file(&path)?;
            info!(path = %path.display(), "old file deleted");
            removed.push(path);
        }
    }
    removed.sort();
    Ok(removed)
}

/// Convert a day count into a [`Duration`].
pub fn days(count: u64) -> Duration {
    Duration::from_secs(count.saturating_mul(86_400))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    #[test]
    fn test_output_stems() {
        assert_eq!(Product::Mosaic.output_stem(Scope::Completed, 0), "mosaiccompleted");
        assert_eq!(Product::Heat.output_stem(Scope::All, 0), "heatall");
        assert_eq!(Product::Intensity.output_stem(Scope::All, 15), "intensityall_n15");
        assert_eq!(Product::Mosaic.output_stem(Scope::Completed, 5), "mosaiccompleted_n5");
    }

    #[test]
    fn test_work_dirs() {
        assert_eq!(Product::Mosaic.work_dir_name(0), "tmpMosaic_n0");
        assert_eq!(Product::Intensity.work_dir_name(10), "tmpIntensity_n10");
        assert_eq!(Product::Heat.work_dir_name(25), "tmpHeat_n25");
    }

    #[test]
    fn test_only_mosaic_is_filled() {
        assert_eq!(Product::Mosaic.fill(), Some([200, 200, 200]));
        assert_eq!(Product::Intensity.fill(), None);
        assert_eq!(Product::Heat.fill(), None);
    }

    #[test]
    fn test_best_info_lines() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = BestInfoWriter::create(dir.path()).unwrap();
        writer.record(&Extent::from_bounds([-60.0, -5.0, -59.0, -6.0])).unwrap();
        writer.record(&Extent::from_bounds([-58.25, -4.5, -58.75, -4.0])).unwrap();
        writer.finish().unwrap();

        let listing = fs::read_to_string(dir.path().join(BEST_INFO_FILE)).unwrap();
        assert_eq!(listing, "-60 -6 -59 -5\n-58.75 -4.5 -58.25 -4\n");
    }

    #[test]
    fn test_archive_stamp() {
        let at = FixedOffset::west_opt(3 * 3600)
            .unwrap()
            .with_ymd_and_hms(2012, 10, 5, 9, 7, 59)
            .unwrap();
        assert_eq!(archive_stamp(&at), "2012-10-05_09h07");

        let at = Utc.with_ymd_and_hms(2013, 1, 31, 23, 0, 0).unwrap();
        assert_eq!(archive_stamp(&at), "2013-01-31_23h00");
        assert_eq!(
            archive_path(Path::new("results"), "heatall_n5", &archive_stamp(&at)),
            PathBuf::from("results/heatall_n5_2013-01-31_23h00.tif")
        );
    }

    #[test]
    fn test_days() {
        assert_eq!(days(2), Duration::from_secs(172_800));
        assert_eq!(days(u64::MAX), Duration::from_secs(u64::MAX));
    }
}
