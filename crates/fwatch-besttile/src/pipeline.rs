//! The best-tile pipeline.
//!
//! One run takes the tasks of a scope and their tallies, and for a given
//! minimum-answer threshold:
//!
//! 1. selects the winning acquisition of every eligible task
//! 2. crops that acquisition's raster to the task extent (`tmpMosaic_n<N>/`)
//! 3. writes the intensity and heat encodings of each crop
//!    (`tmpIntensity_n<N>/`, `tmpHeat_n<N>/`)
//! 4. merges each working directory into a product and archives a
//!    timestamped copy
//!
//! A task whose crop fails, or whose tile cannot be decoded and recolored,
//! is reported in [`RunReport::missing_crops`] and left out of every
//! product. The working directories are removed when the run ends, on error
//! paths too. A run in which no crop was written reports
//! [`RunStatus::NoTiles`] and merges nothing.

use crate::confidence::{paint_heat, paint_intensity, AgreementBand};
use crate::config::PipelineConfig;
use crate::output::{archive_path, archive_stamp, BestInfoWriter, Product, Scope};
use crate::tally::{tally_tasks, Selection, Tally};
use crate::{BestTileError, Result};
use chrono::Local;
use fwatch_raster::{list_tiffs, CropWindow, Raster, RasterTools, ToolStatus};
use fwatch_survey::{SurveyClient, Task, TaskQuery};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Final state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// At least one tile was cropped and the products were merged.
    Merged,
    /// No tile was cropped; nothing was merged.
    NoTiles,
}

impl RunStatus {
    /// Numeric status: 0 when merged, 1 when no tiles were produced.
    pub fn code(self) -> i32 {
        match self {
            RunStatus::Merged => 0,
            RunStatus::NoTiles => 1,
        }
    }
}

/// What happened to one merged product.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductReport {
    /// Which product.
    pub product: Product,
    /// Merged output path.
    pub output: PathBuf,
    /// Timestamped copy, when the merge left an output to copy.
    pub archive: Option<PathBuf>,
    /// Merge tool status.
    pub merge: ToolStatus,
}

/// Summary of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Scope of the tasks.
    pub scope: Scope,
    /// Minimum-answer threshold.
    pub min_answers: u32,
    /// Tasks that met the threshold.
    pub selected: usize,
    /// Tasks below the threshold.
    pub skipped: usize,
    /// Tasks whose crop was written, in task order.
    pub cropped: Vec<u64>,
    /// Eligible tasks whose crop left no output, in task order.
    pub missing_crops: Vec<u64>,
    /// Merged products (empty when no tile was cropped).
    pub products: Vec<ProductReport>,
    /// Final status.
    pub status: RunStatus,
}

impl RunReport {
    fn new(scope: Scope, min_answers: u32) -> Self {
        Self {
            scope,
            min_answers,
            selected: 0,
            skipped: 0,
            cropped: Vec::new(),
            missing_crops: Vec::new(),
            products: Vec::new(),
            status: RunStatus::NoTiles,
        }
    }

    /// The report for one product, if it was merged.
    pub fn product(&self, product: Product) -> Option<&ProductReport> {
        self.products.iter().find(|p| p.product == product)
    }
}

/// Result of cropping one task.
enum CropOutcome {
    /// The cropped tile exists at this path.
    Written(PathBuf),
    /// The crop tool failed or left no output.
    Missing,
}

/// Per-threshold working directories, one per product.
///
/// Dropping the value removes the directories.
struct WorkDirs {
    dirs: [(Product, PathBuf); 3],
}

impl WorkDirs {
    /// Create empty working directories under `dest_dir`.
    ///
    /// Leftovers from an interrupted run with the same threshold are discarded.
    fn create(dest_dir: &Path, min_answers: u32) -> Result<Self> {
        let dirs = Product::ALL.map(|p| (p, dest_dir.join(p.work_dir_name(min_answers))));
        for (_, dir) in &dirs {
            if dir.exists() {
                fs::remove_dir_all(dir)?;
            }
            fs::create_dir_all(dir)?;
        }
        Ok(Self { dirs })
    }

    fn dir(&self, product: Product) -> &Path {
        self.dirs
            .iter()
            .find(|(p, _)| *p == product)
            .map(|(_, dir)| dir.as_path())
            .unwrap_or_else(|| unreachable!("every product has a working directory"))
    }

}

impl Drop for WorkDirs {
    fn drop(&mut self) {
        for (_, dir) in &self.dirs {
            if dir.exists() {
                if let Err(e) = fs::remove_dir_all(dir) {
                    warn!(dir = %dir.display(), error = %e, "could not remove working directory");
                }
            }
        }
    }
}

/// Runs the pipeline against one configuration and one set of raster tools.
pub struct BestTileRunner<'a, T: RasterTools> {
    config: &'a PipelineConfig,
    tools: &'a T,
    stamp: String,
}

impl<'a, T: RasterTools> BestTileRunner<'a, T> {
    /// Create a runner stamping archival copies with the current local time.
    pub fn new(config: &'a PipelineConfig, tools: &'a T) -> Self {
        Self {
            config,
            tools,
            stamp: archive_stamp(&Local::now()),
        }
    }

    /// Use a fixed archival suffix.
    pub fn with_stamp<S: Into<String>>(mut self, stamp: S) -> Self {
        self.stamp = stamp.into();
        self
    }

    /// Cut, encode and merge the best tiles of `tasks` for one threshold.
    ///
    /// `tallies` must be index-aligned with `tasks`.
    pub fn run(&self, tasks: &[Task], tallies: &[Tally], scope: Scope, min_answers: u32) -> Result<RunReport> {
        if tasks.len() != tallies.len() {
            return Err(BestTileError::TallyMismatch {
                tasks: tasks.len(),
                tallies: tallies.len(),
            });
        }

        let dest_dir = &self.config.dest_dir;
        fs::create_dir_all(dest_dir)?;
        let work = WorkDirs::create(dest_dir, min_answers)?;
        let mut best_info = match scope {
            Scope::Completed => Some(BestInfoWriter::create(dest_dir)?),
            Scope::All => None,
        };
        let mut report = RunReport::new(scope, min_answers);

        for (task, tally) in tasks.iter().zip(tallies) {
            let Some(selection) = Selection::select(task, tally, min_answers) else {
                report.skipped += 1;
                continue;
            };
            report.selected += 1;
            info!(
                task_id = task.id,
                tile = %selection.category,
                extent = %task.extent,
                votes = selection.winning_count,
                total = selection.total_count,
                "selected best tile"
            );

            if let Some(writer) = best_info.as_mut() {
                writer.record(&task.extent)?;
            }

            let CropOutcome::Written(tile) = self.crop(task, &selection, &work) else {
                report.missing_crops.push(task.id);
                continue;
            };
            if self.encode(&tile, &selection, &work)? {
                report.cropped.push(task.id);
            } else {
                fs::remove_file(&tile)?;
                report.missing_crops.push(task.id);
            }
        }

        if let Some(writer) = best_info {
            writer.finish()?;
        }

        if report.cropped.is_empty() {
            warn!(scope = scope.as_str(), min_answers, "no output detected, nothing to merge");
            return Ok(report);
        }

        for product in Product::ALL {
            let merged = self.merge(product, scope, min_answers, &work)?;
            report.products.push(merged);
        }
        drop(work);

        report.status = RunStatus::Merged;
        info!(
            scope = scope.as_str(),
            min_answers,
            selected = report.selected,
            skipped = report.skipped,
            cropped = report.cropped.len(),
            missing = report.missing_crops.len(),
            "run complete"
        );
        Ok(report)
    }

    /// Crop the winner's raster to the task extent.
    ///
    /// Whatever a failed crop leaves behind is deleted so it never reaches
    /// the mosaic.
    fn crop(&self, task: &Task, selection: &Selection, work: &WorkDirs) -> CropOutcome {
        let source = selection.category.source_path(&self.config.images_dir);
        let output = work.dir(Product::Mosaic).join(tile_name(task.id));
        let e = &task.extent;
        let window = CropWindow::from_bounds(e.min_x, e.min_y, e.max_x, e.max_y);

        let status = self.tools.crop(&window, &source, &output);
        if !status.success() {
            warn!(task_id = task.id, ?status, source = %source.display(), "crop tool reported failure, task skipped");
            if output.exists() {
                if let Err(e) = fs::remove_file(&output) {
                    warn!(task_id = task.id, error = %e, "could not remove partial crop");
                }
            }
            return CropOutcome::Missing;
        }

        if output.is_file() {
            CropOutcome::Written(output)
        } else {
            warn!(task_id = task.id, "no cropped tile written, task skipped");
            CropOutcome::Missing
        }
    }

    /// Write the intensity and heat encodings of a cropped tile.
    ///
    /// Returns `false` without writing anything when the tile cannot be
    /// decoded or recolored.
    fn encode(&self, tile: &Path, selection: &Selection, work: &WorkDirs) -> Result<bool> {
        let (intensity, heat) = match recolor(tile, selection) {
            Ok(painted) => painted,
            Err(e) => {
                warn!(task_id = selection.task_id, tile = %tile.display(), error = %e, "unusable crop, task skipped");
                return Ok(false);
            }
        };

        let name = tile_name(selection.task_id);
        intensity.write_to_file(work.dir(Product::Intensity).join(&name))?;
        heat.write_to_file(work.dir(Product::Heat).join(&name))?;

        debug!(
            task_id = selection.task_id,
            agreement = selection.agreement_ratio(),
            band = ?AgreementBand::from_ratio(selection.agreement_ratio()),
            "encoded tile"
        );
        Ok(true)
    }

    /// Merge one working directory and archive the result.
    fn merge(&self, product: Product, scope: Scope, min_answers: u32, work: &WorkDirs) -> Result<ProductReport> {
        let dest_dir = &self.config.dest_dir;
        let inputs = list_tiffs(work.dir(product))?;
        let stem = product.output_stem(scope, min_answers);
        let output = dest_dir.join(format!("{}.tif", stem));

        // The merge tool updates an existing output in place; start fresh.
        if output.exists() {
            fs::remove_file(&output)?;
        }

        let merge = self.tools.merge(&inputs, &output, product.fill());
        if !merge.success() {
            warn!(product = product.as_str(), status = ?merge, "merge tool reported failure");
        }

        let archive = if output.is_file() {
            let archive = archive_path(dest_dir, &stem, &self.stamp);
            fs::copy(&output, &archive)?;
            info!(output = %output.display(), archive = %archive.display(), tiles = inputs.len(), "merged");
            Some(archive)
        } else {
            warn!(product = product.as_str(), output = %output.display(), "merge produced no output");
            None
        };

        Ok(ProductReport {
            product,
            output,
            archive,
            merge,
        })
    }
}

/// Decode a cropped tile and paint its intensity and heat copies.
fn recolor(tile: &Path, selection: &Selection) -> Result<(Raster, Raster)> {
    let cropped = Raster::from_file(tile)?;

    let mut intensity = cropped.clone();
    paint_intensity(&mut intensity, selection)?;

    let mut heat = cropped;
    paint_heat(&mut heat, selection)?;

    Ok((intensity, heat))
}

/// File name of a task's tile inside a working directory.
fn tile_name(task_id: u64) -> String {
    format!("{}.tif", task_id)
}

/// Fetch, tally and build every configured product.
///
/// Runs the completed-tasks products at threshold 0 when
/// `config.build_completed` is set, then the all-tasks products for each of
/// [`PipelineConfig::thresholds`]. Reports are returned in run order.
pub fn run_best_tile<T: RasterTools>(
    config: &PipelineConfig,
    client: &SurveyClient,
    tools: &T,
) -> Result<Vec<RunReport>> {
    let runner = BestTileRunner::new(config, tools);
    let app_id = client.app_id(&config.app_name)?;
    info!(app = %config.app_name, app_id, "resolved application");

    let mut reports = Vec::new();

    if config.build_completed {
        let tasks = client.tasks(
            app_id,
            TaskQuery {
                completed_only: true,
                limit: config.max_tasks,
            },
        )?;
        let answers = client.answers_for(&tasks, config.max_answers, &config.answer_key)?;
        let tallies = tally_tasks(&answers);
        reports.push(runner.run(&tasks, &tallies, Scope::Completed, 0)?);
    }

    let tasks = client.tasks(
        app_id,
        TaskQuery {
            completed_only: false,
            limit: config.max_tasks,
        },
    )?;
    let answers = client.answers_for(&tasks, config.max_answers, &config.answer_key)?;
    let tallies = tally_tasks(&answers);
    for min_answers in config.thresholds() {
        reports.push(runner.run(&tasks, &tallies, Scope::All, min_answers)?);
    }

    Ok(reports)
}
