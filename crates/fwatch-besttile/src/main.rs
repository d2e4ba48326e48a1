//! besttile - build best-tile mosaics and agreement maps from survey answers
//!
//! Fetches tasks and answers from the task server, picks the acquisition
//! most volunteers chose for each task, and merges the winning tiles into
//! mosaic, intensity and heat products inside the destination directory.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::SystemTime;

use clap::Parser;
use fwatch_besttile::output::{days, remove_stale_rasters};
use fwatch_besttile::{run_best_tile, PipelineConfig, Result, RunStatus};
use fwatch_raster::GdalTools;
use fwatch_survey::SurveyClient;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Command-line arguments for besttile.
///
/// Every option left unset keeps the value from `--config` or the built-in
/// default.
#[derive(Parser, Debug)]
#[command(name = "besttile")]
#[command(about = "Build best-tile mosaics from crowdsourced answers")]
#[command(version)]
struct Args {
    /// Task server address
    #[arg(short = 's', long)]
    server: Option<String>,

    /// Application short name
    #[arg(short = 'n', long)]
    app_name: Option<String>,

    /// Key holding the answer inside each task run's info
    #[arg(short = 'k', long)]
    answer_key: Option<String>,

    /// Maximum number of tasks to download
    #[arg(short = 't', long = "max-number-tasks")]
    max_tasks: Option<u32>,

    /// Maximum number of answers to download per task
    #[arg(short = 'a', long = "max-number-answers")]
    max_answers: Option<u32>,

    /// Also build the completed-tasks products (true/false)
    #[arg(short = 'c', long = "completed-only")]
    build_completed: Option<bool>,

    /// Directory holding one raster per acquisition
    #[arg(short = 'i', long = "images-directory")]
    images_dir: Option<PathBuf>,

    /// Directory receiving the products
    #[arg(short = 'd', long = "destination-directory")]
    dest_dir: Option<PathBuf>,

    /// Build the all-tasks products for thresholds 0, 5, 10, 15, 20 and 25
    #[arg(short = 'f', long)]
    full_build: bool,

    /// Delete .tif files in the destination older than this many days
    #[arg(short = 'r', long = "remove-files", value_name = "DAYS")]
    remove_after_days: Option<u64>,

    /// HTTP timeout in seconds
    #[arg(long = "http-timeout", value_name = "SECS")]
    http_timeout_secs: Option<u64>,

    /// Crop executable
    #[arg(long)]
    gdal_translate: Option<PathBuf>,

    /// Merge executable
    #[arg(long)]
    gdal_merge: Option<PathBuf>,

    /// YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    match run(&args) {
        Ok(RunStatus::Merged) => ExitCode::SUCCESS,
        Ok(RunStatus::NoTiles) => ExitCode::from(1),
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<RunStatus> {
    let config = build_config(args)?;
    config.validate()?;
    info!(
        server = %config.server,
        app = %config.app_name,
        images = %config.images_dir.display(),
        dest = %config.dest_dir.display(),
        full_build = config.full_build,
        "starting"
    );

    let client = SurveyClient::new(&config.server, config.http_timeout())?;
    let tools = GdalTools::new(&config.gdal_translate, &config.gdal_merge);
    let reports = run_best_tile(&config, &client, &tools)?;

    let mut status = RunStatus::Merged;
    for report in &reports {
        if !report.missing_crops.is_empty() {
            warn!(
                scope = report.scope.as_str(),
                min_answers = report.min_answers,
                tasks = ?report.missing_crops,
                "tasks without a cropped tile"
            );
        }
        for product in report.products.iter().filter(|p| p.archive.is_none()) {
            warn!(output = %product.output.display(), "product missing");
        }
        if report.status == RunStatus::NoTiles {
            status = RunStatus::NoTiles;
        }
    }

    if let Some(count) = config.remove_after_days {
        let removed = remove_stale_rasters(&config.dest_dir, days(count), SystemTime::now())?;
        info!(removed = removed.len(), days = count, "stale files cleaned");
    }

    Ok(status)
}

/// Layer the YAML file (if any) and the command-line flags over the defaults.
fn build_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_yaml_file(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(server) = &args.server {
        config.server = server.clone();
    }
    if let Some(app_name) = &args.app_name {
        config.app_name = app_name.clone();
    }
    if let Some(answer_key) = &args.answer_key {
        config.answer_key = answer_key.clone();
    }
    if let Some(max_tasks) = args.max_tasks {
        config.max_tasks = max_tasks;
    }
    if let Some(max_answers) = args.max_answers {
        config.max_answers = max_answers;
    }
    if let Some(build_completed) = args.build_completed {
        config.build_completed = build_completed;
    }
    if let Some(images_dir) = &args.images_dir {
        config.images_dir = images_dir.clone();
    }
    if let Some(dest_dir) = &args.dest_dir {
        config.dest_dir = dest_dir.clone();
    }
    if args.full_build {
        config.full_build = true;
    }
    if args.remove_after_days.is_some() {
        config.remove_after_days = args.remove_after_days;
    }
    if args.http_timeout_secs.is_some() {
        config.http_timeout_secs = args.http_timeout_secs;
    }
    if let Some(translate) = &args.gdal_translate {
        config.gdal_translate = translate.clone();
    }
    if let Some(merge) = &args.gdal_merge {
        config.gdal_merge = merge.clone();
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("besttile").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_no_flags_gives_defaults() {
        let config = build_config(&parse(&[])).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = parse(&[
            "-s", "http://localhost:5000", "-n", "besttile2", "-t", "10", "-a", "5", "-c", "false",
            "-i", "/data/img", "-d", "/data/out", "-f", "-r", "3",
        ]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.server, "http://localhost:5000");
        assert_eq!(config.app_name, "besttile2");
        assert_eq!(config.max_tasks, 10);
        assert_eq!(config.max_answers, 5);
        assert!(!config.build_completed);
        assert_eq!(config.images_dir, PathBuf::from("/data/img"));
        assert_eq!(config.dest_dir, PathBuf::from("/data/out"));
        assert!(config.full_build);
        assert_eq!(config.remove_after_days, Some(3));
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "app_name: from_file\nmax_answers: 12\nfull_build: true").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = build_config(&parse(&["--config", &path, "-a", "20"])).unwrap();
        assert_eq!(config.app_name, "from_file");
        assert_eq!(config.max_answers, 20);
        assert!(config.full_build);
        assert_eq!(config.max_tasks, 1056);
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let args = parse(&["--config", "/nonexistent/besttile.yaml"]);
        assert!(build_config(&args).is_err());
    }
}
