use crate::cli::AnalyzeArgs;
use crate::config::{AppConfig, build_config};
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use otanalysis::engine::progress::ProgressReporter;
use otanalysis::workflows::batch::{self, BatchCounters, BatchResult};
use otanalysis::workflows::report::CurveRecord;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub fn run(args: AnalyzeArgs) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let app = build_config(&args)?;

    let paths = collect_files(&app.input_path)?;
    info!(input = %app.input_path.display(), files = paths.len(), "Collected candidate files.");
    if paths.is_empty() {
        warn!("No files found under the input path.");
    }

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Analyzing {} file(s)...", paths.len());
    let result = batch::run(&paths, &app.core_config, &reporter);

    write_outputs(&app, &result)?;
    print_summary(&result.counters, &app.results_path);
    Ok(())
}

/// Every regular file below `input`, sorted by path; a file input is
/// returned alone.
pub fn collect_files(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        return Err(CliError::Argument(format!(
            "Input path does not exist: {}",
            input.display()
        )));
    }

    let mut files = Vec::new();
    let mut pending = vec![input.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Writes the result table and copies routed files into their bucket folders.
pub fn write_outputs(app: &AppConfig, result: &BatchResult) -> Result<()> {
    if let Some(parent) = app.results_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let count = write_records(&app.results_path, result)?;
    info!(path = %app.results_path.display(), rows = count, "Results written.");

    if let Some(rejected_dir) = &app.rejected_dir {
        for report in &result.files {
            let Some(bucket) = report.bucket() else {
                continue;
            };
            let target_dir = rejected_dir.join(bucket.folder()).join(report.kind.label());
            fs::create_dir_all(&target_dir)?;
            let Some(name) = report.path.file_name() else {
                continue;
            };
            let target = target_dir.join(name);
            debug!(from = %report.path.display(), to = %target.display(), "Copying routed file");
            fs::copy(&report.path, &target)?;
        }
    }
    Ok(())
}

/// Serializes one tab-separated row per analyzed curve, in input order.
pub fn write_records(path: &Path, result: &BatchResult) -> Result<usize> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)?;
    let mut count = 0;
    for curve in result.curves() {
        writer.serialize(CurveRecord::from_curve(curve))?;
        count += 1;
    }
    writer.flush()?;
    Ok(count)
}

fn print_summary(counters: &BatchCounters, results_path: &Path) {
    println!("Files: {} text, {} archive", counters.text_files, counters.archives);
    println!(
        "Skipped: {} non-conforming name(s), {} duplicate(s)",
        counters.non_conforming, counters.duplicates
    );
    println!(
        "Rejected: {} problem curve(s), {} incomplete",
        counters.problem, counters.incomplete
    );
    println!(
        "Analyzed: {} curve(s), {} misaligned",
        counters.analyzed, counters.misaligned
    );
    println!("✓ Results written to: {}", results_path.display());
}
