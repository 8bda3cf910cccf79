use crate::core::io::error::LoadError;
use crate::core::models::curve::Curve;
use crate::engine::config::AnalysisConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use rayon::prelude::*;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{info, instrument, warn};

use super::analyze;
use super::load::{FileKind, load_curve};

static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^b[1-9]+c[1-9]+[a-z]{0,2}-").expect("name pattern is a valid regex")
});
static COUPLE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^b[1-9]+c[1-9]+").expect("couple pattern is a valid regex"));

/// Folder a rejected or suspicious file is set aside in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Bucket {
    Problem,
    Incomplete,
    Alignment,
}

impl Bucket {
    pub fn folder(self) -> &'static str {
        match self {
            Bucket::Problem => "problem_curve",
            Bucket::Incomplete => "Incomplete",
            Bucket::Alignment => "Alignment",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchCounters {
    pub text_files: usize,
    pub archives: usize,
    pub non_conforming: usize,
    pub problem: usize,
    pub incomplete: usize,
    pub duplicates: usize,
    pub analyzed: usize,
    pub misaligned: usize,
}

/// Result of one file. A rejected curve that decoded is kept with its
/// diagnostics; only undecodable files carry no curve.
#[derive(Debug)]
pub enum FileOutcome {
    Analyzed(Box<Curve>),
    Problem {
        reason: String,
        curve: Option<Box<Curve>>,
    },
    Incomplete {
        reason: String,
        curve: Option<Box<Curve>>,
    },
}

impl FileOutcome {
    fn reason(&self) -> Option<&str> {
        match self {
            FileOutcome::Analyzed(_) => None,
            FileOutcome::Problem { reason, .. } | FileOutcome::Incomplete { reason, .. } => {
                Some(reason)
            }
        }
    }
}

#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub kind: FileKind,
    pub outcome: FileOutcome,
}

impl FileReport {
    pub fn curve(&self) -> Option<&Curve> {
        match &self.outcome {
            FileOutcome::Analyzed(curve) => Some(curve.as_ref()),
            _ => None,
        }
    }

    /// The decoded curve whatever the outcome, diagnostics included.
    pub fn retained(&self) -> Option<&Curve> {
        match &self.outcome {
            FileOutcome::Analyzed(curve) => Some(curve.as_ref()),
            FileOutcome::Problem { curve, .. } | FileOutcome::Incomplete { curve, .. } => {
                curve.as_deref()
            }
        }
    }

    /// Misaligned curves are analyzed and still set aside for review.
    pub fn bucket(&self) -> Option<Bucket> {
        match &self.outcome {
            FileOutcome::Problem { .. } => Some(Bucket::Problem),
            FileOutcome::Incomplete { .. } => Some(Bucket::Incomplete),
            FileOutcome::Analyzed(curve) => curve
                .features
                .alignment
                .as_ref()
                .filter(|a| !a.is_aligned())
                .map(|_| Bucket::Alignment),
        }
    }
}

#[derive(Debug, Default)]
pub struct BatchResult {
    pub counters: BatchCounters,
    pub files: Vec<FileReport>,
}

impl BatchResult {
    pub fn curves(&self) -> impl Iterator<Item = &Curve> {
        self.files.iter().filter_map(FileReport::curve)
    }

    /// Every decoded curve, rejected ones included.
    pub fn retained(&self) -> impl Iterator<Item = &Curve> {
        self.files.iter().filter_map(FileReport::retained)
    }
}

/// File name starts with a `b<N>c<N>` couple, up to two letters and a dash.
pub fn is_conforming_name(name: &str) -> bool {
    NAME_PATTERN.is_match(name)
}

/// Acquisition identity of a file: the couple, the rest of the name, no
/// extension. Text and archive exports of one manipulation share it.
pub fn canonical_name(name: &str, kind: FileKind) -> String {
    let stem = name
        .strip_suffix(kind.extension())
        .and_then(|s| s.strip_suffix('.'))
        .unwrap_or(name);
    let (first, rest) = stem.split_once('-').unwrap_or((stem, ""));
    let couple = COUPLE_PATTERN.find(first).map_or(first, |m| m.as_str());
    if rest.is_empty() {
        couple.to_string()
    } else {
        format!("{couple}-{rest}")
    }
}

/// Keeps the first file of every canonical name among conforming curve
/// files, in input order.
pub fn select_files(paths: &[PathBuf]) -> (Vec<(PathBuf, FileKind)>, BatchCounters) {
    let mut counters = BatchCounters::default();
    let mut seen = HashSet::new();
    let mut selected = Vec::new();

    for path in paths {
        let name = file_name(path);
        let Some(kind) = FileKind::from_path(path) else {
            counters.non_conforming += 1;
            continue;
        };
        if !is_conforming_name(&name) {
            counters.non_conforming += 1;
            continue;
        }
        match kind {
            FileKind::Text => counters.text_files += 1,
            FileKind::Archive => counters.archives += 1,
        }
        if !seen.insert(canonical_name(&name, kind)) {
            counters.duplicates += 1;
            continue;
        }
        selected.push((path.clone(), kind));
    }
    (selected, counters)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn process(path: &Path, config: &AnalysisConfig, reporter: &ProgressReporter) -> FileOutcome {
    let mut curve = match load_curve(path) {
        Ok(curve) => curve,
        Err(LoadError::Incomplete(e)) => {
            return FileOutcome::Incomplete {
                reason: e.to_string(),
                curve: None,
            };
        }
        Err(LoadError::Format(e)) => {
            return FileOutcome::Problem {
                reason: e.to_string(),
                curve: None,
            };
        }
    };
    match analyze::run(&mut curve, config, &ProgressReporter::new()) {
        Ok(_) => FileOutcome::Analyzed(Box::new(curve)),
        Err(EngineError::Incomplete(e)) => FileOutcome::Incomplete {
            reason: e.to_string(),
            curve: Some(Box::new(curve)),
        },
        Err(e) => {
            reporter.message(format!("{}: {e}", curve.title));
            FileOutcome::Problem {
                reason: e.to_string(),
                curve: Some(Box::new(curve)),
            }
        }
    }
}

/// Analyzes every selected file on the rayon pool and tallies the results.
#[instrument(skip_all, name = "batch_workflow")]
pub fn run(paths: &[PathBuf], config: &AnalysisConfig, reporter: &ProgressReporter) -> BatchResult {
    // === Phase 1: Selection ===
    reporter.report(Progress::PhaseStart { name: "Selection" });
    let (selected, mut counters) = select_files(paths);
    info!(
        files = paths.len(),
        selected = selected.len(),
        duplicates = counters.duplicates,
        non_conforming = counters.non_conforming,
        "Curve files selected."
    );
    reporter.report(Progress::PhaseFinish);

    // === Phase 2: Analysis ===
    reporter.report(Progress::PhaseStart { name: "Analysis" });
    reporter.report(Progress::TaskStart {
        total_steps: selected.len() as u64,
    });
    let files: Vec<FileReport> = selected
        .into_par_iter()
        .map(|(path, kind)| {
            let outcome = process(&path, config, reporter);
            reporter.report(Progress::TaskIncrement);
            FileReport { path, kind, outcome }
        })
        .collect();
    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    // === Phase 3: Tally ===
    for report in &files {
        match &report.outcome {
            FileOutcome::Analyzed(_) => counters.analyzed += 1,
            FileOutcome::Problem { reason, .. } => {
                warn!(path = %report.path.display(), %reason, "Problem curve");
                counters.problem += 1;
            }
            FileOutcome::Incomplete { .. } => counters.incomplete += 1,
        }
        let Some(bucket) = report.bucket() else {
            continue;
        };
        let reason = match report.outcome.reason() {
            Some(r) => r.to_string(),
            None => {
                counters.misaligned += 1;
                "misaligned".to_string()
            }
        };
        reporter.report(Progress::Routed {
            file: file_name(&report.path),
            reason: format!("{}: {reason}", bucket.folder()),
        });
    }
    info!(
        analyzed = counters.analyzed,
        problem = counters.problem,
        incomplete = counters.incomplete,
        misaligned = counters.misaligned,
        "Batch complete."
    );
    BatchResult { counters, files }
}
