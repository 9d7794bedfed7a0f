//! Lorekeeper conformance suite.
//!
//! Repository-wide consistency checks for a JSON and Markdown game content
//! corpus. Every run walks the content root, builds an entity registry from
//! the JSON files, resolves the references between entities and evaluates a
//! fixed set of rules against that model.
//!
//! # Rules
//!
//! | Rule | Severity |
//! |------|----------|
//! | `malformed_json` | high |
//! | `unreadable_file` | medium |
//! | `missing_id` | low |
//! | `uniqueness` | high |
//! | `reference_integrity` | high |
//! | `unclassified_reference` | low |
//! | `self_reference` | medium |
//! | `relationship_symmetry` | medium |
//! | `relation_range` | medium |
//! | `template_leakage` | high |
//! | `template_placeholder` | medium |
//! | `lore_coverage` | low |
//! | `broken_file_reference` | high (low in inactive areas) |
//! | `broken_markdown_link` | medium |
//! | `style` | low |
//! | `language` | low |
//!
//! # Entry Point
//!
//! ```no_run
//! use lorekeeper_conformance::{run_all, write_report, CheckConfig, CorpusPaths};
//! use std::path::PathBuf;
//!
//! let paths = CorpusPaths {
//!     root: PathBuf::from("."),
//!     output: None,
//! };
//! let report = run_all(&paths, &CheckConfig::default()).expect("conformance run");
//! write_report(&report, &paths.output_path()).expect("write report");
//! std::process::exit(report.exit_code());
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod config;
pub mod entity;
pub mod error;
pub mod model;
pub mod registry;
pub mod report;
pub mod resolver;
pub mod validators;
pub mod walker;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub use config::CheckConfig;
pub use entity::{EntityId, EntityType};
pub use error::CheckError;
pub use model::CorpusModel;
pub use report::{ConformanceReport, Finding, RuleId, Severity, Summary};

/// Report location inside the content root when no output path is given.
pub const DEFAULT_OUTPUT: &str = "system/todo/rule_check_results.json";

/// Paths required by the conformance runner.
#[derive(Debug, Clone)]
pub struct CorpusPaths {
    /// Root of the content repository.
    pub root: PathBuf,
    /// Report destination; defaults to [`DEFAULT_OUTPUT`] under the root.
    pub output: Option<PathBuf>,
}

impl CorpusPaths {
    /// Resolved report destination.
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.root.join(DEFAULT_OUTPUT))
    }
}

/// Walks the corpus, evaluates every enabled rule and returns the sorted
/// report.
///
/// The report output location is probed for writability before the walk so
/// a bad destination fails fast. The output file itself is never scanned.
///
/// # Errors
///
/// Returns an error if the root is missing or not a directory, an external
/// pattern does not compile, or the output location is not writable.
pub fn run_all(paths: &CorpusPaths, config: &CheckConfig) -> Result<ConformanceReport, CheckError> {
    let config = config.clone().prepare()?;
    if !paths.root.exists() {
        return Err(CheckError::RootNotFound(paths.root.clone()));
    }
    if !paths.root.is_dir() {
        return Err(CheckError::RootNotDirectory(paths.root.clone()));
    }

    let output = paths.output_path();
    probe_output(&output)?;

    let skip = vec![output.clone(), temp_path(&output)];
    let model = CorpusModel::load(&paths.root, &config, &skip)?;
    Ok(evaluate(&model, &config))
}

/// Evaluates every enabled rule against an already built model.
pub fn evaluate(model: &CorpusModel, config: &CheckConfig) -> ConformanceReport {
    let mut report = ConformanceReport::new();

    for (rule, evaluator) in validators::RULES {
        if !config.is_enabled(*rule) {
            tracing::debug!(%rule, "rule disabled");
            continue;
        }
        let found = evaluator(model, config);
        tracing::debug!(%rule, findings = found.findings.len(), "rule evaluated");
        report.extend(found);
    }

    report.files_scanned = model.files_scanned;
    report.registry_counts = model.registry.counts();
    report.finalize();

    let summary = report.summary();
    tracing::info!(
        files = summary.files_scanned,
        high = summary.high,
        medium = summary.medium,
        low = summary.low,
        "conformance run finished"
    );
    report
}

/// Writes the report as JSON, replacing any previous report atomically.
///
/// Missing parent directories are created.
///
/// # Errors
///
/// Returns an error if the report cannot be serialized or the destination
/// cannot be written.
pub fn write_report(report: &ConformanceReport, output: &Path) -> Result<(), CheckError> {
    let json = report.to_json()?;
    let write_err = |source| CheckError::WriteReport {
        path: output.to_path_buf(),
        source,
    };

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    let temp = temp_path(output);
    fs::write(&temp, json).map_err(write_err)?;
    fs::rename(&temp, output).map_err(|source| {
        let _ = fs::remove_file(&temp);
        write_err(source)
    })?;

    tracing::info!(path = %output.display(), "report written");
    Ok(())
}

fn temp_path(output: &Path) -> PathBuf {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report.json".to_string());
    output.with_file_name(format!(".{}.tmp", name))
}

fn probe_output(output: &Path) -> Result<(), CheckError> {
    let write_err = |source| CheckError::WriteReport {
        path: output.to_path_buf(),
        source,
    };
    if output.is_dir() {
        return Err(write_err(std::io::Error::other("output path is a directory")));
    }
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    let probe = temp_path(output);
    let mut file = fs::File::create(&probe).map_err(write_err)?;
    let written = file.write_all(b"");
    drop(file);
    let _ = fs::remove_file(&probe);
    written.map_err(write_err)
}
