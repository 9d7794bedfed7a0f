//! `lorekeeper-check`: validates a game content corpus for ID and reference consistency.
//!
//! Runs every enabled rule over the JSON and Markdown files under the content
//! root and writes a JSON report (default:
//! `<root>/system/todo/rule_check_results.json`).
//!
//! **Usage:**
//! ```text
//! lorekeeper-check <ROOT> [--output <path>] [--config <path>] [--quiet]
//! ```
//!
//! Exits 0 without high-severity findings, 1 with at least one, and 2 if the
//! run could not be performed at all (missing root, bad config, unwritable
//! output). Log verbosity follows `RUST_LOG` (default: `warn`).

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use lorekeeper_conformance::{run_all, write_report, CheckConfig, CorpusPaths, Severity};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Exit code for runs that could not be performed.
const EXIT_ENVIRONMENT: i32 = 2;

/// Check a content corpus for ID and reference consistency.
#[derive(Parser)]
#[command(
    name = "lorekeeper-check",
    about = "Validate IDs and cross-references in a game content corpus"
)]
struct Args {
    /// Root of the content repository.
    root: PathBuf,

    /// Report destination (default: <ROOT>/system/todo/rule_check_results.json).
    #[arg(long)]
    output: Option<PathBuf>,

    /// TOML configuration file (default: built-in conventions).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Only print the summary line.
    #[arg(long)]
    quiet: bool,
}

fn main() {
    let args = Args::parse();
    init_tracing();
    process::exit(exit_code(&args));
}

/// Runs the check and maps the outcome to the process exit code.
fn exit_code(args: &Args) -> i32 {
    match run(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("lorekeeper-check: {:#}", err);
            EXIT_ENVIRONMENT
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(args: &Args) -> Result<i32> {
    let config = match &args.config {
        Some(path) => CheckConfig::load(path)?,
        None => CheckConfig::default(),
    };
    let paths = CorpusPaths {
        root: args.root.clone(),
        output: args.output.clone(),
    };

    tracing::debug!(
        root = %paths.root.display(),
        output = %paths.output_path().display(),
        disabled = config.rules.disabled.len(),
        "starting conformance run"
    );

    let report = run_all(&paths, &config).context("conformance run aborted")?;
    let output = paths.output_path();
    write_report(&report, &output)?;

    if !args.quiet {
        println!("Lorekeeper Conformance Report");
        println!("=============================");
        println!();
        for (severity, label) in [
            (Severity::High, "HIGH"),
            (Severity::Medium, "MED "),
            (Severity::Low, "LOW "),
        ] {
            for finding in report.findings.iter().filter(|f| f.severity == severity) {
                match &finding.entity_id {
                    Some(entity) => println!(
                        "[{}] {} {} ({}): {}",
                        label, finding.rule_id, finding.file, entity, finding.message
                    ),
                    None => println!(
                        "[{}] {} {}: {}",
                        label, finding.rule_id, finding.file, finding.message
                    ),
                }
            }
        }
        println!();
    }

    let summary = report.summary();
    println!(
        "Summary: {} files scanned, {} high, {} medium, {} low",
        summary.files_scanned, summary.high, summary.medium, summary.low
    );
    println!("Report written to {}", output.display());

    if report.passed() {
        println!("Conformance PASSED.");
    } else {
        eprintln!(
            "Conformance FAILED: {} high-severity finding(s).",
            summary.high
        );
    }
    Ok(report.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_root(name: &str) -> PathBuf {
        let nonce = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        std::env::temp_dir().join(format!(
            "lorekeeper_check_{name}_{}_{nonce}",
            std::process::id()
        ))
    }

    fn args(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("lorekeeper-check").chain(argv.iter().copied()))
            .expect("valid arguments")
    }

    #[test]
    fn missing_root_exits_with_environment_code() {
        let root = scratch_root("missing");
        let root = root.to_string_lossy();
        assert_eq!(exit_code(&args(&[&*root, "--quiet"])), EXIT_ENVIRONMENT);
    }

    #[test]
    fn unreadable_config_exits_with_environment_code() {
        let root = scratch_root("config");
        std::fs::create_dir_all(&root).expect("create root");
        let config = root.join("absent.toml");
        let argv = [root.to_string_lossy(), "--config".into(), config.to_string_lossy()];
        let argv: Vec<&str> = argv.iter().map(|a| &**a).collect();
        assert_eq!(exit_code(&args(&argv)), EXIT_ENVIRONMENT);
    }

    #[test]
    fn high_findings_exit_one_and_write_the_report() {
        let root = scratch_root("findings");
        std::fs::create_dir_all(root.join("missions")).expect("create root");
        std::fs::write(
            root.join("missions/m01.json"),
            r#"{"id": "m01", "faction_id": "f99"}"#,
        )
        .expect("write mission");
        let output = root.join("out/report.json");

        let argv = [
            root.to_string_lossy(),
            "--output".into(),
            output.to_string_lossy(),
            "--quiet".into(),
        ];
        let argv: Vec<&str> = argv.iter().map(|a| &**a).collect();
        assert_eq!(exit_code(&args(&argv)), 1);
        assert!(output.is_file());
    }
}
