//! Environment errors: the only failures that abort a conformance run.
//!
//! Problems with the corpus content itself never surface here; they are
//! reported as [`Finding`](crate::report::Finding)s instead.

use std::path::PathBuf;

/// A fatal, process-level error raised by the conformance runner.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    /// The content root does not exist.
    #[error("content root {} does not exist", .0.display())]
    RootNotFound(PathBuf),

    /// The content root exists but is not a directory.
    #[error("content root {} is not a directory", .0.display())]
    RootNotDirectory(PathBuf),

    /// The configuration file could not be read.
    #[error("failed to read config {}", path.display())]
    ConfigRead {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML or names an unknown option.
    #[error("invalid config {}", path.display())]
    ConfigParse {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// An external reference pattern is not a valid regular expression.
    #[error("invalid external reference pattern {pattern:?}")]
    Pattern {
        /// The offending pattern as written in the configuration.
        pattern: String,
        /// Underlying regex error.
        #[source]
        source: regex::Error,
    },

    /// The report could not be written to its output path.
    #[error("report output {} is not writable", path.display())]
    WriteReport {
        /// Requested output path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The report could not be serialized.
    #[error("failed to serialize report")]
    Serialize(#[from] serde_json::Error),
}
