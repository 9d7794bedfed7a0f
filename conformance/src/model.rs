//! The in-memory corpus model shared by all rule evaluators.
//!
//! Built fresh on every run: walk, parse, register entities, resolve
//! references. Nothing is cached between runs.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::config::CheckConfig;
use crate::error::CheckError;
use crate::registry::{self, MarkdownDocument, ParsedFile, Registry, SourceDocument};
use crate::report::{Finding, RuleId};
use crate::resolver::{self, ConventionMatcher, ReferenceMatcher, Resolution};
use crate::walker::{self, WalkEvent, WalkOptions};

/// One area entry of the master index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Area {
    /// Area key, e.g. `factions`.
    pub key: String,
    /// Root-relative directory with a trailing `/`.
    pub dir: String,
    /// Area status, e.g. `active` or `inactive`.
    pub status: String,
}

/// Area statuses read from the master index document.
#[derive(Debug, Clone, Default)]
pub struct MasterIndex {
    /// Areas in document order.
    pub areas: Vec<Area>,
}

impl MasterIndex {
    /// Reads the `areas` array of a master index document.
    pub fn from_value(value: &Value) -> Self {
        let areas = value
            .get("areas")
            .and_then(Value::as_array)
            .map(|areas| {
                areas
                    .iter()
                    .filter_map(|area| {
                        let field = |name: &str| {
                            area.get(name).and_then(Value::as_str).map(str::to_string)
                        };
                        Some(Area {
                            key: field("key").unwrap_or_default(),
                            dir: field("dir")?,
                            status: field("status").unwrap_or_else(|| "unknown".to_string()),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self { areas }
    }

    /// Returns the status of the first area containing (or contained in) `path`.
    pub fn area_status(&self, path: &str) -> Option<&str> {
        let normalized = format!("{}/", path.trim_end_matches('/'));
        self.areas
            .iter()
            .filter(|area| !area.dir.is_empty())
            .find(|area| normalized.starts_with(&area.dir) || area.dir.starts_with(&normalized))
            .map(|area| area.status.as_str())
    }
}

/// Everything the rule evaluators look at.
#[derive(Debug, Default)]
pub struct CorpusModel {
    /// Number of JSON and Markdown candidates enumerated.
    pub files_scanned: usize,
    /// Root-relative paths of every walked file and directory.
    pub inventory: BTreeSet<String>,
    /// Parsed JSON documents in walk order.
    pub documents: Vec<SourceDocument>,
    /// Markdown documents in walk order.
    pub markdown: Vec<MarkdownDocument>,
    /// Findings raised while reading files and extracting ids.
    pub intake: Vec<Finding>,
    /// Entity definitions.
    pub registry: Registry,
    /// References, relations and placeholders.
    pub resolution: Resolution,
    /// Area statuses from the master index, if one was found.
    pub master_index: MasterIndex,
}

impl CorpusModel {
    /// Walks `root` and builds the model.
    ///
    /// # Errors
    ///
    /// Returns an error only if the root is missing or not a directory.
    /// Unreadable and malformed files become intake findings.
    pub fn load(root: &Path, config: &CheckConfig, skip_files: &[PathBuf]) -> Result<Self, CheckError> {
        let options = WalkOptions {
            excluded_dirs: config.walk.excluded_dirs.clone(),
            skip_files: skip_files.to_vec(),
        };

        let mut files_scanned = 0usize;
        let mut inventory = BTreeSet::new();
        let mut documents = Vec::new();
        let mut markdown = Vec::new();
        let mut intake = Vec::new();

        for event in walker::walk(root, &options)? {
            let file = match event {
                WalkEvent::Entry(file) => file,
                WalkEvent::Unreadable { relative, reason } => {
                    tracing::warn!(path = %relative, %reason, "skipping unreadable entry");
                    intake.push(Finding::medium(
                        RuleId::UnreadableFile,
                        &relative,
                        format!("cannot visit {}: {}", relative, reason),
                    ));
                    continue;
                }
            };

            inventory.insert(file.relative.clone());
            if file.is_dir || !file.kind.is_candidate() {
                continue;
            }
            files_scanned += 1;

            match registry::parse_file(&file) {
                Ok(ParsedFile::Json(doc)) => documents.push(doc),
                Ok(ParsedFile::Markdown(doc)) => markdown.push(doc),
                Err(finding) => {
                    tracing::warn!(path = %file.relative, rule = %finding.rule_id, "file excluded");
                    intake.push(finding);
                }
            }
        }

        tracing::debug!(
            files_scanned,
            json = documents.len(),
            markdown = markdown.len(),
            "corpus walked"
        );

        Ok(Self::from_parts(
            files_scanned,
            inventory,
            documents,
            markdown,
            intake,
            config,
            &ConventionMatcher::from_config(&config.references),
        ))
    }

    /// Builds the model from already-read documents.
    pub fn from_parts(
        files_scanned: usize,
        inventory: BTreeSet<String>,
        documents: Vec<SourceDocument>,
        markdown: Vec<MarkdownDocument>,
        mut intake: Vec<Finding>,
        config: &CheckConfig,
        matcher: &dyn ReferenceMatcher,
    ) -> Self {
        let (registry, id_findings) = registry::build(&documents, &config.intake);
        intake.extend(id_findings);
        let resolution = resolver::resolve(&documents, &registry, matcher);
        let master_index = documents
            .iter()
            .find(|doc| doc.relative == config.file_references.master_index)
            .map(|doc| MasterIndex::from_value(&doc.value))
            .unwrap_or_default();

        Self {
            files_scanned,
            inventory,
            documents,
            markdown,
            intake,
            registry,
            resolution,
            master_index,
        }
    }

    /// Builds a model from in-memory documents with the default matcher.
    pub fn from_documents(
        documents: Vec<SourceDocument>,
        markdown: Vec<MarkdownDocument>,
        inventory: BTreeSet<String>,
        config: &CheckConfig,
    ) -> Self {
        let files_scanned = documents.len() + markdown.len();
        Self::from_parts(
            files_scanned,
            inventory,
            documents,
            markdown,
            Vec::new(),
            config,
            &ConventionMatcher::from_config(&config.references),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn area_status_matches_by_directory_prefix() {
        let index = MasterIndex::from_value(&json!({
            "areas": [
                {"key": "factions", "dir": "factions/", "status": "active"},
                {"key": "crafting", "dir": "crafting/", "status": "inactive"},
                {"key": "broken"}
            ]
        }));
        assert_eq!(index.areas.len(), 2);
        assert_eq!(index.area_status("crafting/recipes.json"), Some("inactive"));
        assert_eq!(index.area_status("factions"), Some("active"));
        assert_eq!(index.area_status("world/map.json"), None);
    }
}
