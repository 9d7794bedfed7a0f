//! Conformance report types: findings, severity levels, and report aggregation.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Blocks the pipeline: the run exits non-zero.
    High,
    /// Should be addressed, does not affect the exit code.
    Medium,
    /// Advisory only.
    Low,
}

/// Identifier of a rule evaluator. Doubles as the `rule_id` in reports and
/// as the name used to disable a rule in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
    /// File is not valid JSON.
    MalformedJson,
    /// File could not be read.
    UnreadableFile,
    /// Document has no recognizable entity id.
    MissingId,
    /// Duplicate non-template entity definitions.
    Uniqueness,
    /// Reference that does not resolve.
    ReferenceIntegrity,
    /// Reference whose target type cannot be inferred.
    UnclassifiedReference,
    /// Entity referencing itself where the field forbids it.
    SelfReference,
    /// Reciprocal relation values that break the symmetry policy.
    RelationshipSymmetry,
    /// Relation value outside the permitted range.
    RelationRange,
    /// Placeholder token left in production data.
    TemplateLeakage,
    /// Half-filled or malformed template placeholder.
    TemplatePlaceholder,
    /// Faction with mechanics but no lore module.
    LoreCoverage,
    /// JSON path field pointing at a missing file.
    BrokenFileReference,
    /// Markdown link pointing at a missing file.
    BrokenMarkdownLink,
    /// Markdown formatting advisories.
    Style,
    /// Documentation language advisories.
    Language,
}

impl RuleId {
    /// Returns the snake_case name of the rule.
    pub fn as_str(self) -> &'static str {
        match self {
            RuleId::MalformedJson => "malformed_json",
            RuleId::UnreadableFile => "unreadable_file",
            RuleId::MissingId => "missing_id",
            RuleId::Uniqueness => "uniqueness",
            RuleId::ReferenceIntegrity => "reference_integrity",
            RuleId::UnclassifiedReference => "unclassified_reference",
            RuleId::SelfReference => "self_reference",
            RuleId::RelationshipSymmetry => "relationship_symmetry",
            RuleId::RelationRange => "relation_range",
            RuleId::TemplateLeakage => "template_leakage",
            RuleId::TemplatePlaceholder => "template_placeholder",
            RuleId::LoreCoverage => "lore_coverage",
            RuleId::BrokenFileReference => "broken_file_reference",
            RuleId::BrokenMarkdownLink => "broken_markdown_link",
            RuleId::Style => "style",
            RuleId::Language => "language",
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single reported validation issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    /// Rule that produced this finding.
    pub rule_id: RuleId,
    /// Severity of the finding.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
    /// Path of the offending file, relative to the content root.
    pub file: String,
    /// Offending entity, when the finding belongs to one.
    pub entity_id: Option<String>,
}

impl Finding {
    /// Creates a finding without an entity.
    pub fn new(
        rule_id: RuleId,
        severity: Severity,
        file: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_id,
            severity,
            message: message.into(),
            file: file.into(),
            entity_id: None,
        }
    }

    /// Creates a high-severity finding.
    pub fn high(rule_id: RuleId, file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(rule_id, Severity::High, file, message)
    }

    /// Creates a medium-severity finding.
    pub fn medium(rule_id: RuleId, file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(rule_id, Severity::Medium, file, message)
    }

    /// Creates a low-severity finding.
    pub fn low(rule_id: RuleId, file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(rule_id, Severity::Low, file, message)
    }

    /// Attaches the offending entity.
    pub fn with_entity(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Returns true if this finding blocks the pipeline.
    pub fn is_high(&self) -> bool {
        self.severity == Severity::High
    }

    fn sort_key(&self) -> (&str, &str, Option<&str>, &str) {
        (
            self.rule_id.as_str(),
            &self.file,
            self.entity_id.as_deref(),
            &self.message,
        )
    }
}

/// Severity counts plus the number of candidate files scanned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Number of high-severity findings.
    pub high: usize,
    /// Number of medium-severity findings.
    pub medium: usize,
    /// Number of low-severity findings.
    pub low: usize,
    /// Number of JSON and Markdown files scanned.
    pub files_scanned: usize,
}

/// Aggregated findings from all rule evaluators.
#[derive(Debug, Default)]
pub struct ConformanceReport {
    /// All findings, in evaluation order until [`ConformanceReport::finalize`] sorts them.
    pub findings: Vec<Finding>,
    /// Number of JSON and Markdown files scanned.
    pub files_scanned: usize,
    /// Distinct non-template entity ids per type name.
    pub registry_counts: BTreeMap<String, usize>,
}

impl ConformanceReport {
    /// Creates a new empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a finding to this report.
    pub fn push(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    /// Extends this report with findings from another report.
    pub fn extend(&mut self, other: ConformanceReport) {
        self.findings.extend(other.findings);
    }

    /// Returns the number of findings with the given severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == severity)
            .count()
    }

    /// Returns the number of high-severity findings.
    pub fn high_count(&self) -> usize {
        self.count(Severity::High)
    }

    /// Returns true if no finding blocks the pipeline.
    pub fn passed(&self) -> bool {
        self.high_count() == 0
    }

    /// Process exit code for this report: `0` without high findings, `1`
    /// with at least one, whatever the medium and low counts.
    pub fn exit_code(&self) -> i32 {
        if self.passed() {
            0
        } else {
            1
        }
    }

    /// Returns the summary counts.
    pub fn summary(&self) -> Summary {
        Summary {
            high: self.count(Severity::High),
            medium: self.count(Severity::Medium),
            low: self.count(Severity::Low),
            files_scanned: self.files_scanned,
        }
    }

    /// Sorts findings by rule, file, entity and message and drops exact
    /// duplicates so serialization is stable.
    pub fn finalize(&mut self) {
        self.findings.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        self.findings.dedup();
    }

    /// Serializes the report as pretty-printed JSON with a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        let document = ReportDocument {
            summary: self.summary(),
            findings: &self.findings,
            registry_counts: &self.registry_counts,
        };
        let mut out = serde_json::to_string_pretty(&document)?;
        out.push('\n');
        Ok(out)
    }
}

#[derive(Serialize)]
struct ReportDocument<'a> {
    summary: Summary,
    findings: &'a [Finding],
    registry_counts: &'a BTreeMap<String, usize>,
}
