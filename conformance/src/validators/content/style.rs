//! Markdown style and documentation language advisories.
//!
//! Findings are aggregated per file and problem kind so a long document with
//! many overlong lines produces one finding, not hundreds.

use crate::config::CheckConfig;
use crate::model::CorpusModel;
use crate::report::{ConformanceReport, Finding, RuleId};

#[derive(Default)]
struct Tally {
    count: usize,
    first_line: usize,
}

impl Tally {
    fn hit(&mut self, line: usize) {
        if self.count == 0 {
            self.first_line = line;
        }
        self.count += 1;
    }
}

/// Reports overlong lines, trailing whitespace and tab characters in Markdown.
///
/// Line length is not checked inside fenced code blocks or on lines carrying
/// a URL.
pub fn style(model: &CorpusModel, config: &CheckConfig) -> ConformanceReport {
    let mut report = ConformanceReport::new();
    let max = config.style.max_line_length;

    for doc in &model.markdown {
        let mut long = Tally::default();
        let mut trailing = Tally::default();
        let mut tabs = Tally::default();
        let mut in_fence = false;

        for (index, line) in doc.text.lines().enumerate() {
            let number = index + 1;
            if line.trim_start().starts_with("```") {
                in_fence = !in_fence;
            }
            if !in_fence && line.chars().count() > max && !line.contains("://") {
                long.hit(number);
            }
            if has_trailing_whitespace(line, config.style.allow_hard_breaks) {
                trailing.hit(number);
            }
            if line.contains('\t') {
                tabs.hit(number);
            }
        }

        let kinds = [
            (long, format!("longer than {} characters", max)),
            (trailing, "with trailing whitespace".to_string()),
            (tabs, "containing tab characters".to_string()),
        ];
        for (tally, what) in kinds {
            if tally.count > 0 {
                report.push(Finding::low(
                    RuleId::Style,
                    &doc.relative,
                    format!(
                        "{} line(s) {} (first at line {})",
                        tally.count, what, tally.first_line
                    ),
                ));
            }
        }
    }

    report
}

fn has_trailing_whitespace(line: &str, allow_hard_breaks: bool) -> bool {
    let trimmed = line.trim_end_matches([' ', '\t']);
    let tail = &line[trimmed.len()..];
    if tail.is_empty() || trimmed.is_empty() {
        return false;
    }
    !(allow_hard_breaks && tail == "  ")
}

/// Reports configured documentation files with no English section.
pub fn language(model: &CorpusModel, config: &CheckConfig) -> ConformanceReport {
    let mut report = ConformanceReport::new();
    let rules = &config.language;

    for doc in model
        .markdown
        .iter()
        .filter(|doc| rules.files.iter().any(|f| *f == doc.relative))
    {
        if doc.text.chars().count() < rules.min_length {
            continue;
        }
        let lower = doc.text.to_lowercase();
        if !rules
            .english_terms
            .iter()
            .any(|term| lower.contains(&term.to_lowercase()))
        {
            report.push(Finding::low(
                RuleId::Language,
                &doc.relative,
                format!(
                    "no English section found (expected one of: {})",
                    rules.english_terms.join(", ")
                ),
            ));
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MarkdownDocument;
    use std::collections::BTreeSet;

    fn model(files: &[(&str, &str)]) -> CorpusModel {
        let markdown = files
            .iter()
            .map(|(relative, text)| MarkdownDocument {
                relative: relative.to_string(),
                text: text.to_string(),
            })
            .collect();
        CorpusModel::from_documents(Vec::new(), markdown, BTreeSet::new(), &CheckConfig::default())
    }

    #[test]
    fn hard_breaks_are_not_trailing_whitespace() {
        assert!(!has_trailing_whitespace("a line  ", true));
        assert!(has_trailing_whitespace("a line  ", false));
        assert!(has_trailing_whitespace("a line ", true));
        assert!(has_trailing_whitespace("a line\t", true));
        assert!(!has_trailing_whitespace("    ", true));
    }

    #[test]
    fn style_findings_are_aggregated_per_kind() {
        let long = "x".repeat(130);
        let text = format!("# Title\n{long}\n{long}\nend \n\tindented\n```\n{long}\n```\n");
        let model = model(&[("docs/notes.md", &text)]);
        let report = style(&model, &CheckConfig::default());
        let messages: Vec<_> = report.findings.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "2 line(s) longer than 120 characters (first at line 2)",
                "1 line(s) with trailing whitespace (first at line 4)",
                "1 line(s) containing tab characters (first at line 5)",
            ]
        );
        assert!(report.findings.iter().all(|f| !f.is_high()));
    }

    #[test]
    fn readme_without_english_section_is_flagged() {
        let native = "Dieses Projekt beschreibt eine Spielwelt mit Fraktionen, Personen und Orten. \
                      Alle Inhalte liegen als Datenpakete im Repository vor.";
        let english = format!("{native}\n\n## Usage\nRun the checker.");
        let flagged = language(&model(&[("README.md", native)]), &CheckConfig::default());
        assert_eq!(flagged.findings.len(), 1);
        assert_eq!(flagged.findings[0].rule_id, RuleId::Language);

        let clean = language(&model(&[("README.md", &english)]), &CheckConfig::default());
        assert!(clean.findings.is_empty());

        let elsewhere = language(&model(&[("docs/README.md", native)]), &CheckConfig::default());
        assert!(elsewhere.findings.is_empty());
    }
}
