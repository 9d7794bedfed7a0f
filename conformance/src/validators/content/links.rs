//! Link validators.
//!
//! - `broken_file_reference`: JSON path fields (`index`, `file`, `path`, ...)
//!   must point at files that exist under the content root. References into
//!   an area the master index marks `inactive` are downgraded to low.
//! - `broken_markdown_link`: relative Markdown links must resolve.
//!
//! Targets are checked against the walked inventory, not the live filesystem,
//! so excluded directories count as missing.

use pulldown_cmark::{Event, Parser, Tag};
use serde_json::Value;

use crate::config::CheckConfig;
use crate::entity::EntityId;
use crate::model::CorpusModel;
use crate::registry::declared_id;
use crate::report::{ConformanceReport, Finding, RuleId, Severity};
use crate::resolver::placeholder_tokens;

/// Reports JSON path fields pointing at missing files.
pub fn file_references(model: &CorpusModel, config: &CheckConfig) -> ConformanceReport {
    let mut report = ConformanceReport::new();

    for doc in &model.documents {
        let mut found = Vec::new();
        collect_paths(&doc.value, None, config, &mut found);

        for (owner, reference) in found {
            if resolve_link(model, &doc.relative, &reference).is_some() {
                continue;
            }
            let target = join_relative(parent_of(&doc.relative), &reference);
            let status = target
                .as_deref()
                .and_then(|t| model.master_index.area_status(t));
            let (severity, suffix) = match status {
                Some("inactive") => (
                    Severity::Low,
                    " (area marked 'inactive' in the master index)".to_string(),
                ),
                _ => (Severity::High, String::new()),
            };
            let finding = Finding::new(
                RuleId::BrokenFileReference,
                severity,
                &doc.relative,
                format!("broken file reference '{}'{}", reference, suffix),
            );
            report.push(match owner {
                Some(owner) => finding.with_entity(owner.as_str()),
                None => finding,
            });
        }
    }

    report
}

/// Reports relative Markdown links pointing at missing files.
pub fn markdown_links(model: &CorpusModel, _config: &CheckConfig) -> ConformanceReport {
    let mut report = ConformanceReport::new();

    for doc in &model.markdown {
        for link in extract_links(&doc.text) {
            if resolve_link(model, &doc.relative, &link).is_none() {
                report.push(Finding::medium(
                    RuleId::BrokenMarkdownLink,
                    &doc.relative,
                    format!("broken markdown link '{}'", link),
                ));
            }
        }
    }

    report
}

fn collect_paths(
    value: &Value,
    owner: Option<&EntityId>,
    config: &CheckConfig,
    out: &mut Vec<(Option<EntityId>, String)>,
) {
    match value {
        Value::Object(map) => {
            let own = declared_id(map);
            let owner = own.as_ref().or(owner);
            for (key, child) in map {
                if config.file_references.fields.contains(key) {
                    let values: Vec<&Value> = match child {
                        Value::Array(items) => items.iter().collect(),
                        other => vec![other],
                    };
                    for value in values {
                        if let Value::String(s) = value {
                            if looks_like_path(s, config) {
                                out.push((owner.cloned(), s.clone()));
                            }
                        }
                    }
                }
                collect_paths(child, owner, config, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_paths(item, owner, config, out);
            }
        }
        _ => {}
    }
}

fn looks_like_path(value: &str, config: &CheckConfig) -> bool {
    if is_external_link(value) || !placeholder_tokens(value).is_empty() {
        return false;
    }
    value.contains('/')
        || config
            .file_references
            .extensions
            .iter()
            .any(|ext| value.to_ascii_lowercase().ends_with(ext.as_str()))
}

/// Extracts link and image destinations that point inside the repository.
fn extract_links(markdown: &str) -> Vec<String> {
    Parser::new(markdown)
        .filter_map(|event| match event {
            Event::Start(Tag::Link { dest_url, .. }) | Event::Start(Tag::Image { dest_url, .. }) => {
                Some(dest_url.to_string())
            }
            _ => None,
        })
        .filter(|dest| !dest.is_empty() && !dest.starts_with('#') && !is_external_link(dest))
        .collect()
}

fn is_external_link(value: &str) -> bool {
    value.contains("://") || value.starts_with("mailto:") || value.starts_with("tel:")
}

/// Resolves a link written in `from` against the inventory.
///
/// A leading `/` is root-relative; anything else is tried relative to the
/// containing file first and relative to the root second. A link climbing
/// above the root never resolves.
fn resolve_link(model: &CorpusModel, from: &str, link: &str) -> Option<String> {
    let link = link.split(['#', '?']).next().unwrap_or(link).replace("%20", " ");
    if link.is_empty() {
        return Some(String::new());
    }

    let candidates = if let Some(absolute) = link.strip_prefix('/') {
        vec![normalize_path(absolute)]
    } else {
        vec![
            join_relative(parent_of(from), &link),
            normalize_path(&link),
        ]
    };
    candidates
        .into_iter()
        .flatten()
        .find(|c| c.is_empty() || model.inventory.contains(c))
}

fn parent_of(relative: &str) -> &str {
    relative.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

fn join_relative(dir: &str, link: &str) -> Option<String> {
    if dir.is_empty() {
        normalize_path(link)
    } else {
        normalize_path(&format!("{}/{}", dir, link))
    }
}

/// Normalizes a path by resolving `.` and `..` components.
///
/// For example, `lore/../factions/f01.json` becomes `factions/f01.json`.
/// Returns `None` if a `..` would leave the content root.
fn normalize_path(path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            part => parts.push(part),
        }
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{MarkdownDocument, SourceDocument};
    use serde_json::json;
    use std::collections::BTreeSet;

    fn inventory(paths: &[&str]) -> BTreeSet<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn normalizes_dot_segments() {
        assert_eq!(
            normalize_path("lore/../factions/./f01.json").as_deref(),
            Some("factions/f01.json")
        );
        assert_eq!(normalize_path("/a//b/").as_deref(), Some("a/b"));
        assert_eq!(normalize_path("docs/../../README.md"), None);
    }

    #[test]
    fn json_path_fields_are_resolved() {
        let config = CheckConfig::default();
        let docs = vec![
            SourceDocument {
                relative: "master_index.json".to_string(),
                value: json!({"areas": [
                    {"key": "factions", "dir": "factions/", "index": "factions/factions.json", "status": "active"},
                    {"key": "crafting", "dir": "crafting/", "index": "crafting/recipes.json", "status": "inactive"}
                ]}),
                is_template: false,
            },
            SourceDocument {
                relative: "factions/f01.json".to_string(),
                value: json!({"id": "f01", "icon": "../art/f01.png", "image": "{{portrait}}", "file": "https://x.test/a.png"}),
                is_template: false,
            },
        ];
        let model = CorpusModel::from_documents(
            docs,
            Vec::new(),
            inventory(&[
                "crafting",
                "factions",
                "factions/factions.json",
                "master_index.json",
            ]),
            &config,
        );
        let report = file_references(&model, &config);
        let summary: Vec<_> = report
            .findings
            .iter()
            .map(|f| (f.severity, f.file.as_str(), f.entity_id.as_deref()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (Severity::Low, "master_index.json", None),
                (Severity::High, "factions/f01.json", Some("f01")),
            ]
        );
    }

    #[test]
    fn markdown_links_resolve_relative_to_the_file() {
        let config = CheckConfig::default();
        let markdown = vec![MarkdownDocument {
            relative: "docs/guide.md".to_string(),
            text: "See [rules](rules.md#combat), [index](/README.md), \
                   [site](https://example.com), [top](#top) and [gone](../lore/missing.md).\n\n\
                   ```\n[not a link](nowhere.md)\n```\n"
                .to_string(),
        }];
        let model = CorpusModel::from_documents(
            Vec::new(),
            markdown,
            inventory(&["README.md", "docs", "docs/guide.md", "docs/rules.md"]),
            &config,
        );
        let report = markdown_links(&model, &config);
        assert_eq!(report.findings.len(), 1);
        assert!(report.findings[0].message.contains("../lore/missing.md"));
    }

    #[test]
    fn module_lists_are_checked_element_by_element() {
        let config = CheckConfig::default();
        let docs = vec![SourceDocument {
            relative: "data/modules/loading_config.json".to_string(),
            value: json!({
                "load_contexts": {
                    "combat": {"modules": [
                        "data/mechanics/factions_core.json",
                        "data/mechanics/missing_core.json"
                    ]},
                    "story": {"modules": ["data/lore/factions_narrative.json"]}
                },
                "file": "data/mechanics/also_missing.json"
            }),
            is_template: false,
        }];
        let model = CorpusModel::from_documents(
            docs,
            Vec::new(),
            inventory(&[
                "data/lore/factions_narrative.json",
                "data/mechanics/factions_core.json",
            ]),
            &config,
        );
        let mut messages: Vec<_> = file_references(&model, &config)
            .findings
            .into_iter()
            .map(|f| f.message)
            .collect();
        messages.sort();
        assert_eq!(
            messages,
            vec![
                "broken file reference 'data/mechanics/also_missing.json'",
                "broken file reference 'data/mechanics/missing_core.json'",
            ]
        );
    }

    #[test]
    fn links_climbing_above_the_root_are_broken() {
        let config = CheckConfig::default();
        let markdown = vec![MarkdownDocument {
            relative: "README.md".to_string(),
            text: "See [upstream](../../README.md) and [guide](docs/../README.md).\n".to_string(),
        }];
        let model = CorpusModel::from_documents(
            Vec::new(),
            markdown,
            inventory(&["README.md"]),
            &config,
        );
        let report = markdown_links(&model, &config);
        assert_eq!(report.findings.len(), 1);
        assert!(report.findings[0].message.contains("../../README.md"));
    }
}
