//! ID uniqueness validator.
//!
//! Every `(entity_type, id)` may be defined once outside templates. Each
//! collision yields one finding that names every defining file.

use crate::config::CheckConfig;
use crate::model::CorpusModel;
use crate::report::{ConformanceReport, Finding, RuleId};

/// Reports ids with more than one non-template definition.
pub fn validate(model: &CorpusModel, _config: &CheckConfig) -> ConformanceReport {
    let mut report = ConformanceReport::new();

    for definitions in model.registry.duplicates() {
        let Some(first) = definitions.first() else {
            continue;
        };
        let locations: Vec<String> = definitions
            .iter()
            .map(|e| {
                if e.pointer.is_empty() {
                    e.source_path.clone()
                } else {
                    format!("{}#{}", e.source_path, e.pointer)
                }
            })
            .collect();
        report.push(
            Finding::high(
                RuleId::Uniqueness,
                &first.source_path,
                format!(
                    "duplicate {} id '{}' defined {} times: {}",
                    first.entity_type(),
                    first.id,
                    definitions.len(),
                    locations.join(", ")
                ),
            )
            .with_entity(first.id.as_str()),
        );
    }

    report
}
