//! Relation range validator: numeric relation values must stay within the
//! field's configured bounds (-2..=2 by default).

use crate::config::CheckConfig;
use crate::model::CorpusModel;
use crate::report::{ConformanceReport, Finding, RuleId};

/// Reports relation values outside the permitted range.
pub fn validate(model: &CorpusModel, config: &CheckConfig) -> ConformanceReport {
    let mut report = ConformanceReport::new();

    for edge in &model.resolution.relations {
        let Some(policy) = config.relation_policy(&edge.field) else {
            continue;
        };
        if (policy.min..=policy.max).contains(&edge.value) {
            continue;
        }
        report.push(
            Finding::medium(
                RuleId::RelationRange,
                &edge.file,
                format!(
                    "'{}' value {} -> {} is {}, outside {}..={}",
                    edge.field, edge.source, edge.target, edge.value, policy.min, policy.max
                ),
            )
            .with_entity(edge.source.as_str()),
        );
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SourceDocument;
    use serde_json::json;

    #[test]
    fn out_of_range_values_are_reported() {
        let config = CheckConfig::default();
        let doc = SourceDocument {
            relative: "f01.json".to_string(),
            value: json!({"id": "f01", "relations": {"f02": 3, "f03": -2, "f04": 0.5}}),
            is_template: false,
        };
        let model = CorpusModel::from_documents(vec![doc], Vec::new(), Default::default(), &config);
        let report = validate(&model, &config);
        assert_eq!(report.findings.len(), 1);
        assert!(report.findings[0].message.contains("f01 -> f02 is 3"));
    }
}
