//! Relationship symmetry validator.
//!
//! For every relation field with a symmetry policy, the reciprocal values of
//! each entity pair are compared. `exact` requires equal values, `sign` only
//! requires both sides to agree on allied, neutral or hostile, `none` skips
//! the field. Pairs where one side is missing are not judged here.

use std::collections::BTreeMap;

use crate::config::{CheckConfig, Symmetry};
use crate::entity::EntityId;
use crate::model::CorpusModel;
use crate::report::{ConformanceReport, Finding, RuleId};
use crate::resolver::RelationEdge;

/// Reports reciprocal relation values that violate the field's policy.
pub fn validate(model: &CorpusModel, config: &CheckConfig) -> ConformanceReport {
    let mut report = ConformanceReport::new();

    let mut edges: BTreeMap<(&str, &EntityId, &EntityId), &RelationEdge> = BTreeMap::new();
    for edge in &model.resolution.relations {
        edges
            .entry((edge.field.as_str(), &edge.source, &edge.target))
            .or_insert(edge);
    }

    for (&(field, a, b), forward) in &edges {
        if a >= b {
            continue;
        }
        let Some(backward) = edges.get(&(field, b, a)) else {
            continue;
        };
        let Some(policy) = config.relation_policy(field) else {
            continue;
        };
        if agrees(policy.symmetry, forward.value, backward.value) {
            continue;
        }
        report.push(
            Finding::medium(
                RuleId::RelationshipSymmetry,
                &forward.file,
                format!(
                    "'{}' between {} and {} is asymmetric: {} -> {} = {}, {} -> {} = {} ({} symmetry)",
                    field,
                    a,
                    b,
                    a,
                    b,
                    forward.value,
                    b,
                    a,
                    backward.value,
                    policy_name(policy.symmetry)
                ),
            )
            .with_entity(a.as_str()),
        );
    }

    report
}

fn agrees(policy: Symmetry, forward: f64, backward: f64) -> bool {
    match policy {
        Symmetry::Exact => (forward - backward).abs() < f64::EPSILON,
        Symmetry::Sign => sign(forward) == sign(backward),
        Symmetry::None => true,
    }
}

fn sign(value: f64) -> i8 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}

fn policy_name(policy: Symmetry) -> &'static str {
    match policy {
        Symmetry::Exact => "exact",
        Symmetry::Sign => "sign",
        Symmetry::None => "no",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelationPolicy;
    use crate::registry::SourceDocument;
    use crate::report::Severity;
    use serde_json::{json, Value};

    fn model(docs: Vec<(&str, Value)>, config: &CheckConfig) -> CorpusModel {
        let docs = docs
            .into_iter()
            .map(|(relative, value)| SourceDocument {
                relative: relative.to_string(),
                value,
                is_template: false,
            })
            .collect();
        CorpusModel::from_documents(docs, Vec::new(), Default::default(), config)
    }

    #[test]
    fn mismatched_reciprocal_values_are_medium() {
        let config = CheckConfig::default();
        let model = model(
            vec![
                ("f01.json", json!({"id": "f01", "relations": {"f02": -1}})),
                ("f02.json", json!({"id": "f02", "relations": {"f01": 1}})),
            ],
            &config,
        );
        let report = validate(&model, &config);
        assert_eq!(report.findings.len(), 1);
        let finding = &report.findings[0];
        assert_eq!(finding.severity, Severity::Medium);
        assert_eq!(finding.entity_id.as_deref(), Some("f01"));
        assert!(finding.message.contains("f01 -> f02 = -1"));
        assert!(finding.message.contains("f02 -> f01 = 1"));
    }

    #[test]
    fn matching_and_one_sided_relations_pass() {
        let config = CheckConfig::default();
        let model = model(
            vec![
                ("f01.json", json!({"id": "f01", "relations": {"f02": 2, "f03": -2}})),
                ("f02.json", json!({"id": "f02", "relations": {"f01": 2}})),
                ("f03.json", json!({"id": "f03"})),
            ],
            &config,
        );
        assert!(validate(&model, &config).findings.is_empty());
    }

    #[test]
    fn trust_is_asymmetric_by_default() {
        let config = CheckConfig::default();
        let model = model(
            vec![
                ("f01.json", json!({"id": "f01", "trust": {"f02": -2}})),
                ("f02.json", json!({"id": "f02", "trust": {"f01": 2}})),
            ],
            &config,
        );
        assert!(validate(&model, &config).findings.is_empty());
    }

    #[test]
    fn sign_policy_tolerates_magnitude() {
        let mut config = CheckConfig::default();
        config.relations.insert(
            "relations".to_string(),
            RelationPolicy {
                symmetry: Symmetry::Sign,
                ..RelationPolicy::default()
            },
        );
        let model = model(
            vec![
                ("f01.json", json!({"id": "f01", "relations": {"f02": 1, "f03": 1}})),
                ("f02.json", json!({"id": "f02", "relations": {"f01": 2}})),
                ("f03.json", json!({"id": "f03", "relations": {"f01": -1}})),
            ],
            &config,
        );
        let report = validate(&model, &config);
        assert_eq!(report.findings.len(), 1);
        assert!(report.findings[0].message.contains("f03"));
    }
}
