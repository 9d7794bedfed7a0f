//! Rule evaluators.
//!
//! Every evaluator is a pure function of the corpus model and the
//! configuration. [`RULES`] fixes the evaluation order; the final report is
//! sorted anyway, so the order only matters for logging.

pub mod content;
pub mod intake;
pub mod integrity;
pub mod relations;

use crate::config::CheckConfig;
use crate::model::CorpusModel;
use crate::report::{ConformanceReport, RuleId};

/// Signature shared by all rule evaluators.
pub type Evaluator = fn(&CorpusModel, &CheckConfig) -> ConformanceReport;

/// Every rule with its evaluator.
pub const RULES: &[(RuleId, Evaluator)] = &[
    (RuleId::MalformedJson, intake::malformed_json),
    (RuleId::UnreadableFile, intake::unreadable_file),
    (RuleId::MissingId, intake::missing_id),
    (RuleId::Uniqueness, integrity::uniqueness::validate),
    (RuleId::ReferenceIntegrity, integrity::references::integrity),
    (RuleId::UnclassifiedReference, integrity::references::unclassified),
    (RuleId::SelfReference, integrity::references::self_reference),
    (RuleId::RelationshipSymmetry, relations::symmetry::validate),
    (RuleId::RelationRange, relations::range::validate),
    (RuleId::TemplateLeakage, integrity::templates::leakage),
    (RuleId::TemplatePlaceholder, integrity::templates::placeholders),
    (RuleId::LoreCoverage, content::lore::validate),
    (RuleId::BrokenFileReference, content::links::file_references),
    (RuleId::BrokenMarkdownLink, content::links::markdown_links),
    (RuleId::Style, content::style::style),
    (RuleId::Language, content::style::language),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn every_rule_has_exactly_one_evaluator() {
        let ids: BTreeSet<_> = RULES.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids.len(), RULES.len());
        assert_eq!(RULES.len(), 16);
    }

    #[test]
    fn evaluators_only_emit_their_own_rule() {
        let model = CorpusModel::default();
        let config = CheckConfig::default();
        for (id, evaluate) in RULES {
            let report = evaluate(&model, &config);
            assert!(report.findings.iter().all(|f| f.rule_id == *id));
        }
    }
}
