//! Intake validators: problems found while reading files and extracting ids.
//!
//! The findings themselves are produced while the model is built, at the
//! file boundary, so one bad file never stops the scan. These evaluators
//! replay them under their own rule toggles.

use crate::config::CheckConfig;
use crate::model::CorpusModel;
use crate::report::{ConformanceReport, RuleId};

/// Reports files that are not valid JSON.
pub fn malformed_json(model: &CorpusModel, _config: &CheckConfig) -> ConformanceReport {
    replay(model, RuleId::MalformedJson)
}

/// Reports files and directories that could not be read.
pub fn unreadable_file(model: &CorpusModel, _config: &CheckConfig) -> ConformanceReport {
    replay(model, RuleId::UnreadableFile)
}

/// Reports documents without a recognizable entity id.
pub fn missing_id(model: &CorpusModel, _config: &CheckConfig) -> ConformanceReport {
    replay(model, RuleId::MissingId)
}

fn replay(model: &CorpusModel, rule: RuleId) -> ConformanceReport {
    let mut report = ConformanceReport::new();
    for finding in model.intake.iter().filter(|f| f.rule_id == rule) {
        report.push(finding.clone());
    }
    report
}
