//! Template validators.
//!
//! Templates are exempt from uniqueness and resolution, but must stay well
//! formed; production data must not carry any placeholder at all.

use crate::config::CheckConfig;
use crate::model::CorpusModel;
use crate::report::{ConformanceReport, Finding, RuleId};

/// Reports `{{placeholder}}` tokens left in non-template content.
pub fn leakage(model: &CorpusModel, _config: &CheckConfig) -> ConformanceReport {
    let mut report = ConformanceReport::new();

    for site in model.resolution.placeholders.iter().filter(|p| !p.in_template) {
        let finding = Finding::high(
            RuleId::TemplateLeakage,
            &site.file,
            format!(
                "unresolved placeholder '{}' at {}",
                site.token,
                display_path(&site.field_path)
            ),
        );
        report.push(match &site.owner {
            Some(owner) => finding.with_entity(owner.as_str()),
            None => finding,
        });
    }

    report
}

/// Reports half-filled template slots and malformed placeholder tokens.
pub fn placeholders(model: &CorpusModel, config: &CheckConfig) -> ConformanceReport {
    let mut report = ConformanceReport::new();

    for slot in &model.resolution.template_slots {
        if config.external.is_external(&slot.field, &slot.raw, false) {
            continue;
        }
        let finding = Finding::medium(
            RuleId::TemplatePlaceholder,
            &slot.file,
            format!(
                "template value '{}' at {} is neither a placeholder nor a valid id",
                slot.raw,
                display_path(&slot.field_path)
            ),
        );
        report.push(match &slot.owner {
            Some(owner) => finding.with_entity(owner.as_str()),
            None => finding,
        });
    }

    for site in model
        .resolution
        .placeholders
        .iter()
        .filter(|p| p.in_template && !p.well_formed)
    {
        let finding = Finding::medium(
            RuleId::TemplatePlaceholder,
            &site.file,
            format!(
                "malformed placeholder '{}' at {}",
                site.token,
                display_path(&site.field_path)
            ),
        );
        report.push(match &site.owner {
            Some(owner) => finding.with_entity(owner.as_str()),
            None => finding,
        });
    }

    report
}

fn display_path(pointer: &str) -> &str {
    if pointer.is_empty() {
        "/"
    } else {
        pointer
    }
}
