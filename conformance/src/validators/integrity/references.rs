//! Reference validators.
//!
//! - `reference_integrity`: every production reference resolves to a
//!   non-template entity of the type its field expects
//! - `unclassified_reference`: explicit reference fields whose target type
//!   cannot be inferred
//! - `self_reference`: entities naming themselves where the field forbids it

use crate::config::CheckConfig;
use crate::model::CorpusModel;
use crate::report::{ConformanceReport, Finding, RuleId};
use crate::resolver::{Reference, ReferenceStatus};

/// Reports references that do not resolve.
pub fn integrity(model: &CorpusModel, config: &CheckConfig) -> ConformanceReport {
    let mut report = ConformanceReport::new();

    for reference in production(model) {
        let message = match reference.status {
            ReferenceStatus::Resolved
            | ReferenceStatus::Unclassified
            | ReferenceStatus::Template => continue,
            ReferenceStatus::Missing => {
                if is_external(reference, config) {
                    continue;
                }
                format!(
                    "reference to undefined id '{}' at {}",
                    reference.raw,
                    location(reference)
                )
            }
            ReferenceStatus::TemplateOnly => format!(
                "reference to '{}' at {} is only defined by templates",
                reference.raw,
                location(reference)
            ),
            ReferenceStatus::TypeMismatch { expected } => format!(
                "field '{}' expects a {} id but '{}' is a {}",
                reference.field,
                expected,
                reference.raw,
                reference
                    .target
                    .as_ref()
                    .map(|t| t.entity_type().name())
                    .unwrap_or("value")
            ),
            ReferenceStatus::NotAnId { expected } => {
                if is_external(reference, config) {
                    continue;
                }
                format!(
                    "'{}' at {} is not a valid {} id",
                    reference.raw,
                    location(reference),
                    expected
                )
            }
        };
        report.push(with_source(
            Finding::high(RuleId::ReferenceIntegrity, &reference.file, message),
            reference,
        ));
    }

    report
}

/// Reports explicit reference values whose target type cannot be inferred.
pub fn unclassified(model: &CorpusModel, config: &CheckConfig) -> ConformanceReport {
    let mut report = ConformanceReport::new();

    for reference in production(model)
        .filter(|r| r.status == ReferenceStatus::Unclassified)
        .filter(|r| !is_external(r, config))
    {
        report.push(with_source(
            Finding::low(
                RuleId::UnclassifiedReference,
                &reference.file,
                format!(
                    "'{}' in field '{}' does not identify an entity type",
                    reference.raw, reference.field
                ),
            ),
            reference,
        ));
    }

    report
}

/// Reports entities that reference themselves in a forbidden field.
pub fn self_reference(model: &CorpusModel, config: &CheckConfig) -> ConformanceReport {
    let mut report = ConformanceReport::new();
    let forbidden = &config.self_reference.forbidden_fields;

    for reference in production(model).filter(|r| forbidden.contains(&r.field)) {
        let (Some(source), Some(target)) = (&reference.source, &reference.target) else {
            continue;
        };
        if source != target {
            continue;
        }
        report.push(
            Finding::medium(
                RuleId::SelfReference,
                &reference.file,
                format!("{} lists itself in '{}'", source, reference.field),
            )
            .with_entity(source.as_str()),
        );
    }

    report
}

fn production(model: &CorpusModel) -> impl Iterator<Item = &Reference> + '_ {
    model
        .resolution
        .references
        .iter()
        .filter(|r| !r.in_template)
}

fn is_external(reference: &Reference, config: &CheckConfig) -> bool {
    config
        .external
        .is_external(&reference.field, &reference.raw, reference.target.is_some())
}

fn location(reference: &Reference) -> String {
    if reference.field_path.is_empty() {
        reference.field.clone()
    } else {
        reference.field_path.clone()
    }
}

fn with_source(finding: Finding, reference: &Reference) -> Finding {
    match &reference.source {
        Some(source) => finding.with_entity(source.as_str()),
        None => finding,
    }
}
