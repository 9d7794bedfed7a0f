//! Mechanics/lore pairing validator.
//!
//! Faction data is split into a mechanics collection (`factions`, keyed by
//! id) and a narrative collection (`lore_modules`, each naming its
//! `faction_id`). A faction present only on the mechanics side is reported.
//! The opposite direction is a `faction_id` reference and is already covered
//! by `reference_integrity`.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::config::CheckConfig;
use crate::model::CorpusModel;
use crate::report::{ConformanceReport, Finding, RuleId};

/// Reports factions that have mechanics but no lore module.
pub fn validate(model: &CorpusModel, config: &CheckConfig) -> ConformanceReport {
    let mut report = ConformanceReport::new();
    let find = |path: &str| model.documents.iter().find(|doc| doc.relative == path);

    let Some(mechanics) = find(&config.lore.mechanics) else {
        return report;
    };
    let Some(factions) = mechanics.value.get("factions").and_then(Value::as_object) else {
        return report;
    };
    let Some(lore) = find(&config.lore.lore) else {
        report.push(Finding::low(
            RuleId::LoreCoverage,
            &mechanics.relative,
            format!(
                "{} faction(s) have mechanics but the lore collection {} is missing",
                factions.len(),
                config.lore.lore
            ),
        ));
        return report;
    };

    let modules: Vec<&Value> = match lore.value.get("lore_modules") {
        Some(Value::Object(map)) => map.values().collect(),
        Some(Value::Array(items)) => items.iter().collect(),
        _ => Vec::new(),
    };
    let covered: BTreeSet<&str> = modules
        .iter()
        .filter_map(|module| module.get("faction_id").and_then(Value::as_str))
        .collect();

    for faction in factions.keys().filter(|f| !covered.contains(f.as_str())) {
        report.push(
            Finding::low(
                RuleId::LoreCoverage,
                &mechanics.relative,
                format!(
                    "faction {} has mechanics but no lore module in {}",
                    faction, lore.relative
                ),
            )
            .with_entity(faction.as_str()),
        );
    }

    report
}
