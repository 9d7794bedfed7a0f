//! Reference resolver.
//!
//! Walks every parsed document depth-first and records each value that points
//! at another entity, every numeric relation between entities and every
//! template placeholder. Which keys count as references is decided by a
//! [`ReferenceMatcher`], so new naming conventions plug in without touching
//! the scan itself.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::config::ReferencesConfig;
use crate::entity::{EntityId, EntityType};
use crate::registry::{declared_id, is_template_object, pointer_child, Registry, SourceDocument};

/// How a JSON key relates to references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyClass {
    /// `*_id` / `*_ids`: the value (or each element) is a reference.
    Reference {
        /// Target type implied by the key name.
        declared: Option<EntityType>,
    },
    /// Relation container: object keys or sequence elements are references.
    Container {
        /// Target type configured for the container.
        declared: Option<EntityType>,
    },
    /// Anything else.
    Plain,
}

/// Decides which keys and values are cross-references.
pub trait ReferenceMatcher {
    /// Classifies an object key.
    fn classify_key(&self, key: &str) -> KeyClass;

    /// Returns the id a free-standing string value denotes, if any.
    fn match_id(&self, value: &str) -> Option<EntityId>;
}

/// Default matcher: `*_id` naming plus configured relation containers.
#[derive(Debug, Clone)]
pub struct ConventionMatcher {
    containers: BTreeMap<String, Option<EntityType>>,
    min_pattern_digits: usize,
}

impl ConventionMatcher {
    /// Builds the matcher from configuration.
    pub fn from_config(config: &ReferencesConfig) -> Self {
        Self {
            containers: config
                .containers
                .iter()
                .map(|c| (c.name.clone(), c.target))
                .collect(),
            min_pattern_digits: config.min_pattern_digits,
        }
    }
}

impl Default for ConventionMatcher {
    fn default() -> Self {
        Self::from_config(&ReferencesConfig::default())
    }
}

impl ReferenceMatcher for ConventionMatcher {
    fn classify_key(&self, key: &str) -> KeyClass {
        if let Some(declared) = self.containers.get(key) {
            return KeyClass::Container {
                declared: *declared,
            };
        }
        match key
            .strip_suffix("_ids")
            .or_else(|| key.strip_suffix("_id"))
        {
            Some(stem) if !stem.is_empty() => KeyClass::Reference {
                declared: EntityType::from_field_stem(stem).or_else(|| {
                    stem.rsplit('_')
                        .next()
                        .and_then(EntityType::from_field_stem)
                }),
            },
            _ => KeyClass::Plain,
        }
    }

    fn match_id(&self, value: &str) -> Option<EntityId> {
        EntityId::parse(value).filter(|id| id.digit_count() >= self.min_pattern_digits)
    }
}

/// What discovered a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// An explicit reference field or relation container.
    FieldName,
    /// A bare string that matched the id pattern.
    Pattern,
}

/// Outcome of resolving a reference against the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceStatus {
    /// Target has a non-template definition of the expected type.
    Resolved,
    /// Target id is not defined anywhere.
    Missing,
    /// Target is only defined by templates.
    TemplateOnly,
    /// Target exists but the field expects another type.
    TypeMismatch {
        /// Type implied by the field.
        expected: EntityType,
    },
    /// Value is not an id, although the field declares a target type.
    NotAnId {
        /// Type implied by the field.
        expected: EntityType,
    },
    /// Value is not an id and the field implies no target type.
    Unclassified,
    /// Inside a template; not resolved.
    Template,
}

/// A directed edge from one document location to an entity id.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    /// Entity owning the location, if any.
    pub source: Option<EntityId>,
    /// File containing the reference.
    pub file: String,
    /// JSON pointer of the referencing value.
    pub field_path: String,
    /// Key that classified the value (nearest key for pattern matches).
    pub field: String,
    /// Target type implied by the key name.
    pub declared: Option<EntityType>,
    /// Raw value as written.
    pub raw: String,
    /// Parsed target id.
    pub target: Option<EntityId>,
    /// What discovered the reference.
    pub signal: Signal,
    /// True inside a template document or object.
    pub in_template: bool,
    /// Resolution outcome.
    pub status: ReferenceStatus,
}

/// A numeric relation value from one entity to another.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationEdge {
    /// Entity holding the relation.
    pub source: EntityId,
    /// Container field, e.g. `relations`.
    pub field: String,
    /// Related entity.
    pub target: EntityId,
    /// Relation value.
    pub value: f64,
    /// File containing the relation.
    pub file: String,
}

/// A `{{placeholder}}` token found in a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderSite {
    /// Entity owning the string, if any.
    pub owner: Option<EntityId>,
    /// File containing the string.
    pub file: String,
    /// JSON pointer of the string.
    pub field_path: String,
    /// The token, braces included; an unterminated token runs to the end.
    pub token: String,
    /// False for unterminated or empty tokens.
    pub well_formed: bool,
    /// True inside a template document or object.
    pub in_template: bool,
}

/// A template id or reference value that is neither a placeholder nor an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSlot {
    /// Entity owning the slot, if any.
    pub owner: Option<EntityId>,
    /// File containing the slot.
    pub file: String,
    /// JSON pointer of the slot.
    pub field_path: String,
    /// Key of the slot.
    pub field: String,
    /// Raw value as written.
    pub raw: String,
}

/// Everything the resolver discovered.
#[derive(Debug, Default)]
pub struct Resolution {
    /// All references, in document order.
    pub references: Vec<Reference>,
    /// Numeric relation edges between non-template entities.
    pub relations: Vec<RelationEdge>,
    /// Placeholder tokens.
    pub placeholders: Vec<PlaceholderSite>,
    /// Half-filled template slots.
    pub template_slots: Vec<TemplateSlot>,
}

/// Scans all documents and resolves every reference against `registry`.
pub fn resolve(
    documents: &[SourceDocument],
    registry: &Registry,
    matcher: &dyn ReferenceMatcher,
) -> Resolution {
    let mut resolution = Resolution::default();
    for doc in documents {
        let mut scan = Scan {
            file: &doc.relative,
            registry,
            matcher,
            out: &mut resolution,
        };
        scan.visit(&doc.value, "", "", None, doc.is_template);
    }
    tracing::debug!(
        references = resolution.references.len(),
        relations = resolution.relations.len(),
        placeholders = resolution.placeholders.len(),
        "references resolved"
    );
    resolution
}

struct Scan<'a> {
    file: &'a str,
    registry: &'a Registry,
    matcher: &'a dyn ReferenceMatcher,
    out: &'a mut Resolution,
}

impl Scan<'_> {
    fn visit(
        &mut self,
        value: &Value,
        pointer: &str,
        field: &str,
        owner: Option<&EntityId>,
        template: bool,
    ) {
        match value {
            Value::Object(map) => self.visit_object(map, pointer, owner, template),
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    let child = pointer_child(pointer, &index.to_string());
                    self.visit(item, &child, field, owner, template);
                }
            }
            Value::String(s) => {
                self.record_placeholders(s, pointer, owner, template);
                if let Some(target) = self.matcher.match_id(s) {
                    self.push_reference(
                        s,
                        Some(target),
                        pointer,
                        field,
                        None,
                        owner,
                        template,
                        Signal::Pattern,
                    );
                }
            }
            _ => {}
        }
    }

    fn visit_object(
        &mut self,
        map: &Map<String, Value>,
        pointer: &str,
        owner: Option<&EntityId>,
        template: bool,
    ) {
        let template = template || is_template_object(map);
        let own = declared_id(map);
        let owner = own.as_ref().or(owner);

        for (key, child) in map {
            let child_pointer = pointer_child(pointer, key);
            match key.as_str() {
                "is_template" => continue,
                "id" => {
                    if let Value::String(s) = child {
                        self.record_placeholders(s, &child_pointer, owner, template);
                        if template && !is_full_placeholder(s) && EntityId::parse(s).is_none() {
                            self.push_slot(s, &child_pointer, key, owner);
                        }
                    }
                    continue;
                }
                _ => {}
            }

            match self.matcher.classify_key(key) {
                KeyClass::Reference { declared } => {
                    self.visit_reference_value(child, &child_pointer, key, declared, owner, template)
                }
                KeyClass::Container { declared } => {
                    self.visit_container(child, &child_pointer, key, declared, owner, template)
                }
                KeyClass::Plain => self.visit(child, &child_pointer, key, owner, template),
            }
        }
    }

    fn visit_reference_value(
        &mut self,
        value: &Value,
        pointer: &str,
        field: &str,
        declared: Option<EntityType>,
        owner: Option<&EntityId>,
        template: bool,
    ) {
        match value {
            Value::String(s) => self.explicit_reference(s, pointer, field, declared, owner, template),
            Value::Number(n) => {
                let raw = n.to_string();
                self.explicit_reference(&raw, pointer, field, declared, owner, template);
            }
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    let child = pointer_child(pointer, &index.to_string());
                    match item {
                        Value::String(_) | Value::Number(_) => self.visit_reference_value(
                            item, &child, field, declared, owner, template,
                        ),
                        _ => self.visit(item, &child, field, owner, template),
                    }
                }
            }
            Value::Object(_) => self.visit(value, pointer, field, owner, template),
            Value::Null | Value::Bool(_) => {}
        }
    }

    fn visit_container(
        &mut self,
        value: &Value,
        pointer: &str,
        field: &str,
        declared: Option<EntityType>,
        owner: Option<&EntityId>,
        template: bool,
    ) {
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    let child_pointer = pointer_child(pointer, key);
                    let keyed_by_id = EntityId::parse(key).is_some() || is_full_placeholder(key);
                    if !keyed_by_id && !child.is_number() {
                        // grouping key such as "core" or "contested"
                        self.visit_container(child, &child_pointer, field, declared, owner, template);
                        continue;
                    }
                    self.explicit_reference(key, &child_pointer, field, declared, owner, template);
                    match child {
                        Value::Number(n) => {
                            if let (Some(source), Some(target), Some(value), false) =
                                (owner, EntityId::parse(key), n.as_f64(), template)
                            {
                                self.out.relations.push(RelationEdge {
                                    source: source.clone(),
                                    field: field.to_string(),
                                    target,
                                    value,
                                    file: self.file.to_string(),
                                });
                            }
                        }
                        other => self.visit(other, &child_pointer, field, owner, template),
                    }
                }
            }
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    let child = pointer_child(pointer, &index.to_string());
                    match item {
                        Value::String(s) => {
                            self.explicit_reference(s, &child, field, declared, owner, template)
                        }
                        _ => self.visit(item, &child, field, owner, template),
                    }
                }
            }
            Value::String(s) => self.explicit_reference(s, pointer, field, declared, owner, template),
            _ => {}
        }
    }

    fn explicit_reference(
        &mut self,
        raw: &str,
        pointer: &str,
        field: &str,
        declared: Option<EntityType>,
        owner: Option<&EntityId>,
        template: bool,
    ) {
        self.record_placeholders(raw, pointer, owner, template);
        let target = EntityId::parse(raw);
        if template && target.is_none() && !is_full_placeholder(raw) {
            self.push_slot(raw, pointer, field, owner);
        }
        self.push_reference(
            raw,
            target,
            pointer,
            field,
            declared,
            owner,
            template,
            Signal::FieldName,
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn push_reference(
        &mut self,
        raw: &str,
        target: Option<EntityId>,
        pointer: &str,
        field: &str,
        declared: Option<EntityType>,
        owner: Option<&EntityId>,
        template: bool,
        signal: Signal,
    ) {
        let status = if template {
            ReferenceStatus::Template
        } else {
            self.status_of(target.as_ref(), declared)
        };
        self.out.references.push(Reference {
            source: owner.cloned(),
            file: self.file.to_string(),
            field_path: pointer.to_string(),
            field: field.to_string(),
            declared,
            raw: raw.to_string(),
            target,
            signal,
            in_template: template,
            status,
        });
    }

    fn status_of(&self, target: Option<&EntityId>, declared: Option<EntityType>) -> ReferenceStatus {
        let target = match (target, declared) {
            (Some(target), _) => target,
            (None, Some(expected)) => return ReferenceStatus::NotAnId { expected },
            (None, None) => return ReferenceStatus::Unclassified,
        };
        if let Some(expected) = declared {
            if target.entity_type() != expected {
                return ReferenceStatus::TypeMismatch { expected };
            }
        }
        if self.registry.resolves(target) {
            ReferenceStatus::Resolved
        } else if self.registry.definitions(target).is_empty() {
            ReferenceStatus::Missing
        } else {
            ReferenceStatus::TemplateOnly
        }
    }

    fn push_slot(&mut self, raw: &str, pointer: &str, field: &str, owner: Option<&EntityId>) {
        self.out.template_slots.push(TemplateSlot {
            owner: owner.cloned(),
            file: self.file.to_string(),
            field_path: pointer.to_string(),
            field: field.to_string(),
            raw: raw.to_string(),
        });
    }

    fn record_placeholders(
        &mut self,
        text: &str,
        pointer: &str,
        owner: Option<&EntityId>,
        template: bool,
    ) {
        for (token, well_formed) in placeholder_tokens(text) {
            self.out.placeholders.push(PlaceholderSite {
                owner: owner.cloned(),
                file: self.file.to_string(),
                field_path: pointer.to_string(),
                token,
                well_formed,
                in_template: template,
            });
        }
    }
}

/// Extracts `{{...}}` tokens from `text`.
///
/// Each token is paired with whether it is well formed: terminated and
/// naming a non-empty identifier of letters, digits, `_`, `.` or `-`.
pub fn placeholder_tokens(text: &str) -> Vec<(String, bool)> {
    let mut tokens = Vec::new();
    let mut remaining = text;

    while let Some(start) = remaining.find("{{") {
        remaining = &remaining[start..];
        match remaining[2..].find("}}") {
            Some(end) => {
                let token = &remaining[..end + 4];
                let name = token[2..token.len() - 2].trim();
                let well_formed = !name.is_empty()
                    && name
                        .chars()
                        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '-'));
                tokens.push((token.to_string(), well_formed));
                remaining = &remaining[end + 4..];
            }
            None => {
                tokens.push((remaining.to_string(), false));
                break;
            }
        }
    }

    tokens
}

/// Returns true if `value` is exactly one well-formed placeholder.
pub fn is_full_placeholder(value: &str) -> bool {
    let value = value.trim();
    match placeholder_tokens(value).as_slice() {
        [(token, true)] => token == value,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IntakeConfig;
    use crate::registry;
    use serde_json::json;

    fn doc(relative: &str, value: Value) -> SourceDocument {
        let is_template = value.as_object().map(is_template_object).unwrap_or(false);
        SourceDocument {
            relative: relative.to_string(),
            value,
            is_template,
        }
    }

    fn run(docs: &[SourceDocument]) -> Resolution {
        let (registry, _) = registry::build(docs, &IntakeConfig::default());
        resolve(docs, &registry, &ConventionMatcher::default())
    }

    fn find<'a>(resolution: &'a Resolution, raw: &str) -> &'a Reference {
        resolution
            .references
            .iter()
            .find(|r| r.raw == raw)
            .expect("reference present")
    }

    #[test]
    fn classifies_keys_by_convention() {
        let matcher = ConventionMatcher::default();
        assert_eq!(
            matcher.classify_key("faction_id"),
            KeyClass::Reference {
                declared: Some(EntityType::Faction)
            }
        );
        assert_eq!(
            matcher.classify_key("target_sector_ids"),
            KeyClass::Reference {
                declared: Some(EntityType::Sector)
            }
        );
        assert_eq!(
            matcher.classify_key("leader_id"),
            KeyClass::Reference { declared: None }
        );
        assert_eq!(
            matcher.classify_key("allies"),
            KeyClass::Container {
                declared: Some(EntityType::Faction)
            }
        );
        assert_eq!(matcher.classify_key("name"), KeyClass::Plain);
        assert_eq!(matcher.classify_key("_id"), KeyClass::Plain);
    }

    #[test]
    fn pattern_matching_requires_padded_ids() {
        let matcher = ConventionMatcher::default();
        assert!(matcher.match_id("f01").is_some());
        assert!(matcher.match_id("e5").is_none());
        assert!(matcher.match_id("the f01 faction").is_none());
    }

    #[test]
    fn resolves_relations_and_records_edges() {
        let docs = vec![
            doc("f01.json", json!({"id": "f01", "relations": {"f02": -1, "f99": 1}})),
            doc("f02.json", json!({"id": "f02", "relations": {"f01": 1}})),
        ];
        let resolution = run(&docs);

        assert_eq!(find(&resolution, "f02").status, ReferenceStatus::Resolved);
        let missing = find(&resolution, "f99");
        assert_eq!(missing.status, ReferenceStatus::Missing);
        assert_eq!(missing.source.as_ref().map(EntityId::as_str), Some("f01"));
        assert_eq!(missing.field_path, "/relations/f99");
        assert_eq!(resolution.relations.len(), 3);
    }

    #[test]
    fn explicit_fields_beat_pattern_confidence() {
        let docs = vec![doc(
            "a01.json",
            json!({"id": "a01", "faction_id": "Rote Hand", "leader_id": "somebody", "home": "l07"}),
        )];
        let resolution = run(&docs);

        assert_eq!(
            find(&resolution, "Rote Hand").status,
            ReferenceStatus::NotAnId {
                expected: EntityType::Faction
            }
        );
        assert_eq!(find(&resolution, "somebody").status, ReferenceStatus::Unclassified);
        let pattern = find(&resolution, "l07");
        assert_eq!(pattern.signal, Signal::Pattern);
        assert_eq!(pattern.status, ReferenceStatus::Missing);
    }

    #[test]
    fn detects_type_mismatch_and_template_only_targets() {
        let docs = vec![
            doc("a01.json", json!({"id": "a01", "faction_id": "a01", "mission_id": "m03"})),
            doc("tpl.json", json!({"id": "m03", "is_template": true})),
        ];
        let resolution = run(&docs);
        assert_eq!(
            find(&resolution, "a01").status,
            ReferenceStatus::TypeMismatch {
                expected: EntityType::Faction
            }
        );
        let template_only = resolution
            .references
            .iter()
            .find(|r| r.raw == "m03" && !r.in_template)
            .expect("m03 reference");
        assert_eq!(template_only.status, ReferenceStatus::TemplateOnly);
    }

    #[test]
    fn templates_are_checked_for_slots_not_resolved() {
        let docs = vec![doc(
            "templates/faction.json",
            json!({
                "is_template": true,
                "id": "{{faction_id}}",
                "relations": {"{{other}}": 0},
                "allies": ["f0{{n}}"],
                "leader_id": "f77"
            }),
        )];
        let resolution = run(&docs);

        assert!(resolution
            .references
            .iter()
            .all(|r| r.in_template && r.status == ReferenceStatus::Template));
        let slots: Vec<_> = resolution.template_slots.iter().map(|s| s.raw.as_str()).collect();
        assert_eq!(slots, vec!["f0{{n}}"]);
        assert!(resolution.placeholders.iter().all(|p| p.in_template));
    }

    #[test]
    fn container_grouping_keys_are_not_references() {
        let docs = vec![doc(
            "f01.json",
            json!({"id": "f01", "territory": {"core": ["s01"], "contested": ["s02"]}}),
        )];
        let resolution = run(&docs);
        let raws: Vec<_> = resolution.references.iter().map(|r| r.raw.as_str()).collect();
        assert_eq!(raws, vec!["s02", "s01"]);
        assert!(resolution
            .references
            .iter()
            .all(|r| r.declared == Some(EntityType::Sector) && r.field == "territory"));
    }

    #[test]
    fn nested_entities_own_their_references() {
        let docs = vec![doc(
            "world.json",
            json!({"factions": [{"id": "f01", "enemies": ["f02"]}, {"id": "f02", "enemies": ["f01"]}]}),
        )];
        let resolution = run(&docs);
        let owners: Vec<_> = resolution
            .references
            .iter()
            .map(|r| (r.source.as_ref().map(EntityId::as_str), r.raw.as_str()))
            .collect();
        assert_eq!(owners, vec![(Some("f01"), "f02"), (Some("f02"), "f01")]);
    }

    #[test]
    fn placeholder_tokens_flag_malformed_fragments() {
        assert_eq!(
            placeholder_tokens("Hello {{name}}, from {{ faction.name }}"),
            vec![
                ("{{name}}".to_string(), true),
                ("{{ faction.name }}".to_string(), true)
            ]
        );
        assert_eq!(placeholder_tokens("{{}}"), vec![("{{}}".to_string(), false)]);
        assert_eq!(
            placeholder_tokens("broken {{name"),
            vec![("{{name".to_string(), false)]
        );
        assert!(is_full_placeholder("{{faction_id}}"));
        assert!(!is_full_placeholder("f0{{n}}"));
    }
}
