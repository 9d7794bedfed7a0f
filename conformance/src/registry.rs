//! Entity registry builder.
//!
//! Parses candidate files into documents and extracts every entity they
//! define. Colliding definitions are all retained so the uniqueness rule can
//! report each file involved.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::config::IntakeConfig;
use crate::entity::{EntityId, EntityType};
use crate::report::{Finding, RuleId};
use crate::walker::{FileKind, ScannedFile};

/// A parsed JSON document.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Path relative to the content root.
    pub relative: String,
    /// Parsed value tree.
    pub value: Value,
    /// True if the document root carries `"is_template": true`.
    pub is_template: bool,
}

/// A Markdown document kept for style and link rules.
#[derive(Debug, Clone)]
pub struct MarkdownDocument {
    /// Path relative to the content root.
    pub relative: String,
    /// File contents.
    pub text: String,
}

/// A successfully read candidate file.
#[derive(Debug, Clone)]
pub enum ParsedFile {
    /// JSON data file.
    Json(SourceDocument),
    /// Markdown file.
    Markdown(MarkdownDocument),
}

/// Reads and parses one candidate file.
///
/// # Errors
///
/// Returns the finding describing why the file was excluded: an
/// `unreadable_file` finding for IO errors and non-UTF-8 Markdown, a
/// `malformed_json` finding for JSON syntax or encoding errors.
pub fn parse_file(file: &ScannedFile) -> Result<ParsedFile, Finding> {
    let unreadable = |reason: String| {
        Finding::medium(
            RuleId::UnreadableFile,
            &file.relative,
            format!("cannot read {}: {}", file.relative, reason),
        )
    };
    let bytes = std::fs::read(&file.path).map_err(|e| unreadable(e.to_string()))?;

    match file.kind {
        FileKind::Markdown => {
            let text = String::from_utf8(bytes).map_err(|e| unreadable(e.to_string()))?;
            Ok(ParsedFile::Markdown(MarkdownDocument {
                relative: file.relative.clone(),
                text,
            }))
        }
        _ => {
            // JSON is UTF-8 by definition; an encoding error is a parse error.
            let value: Value = serde_json::from_slice(&bytes).map_err(|e| {
                Finding::high(
                    RuleId::MalformedJson,
                    &file.relative,
                    format!(
                        "invalid JSON at line {}, column {}: {}",
                        e.line(),
                        e.column(),
                        e
                    ),
                )
            })?;
            let is_template = value.as_object().map(is_template_object).unwrap_or(false);
            Ok(ParsedFile::Json(SourceDocument {
                relative: file.relative.clone(),
                value,
                is_template,
            }))
        }
    }
}

/// Returns true if the object carries `"is_template": true`.
pub fn is_template_object(map: &Map<String, Value>) -> bool {
    map.get("is_template").and_then(Value::as_bool) == Some(true)
}

/// Returns the entity id an object defines, if its `id` is recognizable.
pub fn declared_id(map: &Map<String, Value>) -> Option<EntityId> {
    map.get("id").and_then(Value::as_str).and_then(EntityId::parse)
}

/// Appends an escaped token to a JSON pointer.
pub fn pointer_child(base: &str, token: &str) -> String {
    format!("{}/{}", base, token.replace('~', "~0").replace('/', "~1"))
}

/// One entity definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// The entity's id.
    pub id: EntityId,
    /// File defining the entity, relative to the content root.
    pub source_path: String,
    /// JSON pointer of the defining object (empty for the document root).
    pub pointer: String,
    /// True for template definitions.
    pub is_template: bool,
    /// The defining object.
    pub fields: Value,
}

impl Entity {
    /// Type selected by the id prefix.
    pub fn entity_type(&self) -> EntityType {
        self.id.entity_type()
    }
}

/// All entity definitions, grouped by type and id.
#[derive(Debug, Default)]
pub struct Registry {
    entries: BTreeMap<EntityType, BTreeMap<String, Vec<Entity>>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a definition, keeping any earlier ones for the same id.
    pub fn insert(&mut self, entity: Entity) {
        self.entries
            .entry(entity.entity_type())
            .or_default()
            .entry(entity.id.as_str().to_string())
            .or_default()
            .push(entity);
    }

    /// Returns every definition of `id`, templates included.
    pub fn definitions(&self, id: &EntityId) -> &[Entity] {
        self.entries
            .get(&id.entity_type())
            .and_then(|ids| ids.get(id.as_str()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns true if `id` has at least one non-template definition.
    pub fn resolves(&self, id: &EntityId) -> bool {
        self.definitions(id).iter().any(|e| !e.is_template)
    }

    /// Iterates over ids with more than one non-template definition, yielding
    /// the production definitions of each.
    pub fn duplicates(&self) -> impl Iterator<Item = Vec<&Entity>> + '_ {
        self.entries
            .values()
            .flat_map(|ids| ids.values())
            .map(|defs| defs.iter().filter(|e| !e.is_template).collect::<Vec<_>>())
            .filter(|defs| defs.len() > 1)
    }

    /// Iterates over every definition in type, id, file order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entries
            .values()
            .flat_map(|ids| ids.values())
            .flat_map(|defs| defs.iter())
    }

    /// Distinct non-template ids per entity type name.
    pub fn counts(&self) -> BTreeMap<String, usize> {
        self.entries
            .iter()
            .map(|(ty, ids)| {
                let n = ids
                    .values()
                    .filter(|defs| defs.iter().any(|e| !e.is_template))
                    .count();
                (ty.name().to_string(), n)
            })
            .filter(|(_, n)| *n > 0)
            .collect()
    }

    fn sort(&mut self) {
        for defs in self.entries.values_mut().flat_map(|ids| ids.values_mut()) {
            defs.sort_by(|a, b| {
                (a.source_path.as_str(), a.pointer.as_str())
                    .cmp(&(b.source_path.as_str(), b.pointer.as_str()))
            });
        }
    }
}

/// Builds the registry from parsed documents.
///
/// Returns the registry together with `missing_id` findings for documents
/// that define no entity. The result does not depend on document order.
pub fn build(documents: &[SourceDocument], config: &IntakeConfig) -> (Registry, Vec<Finding>) {
    let mut registry = Registry::new();
    let mut findings = Vec::new();

    for doc in documents {
        let mut found = Vec::new();
        collect_entities(
            &doc.value,
            "",
            doc.is_template,
            config.nested_entities,
            true,
            doc,
            &mut found,
        );

        if found.is_empty() && !doc.is_template {
            if let Some(finding) = missing_id_finding(doc, config) {
                findings.push(finding);
            }
        }
        for entity in found {
            registry.insert(entity);
        }
    }

    registry.sort();
    tracing::debug!(
        entities = registry.entities().count(),
        "entity registry built"
    );
    (registry, findings)
}

fn collect_entities(
    value: &Value,
    pointer: &str,
    template: bool,
    nested: bool,
    is_root: bool,
    doc: &SourceDocument,
    out: &mut Vec<Entity>,
) {
    match value {
        Value::Object(map) => {
            let template = template || is_template_object(map);
            if let Some(id) = declared_id(map) {
                out.push(Entity {
                    id,
                    source_path: doc.relative.clone(),
                    pointer: pointer.to_string(),
                    is_template: template,
                    fields: value.clone(),
                });
            }
            if nested {
                for (key, child) in map {
                    let child_pointer = pointer_child(pointer, key);
                    collect_entities(child, &child_pointer, template, nested, false, doc, out);
                }
            }
        }
        Value::Array(items) if nested || is_root => {
            for (index, item) in items.iter().enumerate() {
                let child_pointer = pointer_child(pointer, &index.to_string());
                collect_entities(item, &child_pointer, template, nested, false, doc, out);
            }
        }
        _ => {}
    }
}

fn missing_id_finding(doc: &SourceDocument, config: &IntakeConfig) -> Option<Finding> {
    let raw_id = doc.value.as_object().and_then(|map| map.get("id"));
    let message = match raw_id {
        Some(Value::String(s)) if s.contains("{{") => return None,
        Some(Value::String(s)) => format!("id '{}' does not match any entity prefix", s),
        Some(other) => format!("id {} is not a string", other),
        None if config.is_free_form(&doc.relative) => return None,
        None => "document defines no entity id".to_string(),
    };
    Some(Finding::low(RuleId::MissingId, &doc.relative, message))
}
