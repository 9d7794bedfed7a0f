//! Run configuration: rule toggles, reference conventions and policies.
//!
//! Loaded from a TOML file or built from [`CheckConfig::default`]. Unknown keys
//! and unknown rule names are rejected at load time.

use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Deserializer};

use crate::entity::EntityType;
use crate::error::CheckError;
use crate::report::RuleId;

/// Complete configuration for one conformance run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckConfig {
    /// Repository walker options.
    pub walk: WalkConfig,
    /// Entity extraction options.
    pub intake: IntakeConfig,
    /// Rule toggles.
    pub rules: RulesConfig,
    /// Reference discovery conventions.
    pub references: ReferencesConfig,
    /// References allowed to stay unresolved.
    pub external: ExternalConfig,
    /// Numeric relation policies keyed by container field name.
    ///
    /// Tables given in a config file are merged over the defaults, so setting
    /// `[relations.trust]` keeps the `relations` policy in place.
    #[serde(deserialize_with = "merge_relation_policies")]
    pub relations: BTreeMap<String, RelationPolicy>,
    /// Fields in which an entity may not reference itself.
    pub self_reference: SelfReferenceConfig,
    /// File path fields checked for broken references.
    pub file_references: FileReferenceConfig,
    /// Markdown style advisories.
    pub style: StyleConfig,
    /// Documentation language advisories.
    pub language: LanguageConfig,
    /// Mechanics/lore pairing for factions.
    pub lore: LoreConfig,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            walk: WalkConfig::default(),
            intake: IntakeConfig::default(),
            rules: RulesConfig::default(),
            references: ReferencesConfig::default(),
            external: ExternalConfig::default(),
            relations: default_relation_policies(),
            self_reference: SelfReferenceConfig::default(),
            file_references: FileReferenceConfig::default(),
            style: StyleConfig::default(),
            language: LanguageConfig::default(),
            lore: LoreConfig::default(),
        }
    }
}

impl CheckConfig {
    /// Loads and prepares a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, names
    /// an unknown option, or carries an invalid external pattern.
    pub fn load(path: &Path) -> Result<Self, CheckError> {
        let text = std::fs::read_to_string(path).map_err(|source| CheckError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: CheckConfig =
            toml::from_str(&text).map_err(|source| CheckError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        config.prepare()
    }

    /// Compiles the external reference patterns.
    ///
    /// # Errors
    ///
    /// Returns an error if any pattern is not a valid regular expression.
    pub fn prepare(mut self) -> Result<Self, CheckError> {
        self.external.compiled = self
            .external
            .patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| CheckError::Pattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<_, _>>()?;
        Ok(self)
    }

    /// Returns true unless the rule is listed in `rules.disabled`.
    pub fn is_enabled(&self, rule: RuleId) -> bool {
        !self.rules.disabled.contains(&rule)
    }

    /// Returns the relation policy for a container field, if any.
    pub fn relation_policy(&self, field: &str) -> Option<&RelationPolicy> {
        self.relations.get(field)
    }
}

/// Repository walker options.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WalkConfig {
    /// Directory names never descended into. Dot-directories are always skipped.
    pub excluded_dirs: Vec<String>,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            excluded_dirs: [
                ".git",
                ".github",
                "__pycache__",
                ".pytest_cache",
                "node_modules",
                ".venv",
                "venv",
                "env",
                ".idea",
                ".vscode",
                "target",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Entity extraction options.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntakeConfig {
    /// Treat nested objects with a recognizable `id` as entities too.
    pub nested_entities: bool,
    /// File names (or root-relative paths) of documents expected to carry no id.
    pub free_form_files: Vec<String>,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            nested_entities: true,
            free_form_files: vec![
                "master_index.json".to_string(),
                "index.json".to_string(),
                "loading_config.json".to_string(),
            ],
        }
    }
}

impl IntakeConfig {
    /// Returns true if the document at `relative` is expected to lack an id.
    pub fn is_free_form(&self, relative: &str) -> bool {
        let name = relative.rsplit('/').next().unwrap_or(relative);
        self.free_form_files
            .iter()
            .any(|entry| entry == relative || entry == name)
    }
}

/// Rule toggles.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RulesConfig {
    /// Rules that are not evaluated.
    pub disabled: Vec<RuleId>,
}

/// Reference discovery conventions.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReferencesConfig {
    /// Minimum suffix digits for a bare string to be taken as an id.
    pub min_pattern_digits: usize,
    /// Relation container field names and their target types.
    pub containers: Vec<ContainerSpec>,
}

impl Default for ReferencesConfig {
    fn default() -> Self {
        let container = |name: &str, target: Option<EntityType>| ContainerSpec {
            name: name.to_string(),
            target,
        };
        Self {
            min_pattern_digits: 2,
            containers: vec![
                container("relations", Some(EntityType::Faction)),
                container("trust", Some(EntityType::Faction)),
                container("allies", Some(EntityType::Faction)),
                container("enemies", Some(EntityType::Faction)),
                container("rivals", Some(EntityType::Faction)),
                container("territory", Some(EntityType::Sector)),
                container("members", Some(EntityType::Actor)),
            ],
        }
    }
}

/// A relation container field.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContainerSpec {
    /// Field name, e.g. `relations`.
    pub name: String,
    /// Declared target type; omitted means "inferred from each value".
    #[serde(default)]
    pub target: Option<EntityType>,
}

/// References that may stay unresolved.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExternalConfig {
    /// Regular expressions matched against the raw reference value.
    pub patterns: Vec<String>,
    /// Fields whose non-id values are free text (e.g. territory codes).
    pub fields: Vec<String>,
    #[serde(skip)]
    compiled: Vec<Regex>,
}

impl ExternalConfig {
    /// Returns true if a reference may stay unresolved.
    ///
    /// Free-text fields only excuse values that are not ids themselves; an id
    /// under such a field must still resolve.
    pub fn is_external(&self, field: &str, raw: &str, parses_as_id: bool) -> bool {
        if self.compiled.iter().any(|re| re.is_match(raw)) {
            return true;
        }
        !parses_as_id && self.fields.iter().any(|f| f == field)
    }
}

/// Symmetry policy for reciprocal numeric relations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Symmetry {
    /// `A -> B` must equal `B -> A`.
    Exact,
    /// Both directions must agree in sign (allied, neutral, hostile).
    Sign,
    /// Asymmetry is allowed.
    None,
}

fn default_relation_policies() -> BTreeMap<String, RelationPolicy> {
    let mut relations = BTreeMap::new();
    relations.insert("relations".to_string(), RelationPolicy::default());
    relations.insert(
        "trust".to_string(),
        RelationPolicy {
            symmetry: Symmetry::None,
            ..RelationPolicy::default()
        },
    );
    relations
}

fn merge_relation_policies<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, RelationPolicy>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut policies = default_relation_policies();
    policies.extend(BTreeMap::<String, RelationPolicy>::deserialize(deserializer)?);
    Ok(policies)
}

/// Policy for one numeric relation field.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelationPolicy {
    /// Reciprocity requirement.
    pub symmetry: Symmetry,
    /// Smallest permitted value.
    pub min: f64,
    /// Largest permitted value.
    pub max: f64,
}

impl Default for RelationPolicy {
    fn default() -> Self {
        Self {
            symmetry: Symmetry::Exact,
            min: -2.0,
            max: 2.0,
        }
    }
}

/// Fields in which self references are forbidden.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SelfReferenceConfig {
    /// Field names, e.g. `enemies`.
    pub forbidden_fields: Vec<String>,
}

impl Default for SelfReferenceConfig {
    fn default() -> Self {
        Self {
            forbidden_fields: vec![
                "enemies".to_string(),
                "rivals".to_string(),
                "relations".to_string(),
            ],
        }
    }
}

/// File path fields checked for broken references.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileReferenceConfig {
    /// JSON keys whose string values (or arrays of strings) may be file paths.
    pub fields: Vec<String>,
    /// Extensions that mark a value as a path even without a `/`.
    pub extensions: Vec<String>,
    /// Root-relative path of the master index describing area status.
    pub master_index: String,
}

impl Default for FileReferenceConfig {
    fn default() -> Self {
        Self {
            fields: [
                "index", "file", "path", "dir", "icon", "image", "script", "modules",
            ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            extensions: [".json", ".md", ".py", ".txt", ".png", ".jpg"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            master_index: "master_index.json".to_string(),
        }
    }
}

/// Markdown style advisories.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StyleConfig {
    /// Longest line (in characters) before a finding is raised.
    pub max_line_length: usize,
    /// Accept exactly two trailing spaces as a Markdown hard line break.
    pub allow_hard_breaks: bool,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            max_line_length: 120,
            allow_hard_breaks: true,
        }
    }
}

/// Documentation language advisories.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LanguageConfig {
    /// Root-relative Markdown files that must carry English sections.
    pub files: Vec<String>,
    /// Terms whose presence marks English technical documentation.
    pub english_terms: Vec<String>,
    /// Files shorter than this many characters are not checked.
    pub min_length: usize,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            files: vec!["README.md".to_string()],
            english_terms: [
                "install",
                "usage",
                "setup",
                "requirements",
                "getting started",
                "installation",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            min_length: 100,
        }
    }
}

/// Locations of the faction mechanics and lore collections.
///
/// Every faction keyed under `factions` in the mechanics file should have a
/// lore module (an entry of `lore_modules` carrying its `faction_id`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoreConfig {
    /// Root-relative path of the mechanics collection.
    pub mechanics: String,
    /// Root-relative path of the lore collection.
    pub lore: String,
}

impl Default for LoreConfig {
    fn default() -> Self {
        Self {
            mechanics: "data/mechanics/factions_core.json".to_string(),
            lore: "data/lore/factions_narrative.json".to_string(),
        }
    }
}
