//! Fixture corpus for the end-to-end tests.
//!
//! [`BASELINE`] is a small, fully consistent content repository: every
//! reference resolves, relations are reciprocal and the only template uses
//! well-formed placeholders. Tests copy it into a scratch directory and then
//! introduce exactly one defect.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

/// Files of the consistent baseline corpus, as `(relative path, contents)`.
pub const BASELINE: &[(&str, &str)] = &[
    (
        "README.md",
        "# Emberfall\n\
         \n\
         Lore, factions and missions for the Emberfall campaign.\n\
         \n\
         ## Usage\n\
         \n\
         Edit the JSON files under `factions/`, `actors/` and `missions/`, then run\n\
         the rule checker. See [the style guide](docs/style.md) for conventions.\n",
    ),
    (
        "docs/style.md",
        "# Style guide\n\
         \n\
         Every entity lives in its own file and carries a prefixed `id`.\n\
         Back to the [overview](../README.md).\n",
    ),
    (
        "master_index.json",
        r#"{
  "areas": [
    {"key": "factions", "dir": "factions/", "status": "active"},
    {"key": "missions", "dir": "missions/", "status": "active"}
  ]
}"#,
    ),
    (
        "factions/f01.json",
        r#"{
  "id": "f01",
  "name": "Iron Pact",
  "leader_id": "a01",
  "relations": {"f02": -1}
}"#,
    ),
    (
        "factions/f02.json",
        r#"{
  "id": "f02",
  "name": "Ash Court",
  "relations": {"f01": -1}
}"#,
    ),
    (
        "actors/a01.json",
        r#"{
  "id": "a01",
  "name": "Mara Voss",
  "faction_id": "f01"
}"#,
    ),
    (
        "locations/l01.json",
        r#"{
  "id": "l01",
  "name": "Greywater"
}"#,
    ),
    (
        "missions/m01.json",
        r#"{
  "id": "m01",
  "title": "The Ember Road",
  "faction_id": "f02",
  "location_id": "l01"
}"#,
    ),
    (
        "templates/faction_template.json",
        r#"{
  "is_template": true,
  "id": "{{faction_id}}",
  "name": "{{faction_name}}",
  "leader_id": "{{leader_id}}",
  "relations": {"{{rival_id}}": 0}
}"#,
    ),
];

/// Creates a fresh scratch directory holding the baseline corpus.
pub fn baseline(name: &str) -> PathBuf {
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let root = std::env::temp_dir().join(format!(
        "lorekeeper_corpus_{name}_{}_{nonce}",
        std::process::id()
    ));
    for (relative, contents) in BASELINE {
        write(&root, relative, contents);
    }
    root
}

/// Writes (or replaces) one file under `root`.
pub fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create fixture dir");
    }
    std::fs::write(path, contents).expect("write fixture file");
}
