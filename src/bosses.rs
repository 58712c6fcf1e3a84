use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::api::WclClient;
use crate::error::{Error, Result};

// Shipped encounter list; a bosses.json next to the binary overrides it.
const DEFAULT_REGISTRY: &str = include_str!("../default_bosses.json");
const REGISTRY_FILE: &str = "bosses.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BossEntry {
    pub id: u32,
    #[serde(default)]
    pub abilities: Vec<u64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BossRegistry {
    #[serde(default)]
    pub bosses: BTreeMap<String, BossEntry>,
    /// Ability id (stringified, as stored in JSON) to display label.
    #[serde(default)]
    pub ability_names: BTreeMap<String, String>,
}

impl BossRegistry {
    /// Case-insensitive boss lookup; returns the canonical name and entry.
    pub fn find_boss(&self, name: &str) -> Option<(&str, &BossEntry)> {
        let wanted = name.to_lowercase();
        self.bosses
            .iter()
            .find(|(known, _)| known.to_lowercase() == wanted)
            .map(|(known, entry)| (known.as_str(), entry))
    }

    pub fn ability_name(&self, ability_id: u64) -> Option<&str> {
        self.ability_names
            .get(&ability_id.to_string())
            .map(String::as_str)
    }
}

/// Load the registry from an explicit path, a bosses.json in the working
/// directory, or the built-in list, in that order.
pub fn load_registry(path: Option<&Path>) -> Result<BossRegistry> {
    if let Some(path) = path {
        info!(action = "load", component = "boss_registry", path = ?path, "Loading boss registry from file");
        if !path.exists() {
            return Err(Error::InvalidArgument(format!(
                "boss registry not found: {}",
                path.display()
            )));
        }
        let content = fs::read_to_string(path)?;
        return parse_registry(&content);
    }

    let default_file = Path::new(REGISTRY_FILE);
    if default_file.exists() {
        info!(
            action = "load",
            component = "boss_registry",
            "Loading boss registry from bosses.json"
        );
        let content = fs::read_to_string(default_file)?;
        return parse_registry(&content);
    }

    info!(
        action = "load",
        component = "boss_registry",
        "Using built-in boss registry"
    );
    parse_registry(DEFAULT_REGISTRY)
}

fn parse_registry(content: &str) -> Result<BossRegistry> {
    serde_json::from_str(content)
        .map_err(|e| Error::InvalidArgument(format!("boss registry is not valid JSON: {e}")))
}

/// Write the built-in registry out as bosses.json for editing.
pub fn init_default_registry() -> Result<()> {
    let default_file = Path::new(REGISTRY_FILE);
    if default_file.exists() {
        return Err(Error::InvalidArgument(
            "bosses.json already exists; remove it first to reinitialize".to_string(),
        ));
    }

    fs::write(default_file, DEFAULT_REGISTRY)?;
    println!("Created {REGISTRY_FILE} with the built-in encounter list");
    Ok(())
}

const ABILITY_QUERY: &str = r#"
query ($id: Int!) {
  gameData {
    ability(id: $id) {
      id
      name
    }
  }
}
"#;

fn lookup_ability_name(client: &WclClient, ability_id: u64) -> Result<Option<String>> {
    let document = client.query(ABILITY_QUERY, json!({ "id": ability_id }))?;
    Ok(document
        .pointer("/data/gameData/ability/name")
        .and_then(Value::as_str)
        .map(str::to_string))
}

/// Display label for an ability: registry first, then the provider's game
/// data, then the raw id.
pub fn ability_label(client: &WclClient, registry: &BossRegistry, ability_id: u64) -> String {
    if let Some(name) = registry.ability_name(ability_id) {
        return name.to_string();
    }

    match lookup_ability_name(client, ability_id) {
        Ok(Some(name)) => name,
        Ok(None) => ability_id.to_string(),
        Err(e) => {
            warn!(
                action = "lookup",
                component = "boss_registry",
                ability_id,
                error = %e,
                "Ability name lookup failed"
            );
            ability_id.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_registry_parses() {
        let registry = parse_registry(DEFAULT_REGISTRY).unwrap();
        assert!(!registry.bosses.is_empty());

        let (name, entry) = registry.find_boss("Nexus-King Salhadaar").unwrap();
        assert_eq!(name, "Nexus-King Salhadaar");
        assert_eq!(entry.id, 3134);
        assert!(entry.abilities.contains(&1227472));
    }

    #[test]
    fn boss_lookup_is_case_insensitive() {
        let registry = parse_registry(DEFAULT_REGISTRY).unwrap();
        let (name, _) = registry.find_boss("fractillus").unwrap();
        assert_eq!(name, "Fractillus");
        assert!(registry.find_boss("No Such Boss").is_none());
    }

    #[test]
    fn ability_names_resolve_from_registry() {
        let registry = parse_registry(DEFAULT_REGISTRY).unwrap();
        assert_eq!(registry.ability_name(1227472), Some("Besiege"));
        assert_eq!(registry.ability_name(1), None);
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let registry = parse_registry(r#"{ "bosses": { "Solo": { "id": 1 } } }"#).unwrap();
        assert!(registry.ability_names.is_empty());
        let (_, entry) = registry.find_boss("Solo").unwrap();
        assert!(entry.abilities.is_empty());
    }

    #[test]
    fn invalid_json_is_rejected() {
        assert!(parse_registry("not json").is_err());
    }
}
