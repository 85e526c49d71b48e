//! Parsing of the halfon `units_buildings_techs` JSON data file.

use std::{collections::HashMap, fs, path::Path};

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::models::ObjectId;

use super::{CatalogEntry, CatalogGroup, Cost, GameCatalog};

impl GameCatalog {
    /// Load a halfon `units_buildings_techs` JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("loading game catalog from {}", path.display());
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog {}", path.display()))?;
        let catalog = Self::from_json_str(&content)
            .with_context(|| format!("failed to parse catalog {}", path.display()))?;
        if catalog.is_empty() {
            bail!("catalog {} has no entries", path.display());
        }
        info!(
            "catalog has {} units/buildings and {} technologies",
            catalog.len(CatalogGroup::UnitsBuildings),
            catalog.len(CatalogGroup::Techs)
        );
        Ok(catalog)
    }

    /// Parse catalog JSON already held in memory.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let raw: RawCatalog = serde_json::from_str(content)?;
        Ok(Self::new(
            build_group(CatalogGroup::UnitsBuildings, raw.units_buildings)?,
            build_group(CatalogGroup::Techs, raw.techs)?,
        ))
    }
}

fn build_group(
    group: CatalogGroup,
    raw: HashMap<String, RawEntry>,
) -> Result<HashMap<ObjectId, CatalogEntry>> {
    raw.into_iter()
        .map(|(key, entry)| {
            let id = key
                .trim()
                .parse::<ObjectId>()
                .map_err(|_| anyhow!("invalid {group} id '{key}'"))?;
            Ok((id, entry.into_entry()))
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct RawCatalog {
    units_buildings: HashMap<String, RawEntry>,
    techs: HashMap<String, RawEntry>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default)]
    cost: HashMap<String, u32>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    localised_name: Option<String>,
}

impl RawEntry {
    fn into_entry(self) -> CatalogEntry {
        let amount = |resource: &str| self.cost.get(resource).copied().unwrap_or(0);
        let cost = Cost {
            wood: amount("wood"),
            food: amount("food"),
            gold: amount("gold"),
            stone: amount("stone"),
        };
        CatalogEntry {
            cost,
            name: self.name.unwrap_or_default(),
            localised_name: self.localised_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn sample() -> serde_json::Value {
        json!({
            "units_buildings": {
                "83": { "cost": { "food": 50 }, "name": "VMBAS", "localised_name": "Villager" },
                "12": { "cost": { "wood": 175 }, "name": "Barracks" }
            },
            "techs": {
                "15": {
                    "cost": { "food": 200, "gold": 300 },
                    "name": "Guilds",
                    "localised_name": ""
                },
                "101": { "cost": { "food": 500 }, "name": "Feudal Age", "age": 1 }
            }
        })
    }

    #[test]
    fn loads_catalog_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("units_buildings_techs.de.json");
        fs::write(&path, serde_json::to_string(&sample())?)?;

        let catalog = GameCatalog::load(&path)?;
        assert_eq!(catalog.len(CatalogGroup::UnitsBuildings), 2);
        assert_eq!(catalog.len(CatalogGroup::Techs), 2);

        let villager = catalog.unit_or_building(83)?;
        assert_eq!(villager.display_name(), "Villager");
        assert_eq!(villager.cost.food, 50);

        let guilds = catalog.tech(15)?;
        assert_eq!(guilds.display_name(), "Guilds");
        assert_eq!(guilds.cost.gold, 300);
        assert_eq!(guilds.cost.wood, 0);
        Ok(())
    }

    #[test]
    fn rejects_non_numeric_ids() {
        let content = r#"{"units_buildings": {"x1": {"cost": {}}}, "techs": {}}"#;
        let err = GameCatalog::from_json_str(content).expect_err("expected failure");
        assert!(err.to_string().contains("x1"));
    }

    #[test]
    fn empty_catalog_file_is_rejected() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("empty.json");
        fs::write(&path, r#"{"units_buildings": {}, "techs": {}}"#)?;

        let err = GameCatalog::load(&path).expect_err("nothing to resolve against");
        assert!(err.to_string().contains("no entries"), "{err}");
        Ok(())
    }

    #[test]
    fn missing_group_is_an_error() {
        assert!(GameCatalog::from_json_str(r#"{"techs": {}}"#).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempdir().expect("tempdir");
        assert!(GameCatalog::load(dir.path().join("absent.json")).is_err());
    }
}
