//! Static cost catalog for units, buildings and technologies.

pub mod loader;

use std::{collections::HashMap, fmt};

use serde::{Deserialize, Serialize};

use crate::models::{Expense, ObjectId};

/// The two independent id spaces of the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CatalogGroup {
    /// Buildable buildings and trainable units.
    UnitsBuildings,
    /// Researchable technologies.
    Techs,
}

impl fmt::Display for CatalogGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CatalogGroup::UnitsBuildings => "units_buildings",
            CatalogGroup::Techs => "techs",
        })
    }
}

/// Cost of one catalog object, in whole resource units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cost {
    /// Wood.
    pub wood: u32,
    /// Food.
    pub food: u32,
    /// Gold.
    pub gold: u32,
    /// Stone.
    pub stone: u32,
}

impl Cost {
    /// Expense of `amount` copies of this object.
    pub fn to_expense(self, amount: u32) -> Expense {
        let factor = f64::from(amount);
        Expense::new(
            f64::from(self.wood) * factor,
            f64::from(self.food) * factor,
            f64::from(self.gold) * factor,
            f64::from(self.stone) * factor,
        )
    }
}

/// A single catalog object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Price of one copy.
    pub cost: Cost,
    /// Internal name.
    pub name: String,
    /// English display name, when the catalog provides one.
    pub localised_name: Option<String>,
}

impl CatalogEntry {
    /// Name shown to users: the localised name unless it is missing or empty.
    pub fn display_name(&self) -> &str {
        match self.localised_name.as_deref() {
            Some(localised) if !localised.is_empty() => localised,
            _ => &self.name,
        }
    }
}

/// Lookup miss in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no {group} entry with id {id} in the catalog")]
pub struct CatalogError {
    /// Id space that was searched.
    pub group: CatalogGroup,
    /// Id that was not found.
    pub id: ObjectId,
}

/// Immutable id → entry lookup, built once per process.
#[derive(Debug, Clone, Default)]
pub struct GameCatalog {
    units_buildings: HashMap<ObjectId, CatalogEntry>,
    techs: HashMap<ObjectId, CatalogEntry>,
}

impl GameCatalog {
    /// Build a catalog from already parsed groups.
    pub fn new(
        units_buildings: HashMap<ObjectId, CatalogEntry>,
        techs: HashMap<ObjectId, CatalogEntry>,
    ) -> Self {
        Self {
            units_buildings,
            techs,
        }
    }

    /// Entry `id` of `group`.
    pub fn get(&self, group: CatalogGroup, id: ObjectId) -> Result<&CatalogEntry, CatalogError> {
        let entries = match group {
            CatalogGroup::UnitsBuildings => &self.units_buildings,
            CatalogGroup::Techs => &self.techs,
        };
        entries.get(&id).ok_or(CatalogError { group, id })
    }

    /// Building or unit `id`.
    pub fn unit_or_building(&self, id: ObjectId) -> Result<&CatalogEntry, CatalogError> {
        self.get(CatalogGroup::UnitsBuildings, id)
    }

    /// Technology `id`.
    pub fn tech(&self, id: ObjectId) -> Result<&CatalogEntry, CatalogError> {
        self.get(CatalogGroup::Techs, id)
    }

    /// Number of entries in `group`.
    pub fn len(&self, group: CatalogGroup) -> usize {
        match group {
            CatalogGroup::UnitsBuildings => self.units_buildings.len(),
            CatalogGroup::Techs => self.techs.len(),
        }
    }

    /// Whether neither group has any entry.
    pub fn is_empty(&self) -> bool {
        self.units_buildings.is_empty() && self.techs.is_empty()
    }
}
