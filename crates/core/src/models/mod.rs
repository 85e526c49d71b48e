//! Shared domain models.

use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign},
};

use serde::{Deserialize, Serialize};

/// Player slot number as stored in the recording (1-based, 0 is Gaia).
pub type PlayerId = u8;

/// Catalog identifier of a unit, building or technology.
pub type ObjectId = u32;

/// Resource kinds, in the order the recording encodes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    /// Resource id 0.
    Wood,
    /// Resource id 1.
    Food,
    /// Resource id 2.
    Stone,
    /// Resource id 3, the market currency.
    Gold,
}

impl Resource {
    /// Map a recording resource id (`0=wood, 1=food, 2=stone, 3=gold`).
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Self::Wood),
            1 => Some(Self::Food),
            2 => Some(Self::Stone),
            3 => Some(Self::Gold),
            _ => None,
        }
    }

    /// Lowercase name, as used in catalog costs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Wood => "wood",
            Self::Food => "food",
            Self::Stone => "stone",
            Self::Gold => "gold",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Resources that can be traded at the market. Gold is the currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commodity {
    /// Wood.
    Wood,
    /// Food.
    Food,
    /// Stone.
    Stone,
}

impl Commodity {
    /// The resource this commodity is counted as.
    pub fn resource(self) -> Resource {
        match self {
            Self::Wood => Resource::Wood,
            Self::Food => Resource::Food,
            Self::Stone => Resource::Stone,
        }
    }
}

impl TryFrom<Resource> for Commodity {
    type Error = Resource;

    fn try_from(resource: Resource) -> Result<Self, Self::Error> {
        match resource {
            Resource::Wood => Ok(Self::Wood),
            Resource::Food => Ok(Self::Food),
            Resource::Stone => Ok(Self::Stone),
            Resource::Gold => Err(resource),
        }
    }
}

impl fmt::Display for Commodity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.resource().name())
    }
}

/// Resources spent by a single resolved action.
///
/// Amounts are never negative: resources or gold *gained* through the market
/// are not booked, only what was paid.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Expense {
    /// Wood spent.
    pub wood: f64,
    /// Food spent.
    pub food: f64,
    /// Gold spent, including gold paid at the market.
    pub gold: f64,
    /// Stone spent.
    pub stone: f64,
}

impl Expense {
    /// Nothing spent.
    pub const ZERO: Expense = Expense {
        wood: 0.0,
        food: 0.0,
        gold: 0.0,
        stone: 0.0,
    };

    /// Build an expense from its four components.
    pub fn new(wood: f64, food: f64, gold: f64, stone: f64) -> Self {
        Self {
            wood,
            food,
            gold,
            stone,
        }
    }

    /// Expense consisting of a single resource amount.
    pub fn of(resource: Resource, amount: f64) -> Self {
        let mut expense = Self::ZERO;
        *expense.get_mut(resource) = amount;
        expense
    }

    /// Mutable access to the amount spent of `resource`.
    pub fn get_mut(&mut self, resource: Resource) -> &mut f64 {
        match resource {
            Resource::Wood => &mut self.wood,
            Resource::Food => &mut self.food,
            Resource::Gold => &mut self.gold,
            Resource::Stone => &mut self.stone,
        }
    }

    /// Sum of all components, regardless of their market value.
    pub fn total(&self) -> f64 {
        self.wood + self.food + self.gold + self.stone
    }
}

impl Add for Expense {
    type Output = Expense;

    fn add(self, rhs: Expense) -> Expense {
        Expense {
            wood: self.wood + rhs.wood,
            food: self.food + rhs.food,
            gold: self.gold + rhs.gold,
            stone: self.stone + rhs.stone,
        }
    }
}

impl AddAssign for Expense {
    fn add_assign(&mut self, rhs: Expense) {
        *self = *self + rhs;
    }
}

impl Sum for Expense {
    fn sum<I: Iterator<Item = Expense>>(iter: I) -> Self {
        iter.fold(Expense::ZERO, Add::add)
    }
}

impl fmt::Display for Expense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Expense[wood={}, food={}, gold={}, stone={}]",
            self.wood, self.food, self.gold, self.stone
        )
    }
}

/// Snapshot of the fair market price of each tradable commodity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketPrices {
    /// Fair price of 100 wood, in gold.
    pub wood: f64,
    /// Fair price of 100 food, in gold.
    pub food: f64,
    /// Fair price of 100 stone, in gold.
    pub stone: f64,
}

impl MarketPrices {
    /// Fair price of `commodity`.
    pub fn get(&self, commodity: Commodity) -> f64 {
        match commodity {
            Commodity::Wood => self.wood,
            Commodity::Food => self.food,
            Commodity::Stone => self.stone,
        }
    }

    /// Mutable access to the fair price of `commodity`.
    pub fn get_mut(&mut self, commodity: Commodity) -> &mut f64 {
        match commodity {
            Commodity::Wood => &mut self.wood,
            Commodity::Food => &mut self.food,
            Commodity::Stone => &mut self.stone,
        }
    }
}
