//! Append-only ledger of resolved expenses and its TSV cache format.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::{
    models::{Expense, MarketPrices, ObjectId, PlayerId},
    operation::ActionKind,
};

/// Column names of the TSV export, in interchange order.
pub const TSV_COLUMNS: [&str; 12] = [
    "ts",
    "type",
    "player",
    "id",
    "wood",
    "food",
    "gold",
    "stone",
    "name",
    "wood_market",
    "food_market",
    "stone_market",
];

/// One resolved, timestamped expense.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerEntry {
    /// Match time in milliseconds.
    pub elapsed_ms: u64,
    /// Kind of the action that caused the expense.
    #[serde(serialize_with = "serialize_kind")]
    pub kind: ActionKind,
    /// Player who paid.
    pub player_id: PlayerId,
    /// Catalog id of the object, 0 for market trades.
    pub object_id: ObjectId,
    /// Resources spent.
    pub expense: Expense,
    /// Display name of the object or trade.
    pub name: String,
    /// Fair market prices right after the action.
    pub prices: MarketPrices,
}

fn serialize_kind<S>(kind: &ActionKind, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(kind.name())
}

impl LedgerEntry {
    /// Value of the expense in gold at the market prices of the moment.
    pub fn unified_value(&self) -> f64 {
        self.expense.food * (self.prices.food / 100.0)
            + self.expense.wood * (self.prices.wood / 100.0)
            + self.expense.gold
            + self.expense.stone * (self.prices.stone / 100.0)
    }

    fn to_tsv_row(&self) -> String {
        let name: String = self
            .name
            .chars()
            .map(|ch| if matches!(ch, '\t' | '\n' | '\r') { ' ' } else { ch })
            .collect();
        [
            self.elapsed_ms.to_string(),
            self.kind.name().to_string(),
            self.player_id.to_string(),
            self.object_id.to_string(),
            self.expense.wood.to_string(),
            self.expense.food.to_string(),
            self.expense.gold.to_string(),
            self.expense.stone.to_string(),
            name,
            self.prices.wood.to_string(),
            self.prices.food.to_string(),
            self.prices.stone.to_string(),
        ]
        .join("\t")
    }

    fn from_tsv_row(line: usize, row: &str) -> Result<Self, CacheError> {
        let fields: Vec<&str> = row.split('\t').collect();
        if fields.len() != TSV_COLUMNS.len() {
            return Err(CacheError::ColumnCount {
                line,
                expected: TSV_COLUMNS.len(),
                found: fields.len(),
            });
        }

        let kind = ActionKind::from_name(fields[1]).ok_or_else(|| CacheError::InvalidValue {
            line,
            column: TSV_COLUMNS[1],
            value: fields[1].to_string(),
        })?;

        Ok(Self {
            elapsed_ms: parse_field(line, &fields, 0)?,
            kind,
            player_id: parse_field(line, &fields, 2)?,
            object_id: parse_field(line, &fields, 3)?,
            expense: Expense::new(
                parse_field(line, &fields, 4)?,
                parse_field(line, &fields, 5)?,
                parse_field(line, &fields, 6)?,
                parse_field(line, &fields, 7)?,
            ),
            name: fields[8].to_string(),
            prices: MarketPrices {
                wood: parse_field(line, &fields, 9)?,
                food: parse_field(line, &fields, 10)?,
                stone: parse_field(line, &fields, 11)?,
            },
        })
    }
}

fn parse_field<T: std::str::FromStr>(
    line: usize,
    fields: &[&str],
    index: usize,
) -> Result<T, CacheError> {
    fields[index]
        .parse()
        .map_err(|_| CacheError::InvalidValue {
            line,
            column: TSV_COLUMNS[index],
            value: fields[index].to_string(),
        })
}

/// Problems found while reading a TSV ledger cache.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum CacheError {
    /// The file has no header row.
    #[error("ledger cache is empty")]
    MissingHeader,
    /// The header does not list the expected columns.
    #[error("unexpected ledger cache header '{found}'")]
    BadHeader {
        /// Header row as read.
        found: String,
    },
    /// A row has too few or too many fields.
    #[error("line {line}: expected {expected} columns, found {found}")]
    ColumnCount {
        /// 1-based line number.
        line: usize,
        /// Number of columns in the header.
        expected: usize,
        /// Number of fields in the row.
        found: usize,
    },
    /// A field could not be parsed.
    #[error("line {line}: invalid {column} value '{value}'")]
    InvalidValue {
        /// 1-based line number.
        line: usize,
        /// Header name of the field.
        column: &'static str,
        /// Raw field content.
        value: String,
    },
    /// Timestamps went backwards.
    #[error("line {line}: timestamp {elapsed_ms} is earlier than the previous row")]
    OutOfOrder {
        /// 1-based line number.
        line: usize,
        /// Timestamp of the offending row.
        elapsed_ms: u64,
    },
}

/// Ordered record of every expense of a recording.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry; callers guarantee non-decreasing timestamps.
    pub(crate) fn push(&mut self, entry: LedgerEntry) {
        debug_assert!(self
            .entries
            .last()
            .map_or(true, |last| last.elapsed_ms <= entry.elapsed_ms));
        self.entries.push(entry);
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Iterate over the entries, oldest first.
    pub fn iter(&self) -> std::slice::Iter<'_, LedgerEntry> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was spent.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries paid by `player_id`, in ledger order.
    pub fn for_player(&self, player_id: PlayerId) -> impl Iterator<Item = &LedgerEntry> {
        self.entries
            .iter()
            .filter(move |entry| entry.player_id == player_id)
    }

    /// Render the ledger as TSV, header first.
    pub fn to_tsv(&self) -> String {
        let mut out = TSV_COLUMNS.join("\t");
        out.push('\n');
        for entry in &self.entries {
            out.push_str(&entry.to_tsv_row());
            out.push('\n');
        }
        out
    }

    /// Parse a ledger previously produced by [`Ledger::to_tsv`].
    pub fn from_tsv(content: &str) -> Result<Self, CacheError> {
        let mut lines = content.lines().enumerate();
        let header = lines
            .next()
            .map(|(_, header)| header)
            .ok_or(CacheError::MissingHeader)?;
        if header.split('\t').ne(TSV_COLUMNS.iter().copied()) {
            return Err(CacheError::BadHeader {
                found: header.to_string(),
            });
        }

        let mut ledger = Ledger::new();
        for (index, row) in lines {
            if row.is_empty() {
                continue;
            }
            let line = index + 1;
            let entry = LedgerEntry::from_tsv_row(line, row)?;
            if let Some(last) = ledger.entries.last() {
                if entry.elapsed_ms < last.elapsed_ms {
                    return Err(CacheError::OutOfOrder {
                        line,
                        elapsed_ms: entry.elapsed_ms,
                    });
                }
            }
            ledger.push(entry);
        }
        Ok(ledger)
    }

    /// Write the TSV rendering to `path`, creating parent directories.
    pub fn write_tsv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        info!("writing {} ledger entries into {}", self.len(), path.display());
        fs::write(path, self.to_tsv())
            .with_context(|| format!("failed to write {}", path.display()))
    }

    /// Load a TSV ledger cache from `path`.
    pub fn read_tsv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let ledger = Self::from_tsv(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        info!("loaded {} ledger entries from {}", ledger.len(), path.display());
        Ok(ledger)
    }
}

impl<'a> IntoIterator for &'a Ledger {
    type Item = &'a LedgerEntry;
    type IntoIter = std::slice::Iter<'a, LedgerEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(elapsed_ms: u64, kind: ActionKind, expense: Expense, name: &str) -> LedgerEntry {
        LedgerEntry {
            elapsed_ms,
            kind,
            player_id: 1,
            object_id: 0,
            expense,
            name: name.to_string(),
            prices: MarketPrices {
                wood: 103.0,
                food: 100.0,
                stone: 130.0,
            },
        }
    }

    fn sample() -> Ledger {
        let mut ledger = Ledger::new();
        ledger.push(entry(
            0,
            ActionKind::Buy,
            Expense::new(0.0, 0.0, 130.00000000000003, 0.0),
            "buy wood",
        ));
        ledger.push(entry(
            1_250,
            ActionKind::Research,
            Expense::new(0.0, 200.0, 149.5, 0.0),
            "Guilds",
        ));
        ledger.push(entry(
            1_250,
            ActionKind::DeQueue,
            Expense::new(0.0, 180.0, 0.0, 0.0),
            "Villager",
        ));
        ledger
    }

    #[test]
    fn tsv_round_trip_is_exact() -> Result<()> {
        let ledger = sample();
        let tsv = ledger.to_tsv();
        assert!(tsv.starts_with("ts\ttype\tplayer\tid\twood"));
        assert_eq!(Ledger::from_tsv(&tsv)?, ledger);

        let dir = tempdir()?;
        let path = dir.path().join("cache").join("expenses.tsv");
        ledger.write_tsv(&path)?;
        assert_eq!(Ledger::read_tsv(&path)?, ledger);
        Ok(())
    }

    #[test]
    fn names_with_tabs_stay_on_one_row() {
        let mut ledger = Ledger::new();
        ledger.push(entry(5, ActionKind::Build, Expense::ZERO, "odd\tname\n"));
        let parsed = Ledger::from_tsv(&ledger.to_tsv()).expect("parses");
        assert_eq!(parsed.entries()[0].name, "odd name ");
    }

    #[test]
    fn rejects_damaged_caches() {
        assert_eq!(Ledger::from_tsv(""), Err(CacheError::MissingHeader));
        assert!(matches!(
            Ledger::from_tsv("ts\ttype\n"),
            Err(CacheError::BadHeader { .. })
        ));

        let header = TSV_COLUMNS.join("\t");
        let short = format!("{header}\n10\tBUILD\t1\n");
        assert_eq!(
            Ledger::from_tsv(&short),
            Err(CacheError::ColumnCount {
                line: 2,
                expected: 12,
                found: 3
            })
        );

        let bad_kind = format!("{header}\n10\tCHAT\t1\t0\t0\t0\t0\t0\tx\t100\t100\t130\n");
        assert!(matches!(
            Ledger::from_tsv(&bad_kind),
            Err(CacheError::InvalidValue { column: "type", .. })
        ));

        let bad_number = format!("{header}\n10\tBUILD\t1\t0\tlots\t0\t0\t0\tx\t100\t100\t130\n");
        assert!(matches!(
            Ledger::from_tsv(&bad_number),
            Err(CacheError::InvalidValue { column: "wood", .. })
        ));

        let unordered = format!(
            "{header}\n10\tBUILD\t1\t0\t0\t0\t0\t0\tx\t100\t100\t130\n5\tBUILD\t1\t0\t0\t0\t0\t0\tx\t100\t100\t130\n"
        );
        assert_eq!(
            Ledger::from_tsv(&unordered),
            Err(CacheError::OutOfOrder {
                line: 3,
                elapsed_ms: 5
            })
        );
    }

    #[test]
    fn unified_value_weights_resources_by_price() {
        let entry = LedgerEntry {
            prices: MarketPrices {
                wood: 50.0,
                food: 200.0,
                stone: 100.0,
            },
            ..entry(0, ActionKind::Build, Expense::new(100.0, 100.0, 10.0, 100.0), "x")
        };
        assert_eq!(entry.unified_value(), 50.0 + 200.0 + 10.0 + 100.0);
    }
}
