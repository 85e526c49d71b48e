//! Aggregations over a finished ledger, ready for charting or printing.

use std::{collections::BTreeSet, fmt::Write as _};

use chrono::Duration;
use serde::Serialize;

use crate::{
    ledger::{Ledger, LedgerEntry},
    models::{Expense, MarketPrices, PlayerId},
    operation::ActionKind,
    players::{PlayerRegistry, UNALIGNED_TEAM},
};

/// Moment a player reached a new age.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeUp {
    /// Name of the age research, e.g. `Feudal Age`.
    pub name: String,
    /// Match time at which the research was queued.
    pub elapsed_ms: u64,
}

/// Spending of a single player over the whole match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSummary {
    /// Player slot.
    pub player_id: PlayerId,
    /// Display name.
    pub name: String,
    /// Raw resources spent.
    pub totals: Expense,
    /// Everything spent, valued in gold at the prices of the moment.
    pub unified: f64,
    /// Queue and dequeue rows.
    pub units: usize,
    /// Build rows.
    pub buildings: usize,
    /// Market rows.
    pub trades: usize,
    /// Age researches, in match order.
    pub ages: Vec<AgeUp>,
}

/// Unified spending of a team, or of a single unaligned player.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamSummary {
    /// `Team <n> (names)` or `Unaligned <name>`.
    pub label: String,
    /// Player slots of the team.
    pub members: Vec<PlayerId>,
    /// Unified value spent by all members.
    pub unified: f64,
}

/// Match-level digest of a ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// Time of the last ledger entry.
    pub last_entry_ms: u64,
    /// One summary per player slot, by slot number.
    pub players: Vec<PlayerSummary>,
    /// Teams by team id.
    pub teams: Vec<TeamSummary>,
    /// Market prices after the last entry, if any.
    pub final_prices: Option<MarketPrices>,
}

impl Report {
    /// Summarize `ledger`, naming players through `registry`.
    pub fn build(ledger: &Ledger, registry: &PlayerRegistry) -> Self {
        let mut player_ids: BTreeSet<PlayerId> =
            registry.players().map(|player| player.number).collect();
        player_ids.extend(ledger.iter().map(|entry| entry.player_id));

        let players = player_ids
            .into_iter()
            .map(|player_id| summarize_player(ledger, player_id, registry.name_of(player_id)))
            .collect();

        Self {
            last_entry_ms: ledger.entries().last().map_or(0, |entry| entry.elapsed_ms),
            players,
            teams: summarize_teams(ledger, registry),
            final_prices: ledger.entries().last().map(|entry| entry.prices),
        }
    }

    /// Plain-text rendering for terminals.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Last expense at {}", format_elapsed(self.last_entry_ms));

        for player in &self.players {
            let _ = writeln!(out);
            let _ = writeln!(out, "{} (player {})", player.name, player.player_id);
            let _ = writeln!(
                out,
                "  spent: wood {:.0}, food {:.0}, gold {:.0}, stone {:.0} ({:.0} in total)",
                player.totals.wood,
                player.totals.food,
                player.totals.gold,
                player.totals.stone,
                player.totals.total()
            );
            let _ = writeln!(out, "  unified value: {:.0} gold", player.unified);
            let _ = writeln!(
                out,
                "  units queued: {}, buildings: {}, market trades: {}",
                player.units, player.buildings, player.trades
            );
            for age in &player.ages {
                let _ = writeln!(out, "  {} at {}", age.name, format_elapsed(age.elapsed_ms));
            }
        }

        if !self.teams.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Teams");
            for team in &self.teams {
                let _ = writeln!(out, "  {}: {:.0} gold", team.label, team.unified);
            }
        }

        if let Some(prices) = self.final_prices {
            let _ = writeln!(out);
            let _ = writeln!(
                out,
                "Final market: wood {}, food {}, stone {}",
                prices.wood, prices.food, prices.stone
            );
        }
        out
    }
}

fn summarize_player(ledger: &Ledger, player_id: PlayerId, name: String) -> PlayerSummary {
    let entries: Vec<&LedgerEntry> = ledger.for_player(player_id).collect();
    let count = |kinds: &[ActionKind]| {
        entries
            .iter()
            .filter(|entry| kinds.contains(&entry.kind))
            .count()
    };

    PlayerSummary {
        player_id,
        name,
        totals: entries.iter().map(|entry| entry.expense).sum(),
        unified: entries.iter().map(|entry| entry.unified_value()).sum(),
        units: count(&[ActionKind::Queue, ActionKind::DeQueue]),
        buildings: count(&[ActionKind::Build]),
        trades: count(&[ActionKind::Buy, ActionKind::Sell]),
        ages: age_ups(&entries),
    }
}

fn age_ups(entries: &[&LedgerEntry]) -> Vec<AgeUp> {
    entries
        .iter()
        .filter(|entry| entry.kind == ActionKind::Research && entry.name.ends_with("Age"))
        .map(|entry| AgeUp {
            name: entry.name.clone(),
            elapsed_ms: entry.elapsed_ms,
        })
        .collect()
}

fn summarize_teams(ledger: &Ledger, registry: &PlayerRegistry) -> Vec<TeamSummary> {
    let mut teams = Vec::new();
    for (team_id, members) in registry.teams() {
        if *team_id == UNALIGNED_TEAM {
            for member in members {
                teams.push(TeamSummary {
                    label: format!("Unaligned {}", registry.name_of(*member)),
                    members: vec![*member],
                    unified: unified_total(ledger, &[*member]),
                });
            }
        } else {
            let names = members
                .iter()
                .map(|member| registry.name_of(*member))
                .collect::<Vec<_>>()
                .join(",");
            teams.push(TeamSummary {
                label: format!("Team {team_id} ({names})"),
                members: members.clone(),
                unified: unified_total(ledger, members),
            });
        }
    }
    teams
}

fn unified_total(ledger: &Ledger, players: &[PlayerId]) -> f64 {
    ledger
        .iter()
        .filter(|entry| players.contains(&entry.player_id))
        .map(LedgerEntry::unified_value)
        .sum()
}

/// Running total of a player's expenses after each of their entries.
pub fn cumulative_expenses(ledger: &Ledger, player_id: PlayerId) -> Vec<(u64, Expense)> {
    ledger
        .for_player(player_id)
        .scan(Expense::ZERO, |total, entry| {
            *total += entry.expense;
            Some((entry.elapsed_ms, *total))
        })
        .collect()
}

/// Running unified value spent by a group of players.
pub fn cumulative_unified(ledger: &Ledger, players: &[PlayerId]) -> Vec<(u64, f64)> {
    ledger
        .iter()
        .filter(|entry| players.contains(&entry.player_id))
        .scan(0.0, |total, entry| {
            *total += entry.unified_value();
            Some((entry.elapsed_ms, *total))
        })
        .collect()
}

/// Fair market prices over time, one point per ledger entry.
pub fn price_series(ledger: &Ledger) -> Vec<(u64, MarketPrices)> {
    ledger
        .iter()
        .map(|entry| (entry.elapsed_ms, entry.prices))
        .collect()
}

/// Format a match time as `HH:MM:SS`.
pub fn format_elapsed(elapsed_ms: u64) -> String {
    let elapsed = Duration::milliseconds(i64::try_from(elapsed_ms).unwrap_or(i64::MAX));
    format!(
        "{:02}:{:02}:{:02}",
        elapsed.num_hours(),
        elapsed.num_minutes() % 60,
        elapsed.num_seconds() % 60
    )
}
