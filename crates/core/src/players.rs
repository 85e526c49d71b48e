//! Player and team registry extracted from the recording header.

use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::PlayerId;

/// Resolved team id of players who are not in any team.
pub const UNALIGNED_TEAM: u8 = 1;

/// A player slot taking part in the match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Slot number, matching `player_id` in actions.
    pub number: PlayerId,
    /// Display name (account name, AI label, or `P<n>` in privacy mode).
    pub name: String,
    /// Civilization id.
    pub civ_id: u32,
    /// Index into the in-game player colour palette.
    pub color_id: u8,
    /// Team picked in the lobby.
    pub selected_team_id: u8,
    /// Team the game actually used; [`UNALIGNED_TEAM`] means none.
    pub resolved_team_id: u8,
}

/// Header player slot that is neither human, AI nor closed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot identify player {player_number} of type '{kind}': no name and no AI name")]
pub struct PlayerError {
    /// Slot of the offending record.
    pub player_number: PlayerId,
    /// Slot type as written in the header.
    pub kind: String,
}

/// Header player record as written by the decoder.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPlayer {
    /// Slot number.
    pub player_number: PlayerId,
    /// Slot type: `human`, `computer`, `closed`, ...
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Account name of a human player.
    #[serde(default)]
    pub name: Option<String>,
    /// AI difficulty or script label.
    #[serde(default)]
    pub ai_type: Option<String>,
    /// AI player name.
    #[serde(default)]
    pub ai_name: Option<String>,
    /// Civilization id.
    #[serde(default)]
    pub civ_id: u32,
    /// Player colour index.
    #[serde(default)]
    pub color_id: u8,
    /// Team picked in the lobby.
    #[serde(default)]
    pub selected_team_id: u8,
    /// Team the game actually used.
    #[serde(default)]
    pub resolved_team_id: u8,
}

/// Write-once registry of players and their teams.
#[derive(Debug, Clone, Default)]
pub struct PlayerRegistry {
    players: BTreeMap<PlayerId, Player>,
    teams: BTreeMap<u8, Vec<PlayerId>>,
}

impl PlayerRegistry {
    /// Build the registry from header records. Closed slots are skipped.
    pub fn from_records(
        records: impl IntoIterator<Item = RawPlayer>,
        privacy: bool,
    ) -> Result<Self, PlayerError> {
        let mut registry = Self::default();
        for record in records {
            let name = match (non_empty(&record.name), non_empty(&record.ai_name)) {
                (Some(_), _) if privacy => format!("P{}", record.player_number),
                (Some(name), _) => name.to_string(),
                (None, Some(ai_name)) => match non_empty(&record.ai_type) {
                    Some(ai_type) => format!("{ai_type} {ai_name}"),
                    None => ai_name.to_string(),
                },
                (None, None) if record.kind == "closed" => {
                    debug!("skipping closed slot {}", record.player_number);
                    continue;
                }
                (None, None) => {
                    return Err(PlayerError {
                        player_number: record.player_number,
                        kind: record.kind,
                    })
                }
            };

            let player = Player {
                number: record.player_number,
                name,
                civ_id: record.civ_id,
                color_id: record.color_id,
                selected_team_id: record.selected_team_id,
                resolved_team_id: record.resolved_team_id,
            };
            registry
                .teams
                .entry(player.resolved_team_id)
                .or_default()
                .push(player.number);
            registry.players.insert(player.number, player);
        }
        Ok(registry)
    }

    /// Load the decoder's `players.json` (an array of header records).
    pub fn load(path: impl AsRef<Path>, privacy: bool) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read players {}", path.display()))?;
        let records: Vec<RawPlayer> = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse players {}", path.display()))?;
        let registry = Self::from_records(records, privacy)
            .with_context(|| format!("invalid player metadata in {}", path.display()))?;
        Ok(registry)
    }

    /// Player in slot `number`.
    pub fn get(&self, number: PlayerId) -> Option<&Player> {
        self.players.get(&number)
    }

    /// Players ordered by slot number.
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Teams keyed by resolved team id, members in header order.
    pub fn teams(&self) -> &BTreeMap<u8, Vec<PlayerId>> {
        &self.teams
    }

    /// Number of players.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Whether the header listed no player.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Name of `number`, or `P<n>` for slots missing from the header.
    pub fn name_of(&self, number: PlayerId) -> String {
        self.get(number)
            .map(|player| player.name.clone())
            .unwrap_or_else(|| format!("P{number}"))
    }

    /// All player names, sorted.
    pub fn usernames(&self) -> Vec<String> {
        let mut names: Vec<String> = self.players().map(|player| player.name.clone()).collect();
        names.sort();
        names
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn records() -> serde_json::Value {
        json!([
            { "player_number": 1, "type": "human", "name": "Zoe", "civ_id": 5,
              "color_id": 1, "selected_team_id": 2, "resolved_team_id": 2 },
            { "player_number": 2, "type": "computer", "name": "", "ai_type": "Extreme",
              "ai_name": "Bleda", "civ_id": 9, "color_id": 2, "resolved_team_id": 1 },
            { "player_number": 3, "type": "closed" },
            { "player_number": 4, "type": "human", "name": "alice", "civ_id": 1,
              "color_id": 4, "selected_team_id": 2, "resolved_team_id": 2 }
        ])
    }

    fn parse(privacy: bool) -> PlayerRegistry {
        let records: Vec<RawPlayer> = serde_json::from_value(records()).expect("records");
        PlayerRegistry::from_records(records, privacy).expect("registry")
    }

    #[test]
    fn names_humans_and_ais_and_skips_closed_slots() {
        let registry = parse(false);
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.name_of(1), "Zoe");
        assert_eq!(registry.name_of(2), "Extreme Bleda");
        assert!(registry.get(3).is_none());
        assert_eq!(registry.usernames(), vec!["Extreme Bleda", "Zoe", "alice"]);
    }

    #[test]
    fn groups_players_by_resolved_team() {
        let registry = parse(false);
        assert_eq!(registry.teams().get(&2), Some(&vec![1, 4]));
        assert_eq!(registry.teams().get(&UNALIGNED_TEAM), Some(&vec![2]));
    }

    #[test]
    fn privacy_hides_human_names_only() {
        let registry = parse(true);
        assert_eq!(registry.name_of(1), "P1");
        assert_eq!(registry.name_of(4), "P4");
        assert_eq!(registry.name_of(2), "Extreme Bleda");
    }

    #[test]
    fn nameless_open_slot_is_an_error() {
        let records: Vec<RawPlayer> =
            serde_json::from_value(json!([{ "player_number": 6, "type": "human" }]))
                .expect("records");
        let err = PlayerRegistry::from_records(records, false).expect_err("unidentifiable");
        assert_eq!(err.player_number, 6);
    }

    #[test]
    fn loads_players_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("players.json");
        fs::write(&path, serde_json::to_string(&records())?)?;
        let registry = PlayerRegistry::load(&path, false)?;
        assert_eq!(registry.get(4).map(|player| player.civ_id), Some(1));
        Ok(())
    }
}
