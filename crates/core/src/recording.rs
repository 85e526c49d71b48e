//! On-disk layout of a decoded recording and the convert/cache workflow.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};

use crate::{
    catalog::GameCatalog,
    diagnostics::TracingSink,
    ledger::Ledger,
    market::{MarketSettings, MarketState},
    players::PlayerRegistry,
    resolver::ActionResolver,
    stream::OperationReader,
    timeline::TimelineDriver,
};

/// Operation stream written by the decoder.
pub const OPERATIONS_FILE: &str = "operations.jsonl";
/// Header player records written by the decoder.
pub const PLAYERS_FILE: &str = "players.json";
/// Ledger cache produced by this tool.
pub const LEDGER_FILE: &str = "expenses.tsv";

/// Where the ledger of a [`Recording::load_ledger`] call came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerSource {
    /// Replayed from the operation stream.
    Stream,
    /// Reloaded from an existing TSV cache.
    Cache,
}

/// A directory holding one decoded recording.
#[derive(Debug, Clone)]
pub struct Recording {
    dir: PathBuf,
    output_dir: Option<PathBuf>,
}

impl Recording {
    /// Open the recording stored in `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !Self::is_recording_dir(&dir) {
            return Err(anyhow!(
                "{} does not contain {}",
                dir.display(),
                OPERATIONS_FILE
            ));
        }
        Ok(Self {
            dir,
            output_dir: None,
        })
    }

    /// Whether `path` looks like a recording directory.
    pub fn is_recording_dir(path: &Path) -> bool {
        path.join(OPERATIONS_FILE).is_file()
    }

    /// Write (and look for) the ledger cache under `dir` instead of the
    /// recording directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Short label for log lines.
    pub fn name(&self) -> String {
        self.dir
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.dir.display().to_string())
    }

    /// Location of the decoded operation stream.
    pub fn operations_path(&self) -> PathBuf {
        self.dir.join(OPERATIONS_FILE)
    }

    /// Location of the header player records.
    pub fn players_path(&self) -> PathBuf {
        self.dir.join(PLAYERS_FILE)
    }

    /// Location of the ledger cache, honouring the output directory.
    pub fn ledger_path(&self) -> PathBuf {
        self.output_dir
            .as_deref()
            .unwrap_or(&self.dir)
            .join(LEDGER_FILE)
    }

    /// Load the player registry; a recording without header metadata yields
    /// an empty registry.
    pub fn players(&self, privacy: bool) -> Result<PlayerRegistry> {
        let path = self.players_path();
        if !path.is_file() {
            warn!("{} has no {}, player names unavailable", self.name(), PLAYERS_FILE);
            return Ok(PlayerRegistry::default());
        }
        PlayerRegistry::load(path, privacy)
    }

    /// Replay the operation stream with a fresh market.
    pub fn convert(&self, catalog: Arc<GameCatalog>, settings: &MarketSettings) -> Result<Ledger> {
        let path = self.operations_path();
        info!("replaying {}", path.display());
        let reader = OperationReader::open(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let resolver = ActionResolver::new(catalog, MarketState::new(settings.clone()), TracingSink);
        TimelineDriver::new(resolver)
            .run(reader)
            .with_context(|| format!("failed to convert {}", path.display()))
    }

    /// Produce the ledger, reusing the TSV cache when allowed and present.
    pub fn load_ledger(
        &self,
        catalog: Arc<GameCatalog>,
        settings: &MarketSettings,
        accept_cache: bool,
    ) -> Result<(Ledger, LedgerSource)> {
        let cache = self.ledger_path();
        if accept_cache && cache.is_file() {
            info!("loading the cached ledger from {}", cache.display());
            return Ok((Ledger::read_tsv(&cache)?, LedgerSource::Cache));
        }
        Ok((self.convert(catalog, settings)?, LedgerSource::Stream))
    }

    /// Write `ledger` to the cache location and return that path.
    pub fn export(&self, ledger: &Ledger) -> Result<PathBuf> {
        let path = self.ledger_path();
        ledger.write_tsv(&path)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    const CATALOG: &str = r#"{
        "units_buildings": { "83": { "cost": { "food": 50 }, "name": "Villager" } },
        "techs": { "15": { "cost": { "food": 200, "gold": 300 }, "name": "Guilds" } }
    }"#;

    fn write_recording(dir: &Path, operations: &[serde_json::Value]) -> Result<()> {
        fs::create_dir_all(dir)?;
        let lines: Vec<String> = operations.iter().map(|op| op.to_string()).collect();
        fs::write(dir.join(OPERATIONS_FILE), lines.join("\n"))?;
        fs::write(
            dir.join(PLAYERS_FILE),
            json!([{ "player_number": 1, "type": "human", "name": "Zoe", "resolved_team_id": 1 }])
                .to_string(),
        )?;
        Ok(())
    }

    fn catalog() -> Arc<GameCatalog> {
        Arc::new(GameCatalog::from_json_str(CATALOG).expect("catalog"))
    }

    #[test]
    fn converts_exports_and_reuses_cache() -> Result<()> {
        let temp = tempdir()?;
        let dir = temp.path().join("match");
        write_recording(
            &dir,
            &[
                json!({ "type": "sync", "elapsed_ms": 100, "dropped": 0 }),
                json!({ "type": "action", "kind": "QUEUE", "player_id": 1, "unit_id": 83 }),
                json!({ "type": "action", "kind": "MOVE", "player_id": 1 }),
                json!({ "type": "sync", "elapsed_ms": 400 }),
                json!({ "type": "action", "kind": "BUY", "player_id": 1, "resource_id": 1, "amount": 5 }),
            ],
        )?;

        let recording = Recording::open(&dir)?;
        assert_eq!(recording.players(false)?.name_of(1), "Zoe");

        let settings = MarketSettings::default();
        let (ledger, source) = recording.load_ledger(catalog(), &settings, true)?;
        assert_eq!(source, LedgerSource::Stream);
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.entries()[1].elapsed_ms, 500);

        let path = recording.export(&ledger)?;
        assert_eq!(path, dir.join(LEDGER_FILE));

        let (cached, source) = recording.load_ledger(catalog(), &settings, true)?;
        assert_eq!(source, LedgerSource::Cache);
        assert_eq!(cached, ledger);

        let (_, source) = recording.load_ledger(catalog(), &settings, false)?;
        assert_eq!(source, LedgerSource::Stream);
        Ok(())
    }

    #[test]
    fn output_dir_moves_the_cache() -> Result<()> {
        let temp = tempdir()?;
        let dir = temp.path().join("match");
        write_recording(&dir, &[json!({ "type": "sync", "elapsed_ms": 1 })])?;
        let out = temp.path().join("out");

        let recording = Recording::open(&dir)?.with_output_dir(&out);
        let ledger = recording.convert(catalog(), &MarketSettings::default())?;
        assert!(ledger.is_empty());
        assert_eq!(recording.export(&ledger)?, out.join(LEDGER_FILE));
        Ok(())
    }

    #[test]
    fn unsupported_actions_fail_the_conversion() -> Result<()> {
        let temp = tempdir()?;
        let dir = temp.path().join("match");
        write_recording(
            &dir,
            &[
                json!({ "type": "sync", "elapsed_ms": 42 }),
                json!({ "type": "action", "kind": "TRIBUTE", "player_id": 1, "amount": 100 }),
            ],
        )?;

        let err = Recording::open(&dir)?
            .convert(catalog(), &MarketSettings::default())
            .expect_err("tribute is unsupported");
        let message = format!("{err:#}");
        assert!(message.contains("TRIBUTE"), "{message}");
        assert!(message.contains("42 ms"), "{message}");
        Ok(())
    }

    #[test]
    fn rejects_directories_without_a_stream() {
        let temp = tempdir().expect("tempdir");
        assert!(Recording::open(temp.path()).is_err());
    }

    #[test]
    fn missing_players_file_gives_empty_registry() -> Result<()> {
        let temp = tempdir()?;
        fs::write(temp.path().join(OPERATIONS_FILE), "")?;
        let registry = Recording::open(temp.path())?.players(false)?;
        assert!(registry.is_empty());
        Ok(())
    }
}
