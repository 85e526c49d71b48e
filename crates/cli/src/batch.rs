use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, bail, Result};
use aoexp_core::{AppConfig, GameCatalog, LedgerSource, Recording, Report};
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::args::{CliArgs, Command};

/// Result of one recording job, in discovery order.
pub struct JobResult {
    pub index: usize,
    pub name: String,
    pub output: Result<String>,
}

/// Every recording directory below `root`, sorted by path.
pub fn discover(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!("skipping unreadable entry: {err}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_dir() && Recording::is_recording_dir(entry.path()))
        .map(|entry| entry.into_path())
        .collect()
}

/// Resolve the recordings named on the command line: the path itself when it
/// is a recording, otherwise every recording below it. With `-o`, each cache
/// lands under the output directory at the recording's path relative to the
/// input root.
pub fn recordings(args: &CliArgs) -> Result<Vec<Recording>> {
    let dirs = if Recording::is_recording_dir(&args.path) {
        vec![args.path.clone()]
    } else {
        discover(&args.path)
    };
    if dirs.is_empty() {
        bail!("no recordings found under {}", args.path.display());
    }

    dirs.into_iter()
        .map(|dir| {
            let recording = Recording::open(&dir)?;
            Ok(match &args.output {
                Some(out) => {
                    let relative = dir.strip_prefix(&args.path).unwrap_or(Path::new(""));
                    recording.with_output_dir(out.join(relative))
                }
                None => recording,
            })
        })
        .collect()
}

/// Run `command` on every recording concurrently.
pub async fn run_all(
    recordings: Vec<Recording>,
    command: Command,
    catalog: Option<Arc<GameCatalog>>,
    config: Arc<AppConfig>,
) -> Vec<JobResult> {
    let mut jobs = JoinSet::new();
    for (index, recording) in recordings.into_iter().enumerate() {
        let catalog = catalog.clone();
        let config = Arc::clone(&config);
        jobs.spawn_blocking(move || JobResult {
            index,
            name: recording.name(),
            output: process(&recording, command, catalog, &config),
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = jobs.join_next().await {
        match joined {
            Ok(result) => results.push(result),
            Err(err) => error!("recording task failed: {err}"),
        }
    }
    results.sort_by_key(|result| result.index);
    results
}

fn process(
    recording: &Recording,
    command: Command,
    catalog: Option<Arc<GameCatalog>>,
    config: &AppConfig,
) -> Result<String> {
    let name = recording.name();
    if command == Command::Usernames {
        let registry = recording.players(config.privacy)?;
        return Ok(format!("{name}: {}", registry.usernames().join(", ")));
    }

    let catalog = catalog.ok_or_else(|| anyhow!("no catalog loaded for {name}"))?;
    match command {
        Command::Convert => {
            let ledger = recording.convert(catalog, &config.market)?;
            let path = recording.export(&ledger)?;
            Ok(format!(
                "{name}: {} entries written to {}",
                ledger.len(),
                path.display()
            ))
        }
        _ => {
            let (ledger, source) = recording.load_ledger(catalog, &config.market, true)?;
            if source == LedgerSource::Stream {
                recording.export(&ledger)?;
            }
            let registry = recording.players(config.privacy)?;
            info!("{name}: {} ledger entries", ledger.len());
            Ok(format!(
                "== {name} ==\n{}",
                Report::build(&ledger, &registry).render()
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use aoexp_core::recording::{LEDGER_FILE, OPERATIONS_FILE, PLAYERS_FILE};
    use serde_json::json;
    use tempfile::tempdir;

    const CATALOG: &str = r#"{
        "units_buildings": { "12": { "cost": { "wood": 175 }, "name": "Barracks" } },
        "techs": {}
    }"#;

    fn write_recording(dir: &Path, name: &str, operations: &str) -> Result<()> {
        fs::create_dir_all(dir)?;
        fs::write(dir.join(OPERATIONS_FILE), operations)?;
        fs::write(
            dir.join(PLAYERS_FILE),
            json!([{ "player_number": 1, "type": "human", "name": name, "resolved_team_id": 1 }])
                .to_string(),
        )?;
        Ok(())
    }

    fn build_line() -> &'static str {
        concat!(
            "{\"type\":\"sync\",\"elapsed_ms\":2000}\n",
            "{\"type\":\"action\",\"kind\":\"BUILD\",\"player_id\":1,\"building_id\":12}\n",
        )
    }

    fn cli(command: Command, path: &Path, output: Option<PathBuf>) -> CliArgs {
        CliArgs {
            command,
            path: path.to_path_buf(),
            output,
            debug: false,
            privacy: false,
        }
    }

    #[test]
    fn discovers_nested_recordings_in_order() -> Result<()> {
        let temp = tempdir()?;
        write_recording(&temp.path().join("b"), "Bob", "")?;
        write_recording(&temp.path().join("a/inner"), "Ann", "")?;
        fs::create_dir_all(temp.path().join("empty"))?;

        let found = discover(temp.path());
        assert_eq!(
            found,
            vec![temp.path().join("a/inner"), temp.path().join("b")]
        );
        Ok(())
    }

    #[test]
    fn empty_tree_is_an_error() -> Result<()> {
        let temp = tempdir()?;
        assert!(recordings(&cli(Command::Convert, temp.path(), None)).is_err());
        Ok(())
    }

    #[tokio::test]
    async fn converts_every_recording_into_the_output_tree() -> Result<()> {
        let temp = tempdir()?;
        let root = temp.path().join("games");
        write_recording(&root.join("one"), "Ann", build_line())?;
        write_recording(&root.join("two"), "Bob", build_line())?;
        let out = temp.path().join("out");

        let args = cli(Command::Convert, &root, Some(out.clone()));
        let catalog = Arc::new(GameCatalog::from_json_str(CATALOG)?);
        let results = run_all(
            recordings(&args)?,
            Command::Convert,
            Some(catalog),
            Arc::new(AppConfig::default()),
        )
        .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].name, "one");
        for result in &results {
            let text = result.output.as_ref().map_err(|err| anyhow!("{err:#}"))?;
            assert!(text.contains("1 entries"), "{text}");
        }
        assert!(out.join("one").join(LEDGER_FILE).is_file());
        assert!(out.join("two").join(LEDGER_FILE).is_file());
        Ok(())
    }

    #[tokio::test]
    async fn one_failing_recording_does_not_stop_the_others() -> Result<()> {
        let temp = tempdir()?;
        write_recording(&temp.path().join("bad"), "Ann", "not json\n")?;
        write_recording(&temp.path().join("good"), "Bob", build_line())?;

        let args = cli(Command::Analyse, temp.path(), None);
        let catalog = Arc::new(GameCatalog::from_json_str(CATALOG)?);
        let results = run_all(
            recordings(&args)?,
            Command::Analyse,
            Some(catalog),
            Arc::new(AppConfig::default()),
        )
        .await;

        assert!(results[0].output.is_err());
        let report = results[1].output.as_ref().map_err(|err| anyhow!("{err:#}"))?;
        assert!(report.contains("Bob (player 1)"), "{report}");
        assert!(temp.path().join("good").join(LEDGER_FILE).is_file());
        Ok(())
    }

    #[tokio::test]
    async fn usernames_need_no_catalog() -> Result<()> {
        let temp = tempdir()?;
        write_recording(temp.path(), "Zoe", "")?;
        let mut args = cli(Command::Usernames, temp.path(), None);
        args.privacy = true;

        let config = AppConfig {
            privacy: true,
            ..AppConfig::default()
        };
        let results = run_all(recordings(&args)?, Command::Usernames, None, Arc::new(config)).await;
        let text = results[0].output.as_ref().map_err(|err| anyhow!("{err:#}"))?;
        assert!(text.ends_with(": P1"), "{text}");
        Ok(())
    }
}
