use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};

pub const USAGE: &str = "\
Usage: aoexp <convert|analyse|usernames> <path> [options]

<path> is a recording directory, or a tree that is scanned for them.

Actions:
  convert     replay the operation stream and write expenses.tsv
  analyse     like convert, but reuse an existing expenses.tsv and print a report
  usernames   print the player names of the recording

Options:
  -o, --output <dir>   write expenses.tsv under <dir> instead of the recording
  -d, --debug          log every parsed event and market operation
  -p, --privacy        replace human player names with P<n>
  -h, --help           show this help";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Convert,
    Analyse,
    Usernames,
}

impl Command {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "convert" => Some(Command::Convert),
            "analyse" | "analyze" => Some(Command::Analyse),
            "usernames" => Some(Command::Usernames),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub command: Command,
    pub path: PathBuf,
    pub output: Option<PathBuf>,
    pub debug: bool,
    pub privacy: bool,
}

/// Parse the arguments following the program name. `None` means help was
/// requested.
pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Option<CliArgs>> {
    let mut command = None;
    let mut path = None;
    let mut output = None;
    let mut debug = false;
    let mut privacy = false;

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(None),
            "-d" | "--debug" => debug = true,
            "-p" | "--privacy" => privacy = true,
            "-o" | "--output" => {
                let dir = args
                    .next()
                    .ok_or_else(|| anyhow!("{arg} expects a directory"))?;
                output = Some(PathBuf::from(dir));
            }
            flag if flag.starts_with('-') => bail!("unknown option {flag}"),
            value if command.is_none() => {
                command = Some(
                    Command::parse(value).ok_or_else(|| anyhow!("unknown action '{value}'"))?,
                );
            }
            value if path.is_none() => path = Some(PathBuf::from(value)),
            value => bail!("unexpected argument '{value}'"),
        }
    }

    let command = command.ok_or_else(|| anyhow!("missing action"))?;
    let path = path.ok_or_else(|| anyhow!("missing recording path"))?;
    Ok(Some(CliArgs {
        command,
        path,
        output,
        debug,
        privacy,
    }))
}
