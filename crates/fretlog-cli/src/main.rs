//! `fretlog` command line

mod commands;

use anyhow::Context as _;
use clap::{value_parser, Arg, ArgAction, ArgGroup, ArgMatches, Command};
use fretlog_core::{ImportPreview, TrackerConfig, VersionedStore};
use fretlog_store::FileStore;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("fretlog")
        .version(fretlog_core::VERSION)
        .about("Guitar maintenance tracker data: migrate, inspect, back up and restore")
        .subcommand_required(true)
        .arg(
            Arg::new("store")
                .long("store")
                .global(true)
                .default_value("fretlog.json")
                .value_parser(value_parser!(PathBuf))
                .help("Store file (JSON object of key to text)"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Write logs to stderr as JSON lines"),
        )
        .subcommand(
            Command::new("migrate")
                .about("Bring stored data to the current version and print what was done")
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Report without writing the migrated document"),
                ),
        )
        .subcommand(
            Command::new("show")
                .about("Print the current document")
                .arg(
                    Arg::new("instance")
                        .long("instance")
                        .help("Print only this instance"),
                ),
        )
        .subcommand(
            Command::new("field")
                .about("Print one field, looked up at top level then on the active instance")
                .arg(Arg::new("name").required(true)),
        )
        .subcommand(
            Command::new("set")
                .about("Replace one field with a JSON value")
                .arg(Arg::new("name").required(true))
                .arg(Arg::new("value").required(true).help("JSON text")),
        )
        .subcommand(
            Command::new("export")
                .about("Write a backup of the current document")
                .arg(
                    Arg::new("out")
                        .long("out")
                        .value_parser(value_parser!(PathBuf))
                        .help("Backup file; stdout when omitted"),
                ),
        )
        .subcommand(
            Command::new("import")
                .about("Merge or restore a backup file")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("merge")
                        .long("merge")
                        .action(ArgAction::SetTrue)
                        .help("Add backup records the store lacks"),
                )
                .arg(
                    Arg::new("restore")
                        .long("restore")
                        .action(ArgAction::SetTrue)
                        .help("Replace the stored document with the backup"),
                )
                .group(
                    ArgGroup::new("mode")
                        .args(["merge", "restore"])
                        .required(true),
                )
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Print the preview only"),
                )
                .arg(
                    Arg::new("yes")
                        .long("yes")
                        .action(ArgAction::SetTrue)
                        .help("Restore without asking"),
                ),
        )
        .subcommand(
            Command::new("reset")
                .about("Delete every stored entry, legacy keys included")
                .arg(
                    Arg::new("yes")
                        .long("yes")
                        .action(ArgAction::SetTrue)
                        .required(true)
                        .help("Confirm deletion"),
                ),
        )
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_env("FRETLOG_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn open(matches: &ArgMatches) -> anyhow::Result<VersionedStore<FileStore>> {
    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => TrackerConfig::load(path)?,
        None => TrackerConfig::default(),
    };
    let path = matches
        .get_one::<PathBuf>("store")
        .context("store path missing")?;
    tracing::debug!(store = %path.display(), "opening store");
    Ok(VersionedStore::new(FileStore::new(path), config))
}

/// Ask on the terminal before a restore
fn ask(preview: &ImportPreview) -> bool {
    eprint!("{preview}Replace the stored document? [y/N] ");
    io::stderr().flush().ok();
    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_err() {
        return false;
    }
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}

fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_logging(matches.get_flag("json-logs"));

    let result = open(&matches).and_then(|tracker| {
        let mut stdout = io::stdout().lock();
        commands::dispatch(&tracker, &matches, &mut stdout, &mut ask)
    });
    match result {
        Ok(status) => status.into(),
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_requires_exactly_one_mode() {
        assert!(cli().try_get_matches_from(["fretlog", "import", "b.json"]).is_err());
        assert!(cli()
            .try_get_matches_from(["fretlog", "import", "b.json", "--merge", "--restore"])
            .is_err());
        assert!(cli()
            .try_get_matches_from(["fretlog", "import", "b.json", "--restore", "--yes"])
            .is_ok());
    }

    #[test]
    fn reset_requires_yes() {
        assert!(cli().try_get_matches_from(["fretlog", "reset"]).is_err());
        assert!(cli().try_get_matches_from(["fretlog", "reset", "--yes"]).is_ok());
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let matches = cli()
            .try_get_matches_from(["fretlog", "show", "--store", "s.json", "--json-logs"])
            .unwrap();
        assert!(matches.get_flag("json-logs"));
        assert_eq!(
            matches.get_one::<PathBuf>("store"),
            Some(&PathBuf::from("s.json"))
        );
    }

    #[test]
    fn command_definition_is_consistent() {
        cli().debug_assert();
    }
}
