//! Subcommand implementations
//!
//! Output goes to the given writer; logs go to stderr through tracing.

use anyhow::{bail, Context as _};
use clap::ArgMatches;
use fretlog_core::{
    BackupImporter, Confirmation, ImportMode, ImportOutcome, PersistOutcome, VersionedStore,
};
use fretlog_store::KeyValueStore;
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// How a command ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Status {
    Success,
    /// Ran, but did not do what was asked
    Failure,
}

impl From<Status> for ExitCode {
    fn from(status: Status) -> Self {
        match status {
            Status::Success => Self::SUCCESS,
            Status::Failure => Self::FAILURE,
        }
    }
}

/// Run the chosen subcommand
pub(crate) fn dispatch<S: KeyValueStore>(
    tracker: &VersionedStore<S>,
    matches: &ArgMatches,
    out: &mut dyn Write,
    confirmation: &mut dyn Confirmation,
) -> anyhow::Result<Status> {
    match matches.subcommand() {
        Some(("migrate", args)) => migrate(tracker, args.get_flag("dry-run"), out),
        Some(("show", args)) => show(tracker, args.get_one::<String>("instance"), out),
        Some(("field", args)) => field(tracker, required(args, "name")?, out),
        Some(("set", args)) => set(tracker, required(args, "name")?, required(args, "value")?, out),
        Some(("export", args)) => export(tracker, args.get_one::<PathBuf>("out"), out),
        Some(("import", args)) => {
            let file = args.get_one::<PathBuf>("file").context("backup file missing")?;
            let mode = if args.get_flag("restore") {
                ImportMode::Restore
            } else {
                ImportMode::Merge
            };
            let confirm_all = &mut |_: &fretlog_core::ImportPreview| true;
            let confirmation = if args.get_flag("yes") {
                confirm_all as &mut dyn Confirmation
            } else {
                confirmation
            };
            import(tracker, file, mode, args.get_flag("dry-run"), confirmation, out)
        }
        Some(("reset", _)) => {
            tracker.reset()?;
            writeln!(out, "store cleared")?;
            Ok(Status::Success)
        }
        Some((other, _)) => bail!("unknown command `{other}`"),
        None => bail!("no command given"),
    }
}

fn required<'a>(args: &'a ArgMatches, name: &str) -> anyhow::Result<&'a str> {
    args.get_one::<String>(name)
        .map(String::as_str)
        .with_context(|| format!("missing argument `{name}`"))
}

fn migrate<S: KeyValueStore>(
    tracker: &VersionedStore<S>,
    dry_run: bool,
    out: &mut dyn Write,
) -> anyhow::Result<Status> {
    if dry_run {
        let (_, report) = tracker.read()?;
        write!(out, "{report}")?;
        writeln!(out, "dry run: nothing written")?;
        return Ok(Status::Success);
    }

    let loaded = tracker.load()?;
    write!(out, "{}", loaded.report)?;
    match loaded.persisted {
        PersistOutcome::Unchanged => writeln!(out, "already current")?,
        PersistOutcome::Written => writeln!(out, "saved as version {}", loaded.document.version)?,
        PersistOutcome::Skipped => {
            writeln!(out, "stored data left untouched; showing defaults")?;
            return Ok(Status::Failure);
        }
        PersistOutcome::Failed(e) => {
            writeln!(out, "not saved: {e}")?;
            return Ok(Status::Failure);
        }
    }
    Ok(Status::Success)
}

fn show<S: KeyValueStore>(
    tracker: &VersionedStore<S>,
    instance: Option<&String>,
    out: &mut dyn Write,
) -> anyhow::Result<Status> {
    let document = tracker.get_document()?;
    let text = match instance {
        Some(id) => {
            let state = document
                .instance(id)
                .with_context(|| format!("no instance `{id}`"))?;
            serde_json::to_string_pretty(state)?
        }
        None => serde_json::to_string_pretty(&document)?,
    };
    writeln!(out, "{text}")?;
    Ok(Status::Success)
}

fn field<S: KeyValueStore>(
    tracker: &VersionedStore<S>,
    name: &str,
    out: &mut dyn Write,
) -> anyhow::Result<Status> {
    let value = tracker.get_field(name, Value::Null)?;
    writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
    Ok(if value.is_null() {
        Status::Failure
    } else {
        Status::Success
    })
}

fn set<S: KeyValueStore>(
    tracker: &VersionedStore<S>,
    name: &str,
    value: &str,
    out: &mut dyn Write,
) -> anyhow::Result<Status> {
    let value: Value =
        serde_json::from_str(value).with_context(|| format!("value for `{name}` is not JSON"))?;
    tracker.update_field(name, value)?;
    writeln!(out, "{name} updated")?;
    Ok(Status::Success)
}

fn export<S: KeyValueStore>(
    tracker: &VersionedStore<S>,
    path: Option<&PathBuf>,
    out: &mut dyn Write,
) -> anyhow::Result<Status> {
    let text = tracker.export(chrono::Utc::now())?.to_json_pretty()?;
    match path {
        Some(path) => {
            std::fs::write(path, &text)
                .with_context(|| format!("writing backup to {}", path.display()))?;
            tracing::info!(path = %path.display(), bytes = text.len(), "backup written");
            writeln!(out, "backup written to {}", path.display())?;
        }
        None => writeln!(out, "{text}")?,
    }
    Ok(Status::Success)
}

fn import<S: KeyValueStore>(
    tracker: &VersionedStore<S>,
    file: &Path,
    mode: ImportMode,
    dry_run: bool,
    confirmation: &mut dyn Confirmation,
    out: &mut dyn Write,
) -> anyhow::Result<Status> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("reading backup {}", file.display()))?;
    let importer = BackupImporter::new(tracker);

    if dry_run {
        let plan = importer.plan(&text, mode)?;
        writeln!(out, "{} ({mode})", plan.kind)?;
        write!(out, "{}", plan.report)?;
        write!(out, "{}", plan.preview)?;
        return Ok(Status::Success);
    }

    match importer.import(&text, mode, confirmation)? {
        ImportOutcome::Applied { preview, report } => {
            write!(out, "{report}")?;
            write!(out, "{preview}")?;
            writeln!(out, "{mode} applied")?;
        }
        ImportOutcome::Unchanged => writeln!(out, "backup matches stored data; nothing to do")?,
        ImportOutcome::Declined => {
            writeln!(out, "{mode} cancelled")?;
            return Ok(Status::Failure);
        }
    }
    Ok(Status::Success)
}
