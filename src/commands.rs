//! Subcommand handlers for the `loanform` binary.
//!
//! Handlers write JSON to the given writer and return whether the command
//! succeeded; `main` maps a failed command to a non-zero exit code.

use anyhow::Context;
use serde_json::{json, Value};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::cli::Command;
use crate::config::Settings;
use crate::forms::{FormCatalog, TabDefinition};
use crate::schema::document::to_json_schema;
use crate::session::{FormSession, SessionEvent};
use crate::validator::validate_document;
use crate::value::DataValue;

pub fn run<W: Write>(command: &Command, settings: &Settings, out: &mut W) -> anyhow::Result<bool> {
    let catalog = settings.catalog()?;

    match command {
        Command::Tabs => {
            for tab in catalog.iter() {
                let marker = if tab.name() == settings.form.default_tab { "*" } else { " " };
                writeln!(out, "{} {}\t{}", marker, tab.name(), tab.title())?;
            }
            Ok(true)
        }
        Command::Schema { data, .. } => {
            let tab = select_tab(&catalog, command, settings)?;
            let session = match data {
                Some(path) => FormSession::with_data(tab.schema().clone(), load_document(path)?),
                None => tab.open(),
            };
            print_json(out, &to_json_schema(&session.snapshot().effective_schema))?;
            Ok(true)
        }
        Command::Validate { data, .. } => {
            let tab = select_tab(&catalog, command, settings)?;
            let errors = validate_document(tab.schema(), &load_document(data)?);
            info!("Validated '{}': {} errors", tab.name(), errors.len());
            print_json(out, &json!(errors))?;
            Ok(true)
        }
        Command::Submit { data, .. } => {
            let tab = select_tab(&catalog, command, settings)?;
            let tab_name = tab.name().to_string();
            let mut session = FormSession::with_data(tab.schema().clone(), load_document(data)?)
                .on_accept(Arc::new(move |_: &DataValue| info!("Tab '{}' submitted", tab_name)));
            let outcome = session.submit()?;
            print_json(out, &json!(outcome))?;
            Ok(outcome.is_accepted())
        }
        Command::Replay { events, .. } => {
            let tab = select_tab(&catalog, command, settings)?;
            replay(tab, events, out)
        }
    }
}

fn select_tab<'a>(catalog: &'a FormCatalog, command: &Command, settings: &Settings) -> anyhow::Result<&'a TabDefinition> {
    let name = command.tab().unwrap_or(settings.form.default_tab.as_str());
    catalog
        .get(name)
        .with_context(|| format!("Unknown tab '{}'", name))
}

/// Apply each event in order, printing the session's view after each one.
/// Misused events are reported and skipped.
fn replay<W: Write>(tab: &TabDefinition, events: &Path, out: &mut W) -> anyhow::Result<bool> {
    let content = std::fs::read_to_string(events)
        .with_context(|| format!("Failed to read {}", events.display()))?;
    let mut session = tab.open();
    let mut clean = true;

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        if line.trim().is_empty() {
            continue;
        }
        let event: SessionEvent = serde_json::from_str(line)
            .with_context(|| format!("{}:{}: invalid event", events.display(), line_no))?;

        let report = match session.apply(&event) {
            Ok(Some(outcome)) => json!({"line": line_no, "state": session.state(), "submit": outcome}),
            Ok(None) => {
                let mut view = session.snapshot().to_json();
                view["line"] = json!(line_no);
                view["state"] = json!(session.state());
                view
            }
            Err(e) => {
                clean = false;
                tracing::warn!("Event on line {} refused: {}", line_no, e);
                json!({"line": line_no, "state": session.state(), "error": e.to_string()})
            }
        };
        writeln!(out, "{}", report)?;
    }

    Ok(clean)
}

/// Read a form document; the format follows the file extension (JSON by default).
pub fn load_document(path: &Path) -> anyhow::Result<DataValue> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
    let value: Value = match ext {
        "yaml" | "yml" => serde_yaml::from_str(&content)?,
        "toml" => toml::from_str(&content)?,
        _ => serde_json::from_str(&content)?,
    };
    DataValue::try_from(value).with_context(|| format!("{} is not a form document", path.display()))
}

fn print_json<W: Write>(out: &mut W, value: &Value) -> anyhow::Result<()> {
    writeln!(out, "{}", serde_json::to_string_pretty(value)?)?;
    Ok(())
}
