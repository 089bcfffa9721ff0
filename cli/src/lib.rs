use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use serde::Serialize;
use slicer_lib::state::get_storage_path;
use slicer_lib::{Action, Colors, DashboardState, Dimension, Expression, Value};
use tracing::{debug, info};

#[derive(Debug, Parser, Clone)]
#[command(
    name = "slicer",
    author,
    version,
    about = "Manage the split colors of a saved dashboard view",
    long_about = None
)]
pub struct Cli {
    /// Dashboard state file (defaults to $SLICER_STATE_PATH, then the config directory)
    #[arg(long, value_name = "STATE_FILE", global = true)]
    pub state: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Register a dimension, replacing one with the same name
    Dimension {
        #[arg(long)]
        name: String,
        #[arg(long)]
        title: Option<String>,
        /// Type tag such as STRING or TIME
        #[arg(long = "type", value_name = "TYPE")]
        kind: Option<String>,
        /// Field reference, e.g. `$countryName`
        #[arg(long)]
        expression: Option<String>,
    },
    /// Start a color assignment that waits for a top-N query
    Init {
        #[arg(long)]
        dimension: String,
        #[arg(long, default_value_t = 5)]
        limit: u32,
    },
    /// Freeze the rows returned by the top-N query into color slots
    Freeze {
        #[arg(required = true)]
        values: Vec<String>,
    },
    /// Pin a value to the next free color, or unpin it
    Toggle { value: String },
    /// Drop pinned values and go back to a top-N query
    Limit { limit: u32 },
    /// Print the current assignment
    Show,
    /// Print the query fragments matching the current assignment
    Query {
        /// Column the filter applies to (defaults to the dimension)
        #[arg(long)]
        segment: Option<String>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SlotReport {
    slot: usize,
    value: Value,
    color: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AssignmentReport<'a> {
    dimension: &'a str,
    needs_values: bool,
    same_as_limit: bool,
    limit: Option<u32>,
    slots: Vec<SlotReport>,
}

pub fn run(cli: Cli) -> Result<()> {
    let stdout = io::stdout();
    execute(cli, &mut stdout.lock())
}

pub fn execute<W: Write>(cli: Cli, out: &mut W) -> Result<()> {
    let path = match cli.state {
        Some(path) => path,
        None => get_storage_path().context("failed to resolve dashboard state path")?,
    };

    let mut state = DashboardState::load_from_path(&path)
        .with_context(|| format!("failed to load dashboard state from '{}'", path.display()))?;
    let before = state.version();

    match cli.command {
        Command::Dimension {
            name,
            title,
            kind,
            expression,
        } => {
            let mut dimension = Dimension::new(name)?;
            if let Some(title) = title {
                dimension = dimension.with_title(title);
            }
            if let Some(kind) = kind {
                dimension = dimension.with_kind(kind);
            }
            if let Some(expression) = expression {
                dimension = dimension.with_expression(Expression::parse_loose(&expression)?);
            }
            state.add_dimension(dimension);
        }
        Command::Init { dimension, limit } => {
            let name = resolve_dimension(&state, &dimension)?;
            state.set_colors(Colors::init(name, limit)?);
        }
        Command::Freeze { values } => {
            let values = values.iter().map(|value| Value::parse_loose(value));
            let colors = current(&state)?.set_value_equivalent(values);
            state.set_colors(colors);
        }
        Command::Toggle { value } => {
            let value = Value::parse_loose(&value);
            let colors = current(&state)?;
            let toggled = if colors.has(&value) {
                colors.remove(&value)
            } else {
                colors.try_add(value)?
            };
            state.set_colors(toggled);
        }
        Command::Limit { limit } => {
            let colors = current(&state)?.set_as_limit(limit);
            state.set_colors(colors);
        }
        Command::Show => write_assignment(out, current(&state)?)?,
        Command::Query { segment } => write_query(out, current(&state)?, segment.as_deref())?,
    }

    if state.version() != before {
        state
            .save_to_path(&path)
            .with_context(|| format!("failed to save dashboard state to '{}'", path.display()))?;
        info!(
            target: "slicer::cli",
            path = %path.display(),
            version = state.version(),
            "dashboard state updated"
        );
    } else {
        debug!(target: "slicer::cli", path = %path.display(), "dashboard state unchanged");
    }

    Ok(())
}

/// Maps a user-typed dimension name onto a registered one. Any name is
/// accepted while no dimensions are registered.
fn resolve_dimension(state: &DashboardState, name: &str) -> Result<String> {
    if state.dimensions().is_empty() {
        return Ok(name.to_string());
    }

    state
        .dimension(name)
        .map(|dimension| dimension.name().to_string())
        .ok_or_else(|| anyhow!("unknown dimension '{name}'"))
}

fn current(state: &DashboardState) -> Result<&Colors> {
    state
        .colors()
        .ok_or_else(|| anyhow!("no color assignment yet; run `slicer init` first"))
}

fn write_assignment<W: Write>(out: &mut W, colors: &Colors) -> Result<()> {
    let slots = colors
        .slots()
        .map(|slots| {
            slots
                .iter()
                .filter_map(|(slot, value)| {
                    let color = slicer_lib::palette::color_at(slot)?;
                    Some(SlotReport {
                        slot,
                        value: value.clone(),
                        color,
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let report = AssignmentReport {
        dimension: colors.dimension(),
        needs_values: colors.needs_values(),
        same_as_limit: colors.same_as_limit(),
        limit: colors.limit(),
        slots,
    };

    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)?;
    Ok(())
}

fn write_query<W: Write>(out: &mut W, colors: &Colors, segment: Option<&str>) -> Result<()> {
    let mut actions: Vec<Action> = Vec::with_capacity(2);
    if let Some(filter) = colors.to_having_filter(segment) {
        actions.push(filter.into());
    }
    actions.push(colors.to_limit_action().into());

    serde_json::to_writer_pretty(&mut *out, &actions)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use clap::CommandFactory;
    use serde_json::{Value as Json, json};

    fn invoke(state: &assert_fs::fixture::ChildPath, args: &[&str]) -> Result<String> {
        let mut argv = vec!["slicer", "--state"];
        let path = state.path().to_str().expect("utf-8 temp path");
        argv.push(path);
        argv.extend_from_slice(args);

        let cli = Cli::try_parse_from(argv)?;
        let mut out = Vec::new();
        execute(cli, &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    fn invoke_json(state: &assert_fs::fixture::ChildPath, args: &[&str]) -> Json {
        let output = invoke(state, args).expect("command succeeds");
        serde_json::from_str(&output).expect("command prints json")
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn freeze_then_pin_keeps_existing_colors() {
        let temp = assert_fs::TempDir::new().expect("temp dir");
        let state = temp.child("state.json");

        invoke(&state, &["init", "--dimension", "country", "--limit", "3"]).expect("init");
        invoke(&state, &["freeze", "US", "UK", "FR"]).expect("freeze");
        invoke(&state, &["toggle", "DE"]).expect("pin");
        invoke(&state, &["toggle", "UK"]).expect("unpin");

        let shown = invoke_json(&state, &["show"]);
        assert_eq!(
            shown,
            json!({
                "dimension": "country",
                "needsValues": false,
                "sameAsLimit": false,
                "limit": null,
                "slots": [
                    {"slot": 0, "value": "US", "color": "#2D95CA"},
                    {"slot": 2, "value": "FR", "color": "#D36FA4"},
                    {"slot": 3, "value": "DE", "color": "#66CC86"}
                ]
            })
        );
    }

    #[test]
    fn query_in_limit_mode_only_caps_rows() {
        let temp = assert_fs::TempDir::new().expect("temp dir");
        let state = temp.child("state.json");

        invoke(&state, &["init", "--dimension", "country", "--limit", "5"]).expect("init");

        let actions = invoke_json(&state, &["query"]);
        assert_eq!(actions, json!([{"action": "limit", "limit": 5}]));
    }

    #[test]
    fn query_after_freeze_filters_on_segment() {
        let temp = assert_fs::TempDir::new().expect("temp dir");
        let state = temp.child("state.json");

        invoke(&state, &["init", "--dimension", "country"]).expect("init");
        invoke(&state, &["freeze", "US", "42"]).expect("freeze");

        let actions = invoke_json(&state, &["query", "--segment", "SEGMENT"]);
        assert_eq!(
            actions,
            json!([
                {
                    "action": "filter",
                    "expression": {
                        "op": "in",
                        "operand": {"op": "ref", "name": "SEGMENT"},
                        "expression": {
                            "op": "literal",
                            "value": {"setType": "STRING", "elements": ["US", 42.0]}
                        }
                    }
                },
                {"action": "limit", "limit": 2}
            ])
        );
    }

    #[test]
    fn limit_discards_pins() {
        let temp = assert_fs::TempDir::new().expect("temp dir");
        let state = temp.child("state.json");

        invoke(&state, &["init", "--dimension", "country"]).expect("init");
        invoke(&state, &["freeze", "US"]).expect("freeze");
        invoke(&state, &["limit", "8"]).expect("limit");

        let shown = invoke_json(&state, &["show"]);
        assert_eq!(shown["needsValues"], json!(true));
        assert_eq!(shown["limit"], json!(8));
        assert_eq!(shown["slots"], json!([]));
    }

    #[test]
    fn init_resolves_registered_dimension_names() {
        let temp = assert_fs::TempDir::new().expect("temp dir");
        let state = temp.child("state.json");

        invoke(
            &state,
            &["dimension", "--name", "countryIsoCode", "--expression", "$iso"],
        )
        .expect("register dimension");
        invoke(&state, &["init", "--dimension", "COUNTRYISOCODE"]).expect("init");

        let shown = invoke_json(&state, &["show"]);
        assert_eq!(shown["dimension"], json!("countryIsoCode"));

        let err = invoke(&state, &["init", "--dimension", "city"]).expect_err("unknown");
        assert!(err.to_string().contains("unknown dimension 'city'"));
    }

    #[test]
    fn commands_without_assignment_fail() {
        let temp = assert_fs::TempDir::new().expect("temp dir");
        let state = temp.child("state.json");

        let err = invoke(&state, &["toggle", "US"]).expect_err("no assignment");
        assert!(err.to_string().contains("run `slicer init` first"));
        assert!(!state.path().exists());
    }

    #[test]
    fn toggle_on_full_palette_reports_error() {
        let temp = assert_fs::TempDir::new().expect("temp dir");
        let state = temp.child("state.json");

        invoke(&state, &["init", "--dimension", "hour", "--limit", "10"]).expect("init");
        invoke(
            &state,
            &["freeze", "0", "1", "2", "3", "4", "5", "6", "7", "8", "9"],
        )
        .expect("freeze");

        let err = invoke(&state, &["toggle", "10"]).expect_err("palette full");
        assert!(err.to_string().contains("no free color slot"));
    }

    #[test]
    fn read_only_commands_leave_state_file_untouched() {
        let temp = assert_fs::TempDir::new().expect("temp dir");
        let state = temp.child("state.json");

        invoke(&state, &["init", "--dimension", "country"]).expect("init");
        let saved = std::fs::read_to_string(state.path()).expect("read state");

        invoke(&state, &["show"]).expect("show");
        invoke(&state, &["query"]).expect("query");
        let after = std::fs::read_to_string(state.path()).expect("read state");
        assert_eq!(after, saved);
    }
}
