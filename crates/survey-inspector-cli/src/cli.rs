use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use survey_inspector::{
    load_definition_file, ChangeDetection, ChangeTracker, ExpressionRegistry, InspectorEntry,
    InspectorOptions, RefreshSummary,
};

use crate::trace::load_trace;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DetectionArg {
    /// Scalars by value, arrays/objects by identity (rebuilt composites always count as changed).
    Identity,
    /// Deep comparison of resolved values.
    Structural,
}

impl From<DetectionArg> for ChangeDetection {
    fn from(value: DetectionArg) -> Self {
        match value {
            DetectionArg::Identity => ChangeDetection::Identity,
            DetectionArg::Structural => ChangeDetection::Structural,
        }
    }
}

#[derive(Parser)]
#[command(about = "Inspect the conditional and computed expressions of a survey definition.")]
pub struct Args {
    /// Log at debug level (overridden by `RUST_LOG`).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every expression found in a survey definition.
    List {
        /// Survey definition (full survey document or bare root item).
        definition: PathBuf,

        #[command(flatten)]
        view: ViewArgs,
    },
    /// Replay recorded engine snapshots and report which expressions changed at each step.
    Replay {
        /// Survey definition (full survey document or bare root item).
        definition: PathBuf,

        /// JSON array of steps: `{label?, responses?, values: {"<rendering>": <value>}}`.
        trace: PathBuf,

        #[command(flatten)]
        view: ViewArgs,

        /// How a new value is compared with the previous one.
        #[arg(long, value_enum, default_value_t = DetectionArg::Identity)]
        change_detection: DetectionArg,

        /// Only print expressions that changed at each step.
        #[arg(long)]
        changed_only: bool,
    },
}

#[derive(ClapArgs)]
struct ViewArgs {
    /// Only show items whose key contains this substring (case-sensitive).
    #[arg(long)]
    filter: Option<String>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Debug, Serialize)]
struct JsonListing<'a> {
    definition: &'a str,
    expressions: usize,
    items: usize,
    fields: Vec<&'static str>,
    entries: Vec<InspectorEntry>,
}

#[derive(Debug, Serialize)]
struct JsonStep<'a> {
    step: usize,
    label: Option<&'a str>,
    summary: RefreshSummary,
    entries: Vec<InspectorEntry>,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    run_with_args(args)
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    // A second init (e.g. from tests driving `run_with_args`) is harmless.
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .try_init();
}

pub fn run_with_args(args: Args) -> Result<()> {
    match args.command {
        Command::List { definition, view } => run_list(definition, view),
        Command::Replay {
            definition,
            trace,
            view,
            change_detection,
            changed_only,
        } => run_replay(definition, trace, view, change_detection.into(), changed_only),
    }
}

fn run_list(definition: PathBuf, view: ViewArgs) -> Result<()> {
    let root = load_definition_file(&definition)
        .with_context(|| format!("load survey definition {}", definition.display()))?;
    let registry = ExpressionRegistry::build(Some(&root));
    let entries: Vec<InspectorEntry> = registry
        .list(view.filter.as_deref())
        .map(|(item_key, descriptor)| InspectorEntry::new(item_key, descriptor))
        .collect();

    write_stdout(|out| match view.format {
        OutputFormat::Text => {
            writeln!(
                out,
                "Survey {}: {} expressions across {} items",
                root.key(),
                registry.len(),
                registry.group_count()
            )?;
            if let Some(filter) = &view.filter {
                writeln!(out, "  filter: {filter}")?;
            }
            writeln!(out)?;
            for entry in &entries {
                writeln!(out, "{} {}", entry.label(), entry.field)?;
                writeln!(out, "    {}", entry.expression)?;
            }
            Ok(())
        }
        OutputFormat::Json => {
            let definition = definition.to_string_lossy();
            let listing = JsonListing {
                definition: &definition,
                expressions: registry.len(),
                items: registry.group_count(),
                fields: registry.fields().map(|field| field.as_str()).collect(),
                entries,
            };
            serde_json::to_writer(&mut *out, &listing)?;
            out.write_all(b"\n")
        }
    })
}

fn run_replay(
    definition: PathBuf,
    trace: PathBuf,
    view: ViewArgs,
    change_detection: ChangeDetection,
    changed_only: bool,
) -> Result<()> {
    let root = load_definition_file(&definition)
        .with_context(|| format!("load survey definition {}", definition.display()))?;
    let steps = load_trace(&trace)?;
    let mut tracker =
        ChangeTracker::from_definition(Some(&root), InspectorOptions { change_detection });
    log::info!(
        "replaying {} steps against {} expressions",
        steps.len(),
        tracker.registry().len()
    );

    let mut reports = Vec::with_capacity(steps.len());
    for (idx, step) in steps.iter().enumerate() {
        let summary = tracker
            .on_state_change(step.engine(), step.responses.clone())
            .with_context(|| format!("replay step {}", idx + 1))?;
        let entries: Vec<InspectorEntry> = tracker
            .feed(view.filter.as_deref())
            .into_iter()
            .filter(|entry| !changed_only || entry.changed)
            .collect();
        reports.push(JsonStep {
            step: idx + 1,
            label: step.label.as_deref(),
            summary,
            entries,
        });
    }

    write_stdout(|out| match view.format {
        OutputFormat::Text => {
            for report in &reports {
                write!(out, "== step {}", report.step)?;
                if let Some(label) = report.label {
                    write!(out, ": {label}")?;
                }
                writeln!(
                    out,
                    " ({} evaluated, {} changed)",
                    report.summary.evaluated, report.summary.changed
                )?;
                for entry in &report.entries {
                    let marker = if entry.changed { '*' } else { ' ' };
                    let value = entry
                        .value
                        .as_ref()
                        .map_or_else(|| "undefined".to_string(), |v| v.to_string());
                    writeln!(
                        out,
                        "{marker} {} {}: {} = {value}",
                        entry.label(),
                        entry.field,
                        entry.expression
                    )?;
                }
            }
            Ok(())
        }
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, &reports)?;
            out.write_all(b"\n")
        }
    })
}

/// Writes to a locked stdout; a closed pipe (`survey_inspect ... | head`) is not an error.
fn write_stdout<F>(render: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    match render(&mut handle).and_then(|()| handle.flush()) {
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => Ok(other?),
    }
}
