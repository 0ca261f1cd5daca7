//! Scenario-file CLI: inspect a planning portfolio, apply decisions, and
//! place projects into program books, with the full cascade running on
//! every mutation.

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde_json::{Value as JsonValue, json};
use std::fs;
use std::path::PathBuf;

use crate::core::config::PlanningConfig;
use crate::core::store::MemoryStore;
use crate::core::time;
use crate::domain::decision::{Decision, DecisionKind};
use crate::lifecycle::usecases::Planner;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[clap(
    name = "capworks",
    version = env!("CARGO_PKG_VERSION"),
    about = "Lifecycle and consistency engine for capital-works planning portfolios."
)]
pub struct Cli {
    /// Scenario file holding the serialized portfolio (JSON).
    #[clap(long)]
    scenario: PathBuf,
    /// Optional capworks.toml overriding validation bounds.
    #[clap(long)]
    config: Option<PathBuf>,
    /// Output format for this invocation.
    #[clap(long, value_enum, default_value = "text")]
    format: OutputFormat,
    /// Actor recorded on audit stamps (falls back to the config default).
    #[clap(long)]
    actor: Option<String>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print portfolio statuses, budgets, and staleness.
    Inspect,
    /// Apply a decision to a project.
    DecideProject {
        #[clap(long)]
        id: String,
        /// Decision type: postponed, replanned, canceled, removeFromProgramBook.
        #[clap(long = "type")]
        type_id: String,
        #[clap(long)]
        start_year: Option<i32>,
        #[clap(long)]
        end_year: Option<i32>,
        #[clap(long)]
        program_book: Option<String>,
        #[clap(long, default_value = "")]
        text: String,
    },
    /// Apply a decision to an intervention.
    DecideIntervention {
        #[clap(long)]
        id: String,
        /// Decision type: accepted, refused, returned, revisionRequest, canceled.
        #[clap(long = "type")]
        type_id: String,
        #[clap(long)]
        target_year: Option<i32>,
        #[clap(long, default_value = "")]
        text: String,
    },
    /// Add a project to a program book for the book's year.
    Program {
        #[clap(long)]
        project: String,
        #[clap(long)]
        program_book: String,
    },
}

fn parse_kind(raw: &str) -> anyhow::Result<DecisionKind> {
    serde_json::from_value(JsonValue::String(raw.to_string()))
        .map_err(|_| anyhow!("unknown decision type '{}'", raw))
}

fn load_store(path: &PathBuf) -> anyhow::Result<MemoryStore> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading scenario {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| "parsing scenario json")
}

fn save_store(path: &PathBuf, store: &MemoryStore) -> anyhow::Result<()> {
    let content = serde_json::to_string_pretty(store)?;
    fs::write(path, content).with_context(|| format!("writing scenario {}", path.display()))
}

/// Standard command response envelope printed in json mode.
fn envelope(cmd: &str, status: &str, extra: JsonValue) -> JsonValue {
    let mut base = json!({
        "ts": time::now_epoch_z(),
        "event_id": time::new_id(),
        "cmd": cmd,
        "status": status
    });
    if let (Some(base_obj), Some(extra_obj)) = (base.as_object_mut(), extra.as_object()) {
        for (k, v) in extra_obj {
            base_obj.insert(k.clone(), v.clone());
        }
    }
    base
}

fn print_inspect(store: &MemoryStore, format: OutputFormat) {
    if format == OutputFormat::Json {
        let summary = json!({
            "projects": store.projects.len(),
            "interventions": store.interventions.len(),
            "programBooks": store.program_books.len(),
        });
        println!("{}", envelope("inspect", "ok", summary));
        return;
    }
    use crate::core::store::{InterventionRepository, ProjectRepository};
    println!("{}", "projects".bold());
    for project in store.all_projects() {
        println!(
            "  {} [{}] {}-{} budget {:.3}",
            project.id,
            project.status.as_str().cyan(),
            project.start_year,
            project.end_year,
            project.global_budget.allowance
        );
        for period in &project.annual_distribution.annual_periods {
            let book = period.program_book_id.as_deref().unwrap_or("-");
            println!(
                "    {} rank {} allowance {:.3} book {}",
                period.year, period.rank, period.annual_allowance, book
            );
        }
    }
    println!("{}", "interventions".bold());
    for intervention in store.all_interventions() {
        let flag = if intervention.decision_required {
            "decision required".yellow().to_string()
        } else {
            String::new()
        };
        println!(
            "  {} [{}] year {} allowance {:.3} {}",
            intervention.id,
            intervention.status.as_str().cyan(),
            intervention.planification_year,
            intervention.estimate.allowance,
            flag
        );
    }
    println!("{}", "program books".bold());
    let mut books: Vec<_> = store.program_books.values().collect();
    books.sort_by(|a, b| a.id.cmp(&b.id));
    for book in books {
        let staleness = if book.is_outdated() {
            "outdated".red().to_string()
        } else {
            "fresh".green().to_string()
        };
        println!(
            "  {} [{}] projects {} {}",
            book.id,
            book.status.as_str().cyan(),
            book.project_ids.len(),
            staleness
        );
    }
}

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => PlanningConfig::load(path)?,
        None => PlanningConfig::default(),
    };
    let actor = cli
        .actor
        .clone()
        .unwrap_or_else(|| config.default_actor.clone());
    let mut store = load_store(&cli.scenario)?;

    match &cli.command {
        Command::Inspect => {
            print_inspect(&store, cli.format);
            return Ok(());
        }
        Command::DecideProject {
            id,
            type_id,
            start_year,
            end_year,
            program_book,
            text,
        } => {
            let kind = parse_kind(type_id)?;
            let mut decision = Decision::new(kind, &actor).with_text(text.clone());
            if let (Some(start), Some(end)) = (start_year, end_year) {
                decision = decision.with_range(*start, *end);
            }
            if let Some(book) = program_book {
                decision = decision.with_program_book(book.clone());
            }
            let mut planner = Planner::new(&mut store, config);
            let project = planner.apply_project_decision(id, decision, &actor)?;
            report(
                cli.format,
                "decide-project",
                json!({"projectId": project.id, "projectStatus": project.status}),
                format!(
                    "project {} is now {}",
                    project.id,
                    project.status.as_str().cyan()
                ),
            );
        }
        Command::DecideIntervention {
            id,
            type_id,
            target_year,
            text,
        } => {
            let kind = parse_kind(type_id)?;
            let mut decision = Decision::new(kind, &actor).with_text(text.clone());
            if let Some(year) = target_year {
                decision = decision.with_target_year(*year);
            }
            let mut planner = Planner::new(&mut store, config);
            let intervention = planner.apply_intervention_decision(id, decision, &actor)?;
            report(
                cli.format,
                "decide-intervention",
                json!({"interventionId": intervention.id, "interventionStatus": intervention.status}),
                format!(
                    "intervention {} is now {}",
                    intervention.id,
                    intervention.status.as_str().cyan()
                ),
            );
        }
        Command::Program {
            project,
            program_book,
        } => {
            let mut planner = Planner::new(&mut store, config);
            let project = planner.add_project_to_program_book(project, program_book, &actor)?;
            report(
                cli.format,
                "program",
                json!({"projectId": project.id, "projectStatus": project.status}),
                format!(
                    "project {} programmed into {}",
                    project.id,
                    program_book.as_str().cyan()
                ),
            );
        }
    }

    save_store(&cli.scenario, &store)
}

fn report(format: OutputFormat, cmd: &str, extra: JsonValue, line: String) {
    match format {
        OutputFormat::Json => println!("{}", envelope(cmd, "ok", extra)),
        OutputFormat::Text => println!("{}", line),
    }
}
