//! `stagecheck check`: run the scheduler over a snapshot directory.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use stagecheck_core::{EntityType, Scope};
use stagecheck_diff::{Category, CategorySet, ResultAggregate};
use stagecheck_scheduler::{
    dump_to_log, init_tracing, FileDataSource, ReconcileReport, Scheduler,
};

/// Identity keys listed per table row before the rest are elided.
const MAX_KEYS: usize = 5;

/// Arguments for `stagecheck check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Snapshot directory holding scopes.json, staging/ and live/.
    #[arg(long)]
    pub data: PathBuf,

    /// Model registry file (default: ~/.stagecheck/models.yaml).
    #[arg(long)]
    pub models: Option<PathBuf>,

    /// Only check these scope ids (repeatable).
    #[arg(long = "scope", value_name = "ID")]
    pub scopes: Vec<i64>,

    /// Only check these entity types (repeatable).
    #[arg(long = "entity", value_name = "TYPE")]
    pub entities: Vec<String>,

    /// Categories to compute (repeatable); all four when omitted.
    #[arg(long = "show", value_name = "CATEGORY")]
    pub show: Vec<Category>,

    /// Worker count; 0 uses the registry's numberThreads.
    #[arg(long, default_value_t = 0)]
    pub threads: usize,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,

    /// Also write every record of every category to the log.
    #[arg(long)]
    pub dump_log: bool,
}

impl CheckArgs {
    pub fn run(self) -> Result<()> {
        init_tracing();

        let registry = super::load_registry(self.models.as_deref())?;
        let source = FileDataSource::new(&self.data);
        let scopes = select_scopes(
            source
                .load_scopes()
                .with_context(|| format!("failed to read scopes from {}", self.data.display()))?,
            &self.scopes,
        )?;

        let filter: Vec<EntityType> = self.entities.iter().map(|e| EntityType::from(e.as_str())).collect();
        for entity_type in &filter {
            if registry.policy_for(entity_type).is_err() {
                eprintln!(
                    "{} no comparison policy for '{entity_type}'; it will be reported as an error",
                    "warning:".yellow().bold()
                );
            }
        }
        let entity_types = registry.entity_types(&filter);

        let wanted = if self.show.is_empty() {
            CategorySet::all()
        } else {
            self.show.iter().copied().collect()
        };
        let threads = if self.threads == 0 {
            registry.number_threads()
        } else {
            self.threads
        };

        let scheduler = Scheduler::new(Arc::new(registry), Arc::new(source));
        let report = scheduler
            .execute(&scopes, &entity_types, &wanted, threads)
            .context("reconciliation could not start")?;

        if self.dump_log {
            dump_to_log(&report, true);
        }

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize report JSON")?
            );
            return Ok(());
        }

        print_report(&report);
        Ok(())
    }
}

/// Keep the requested scopes in snapshot order; an id missing from the
/// snapshot is an error.
fn select_scopes(all: Vec<Scope>, requested: &[i64]) -> Result<Vec<Scope>> {
    if requested.is_empty() {
        return Ok(all);
    }
    for id in requested {
        if !all.iter().any(|s| s.id.0 == *id) {
            bail!("scope {id} is not listed in scopes.json");
        }
    }
    Ok(all
        .into_iter()
        .filter(|s| requested.contains(&s.id.0))
        .collect())
}

#[derive(Tabled)]
struct ResultRow {
    #[tabled(rename = "entity type")]
    entity_type: String,
    #[tabled(rename = "category")]
    category: String,
    #[tabled(rename = "count")]
    count: String,
    #[tabled(rename = "keys")]
    keys: String,
}

fn rows(aggregate: &ResultAggregate) -> Vec<ResultRow> {
    let entity_type = aggregate.entity_type().to_string();
    if let Some(err) = aggregate.error() {
        return vec![ResultRow {
            entity_type,
            category: "error".to_string(),
            count: "-".to_string(),
            keys: err.to_string(),
        }];
    }
    aggregate
        .counts()
        .into_iter()
        .map(|(category, count)| ResultRow {
            entity_type: entity_type.clone(),
            category: category.to_string(),
            count: count.to_string(),
            keys: key_list(aggregate, category),
        })
        .collect()
}

fn key_list(aggregate: &ResultAggregate, category: Category) -> String {
    let records = aggregate.records(category);
    let mut keys: Vec<String> = records
        .iter()
        .take(MAX_KEYS)
        .map(|r| match r.identity_key() {
            Some(key) => key.to_string(),
            None => format!("#{}", r.local_key()),
        })
        .collect();
    if records.len() > MAX_KEYS {
        keys.push(format!("(+{})", records.len() - MAX_KEYS));
    }
    keys.join(", ")
}

fn print_report(report: &ReconcileReport) {
    let separator = "■".repeat(67).bright_black().to_string();
    let tasks: usize = report.iter().map(|s| s.results.len()).sum();
    println!(
        "Stagecheck v{} | {} scopes | {} tasks | {} errors",
        env!("CARGO_PKG_VERSION"),
        report.iter().count(),
        tasks,
        report.error_count(),
    );

    for scope_results in report {
        println!("{separator}");
        println!("{}", format!("SCOPE {}", scope_results.scope.label()).bold());
        let table_rows: Vec<ResultRow> = scope_results.results.iter().flat_map(rows).collect();
        if table_rows.is_empty() {
            println!("No differences.");
            continue;
        }
        let mut table = Table::new(table_rows);
        table.with(Style::rounded());
        println!("{table}");
    }
    println!("{separator}");

    if report.is_clean() {
        println!("{}", "Staging and live are in sync.".green());
    } else if report.error_count() > 0 {
        println!("{}", "Some checks failed; see the error rows above.".red());
    } else {
        println!("{}", "Staging and live differ.".yellow());
    }
}
