//! `stagecheck models`: checkable entity types and their policies.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use stagecheck_core::PolicyFlags;

/// Arguments for `stagecheck models`.
#[derive(Args, Debug)]
pub struct ModelsArgs {
    /// Model registry file (default: ~/.stagecheck/models.yaml).
    #[arg(long)]
    pub models: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ModelJson {
    entity_type: String,
    primary_key: String,
    handler: Option<String>,
    flags: PolicyFlags,
    variant: String,
    identity: String,
    exact_attributes: Vec<String>,
    fetch_attributes: Vec<String>,
}

#[derive(Tabled)]
struct ModelRow {
    #[tabled(rename = "entity type")]
    entity_type: String,
    #[tabled(rename = "handler")]
    handler: String,
    #[tabled(rename = "flags")]
    flags: String,
    #[tabled(rename = "variant")]
    variant: String,
    #[tabled(rename = "identity")]
    identity: String,
    #[tabled(rename = "fetch")]
    fetch: String,
}

impl ModelsArgs {
    pub fn run(self) -> Result<()> {
        let registry = super::load_registry(self.models.as_deref())?;
        let policies = registry.checkable();

        if self.json {
            let payload: Vec<ModelJson> = policies
                .iter()
                .map(|p| ModelJson {
                    entity_type: p.entity_type().to_string(),
                    primary_key: p.primary_key().to_string(),
                    handler: registry.handler_for(p.entity_type()).map(|h| h.to_string()),
                    flags: p.flags(),
                    variant: p.variant().to_string(),
                    identity: p.identity_rule().to_string(),
                    exact_attributes: p.exact_attributes().iter().map(|a| a.to_string()).collect(),
                    fetch_attributes: p.fetch_attributes().iter().map(|a| a.to_string()).collect(),
                })
                .collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to serialize models JSON")?
            );
            return Ok(());
        }

        if policies.is_empty() {
            println!("No checkable entity types.");
            return Ok(());
        }

        let rows: Vec<ModelRow> = policies
            .iter()
            .map(|p| ModelRow {
                entity_type: p.entity_type().to_string(),
                handler: registry
                    .handler_for(p.entity_type())
                    .map(|h| h.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                flags: flag_letters(p.flags()),
                variant: p.variant().to_string(),
                identity: p.identity_rule().to_string(),
                fetch: p
                    .fetch_attributes()
                    .iter()
                    .map(|a| a.to_string())
                    .collect::<Vec<_>>()
                    .join(","),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        println!(
            "{}",
            "flags: a=audited g=grouped r=resourced s=staged w=workflowed".bright_black()
        );
        Ok(())
    }
}

fn flag_letters(flags: PolicyFlags) -> String {
    [
        (flags.audited, 'a'),
        (flags.grouped, 'g'),
        (flags.resourced, 'r'),
        (flags.staged, 's'),
        (flags.workflowed, 'w'),
    ]
    .iter()
    .map(|(on, letter)| if *on { *letter } else { '-' })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_letters_mark_missing_flags() {
        let flags = PolicyFlags {
            grouped: true,
            staged: true,
            ..PolicyFlags::default()
        };
        assert_eq!(flag_letters(flags), "-g-s-");
    }
}
