pub mod check;
pub mod models;

use std::path::Path;

use anyhow::{Context, Result};

use stagecheck_core::{registry, ModelRegistry};

/// `--models <file>` when given, `~/.stagecheck/models.yaml` otherwise.
pub fn load_registry(path: Option<&Path>) -> Result<ModelRegistry> {
    match path {
        Some(path) => registry::load_at(path)
            .with_context(|| format!("failed to load model registry {}", path.display())),
        None => registry::load()
            .context("failed to load model registry; pass --models or create ~/.stagecheck/models.yaml"),
    }
}
