//! CLI command definitions.
//!
//! Every subcommand starts from the same synthesis run: load contexts, load
//! the application, build the layer tree. They differ in what they do with it.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Args, Parser, Subcommand};
use thiserror::Error;
use tracing::info;

use stratum_core::{AppDescriptor, Diagnostics, ImageRule, StratumConfig, Synthesis, Synthesizer};

pub mod build;
pub mod push;
pub mod yaml;

/// Stratum - layered Kubernetes manifests for many deployment contexts
#[derive(Parser)]
#[command(name = "stratum")]
#[command(version, about = "Layered Kubernetes manifests for many deployment contexts")]
#[command(long_about = r#"
Stratum turns one application description into a kustomize base plus one
overlay per deployment context, each with its own image rewrite rules.

COMMANDS:
  yaml   → Write the base and context overlays
  build  → Build the application's images for a target context
  push   → Build and push the application's images for a target context

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Finished with warnings
  4 - Application contract violation
  5 - Output error
  A failing external tool passes its own exit status through.
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Inputs shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Context configuration file (YAML, or TOML by extension)
    #[arg(short, long, global = true, default_value = "contexts.yaml", env = "STRATUM_CONFIG")]
    pub config: PathBuf,

    /// Application description
    #[arg(short, long, global = true, default_value = "app.yaml", env = "STRATUM_APP")]
    pub app: PathBuf,

    /// Only generate these contexts (repeatable; default: all)
    #[arg(long = "context", global = true, value_name = "NAME")]
    pub contexts: Vec<String>,

    /// Print external tool command lines instead of running them
    #[arg(long, global = true)]
    pub dry_run: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write the base layer and one overlay per context
    Yaml(yaml::YamlArgs),

    /// Build container images for a target context
    Build(build::ImageArgs),

    /// Build and push container images for a target context
    Push(build::ImageArgs),
}

/// What a successful command leaves for the exit status.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub warnings: usize,
}

impl Outcome {
    pub fn from_diagnostics(diagnostics: &Diagnostics) -> Self {
        Self {
            warnings: diagnostics.len(),
        }
    }
}

/// A command line that parses but cannot be acted on.
#[derive(Debug, Error)]
pub enum UsageError {
    #[error("Target context `{0}` is not configured or not selected")]
    UnknownTarget(String),
}

/// Load everything and run the synthesis pipeline.
pub fn synthesize(global: &GlobalArgs) -> Result<(AppDescriptor, Synthesis)> {
    let mut diagnostics = Diagnostics::new();
    let config = StratumConfig::load(&global.config, &mut diagnostics);
    let config = if global.contexts.is_empty() {
        config
    } else {
        config.select(&global.contexts, &mut diagnostics)
    };

    let app = AppDescriptor::load(&global.app)
        .with_context(|| format!("Failed to load application {}", global.app.display()))?;

    let synthesis = Synthesizer::new(&app, &config)
        .run(diagnostics)
        .context("Synthesis failed")?;
    info!(
        "Synthesized {} layer(s) with {} warning(s)",
        synthesis.layers.len(),
        synthesis.diagnostics.len()
    );
    Ok((app, synthesis))
}

/// Image rules of the target context, or none without a target.
pub fn target_rules(synthesis: &Synthesis, target: Option<&str>) -> Result<Vec<ImageRule>> {
    match target {
        None => Ok(Vec::new()),
        Some(target) => synthesis
            .registry
            .get(target)
            .filter(|layer| !layer.is_base())
            .map(|layer| layer.images.clone())
            .ok_or_else(|| UsageError::UnknownTarget(target.to_string()).into()),
    }
}
