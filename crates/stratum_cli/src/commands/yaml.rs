//! Yaml command - Write the layered manifests.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use stratum_output::{sink_for, DirectorySink, OutputSink};
use stratum_tools::{KustomizeRenderer, ProcessRunner};

use super::{synthesize, GlobalArgs, Outcome, UsageError};

/// Archive prefix when the application has no name.
const DEFAULT_PREFIX: &str = "manifests";

#[derive(Args, Debug, Clone)]
pub struct YamlArgs {
    /// Output directory, `.tar.gz`/`.tgz` archive, or `-` for stdout
    #[arg(short, long, default_value = "manifests")]
    pub output: PathBuf,

    /// Also print this context's overlay as rendered by kustomize
    #[arg(short, long)]
    pub target: Option<String>,
}

pub async fn execute(global: &GlobalArgs, args: YamlArgs) -> Result<Outcome> {
    let (_, synthesis) = synthesize(global)?;
    let prefix = synthesis
        .application
        .clone()
        .unwrap_or_else(|| DEFAULT_PREFIX.to_string());

    sink_for(&args.output, &prefix)
        .write(&synthesis.layers)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    info!("Wrote {} layer(s)", synthesis.layers.len());

    if let Some(target) = &args.target {
        if synthesis.layer(target).is_none() || target == stratum_core::BASE_LAYER {
            return Err(UsageError::UnknownTarget(target.clone()).into());
        }

        let runner = ProcessRunner::new().dry_run(global.dry_run);
        let rendered = if is_directory_output(&args.output) {
            render_overlay(&runner, &args.output.join(target)).await?
        } else {
            // archives and streams cannot be handed to kustomize directly
            let staging = tempfile::tempdir()?;
            DirectorySink::new(staging.path()).write(&synthesis.layers)?;
            render_overlay(&runner, &staging.path().join(target)).await?
        };

        let mut stdout = std::io::stdout().lock();
        stdout.write_all(rendered.as_bytes())?;
        stdout.flush()?;
    }

    Ok(Outcome::from_diagnostics(&synthesis.diagnostics))
}

fn is_directory_output(output: &Path) -> bool {
    let name = output.to_string_lossy();
    name != "-" && !name.ends_with(".tar.gz") && !name.ends_with(".tgz")
}

async fn render_overlay(runner: &ProcessRunner, dir: &Path) -> Result<String> {
    KustomizeRenderer::new(runner)
        .render(dir)
        .await
        .with_context(|| format!("Failed to render {}", dir.display()))
}
