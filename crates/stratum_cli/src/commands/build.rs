//! Build command - Build the application's images.

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use stratum_core::Application;
use stratum_tools::{ContainerRuntime, ImageBuilder, ProcessRunner};

use super::{synthesize, target_rules, GlobalArgs, Outcome};

#[derive(Args, Debug, Clone)]
pub struct ImageArgs {
    /// Context whose image rules name the built images
    #[arg(short, long)]
    pub target: Option<String>,

    /// Container runtime to use (docker or podman; default: detect)
    #[arg(long)]
    pub runtime: Option<ContainerRuntime>,
}

/// Which image step to run after synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Build,
    Push,
}

pub(crate) async fn run(global: &GlobalArgs, args: ImageArgs, step: Step) -> Result<Outcome> {
    let (app, synthesis) = synthesize(global)?;
    let rules = target_rules(&synthesis, args.target.as_deref())?;

    let builds = app.builds();
    if builds.is_empty() {
        info!("Application declares no builds");
        return Ok(Outcome::from_diagnostics(&synthesis.diagnostics));
    }

    let runner = ProcessRunner::new().dry_run(global.dry_run);
    let runtime = ContainerRuntime::detect(&runner, args.runtime).await?;
    let builder = ImageBuilder::new(&runner, runtime).with_rules(rules);

    let references = match step {
        Step::Build => builder.build_all(&builds).await.context("Image build failed")?,
        Step::Push => builder.push_all(&builds).await.context("Image push failed")?,
    };
    for reference in &references {
        info!("{:?} done: {}", step, reference);
    }

    Ok(Outcome::from_diagnostics(&synthesis.diagnostics))
}

pub async fn execute(global: &GlobalArgs, args: ImageArgs) -> Result<Outcome> {
    run(global, args, Step::Build).await
}
