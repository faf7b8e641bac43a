//! Rendering a layer directory through kustomize.

use std::path::Path;

use tracing::{debug, info};

use crate::error::{ToolError, ToolResult};
use crate::runner::{Invocation, ToolRunner};

/// Runs `kustomize build`, or `kubectl kustomize` when kustomize is missing.
pub struct KustomizeRenderer<'a> {
    runner: &'a dyn ToolRunner,
}

impl<'a> KustomizeRenderer<'a> {
    pub fn new(runner: &'a dyn ToolRunner) -> Self {
        Self { runner }
    }

    async fn invocation(&self, dir: &Path) -> ToolResult<Invocation> {
        let kustomize = Invocation::new("kustomize").arg("version");
        if self.runner.is_available(&kustomize).await {
            return Ok(Invocation::new("kustomize").arg("build").path_arg(dir));
        }

        debug!("kustomize not found, trying kubectl");
        let kubectl = Invocation::new("kubectl").args(["version", "--client"]);
        if self.runner.is_available(&kubectl).await {
            return Ok(Invocation::new("kubectl").arg("kustomize").path_arg(dir));
        }

        Err(ToolError::NotAvailable(
            "neither kustomize nor kubectl is available".to_string(),
        ))
    }

    /// Render the kustomization in `dir` and return the resulting YAML.
    pub async fn render(&self, dir: &Path) -> ToolResult<String> {
        let invocation = self.invocation(dir).await?.captured();
        info!("Rendering {}", dir.display());
        let output = self.runner.run(&invocation).await?.check(&invocation)?;
        Ok(output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockToolRunner;
    use crate::runner::ToolOutput;

    #[tokio::test]
    async fn test_render_with_kustomize() {
        let runner =
            MockToolRunner::new().add_response("kustomize", ToolOutput::success("kind: Service\n"));
        let output = KustomizeRenderer::new(&runner)
            .render(Path::new("manifests/dev"))
            .await
            .unwrap();

        assert_eq!(output, "kind: Service\n");
        let calls = runner.calls();
        assert_eq!(calls[0].command_line(), "kustomize build manifests/dev");
        assert!(calls[0].capture);
    }

    #[tokio::test]
    async fn test_render_falls_back_to_kubectl() {
        let runner = MockToolRunner::new().set_unavailable("kustomize");
        KustomizeRenderer::new(&runner)
            .render(Path::new("manifests/dev"))
            .await
            .unwrap();
        assert_eq!(runner.command_lines(), vec!["kubectl kustomize manifests/dev"]);
    }

    #[tokio::test]
    async fn test_render_without_tools() {
        let runner = MockToolRunner::new()
            .set_unavailable("kustomize")
            .set_unavailable("kubectl");
        let err = KustomizeRenderer::new(&runner)
            .render(Path::new("manifests/dev"))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotAvailable(_)));
    }

    #[tokio::test]
    async fn test_render_failure_propagates_status() {
        let runner = MockToolRunner::new().add_response("kustomize", ToolOutput::failure(1));
        let err = KustomizeRenderer::new(&runner)
            .render(Path::new("manifests/dev"))
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), Some(1));
    }
}
