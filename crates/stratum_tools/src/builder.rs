//! Container image build and push.

use stratum_core::{rewrite_image, BuildSpec, ImageRule};
use tracing::{info, instrument};

use crate::error::ToolResult;
use crate::runner::{Invocation, ToolRunner};
use crate::runtime::ContainerRuntime;

/// Builds and pushes the images an application declares.
///
/// Image names go through the rewrite rules of the target context, so the
/// tag that gets built is the reference the overlay deploys.
pub struct ImageBuilder<'a> {
    runner: &'a dyn ToolRunner,
    runtime: ContainerRuntime,
    rules: Vec<ImageRule>,
}

impl<'a> ImageBuilder<'a> {
    pub fn new(runner: &'a dyn ToolRunner, runtime: ContainerRuntime) -> Self {
        Self {
            runner,
            runtime,
            rules: Vec::new(),
        }
    }

    pub fn with_rules(mut self, rules: Vec<ImageRule>) -> Self {
        self.rules = rules;
        self
    }

    pub fn runtime(&self) -> ContainerRuntime {
        self.runtime
    }

    /// The reference a build is tagged and pushed as.
    pub fn target_reference(&self, build: &BuildSpec) -> ToolResult<String> {
        Ok(rewrite_image(&self.rules, &build.name)?)
    }

    pub fn build_invocation(&self, build: &BuildSpec) -> ToolResult<Invocation> {
        let mut invocation = Invocation::new(self.runtime.command())
            .arg("build")
            .arg("-t")
            .arg(self.target_reference(build)?);
        if let Some(main) = &build.main {
            invocation = invocation.arg("-f").path_arg(&build.context.join(main));
        }
        Ok(invocation.path_arg(&build.context))
    }

    pub fn push_invocation(&self, build: &BuildSpec) -> ToolResult<Invocation> {
        Ok(Invocation::new(self.runtime.command())
            .arg("push")
            .arg(self.target_reference(build)?))
    }

    /// Build one image and return the reference it was tagged with.
    #[instrument(skip_all, fields(image = %build.name))]
    pub async fn build(&self, build: &BuildSpec) -> ToolResult<String> {
        let invocation = self.build_invocation(build)?;
        let reference = self.target_reference(build)?;
        info!("Building {}", reference);
        self.runner.run(&invocation).await?.check(&invocation)?;
        Ok(reference)
    }

    /// Push one previously built image.
    #[instrument(skip_all, fields(image = %build.name))]
    pub async fn push(&self, build: &BuildSpec) -> ToolResult<String> {
        let invocation = self.push_invocation(build)?;
        let reference = self.target_reference(build)?;
        info!("Pushing {}", reference);
        self.runner.run(&invocation).await?.check(&invocation)?;
        Ok(reference)
    }

    /// Build every image in order, stopping at the first failure.
    pub async fn build_all(&self, builds: &[BuildSpec]) -> ToolResult<Vec<String>> {
        let mut built = Vec::with_capacity(builds.len());
        for build in builds {
            built.push(self.build(build).await?);
        }
        Ok(built)
    }

    /// Build then push every image in order, stopping at the first failure.
    pub async fn push_all(&self, builds: &[BuildSpec]) -> ToolResult<Vec<String>> {
        let mut pushed = Vec::with_capacity(builds.len());
        for build in builds {
            self.build(build).await?;
            pushed.push(self.push(build).await?);
        }
        Ok(pushed)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::mock::MockToolRunner;
    use crate::runner::ToolOutput;

    fn web() -> BuildSpec {
        BuildSpec {
            name: "web".to_string(),
            context: PathBuf::from("src/web"),
            main: Some(PathBuf::from("Dockerfile.prod")),
        }
    }

    #[test]
    fn test_build_invocation_uses_rewritten_reference() {
        let runner = MockToolRunner::new();
        let builder = ImageBuilder::new(&runner, ContainerRuntime::Podman).with_rules(vec![
            ImageRule::new("web")
                .with_new_name("reg.example.com/web")
                .with_new_tag("2.0"),
        ]);

        let invocation = builder.build_invocation(&web()).unwrap();
        assert_eq!(
            invocation.command_line(),
            "podman build -t reg.example.com/web:2.0 -f src/web/Dockerfile.prod src/web"
        );
        assert_eq!(
            builder.push_invocation(&web()).unwrap().command_line(),
            "podman push reg.example.com/web:2.0"
        );
    }

    #[test]
    fn test_no_rules_keeps_name() {
        let runner = MockToolRunner::new();
        let builder = ImageBuilder::new(&runner, ContainerRuntime::Docker);
        let build = BuildSpec {
            main: None,
            ..web()
        };
        assert_eq!(
            builder.build_invocation(&build).unwrap().command_line(),
            "docker build -t web src/web"
        );
    }

    #[tokio::test]
    async fn test_push_all_builds_first() {
        let runner = MockToolRunner::new();
        let builder = ImageBuilder::new(&runner, ContainerRuntime::Docker)
            .with_rules(vec![ImageRule::new("web").with_new_tag("dev")]);

        let pushed = builder.push_all(&[web()]).await.unwrap();
        assert_eq!(pushed, vec!["web:dev"]);

        let calls = runner.command_lines();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].starts_with("docker build -t web:dev"));
        assert_eq!(calls[1], "docker push web:dev");
    }

    #[tokio::test]
    async fn test_failed_build_stops() {
        let runner = MockToolRunner::new().add_response("docker", ToolOutput::failure(2));
        let builder = ImageBuilder::new(&runner, ContainerRuntime::Docker);

        let err = builder.push_all(&[web(), web()]).await.unwrap_err();
        assert_eq!(err.exit_code(), Some(2));
        assert_eq!(runner.call_count(), 1);
    }
}
