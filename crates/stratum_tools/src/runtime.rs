//! Container runtime selection.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ToolError, ToolResult};
use crate::runner::{Invocation, ToolRunner};

/// Container runtime type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerRuntime {
    Docker,
    Podman,
}

impl ContainerRuntime {
    pub const ALL: [ContainerRuntime; 2] = [Self::Docker, Self::Podman];

    /// Get the CLI command name.
    pub fn command(&self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Podman => "podman",
        }
    }

    fn probe(&self) -> Invocation {
        Invocation::new(self.command()).arg("version")
    }

    /// Pick a runtime: the preferred one if it answers, else docker, else podman.
    pub async fn detect(
        runner: &dyn ToolRunner,
        preferred: Option<ContainerRuntime>,
    ) -> ToolResult<ContainerRuntime> {
        if let Some(preferred) = preferred {
            if runner.is_available(&preferred.probe()).await {
                return Ok(preferred);
            }
            warn!(
                "Preferred runtime {} not available, trying alternatives",
                preferred
            );
        }

        for runtime in Self::ALL {
            if Some(runtime) != preferred && runner.is_available(&runtime.probe()).await {
                info!("Using container runtime: {}", runtime);
                return Ok(runtime);
            }
        }

        Err(ToolError::NotAvailable(
            "neither docker nor podman is available".to_string(),
        ))
    }
}

impl std::fmt::Display for ContainerRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.command())
    }
}

impl FromStr for ContainerRuntime {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "docker" => Ok(Self::Docker),
            "podman" => Ok(Self::Podman),
            _ => Err(ToolError::UnknownRuntime(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockToolRunner;

    #[test]
    fn test_parse_runtime() {
        assert_eq!("docker".parse::<ContainerRuntime>().unwrap(), ContainerRuntime::Docker);
        assert_eq!("Podman".parse::<ContainerRuntime>().unwrap(), ContainerRuntime::Podman);
        assert!("containerd".parse::<ContainerRuntime>().is_err());
    }

    #[tokio::test]
    async fn test_detect_prefers_docker() {
        let runner = MockToolRunner::new();
        let runtime = ContainerRuntime::detect(&runner, None).await.unwrap();
        assert_eq!(runtime, ContainerRuntime::Docker);
    }

    #[tokio::test]
    async fn test_detect_falls_back_to_podman() {
        let runner = MockToolRunner::new().set_unavailable("docker");
        let runtime = ContainerRuntime::detect(&runner, None).await.unwrap();
        assert_eq!(runtime, ContainerRuntime::Podman);
    }

    #[tokio::test]
    async fn test_detect_honors_preference() {
        let runner = MockToolRunner::new();
        let runtime = ContainerRuntime::detect(&runner, Some(ContainerRuntime::Podman))
            .await
            .unwrap();
        assert_eq!(runtime, ContainerRuntime::Podman);

        let runner = MockToolRunner::new().set_unavailable("podman");
        let runtime = ContainerRuntime::detect(&runner, Some(ContainerRuntime::Podman))
            .await
            .unwrap();
        assert_eq!(runtime, ContainerRuntime::Docker);
    }

    #[tokio::test]
    async fn test_detect_fails_without_runtime() {
        let runner = MockToolRunner::new()
            .set_unavailable("docker")
            .set_unavailable("podman");
        let err = ContainerRuntime::detect(&runner, None).await.unwrap_err();
        assert!(matches!(err, ToolError::NotAvailable(_)));
    }
}
