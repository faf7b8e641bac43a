//! # stratum_tools
//!
//! Wrappers around the external tools Stratum drives: a container runtime
//! (docker or podman) for image builds and pushes, and kustomize for
//! rendering an overlay.
//!
//! Every tool goes through the [`ToolRunner`] trait. [`ProcessRunner`] spawns
//! real processes (or only prints them in dry-run mode); [`MockToolRunner`]
//! records invocations for tests.
//!
//! ## Example
//!
//! ```rust,no_run
//! use stratum_tools::{ContainerRuntime, ImageBuilder, ProcessRunner};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     # let builds: Vec<stratum_core::BuildSpec> = Vec::new();
//!     let runner = ProcessRunner::new().dry_run(true);
//!     let runtime = ContainerRuntime::detect(&runner, None).await?;
//!     ImageBuilder::new(&runner, runtime).build_all(&builds).await?;
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod error;
pub mod kustomize;
pub mod mock;
pub mod runner;
pub mod runtime;

pub use builder::ImageBuilder;
pub use error::{ToolError, ToolResult};
pub use kustomize::KustomizeRenderer;
pub use mock::MockToolRunner;
pub use runner::{Invocation, ProcessRunner, ToolOutput, ToolRunner};
pub use runtime::ContainerRuntime;
