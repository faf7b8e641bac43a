//! Mock tool runner for testing.
//!
//! Captures every invocation and answers with queued outputs, so build and
//! render flows can be exercised without docker, podman or kustomize.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::ToolResult;
use crate::runner::{Invocation, ToolOutput, ToolRunner};

/// Mock tool runner for testing.
///
/// Every program is available unless marked otherwise. Outputs are queued
/// per program; once a queue is empty the runner answers with success.
#[derive(Clone, Default)]
pub struct MockToolRunner {
    unavailable: Arc<RwLock<HashSet<String>>>,
    responses: Arc<RwLock<HashMap<String, VecDeque<ToolOutput>>>>,
    calls: Arc<RwLock<Vec<Invocation>>>,
}

impl MockToolRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make probes for `program` fail.
    pub fn set_unavailable(self, program: impl Into<String>) -> Self {
        self.unavailable.write().insert(program.into());
        self
    }

    /// Queue the output of the next run of `program`.
    pub fn add_response(self, program: impl Into<String>, output: ToolOutput) -> Self {
        self.responses
            .write()
            .entry(program.into())
            .or_default()
            .push_back(output);
        self
    }

    /// All invocations passed to `run`, in order.
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.read().clone()
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.calls.read().iter().map(Invocation::command_line).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().len()
    }

    pub fn clear_calls(&self) {
        self.calls.write().clear();
    }
}

#[async_trait]
impl ToolRunner for MockToolRunner {
    async fn is_available(&self, probe: &Invocation) -> bool {
        !self.unavailable.read().contains(&probe.program)
    }

    async fn run(&self, invocation: &Invocation) -> ToolResult<ToolOutput> {
        self.calls.write().push(invocation.clone());
        let output = self
            .responses
            .write()
            .get_mut(&invocation.program)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| ToolOutput::success(""));
        Ok(output)
    }
}
