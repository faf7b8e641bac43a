//! Directory tree output.

use std::fs;
use std::path::{Path, PathBuf};

use stratum_core::RenderedLayer;
use tracing::{debug, info};

use crate::error::{OutputError, OutputResult};
use crate::sink::OutputSink;

/// Writes `<root>/<layer>/<file>`.
///
/// Each layer is staged in a temporary directory under `root` and moved into
/// place with a rename, so a layer directory is either the previous one or
/// the complete new one.
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn write_layer(&self, layer: &RenderedLayer) -> std::io::Result<()> {
        let staging = tempfile::Builder::new()
            .prefix(".stratum-staging-")
            .tempdir_in(&self.root)?;

        for (name, content) in &layer.files {
            fs::write(staging.path().join(name), content)?;
        }

        let target = self.root.join(&layer.name);
        if target.exists() {
            let retired = tempfile::Builder::new()
                .prefix(".stratum-retired-")
                .tempdir_in(&self.root)?;
            let retired_layer = retired.path().join(&layer.name);
            fs::rename(&target, &retired_layer)?;
            if let Err(e) = fs::rename(staging.path(), &target) {
                fs::rename(&retired_layer, &target)?;
                return Err(e);
            }
        } else {
            fs::rename(staging.path(), &target)?;
        }

        debug!("Wrote layer {} to {:?}", layer.name, target);
        Ok(())
    }
}

impl OutputSink for DirectorySink {
    fn write(&mut self, layers: &[RenderedLayer]) -> OutputResult<()> {
        if self.root.exists() && !self.root.is_dir() {
            return Err(OutputError::InvalidPath {
                path: self.root.clone(),
                message: "not a directory".to_string(),
            });
        }
        fs::create_dir_all(&self.root)?;

        for layer in layers {
            self.write_layer(layer).map_err(|source| OutputError::Layer {
                layer: layer.name.clone(),
                source,
            })?;
        }

        info!("Wrote {} layer(s) to {}", layers.len(), self.root.display());
        Ok(())
    }
}
