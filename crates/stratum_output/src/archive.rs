//! Gzip-compressed tar output.

use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use stratum_core::RenderedLayer;
use tempfile::NamedTempFile;
use tracing::info;

use crate::error::{OutputError, OutputResult};
use crate::sink::OutputSink;

/// Writes every layer into one `.tar.gz`, under a top-level `prefix/`.
///
/// The archive is assembled in a temporary file next to the destination and
/// only persisted once complete. Entries carry a zero mtime so identical
/// input yields identical archives.
pub struct ArchiveSink {
    path: PathBuf,
    prefix: String,
}

impl ArchiveSink {
    pub fn new(path: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            prefix: prefix.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append_layers<W: Write>(
        &self,
        builder: &mut tar::Builder<W>,
        layers: &[RenderedLayer],
    ) -> std::io::Result<()> {
        for layer in layers {
            for (name, content) in &layer.files {
                let entry = format!("{}/{}/{}", self.prefix, layer.name, name);
                let mut header = tar::Header::new_gnu();
                header.set_size(content.len() as u64);
                header.set_mode(0o644);
                header.set_mtime(0);
                header.set_entry_type(tar::EntryType::Regular);
                header.set_cksum();
                builder.append_data(&mut header, &entry, content.as_bytes())?;
            }
        }
        Ok(())
    }
}

impl OutputSink for ArchiveSink {
    fn write(&mut self, layers: &[RenderedLayer]) -> OutputResult<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !parent.is_dir() {
            return Err(OutputError::InvalidPath {
                path: self.path.clone(),
                message: "parent directory does not exist".to_string(),
            });
        }

        let file = NamedTempFile::new_in(&parent)?;
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);

        self.append_layers(&mut builder, layers)?;

        let encoder = builder.into_inner()?;
        let file = encoder.finish()?;
        file.persist(&self.path)?;

        info!(
            "Wrote {} layer(s) to archive {}",
            layers.len(),
            self.path.display()
        );
        Ok(())
    }
}
