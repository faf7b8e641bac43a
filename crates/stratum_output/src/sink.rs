//! The sink trait and sink selection.

use std::io::Write;
use std::path::Path;

use stratum_core::RenderedLayer;

use crate::archive::ArchiveSink;
use crate::directory::DirectorySink;
use crate::error::OutputResult;

/// Destination for a rendered layer tree.
pub trait OutputSink {
    fn write(&mut self, layers: &[RenderedLayer]) -> OutputResult<()>;
}

/// Writes every file as one multi-document YAML stream.
pub struct StreamSink<W: Write> {
    writer: W,
}

impl<W: Write> StreamSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> OutputSink for StreamSink<W> {
    fn write(&mut self, layers: &[RenderedLayer]) -> OutputResult<()> {
        for layer in layers {
            for (name, content) in &layer.files {
                writeln!(self.writer, "---")?;
                writeln!(self.writer, "# {}/{}", layer.name, name)?;
                self.writer.write_all(content.as_bytes())?;
                if !content.ends_with('\n') {
                    writeln!(self.writer)?;
                }
            }
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Pick a sink for an output argument.
///
/// `-` streams to stdout, `*.tar.gz`/`*.tgz` builds an archive whose entries
/// sit under `prefix/`, anything else is a directory.
pub fn sink_for(output: &Path, prefix: &str) -> Box<dyn OutputSink> {
    if output == Path::new("-") {
        return Box::new(StreamSink::new(std::io::stdout()));
    }

    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        Box::new(ArchiveSink::new(output, prefix))
    } else {
        Box::new(DirectorySink::new(output))
    }
}
