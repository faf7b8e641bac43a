//! # stratum_output
//!
//! Sinks that write a rendered layer tree: a directory per layer, a single
//! `.tar.gz` archive, or a YAML stream.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use stratum_output::sink_for;
//! # let layers: Vec<stratum_core::RenderedLayer> = Vec::new();
//!
//! let mut sink = sink_for(Path::new("manifests"), "shop");
//! sink.write(&layers).unwrap();
//! ```

pub mod archive;
pub mod directory;
pub mod error;
pub mod sink;

pub use archive::ArchiveSink;
pub use directory::DirectorySink;
pub use error::{OutputError, OutputResult};
pub use sink::{sink_for, OutputSink, StreamSink};
