//! # stratum_core
//!
//! Multi-context manifest synthesis for Stratum.
//!
//! One application description is laid out as a `base` layer plus one
//! overlay per deployment context. Each overlay references the base, carries
//! only what differs for its context, and gets its own ordered list of image
//! rewrite rules.
//!
//! ## Pipeline
//!
//! 1. [`ResourceCollector`] pulls resource items from an [`Application`].
//! 2. [`LayerRegistry`] accumulates them per layer, keyed by file name.
//! 3. [`ImageRewriteResolver`] computes each context's image rules.
//! 4. [`KustomizationEmitter`] describes every layer as a kustomization.
//! 5. [`synth::render`] turns layers into file contents for an output sink.
//!
//! ## Example
//!
//! ```rust,no_run
//! use stratum_core::{AppDescriptor, Diagnostics, StratumConfig, Synthesizer};
//!
//! let mut diagnostics = Diagnostics::new();
//! let config = StratumConfig::load("contexts.yaml", &mut diagnostics);
//! let app = AppDescriptor::load("app.yaml").unwrap();
//!
//! let synthesis = Synthesizer::new(&app, &config).run(diagnostics).unwrap();
//! for layer in &synthesis.layers {
//!     println!("{}: {} file(s)", layer.name, layer.files.len());
//! }
//! ```

pub mod application;
pub mod context;
pub mod descriptor;
pub mod diagnostics;
pub mod error;
pub mod image;
pub mod item;
pub mod kustomization;
pub mod layer;
pub mod resolver;
pub mod services;
pub mod synth;

pub use application::{Application, BuildSpec, ResourceCollector};
pub use context::{Context, IksIngress, Ingress, IngressConfig, StratumConfig};
pub use descriptor::AppDescriptor;
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use error::{CoreError, CoreResult};
pub use image::{rewrite_image, ImageRef, ImageRule};
pub use item::{PatchTarget, ResourceItem};
pub use kustomization::{
    Json6902Patch, Json6902Target, Kustomization, KustomizationEmitter, APPLICATION_ANNOTATION,
    KUSTOMIZATION_FILE,
};
pub use layer::{JsonPatchEntry, Layer, LayerRegistry, BASE_LAYER};
pub use resolver::ImageRewriteResolver;
pub use services::{ingress_items, ServiceSpec};
pub use synth::{render, RenderedLayer, Synthesis, Synthesizer};
