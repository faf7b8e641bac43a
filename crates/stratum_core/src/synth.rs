//! The synthesis pipeline: collect, layer, resolve images, emit, render.

use indexmap::IndexMap;
use tracing::{debug, info, instrument};

use crate::application::{Application, ResourceCollector};
use crate::context::StratumConfig;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::{CoreError, CoreResult};
use crate::image::ImageRef;
use crate::kustomization::{Kustomization, KustomizationEmitter, KUSTOMIZATION_FILE};
use crate::layer::{Layer, LayerRegistry, BASE_LAYER};
use crate::resolver::ImageRewriteResolver;

/// A layer turned into file contents, ready for a sink.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedLayer {
    pub name: String,
    pub kustomization: Kustomization,
    /// File name to contents, `kustomization.yaml` last.
    pub files: IndexMap<String, String>,
}

impl RenderedLayer {
    pub fn file(&self, name: &str) -> Option<&str> {
        self.files.get(name).map(String::as_str)
    }
}

/// Everything a run produced.
#[derive(Debug)]
pub struct Synthesis {
    pub application: Option<String>,
    pub registry: LayerRegistry,
    pub layers: Vec<RenderedLayer>,
    pub diagnostics: Diagnostics,
}

impl Synthesis {
    pub fn layer(&self, name: &str) -> Option<&RenderedLayer> {
        self.layers.iter().find(|l| l.name == name)
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Builds every layer for one application and a set of contexts.
pub struct Synthesizer<'a> {
    app: &'a dyn Application,
    config: &'a StratumConfig,
}

impl<'a> Synthesizer<'a> {
    pub fn new(app: &'a dyn Application, config: &'a StratumConfig) -> Self {
        Self { app, config }
    }

    /// Run the pipeline.
    ///
    /// `diagnostics` carries warnings from earlier stages (configuration
    /// loading, context selection) and is returned inside the [`Synthesis`].
    /// Contract violations abort with an error and nothing is rendered.
    #[instrument(skip_all, fields(contexts = self.config.contexts.len()))]
    pub fn run(&self, mut diagnostics: Diagnostics) -> CoreResult<Synthesis> {
        let collector = ResourceCollector::new(self.app);
        let mut registry = LayerRegistry::new();

        registry.layer(BASE_LAYER);
        for context in &self.config.contexts {
            registry.layer(&context.name);
        }

        let mut count = 0usize;
        for item in collector.collect(self.config)? {
            let item = item?;
            if !registry.contains(item.layer()) {
                if self.config.is_declared(item.layer()) {
                    debug!(
                        "Skipping `{}` for unselected layer `{}`",
                        item.file_name(),
                        item.layer()
                    );
                } else {
                    diagnostics.warn(
                        DiagnosticKind::Configuration,
                        format!(
                            "`{}` targets unknown layer `{}`",
                            item.file_name(),
                            item.layer()
                        ),
                    );
                }
                continue;
            }
            registry.apply(item);
            count += 1;
        }
        info!("Collected {} item(s) into {} layer(s)", count, registry.len());

        // malformed references are reported once, not once per context
        let images: Vec<String> = collector
            .images()
            .into_iter()
            .filter(|image| match ImageRef::parse(image) {
                Ok(_) => true,
                Err(e) => {
                    diagnostics.record(&e);
                    false
                }
            })
            .collect();
        for context in &self.config.contexts {
            let rules =
                ImageRewriteResolver::new(context).resolve(images.as_slice(), &mut diagnostics);
            registry.layer(&context.name).images = rules;
        }

        let emitter = KustomizationEmitter::new(collector.name());
        let layers = emitter
            .emit_all(&registry)
            .map(|(layer, kustomization)| render(layer, kustomization))
            .collect::<CoreResult<Vec<_>>>()?;

        Ok(Synthesis {
            application: collector.name(),
            registry,
            layers,
            diagnostics,
        })
    }
}

/// Serialize a layer's entries and its kustomization.
///
/// Two entries that would land on the same file are a contract violation.
pub fn render(layer: &Layer, kustomization: Kustomization) -> CoreResult<RenderedLayer> {
    let mut files: IndexMap<String, String> = IndexMap::new();
    let mut insert = |name: &str, content: String| -> CoreResult<()> {
        if name == KUSTOMIZATION_FILE || files.insert(name.to_string(), content).is_some() {
            return Err(CoreError::contract(format!(
                "layer `{}` has more than one file named `{}`",
                layer.name, name
            )));
        }
        Ok(())
    };

    for (name, object) in &layer.resources {
        insert(name, serde_yaml::to_string(object)?)?;
    }
    for (name, patch) in &layer.patches {
        insert(name, serde_yaml::to_string(patch)?)?;
    }
    for (name, entry) in &layer.json_patches {
        insert(name, format!("{}\n", serde_json::to_string_pretty(&entry.patch)?))?;
    }

    files.insert(
        KUSTOMIZATION_FILE.to_string(),
        serde_yaml::to_string(&kustomization)?,
    );

    Ok(RenderedLayer {
        name: layer.name.clone(),
        kustomization,
        files,
    })
}
