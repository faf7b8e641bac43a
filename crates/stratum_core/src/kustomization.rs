//! Kustomization manifests emitted for each layer.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::image::ImageRule;
use crate::item::PatchTarget;
use crate::layer::{Layer, LayerRegistry};

pub const KUSTOMIZATION_FILE: &str = "kustomization.yaml";

/// Annotation carrying the owning application's name.
pub const APPLICATION_ANNOTATION: &str = "stratum.dev/application";

const API_VERSION: &str = "kustomize.config.k8s.io/v1beta1";
const KIND: &str = "Kustomization";

/// Target selector in kustomize's `patchesJson6902` form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Json6902Target {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub group: String,
    pub version: String,
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl From<&PatchTarget> for Json6902Target {
    fn from(target: &PatchTarget) -> Self {
        let (group, version) = target.group_version();
        Self {
            group: group.to_string(),
            version: version.to_string(),
            kind: target.kind.clone(),
            name: target.name.clone(),
            namespace: target.namespace.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Json6902Patch {
    pub path: String,
    pub target: Json6902Target,
}

/// The `kustomization.yaml` of a single layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kustomization {
    pub api_version: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bases: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patches_strategic_merge: Vec<String>,
    #[serde(
        rename = "patchesJson6902",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub patches_json: Vec<Json6902Patch>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageRule>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub common_annotations: IndexMap<String, String>,
}

impl Default for Kustomization {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            bases: Vec::new(),
            resources: Vec::new(),
            patches_strategic_merge: Vec::new(),
            patches_json: Vec::new(),
            images: Vec::new(),
            common_annotations: IndexMap::new(),
        }
    }
}

/// Produces one kustomization per layer. Pure data, no I/O.
#[derive(Debug, Default)]
pub struct KustomizationEmitter {
    application: Option<String>,
}

impl KustomizationEmitter {
    pub fn new(application: Option<String>) -> Self {
        Self { application }
    }

    pub fn emit(&self, layer: &Layer) -> Kustomization {
        let mut common_annotations = IndexMap::new();
        if let Some(name) = &self.application {
            common_annotations.insert(APPLICATION_ANNOTATION.to_string(), name.clone());
        }

        Kustomization {
            bases: layer.bases.iter().map(|base| format!("../{}", base)).collect(),
            resources: layer.resources.keys().cloned().collect(),
            patches_strategic_merge: layer.patches.keys().cloned().collect(),
            patches_json: layer
                .json_patches
                .iter()
                .map(|(path, entry)| Json6902Patch {
                    path: path.clone(),
                    target: Json6902Target::from(&entry.target),
                })
                .collect(),
            images: if layer.is_base() {
                Vec::new()
            } else {
                layer.images.clone()
            },
            common_annotations,
            ..Kustomization::default()
        }
    }

    /// Emit every layer, in registry order.
    pub fn emit_all<'r>(
        &'r self,
        registry: &'r LayerRegistry,
    ) -> impl Iterator<Item = (&'r Layer, Kustomization)> + 'r {
        registry.iter().map(move |layer| (layer, self.emit(layer)))
    }
}
