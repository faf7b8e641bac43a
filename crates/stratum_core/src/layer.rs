//! Layers and the registry that accumulates them.

use indexmap::IndexMap;
use tracing::debug;

use crate::image::ImageRule;
use crate::item::{PatchTarget, ResourceItem};

/// Name of the layer every context overlays.
pub const BASE_LAYER: &str = "base";

/// A JSON patch together with the resource it targets.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonPatchEntry {
    pub patch: serde_json::Value,
    pub target: PatchTarget,
}

/// A named bundle of resources, patches and image rules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layer {
    pub name: String,
    pub resources: IndexMap<String, serde_yaml::Value>,
    pub patches: IndexMap<String, serde_yaml::Value>,
    pub json_patches: IndexMap<String, JsonPatchEntry>,
    pub bases: Vec<String>,
    pub images: Vec<ImageRule>,
}

impl Layer {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let bases = if name == BASE_LAYER {
            Vec::new()
        } else {
            vec![BASE_LAYER.to_string()]
        };
        Self {
            name,
            bases,
            ..Default::default()
        }
    }

    pub fn is_base(&self) -> bool {
        self.name == BASE_LAYER
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
            && self.patches.is_empty()
            && self.json_patches.is_empty()
            && self.images.is_empty()
    }
}

/// Owns the base layer and one layer per context.
///
/// A pure accumulator: entries are upserted by file name, so a later write
/// for the same key replaces the earlier value in place.
#[derive(Debug, Default)]
pub struct LayerRegistry {
    layers: IndexMap<String, Layer>,
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the named layer, creating it on first reference.
    pub fn layer(&mut self, name: &str) -> &mut Layer {
        self.layers.entry(name.to_string()).or_insert_with(|| {
            debug!("Creating layer `{}`", name);
            Layer::new(name)
        })
    }

    pub fn get(&self, name: &str) -> Option<&Layer> {
        self.layers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.layers.contains_key(name)
    }

    pub fn add_resource(&mut self, object: serde_yaml::Value, name: &str, layer: &str) {
        self.layer(layer).resources.insert(name.to_string(), object);
    }

    pub fn add_patch(&mut self, patch: serde_yaml::Value, name: &str, layer: &str) {
        self.layer(layer).patches.insert(name.to_string(), patch);
    }

    pub fn add_json_patch(&mut self, patch: serde_json::Value, target: PatchTarget, layer: &str) {
        self.layer(layer)
            .json_patches
            .insert(target.file_name(), JsonPatchEntry { patch, target });
    }

    /// Route an item to the upsert matching its variant.
    pub fn apply(&mut self, item: ResourceItem) {
        match item {
            ResourceItem::Resource {
                name,
                object,
                layer,
            } => self.add_resource(object, &name, &layer),
            ResourceItem::StructuralPatch { name, patch, layer } => {
                self.add_patch(patch, &name, &layer)
            }
            ResourceItem::JsonPatch {
                patch,
                target,
                layer,
            } => self.add_json_patch(patch, target, &layer),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.values()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}
