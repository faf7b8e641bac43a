//! Resource items produced by an application.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::layer::BASE_LAYER;

/// Resource a JSON patch applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PatchTarget {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl PatchTarget {
    pub fn new(
        api_version: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
            name: name.into(),
            namespace: None,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Split `apiVersion` into `(group, version)`; the core group is empty.
    pub fn group_version(&self) -> (&str, &str) {
        match self.api_version.split_once('/') {
            Some((group, version)) => (group, version),
            None => ("", self.api_version.as_str()),
        }
    }

    /// File name the patch is written to within its layer.
    pub fn file_name(&self) -> String {
        let (group, version) = self.group_version();
        let mut parts = Vec::with_capacity(5);
        if !group.is_empty() {
            parts.push(group);
        }
        parts.push(version);
        parts.push(self.kind.as_str());
        if let Some(namespace) = &self.namespace {
            parts.push(namespace.as_str());
        }
        parts.push(self.name.as_str());
        format!("{}.patch.json", parts.join("_").to_lowercase())
    }

    pub fn validate(&self) -> CoreResult<()> {
        let (_, version) = self.group_version();
        if version.is_empty() || self.kind.is_empty() || self.name.is_empty() {
            return Err(CoreError::contract(format!(
                "JSON patch target needs apiVersion, kind and name: {:?}",
                self
            )));
        }
        Ok(())
    }
}

/// One unit of output an application contributes to a layer.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceItem {
    /// A manifest emitted verbatim under `name`.
    Resource {
        name: String,
        object: serde_yaml::Value,
        layer: String,
    },
    /// A strategic-merge patch file.
    StructuralPatch {
        name: String,
        patch: serde_yaml::Value,
        layer: String,
    },
    /// An RFC 6902 operation list plus its target.
    JsonPatch {
        patch: serde_json::Value,
        target: PatchTarget,
        layer: String,
    },
}

impl ResourceItem {
    pub fn resource(name: impl Into<String>, object: serde_yaml::Value) -> Self {
        Self::Resource {
            name: name.into(),
            object,
            layer: BASE_LAYER.to_string(),
        }
    }

    pub fn structural_patch(name: impl Into<String>, patch: serde_yaml::Value) -> Self {
        Self::StructuralPatch {
            name: name.into(),
            patch,
            layer: BASE_LAYER.to_string(),
        }
    }

    pub fn json_patch(patch: serde_json::Value, target: PatchTarget) -> Self {
        Self::JsonPatch {
            patch,
            target,
            layer: BASE_LAYER.to_string(),
        }
    }

    /// Move the item into another layer.
    pub fn in_layer(mut self, name: impl Into<String>) -> Self {
        match &mut self {
            Self::Resource { layer, .. }
            | Self::StructuralPatch { layer, .. }
            | Self::JsonPatch { layer, .. } => *layer = name.into(),
        }
        self
    }

    pub fn layer(&self) -> &str {
        match self {
            Self::Resource { layer, .. }
            | Self::StructuralPatch { layer, .. }
            | Self::JsonPatch { layer, .. } => layer,
        }
    }

    /// The key this item occupies in its layer.
    pub fn file_name(&self) -> String {
        match self {
            Self::Resource { name, .. } | Self::StructuralPatch { name, .. } => name.clone(),
            Self::JsonPatch { target, .. } => target.file_name(),
        }
    }

    /// Reject items that cannot be written as a layer file.
    pub fn validate(&self) -> CoreResult<()> {
        if self.layer().is_empty() {
            return Err(CoreError::contract(format!(
                "item `{}` has an empty layer name",
                self.file_name()
            )));
        }
        match self {
            Self::Resource { name, .. } | Self::StructuralPatch { name, .. } => {
                if name.is_empty() || name.contains('/') || name.contains('\\') || name == ".." {
                    return Err(CoreError::contract(format!(
                        "invalid file name `{}` for layer `{}`",
                        name,
                        self.layer()
                    )));
                }
                Ok(())
            }
            Self::JsonPatch { patch, target, .. } => {
                target.validate()?;
                if !patch.is_array() {
                    return Err(CoreError::contract(format!(
                        "JSON patch for {}/{} must be a list of operations",
                        target.kind, target.name
                    )));
                }
                Ok(())
            }
        }
    }
}
