//! File-backed [`Application`]: a YAML description of services, resources
//! and patches.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use serde::Deserialize;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::application::{Application, BuildSpec};
use crate::context::StratumConfig;
use crate::error::{CoreError, CoreResult};
use crate::item::{PatchTarget, ResourceItem};
use crate::layer::BASE_LAYER;
use crate::services::{ingress_items, ServiceSpec};

fn default_layer() -> String {
    BASE_LAYER.to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ResourceDecl {
    name: String,
    #[serde(default = "default_layer")]
    layer: String,
    object: serde_yaml::Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct PatchDecl {
    name: String,
    #[serde(default = "default_layer")]
    layer: String,
    patch: serde_yaml::Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct JsonPatchDecl {
    target: PatchTarget,
    #[serde(default = "default_layer")]
    layer: String,
    patch: serde_json::Value,
}

/// Application described by a YAML file.
///
/// ```yaml
/// name: shop
/// images: [redis:7]
/// builds:
///   - { name: shop/web, context: ./web, main: Dockerfile }
/// services:
///   - { name: web, image: shop/web, port: 8080, expose: true }
/// include: [./manifests]
/// resources: [{ name: cm.yaml, object: { ... } }]
/// patches: [{ name: replicas.yaml, layer: prod, patch: { ... } }]
/// jsonPatches: [{ target: { apiVersion: v1, kind: Service, name: web }, patch: [ ... ] }]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AppDescriptor {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    images: Vec<String>,
    #[serde(default)]
    builds: Vec<BuildSpec>,
    #[serde(default)]
    services: Vec<ServiceSpec>,
    #[serde(default)]
    include: Vec<PathBuf>,
    #[serde(default)]
    resources: Vec<ResourceDecl>,
    #[serde(default)]
    patches: Vec<PatchDecl>,
    #[serde(default)]
    json_patches: Vec<JsonPatchDecl>,
    #[serde(skip)]
    root: PathBuf,
}

impl AppDescriptor {
    /// Load a descriptor; relative paths resolve against its directory.
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        debug!("Reading application description from {:?}", path);

        let content = fs::read_to_string(path).map_err(|e| {
            CoreError::contract(format!(
                "cannot read application description {}: {}",
                path.display(),
                e
            ))
        })?;
        let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::from_yaml(&content, root).map_err(|e| match e {
            CoreError::ResourceContract(message) => {
                CoreError::contract(format!("{}: {}", path.display(), message))
            }
            other => other,
        })
    }

    /// Parse a descriptor from YAML text.
    pub fn from_yaml(content: &str, root: impl Into<PathBuf>) -> CoreResult<Self> {
        let mut descriptor: AppDescriptor = serde_yaml::from_str(content)
            .map_err(|e| CoreError::contract(format!("invalid application description: {}", e)))?;
        descriptor.root = root.into();

        for service in &descriptor.services {
            service.validate()?;
        }
        for build in &mut descriptor.builds {
            if build.context.is_relative() {
                build.context = descriptor.root.join(&build.context);
            }
        }

        info!(
            "Loaded application {} ({} service(s), {} build(s))",
            descriptor.name.as_deref().unwrap_or("<unnamed>"),
            descriptor.services.len(),
            descriptor.builds.len()
        );
        Ok(descriptor)
    }

    pub fn services(&self) -> &[ServiceSpec] {
        &self.services
    }

    /// Every `*.yaml`/`*.yml` file under the include directories, as base
    /// resources named after their path below the include directory, with
    /// separators turned into `-` (`a/cm.yaml` becomes `a-cm.yaml`).
    fn included_items(&self) -> CoreResult<Vec<ResourceItem>> {
        let mut items = Vec::new();
        for dir in &self.include {
            let dir = self.root.join(dir);
            if !dir.is_dir() {
                return Err(CoreError::contract(format!(
                    "include directory not found: {}",
                    dir.display()
                )));
            }

            for entry in WalkDir::new(&dir)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path();
                let is_yaml = path
                    .extension()
                    .is_some_and(|ext| ext == "yaml" || ext == "yml");
                if !path.is_file() || !is_yaml {
                    continue;
                }

                let content = fs::read_to_string(path)?;
                let object: serde_yaml::Value = serde_yaml::from_str(&content).map_err(|e| {
                    CoreError::contract(format!("invalid manifest {}: {}", path.display(), e))
                })?;
                let name = included_name(&dir, path);
                debug!("Including {} as `{}`", path.display(), name);
                items.push(ResourceItem::resource(name, object));
            }
        }
        Ok(items)
    }
}

fn included_name(dir: &Path, path: &Path) -> String {
    path.strip_prefix(dir)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("-")
}

impl Application for AppDescriptor {
    fn name(&self) -> Option<String> {
        self.name.clone()
    }

    fn resources(&self, config: &StratumConfig) -> CoreResult<Vec<ResourceItem>> {
        let mut items = Vec::new();

        for service in &self.services {
            items.extend(service.base_items()?);
        }
        items.extend(self.included_items()?);

        items.extend(self.resources.iter().map(|decl| {
            ResourceItem::resource(&decl.name, decl.object.clone()).in_layer(&decl.layer)
        }));
        items.extend(self.patches.iter().map(|decl| {
            ResourceItem::structural_patch(&decl.name, decl.patch.clone()).in_layer(&decl.layer)
        }));
        items.extend(self.json_patches.iter().map(|decl| {
            ResourceItem::json_patch(decl.patch.clone(), decl.target.clone()).in_layer(&decl.layer)
        }));

        for context in &config.contexts {
            items.extend(ingress_items(context, &self.services)?);
        }

        Ok(items)
    }

    fn images(&self) -> Vec<String> {
        let images: IndexSet<String> = self
            .images
            .iter()
            .cloned()
            .chain(self.services.iter().map(|s| s.image.clone()))
            .chain(self.builds.iter().map(|b| b.name.clone()))
            .collect();
        images.into_iter().collect()
    }

    fn builds(&self) -> Vec<BuildSpec> {
        self.builds.clone()
    }
}
