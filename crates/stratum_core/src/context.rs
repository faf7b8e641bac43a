//! Deployment contexts and the configuration file that declares them.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::diagnostics::Diagnostics;
use crate::error::{CoreError, CoreResult};
use crate::image::ImageRule;
use crate::layer::BASE_LAYER;

static CONTEXT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9._-]*[A-Za-z0-9])?$").expect("valid context name regex")
});

/// IBM Cloud Kubernetes Service ingress settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IksIngress {
    pub subdomain: String,
    pub tlssecret: String,
}

/// Ingress block as written in the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct IngressConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iks: Option<IksIngress>,
}

/// How exposed services are reached in a context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ingress {
    NodePort(u16),
    Iks(IksIngress),
}

impl IngressConfig {
    /// Resolve the mutually exclusive ingress styles.
    pub fn mode(&self) -> Result<Option<Ingress>, String> {
        match (self.node_port, &self.iks) {
            (Some(_), Some(_)) => Err("`nodePort` and `iks` are mutually exclusive".to_string()),
            (Some(port), None) => Ok(Some(Ingress::NodePort(port))),
            (None, Some(iks)) => Ok(Some(Ingress::Iks(iks.clone()))),
            (None, None) => Ok(None),
        }
    }
}

/// A named target environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Context {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingress: Option<IngressConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageRule>,
}

impl Context {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ingress: None,
            registry: None,
            image_tag: None,
            images: Vec::new(),
        }
    }

    pub fn with_registry(mut self, registry: impl Into<String>) -> Self {
        self.registry = Some(registry.into());
        self
    }

    pub fn with_image_tag(mut self, tag: impl Into<String>) -> Self {
        self.image_tag = Some(tag.into());
        self
    }

    pub fn with_image(mut self, rule: ImageRule) -> Self {
        self.images.push(rule);
        self
    }

    pub fn with_ingress(mut self, ingress: Ingress) -> Self {
        self.ingress = Some(match ingress {
            Ingress::NodePort(port) => IngressConfig {
                node_port: Some(port),
                iks: None,
            },
            Ingress::Iks(iks) => IngressConfig {
                node_port: None,
                iks: Some(iks),
            },
        });
        self
    }

    /// The effective ingress style; conflicting settings are rejected at load time.
    pub fn ingress_mode(&self) -> Option<Ingress> {
        self.ingress.as_ref().and_then(|i| i.mode().ok().flatten())
    }
}

/// The set of contexts loaded for a run.
#[derive(Debug, Clone, Default)]
pub struct StratumConfig {
    pub path: Option<PathBuf>,
    pub contexts: Vec<Context>,
    /// Every context the file declared, including those left out by `select`.
    declared: Vec<String>,
}

impl StratumConfig {
    pub fn new(contexts: Vec<Context>) -> Self {
        Self {
            path: None,
            declared: contexts.iter().map(|c| c.name.clone()).collect(),
            contexts,
        }
    }

    /// Load contexts from a YAML (or `.toml`) file.
    ///
    /// Never fails: every problem is recorded in `diagnostics` and the run
    /// continues with whatever contexts could be read.
    pub fn load(path: impl AsRef<Path>, diagnostics: &mut Diagnostics) -> Self {
        let path = path.as_ref();
        let mut config = Self {
            path: Some(path.to_path_buf()),
            ..Self::default()
        };

        let document = match Self::read_document(path) {
            Ok(document) => document,
            Err(e) => {
                diagnostics.record(&CoreError::Configuration {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                });
                return config;
            }
        };

        let entries = match document.get("contexts") {
            Some(serde_yaml::Value::Sequence(entries)) => entries.clone(),
            Some(_) => {
                config.warn(diagnostics, "`contexts` must be a list");
                return config;
            }
            None => {
                config.warn(diagnostics, "no `contexts` list found");
                return config;
            }
        };

        for (index, entry) in entries.into_iter().enumerate() {
            match serde_yaml::from_value::<Context>(entry) {
                Ok(context) => config.push_validated(context, diagnostics),
                Err(e) => config.warn(diagnostics, format!("context #{}: {}", index + 1, e)),
            }
        }

        info!(
            "Loaded {} context(s) from {}",
            config.contexts.len(),
            path.display()
        );
        config
    }

    fn read_document(path: &Path) -> CoreResult<serde_yaml::Value> {
        debug!("Reading context configuration from {:?}", path);
        let content = fs::read_to_string(path)?;
        let is_toml = path.extension().is_some_and(|ext| ext == "toml");
        let document = if is_toml {
            toml::from_str::<serde_yaml::Value>(&content)?
        } else {
            serde_yaml::from_str::<serde_yaml::Value>(&content)?
        };
        Ok(document)
    }

    fn push_validated(&mut self, mut context: Context, diagnostics: &mut Diagnostics) {
        if !CONTEXT_NAME.is_match(&context.name) {
            self.warn(
                diagnostics,
                format!("invalid context name `{}`", context.name),
            );
            return;
        }
        if context.name == BASE_LAYER {
            self.warn(
                diagnostics,
                format!("context name `{}` is reserved for the base layer", BASE_LAYER),
            );
            return;
        }
        if self.get(&context.name).is_some() {
            self.warn(
                diagnostics,
                format!("duplicate context `{}` ignored", context.name),
            );
            return;
        }
        if let Some(Err(message)) = context.ingress.as_ref().map(IngressConfig::mode) {
            self.warn(
                diagnostics,
                format!("context `{}`: {}; ingress ignored", context.name, message),
            );
            context.ingress = None;
        }
        if let Some(rule) = context.images.iter().find(|rule| rule.name.is_empty()) {
            self.warn(
                diagnostics,
                format!(
                    "context `{}`: image rule without a name dropped ({:?})",
                    context.name, rule
                ),
            );
            context.images.retain(|rule| !rule.name.is_empty());
        }
        if context.registry.as_deref().is_some_and(str::is_empty) {
            context.registry = None;
        }

        self.declared.push(context.name.clone());
        self.contexts.push(context);
    }

    fn warn(&self, diagnostics: &mut Diagnostics, message: impl Into<String>) {
        let error = CoreError::Configuration {
            path: self.path.clone().unwrap_or_default(),
            message: message.into(),
        };
        diagnostics.record(&error);
    }

    pub fn get(&self, name: &str) -> Option<&Context> {
        self.contexts.iter().find(|c| c.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.contexts.iter().map(|c| c.name.as_str())
    }

    /// Whether the configuration knows `name`, selected or not.
    pub fn is_declared(&self, name: &str) -> bool {
        self.get(name).is_some() || self.declared.iter().any(|d| d == name)
    }

    /// Restrict the configuration to the requested contexts.
    ///
    /// An empty request keeps every context. Unknown names are reported as
    /// `ContextNotFound` warnings.
    pub fn select(&self, requested: &[String], diagnostics: &mut Diagnostics) -> StratumConfig {
        if requested.is_empty() {
            return self.clone();
        }

        let mut contexts: Vec<Context> = Vec::new();
        for name in requested {
            match self.get(name) {
                Some(context) if !contexts.iter().any(|c| c.name == context.name) => {
                    contexts.push(context.clone());
                }
                Some(_) => {}
                None => diagnostics.record(&CoreError::ContextNotFound(name.clone())),
            }
        }

        StratumConfig {
            path: self.path.clone(),
            contexts,
            declared: self.declared.clone(),
        }
    }
}
