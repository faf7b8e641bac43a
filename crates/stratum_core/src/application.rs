//! The application contract and the collector that reads from it.

use std::path::PathBuf;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::context::StratumConfig;
use crate::error::CoreResult;
use crate::item::ResourceItem;

/// An image that has to be built before it can be deployed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildSpec {
    /// Image reference produced by the build.
    pub name: String,
    /// Build context directory.
    pub context: PathBuf,
    /// Dockerfile, relative to the build context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<PathBuf>,
}

/// What an application description must provide.
#[cfg_attr(test, mockall::automock)]
pub trait Application {
    /// Identifier used for annotations and output naming.
    fn name(&self) -> Option<String>;

    /// Every resource, structural patch and JSON patch, for all contexts.
    fn resources(&self, config: &StratumConfig) -> CoreResult<Vec<ResourceItem>>;

    /// Image references used by the deployed resources.
    fn images(&self) -> Vec<String>;

    /// Images that need a build step.
    fn builds(&self) -> Vec<BuildSpec>;
}

/// Adapter between an [`Application`] and the layer registry.
pub struct ResourceCollector<'a> {
    app: &'a dyn Application,
}

impl<'a> ResourceCollector<'a> {
    pub fn new(app: &'a dyn Application) -> Self {
        Self { app }
    }

    /// Items in the order the application produced them.
    ///
    /// Each item is checked as it is pulled; the first contract violation
    /// surfaces as an `Err` and callers are expected to stop there.
    #[instrument(skip_all)]
    pub fn collect(
        &self,
        config: &StratumConfig,
    ) -> CoreResult<impl Iterator<Item = CoreResult<ResourceItem>>> {
        let items = self.app.resources(config)?;
        debug!("Application produced {} item(s)", items.len());
        Ok(items.into_iter().map(|item| -> CoreResult<ResourceItem> {
            item.validate()?;
            Ok(item)
        }))
    }

    /// Image references deduplicated by exact string, first occurrence kept.
    pub fn images(&self) -> Vec<String> {
        self.app
            .images()
            .into_iter()
            .collect::<IndexSet<String>>()
            .into_iter()
            .collect()
    }

    pub fn name(&self) -> Option<String> {
        self.app.name().filter(|name| !name.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::item::PatchTarget;

    #[test]
    fn test_images_are_deduplicated_in_order() {
        let mut app = MockApplication::new();
        app.expect_images()
            .returning(|| vec!["b".into(), "a".into(), "b".into(), "a:1".into()]);

        let collector = ResourceCollector::new(&app);
        assert_eq!(collector.images(), vec!["b", "a", "a:1"]);
    }

    #[test]
    fn test_collect_validates_items() {
        let mut app = MockApplication::new();
        app.expect_resources().returning(|_| {
            Ok(vec![
                ResourceItem::resource("ok.yaml", serde_yaml::Value::Null),
                ResourceItem::json_patch(
                    serde_json::json!({}),
                    PatchTarget::new("v1", "Service", "x"),
                ),
            ])
        });

        let collector = ResourceCollector::new(&app);
        let results: Vec<_> = collector.collect(&StratumConfig::default()).unwrap().collect();
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(CoreError::ResourceContract(_))));
    }

    #[test]
    fn test_collect_tolerates_empty_application() {
        let mut app = MockApplication::new();
        app.expect_resources().returning(|_| Ok(Vec::new()));

        let collector = ResourceCollector::new(&app);
        assert_eq!(collector.collect(&StratumConfig::default()).unwrap().count(), 0);
    }

    #[test]
    fn test_empty_name_is_no_name() {
        let mut app = MockApplication::new();
        app.expect_name().returning(|| Some(String::new()));
        assert_eq!(ResourceCollector::new(&app).name(), None);
    }
}
