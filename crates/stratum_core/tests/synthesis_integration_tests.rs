//! Integration tests for the synthesis pipeline.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use tempfile::tempdir;

use stratum_core::{
    AppDescriptor, Context, DiagnosticKind, Diagnostics, ImageRef, ImageRewriteResolver,
    ImageRule, StratumConfig, Synthesizer, BASE_LAYER,
};

const APP: &str = r#"
name: shop
images:
  - redis:7
builds:
  - { name: web, context: ./web }
services:
  - { name: web, image: web, port: 8080, expose: true }
  - { name: api, image: "team/api:1.4", port: 8000, expose: true }
  - { name: cache, image: "redis:7", port: 6379 }
resources:
  - name: settings.yaml
    object: { apiVersion: v1, kind: ConfigMap, metadata: { name: settings }, data: { mode: base } }
patches:
  - name: web-replicas.yaml
    layer: prod
    patch: { apiVersion: apps/v1, kind: Deployment, metadata: { name: web }, spec: { replicas: 4 } }
jsonPatches:
  - target: { apiVersion: v1, kind: ConfigMap, name: settings }
    layer: dev
    patch:
      - { op: replace, path: /data/mode, value: dev }
"#;

const CONTEXTS: &str = r#"
contexts:
  - name: dev
    ingress: { nodePort: 30080 }
    registry: reg.example.com
    imageTag: latest
  - name: prod
    ingress:
      iks: { subdomain: shop.example.com, tlssecret: shop-tls }
    registry: icr.io/shop
    imageTag: "2.0"
    images:
      - { name: redis, newName: icr.io/mirror/redis }
"#;

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

/// Test the full pipeline from files on disk.
#[test]
fn test_full_synthesis_from_files() {
    let temp = tempdir().unwrap();
    write(temp.path(), "app.yaml", APP);
    write(temp.path(), "contexts.yaml", CONTEXTS);

    let mut diagnostics = Diagnostics::new();
    let config = StratumConfig::load(temp.path().join("contexts.yaml"), &mut diagnostics);
    let app = AppDescriptor::load(temp.path().join("app.yaml")).unwrap();

    let synthesis = Synthesizer::new(&app, &config).run(diagnostics).unwrap();
    assert!(synthesis.is_clean(), "{:?}", synthesis.diagnostics);
    assert_eq!(synthesis.application.as_deref(), Some("shop"));

    // Base layer
    let base = synthesis.layer(BASE_LAYER).unwrap();
    assert_eq!(
        base.kustomization.resources,
        vec![
            "web-deployment.yaml",
            "web-service.yaml",
            "api-deployment.yaml",
            "api-service.yaml",
            "cache-deployment.yaml",
            "cache-service.yaml",
            "settings.yaml",
        ]
    );
    assert!(base.kustomization.bases.is_empty());
    assert!(base.kustomization.images.is_empty());

    // Dev overlay: node ports and a JSON patch
    let dev = synthesis.layer("dev").unwrap();
    assert_eq!(dev.kustomization.bases, vec!["../base"]);
    assert_eq!(
        dev.kustomization.patches_strategic_merge,
        vec!["web-service-nodeport.yaml", "api-service-nodeport.yaml"]
    );
    assert_eq!(dev.kustomization.patches_json.len(), 1);
    assert_eq!(dev.kustomization.patches_json[0].target.kind, "ConfigMap");
    assert!(dev.file("api-service-nodeport.yaml").unwrap().contains("nodePort: 30081"));
    assert_eq!(
        dev.kustomization.images,
        vec![
            ImageRule::new("team/api:1.4"),
            ImageRule::new("redis:7").with_new_name("reg.example.com/redis"),
            ImageRule::new("web")
                .with_new_name("reg.example.com/web")
                .with_new_tag("latest"),
        ]
    );

    // Prod overlay: ingresses, explicit rule first, redis suppressed by repository match
    let prod = synthesis.layer("prod").unwrap();
    assert_eq!(
        prod.kustomization.resources,
        vec!["web-ingress.yaml", "api-ingress.yaml"]
    );
    assert_eq!(prod.kustomization.patches_strategic_merge, vec!["web-replicas.yaml"]);
    assert_eq!(
        prod.kustomization.images,
        vec![
            ImageRule::new("redis").with_new_name("icr.io/mirror/redis"),
            ImageRule::new("team/api:1.4"),
            ImageRule::new("web")
                .with_new_name("icr.io/shop/web")
                .with_new_tag("2.0"),
        ]
    );
    let ingress = prod.file("web-ingress.yaml").unwrap();
    assert!(ingress.contains("host: web.shop.example.com"));
    assert!(ingress.contains("secretName: shop-tls"));

    // Every layer carries the application annotation
    for layer in &synthesis.layers {
        assert_eq!(
            layer.kustomization.common_annotations["stratum.dev/application"],
            "shop"
        );
    }
}

/// Base resources are never duplicated into a context layer.
#[test]
fn test_base_resources_stay_in_base() {
    let app = AppDescriptor::from_yaml(APP, "/apps/shop").unwrap();
    let config = StratumConfig::new(vec![Context::new("dev"), Context::new("prod")]);
    let synthesis = Synthesizer::new(&app, &config).run(Diagnostics::new()).unwrap();

    let base = synthesis.registry.get(BASE_LAYER).unwrap();
    for context in ["dev", "prod"] {
        let layer = synthesis.registry.get(context).unwrap();
        assert_eq!(layer.bases, vec![BASE_LAYER]);
        for name in base.resources.keys() {
            assert!(!layer.resources.contains_key(name), "{} duplicated in {}", name, context);
        }
    }

    let settings = &base.resources["settings.yaml"];
    assert_eq!(settings["data"]["mode"], serde_yaml::Value::from("base"));
}

/// A missing configuration still produces the base layer, with a warning.
#[test]
fn test_missing_configuration_produces_base_only() {
    let temp = tempdir().unwrap();
    let mut diagnostics = Diagnostics::new();
    let config = StratumConfig::load(temp.path().join("missing.yaml"), &mut diagnostics);

    let app = AppDescriptor::from_yaml(APP, temp.path()).unwrap();
    let synthesis = Synthesizer::new(&app, &config).run(diagnostics).unwrap();

    assert_eq!(synthesis.layers.len(), 1);
    // the unreadable file, then the prod and dev patches with nowhere to go
    assert_eq!(synthesis.diagnostics.count(DiagnosticKind::Configuration), 3);
}

/// Selecting an unknown context is a warning, the known ones are still built.
#[test]
fn test_context_selection() {
    let temp = tempdir().unwrap();
    write(temp.path(), "contexts.yaml", CONTEXTS);

    let mut diagnostics = Diagnostics::new();
    let config = StratumConfig::load(temp.path().join("contexts.yaml"), &mut diagnostics);
    let selected = config.select(&["prod".to_string(), "qa".to_string()], &mut diagnostics);

    let app = AppDescriptor::from_yaml(APP, temp.path()).unwrap();
    let synthesis = Synthesizer::new(&app, &selected).run(diagnostics).unwrap();

    let names: Vec<_> = synthesis.layers.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["base", "prod"]);
    assert_eq!(synthesis.diagnostics.count(DiagnosticKind::ContextNotFound), 1);
    // the dev-only JSON patch is not written anywhere
    assert!(synthesis
        .layers
        .iter()
        .all(|l| l.kustomization.patches_json.is_empty()));
}

/// Properties of the resolved image list over a mixed set of references.
#[test]
fn test_image_rule_properties() {
    let images = [
        "web",
        "web:1",
        "team/api",
        "team/api:2",
        "redis:7",
        "web",
        "localhost:5000/x",
        "a",
        "a:latest",
    ];
    let contexts = [
        Context::new("plain"),
        Context::new("reg").with_registry("reg.example.com"),
        Context::new("tag").with_image_tag("t"),
        Context::new("both")
            .with_registry("reg.example.com")
            .with_image_tag("t")
            .with_image(ImageRule::new("web").with_new_tag("pinned")),
    ];

    for context in &contexts {
        let mut diagnostics = Diagnostics::new();
        let resolver = ImageRewriteResolver::new(context);
        let rules = resolver.resolve(&images, &mut diagnostics);
        assert!(diagnostics.is_empty());

        // idempotent
        assert_eq!(rules, resolver.resolve(&images, &mut diagnostics));

        // explicit rules first
        let explicit = context.images.len();
        assert_eq!(&rules[..explicit], context.images.as_slice());

        let derived = &rules[explicit..];

        // no duplicate derived names
        let names: HashSet<_> = derived.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names.len(), derived.len());

        // tagged before untagged
        let pinned: Vec<bool> = derived
            .iter()
            .map(|r| ImageRef::parse(&r.name).unwrap().is_pinned())
            .collect();
        let first_untagged = pinned.iter().position(|p| !p).unwrap_or(pinned.len());
        assert!(pinned[first_untagged..].iter().all(|p| !p), "{:?}", derived);

        // explicit rules suppress derived ones by name or repository
        for rule in &context.images {
            assert!(derived.iter().all(|d| {
                let image = ImageRef::parse(&d.name).unwrap();
                d.name != rule.name && image.repository != rule.name
            }));
        }

        // "a" and "a:latest" are distinct rules
        assert!(derived.iter().any(|r| r.name == "a"));
        assert!(derived.iter().any(|r| r.name == "a:latest"));
    }
}
