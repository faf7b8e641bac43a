//! Service shorthand: a Deployment plus a Service, and how each context
//! exposes it.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::context::{Context, IksIngress, Ingress};
use crate::error::{CoreError, CoreResult};
use crate::item::ResourceItem;

fn default_replicas() -> u32 {
    1
}

/// A long-running workload declared by the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ServiceSpec {
    pub name: String,
    pub image: String,
    pub port: u16,
    #[serde(default = "default_replicas")]
    pub replicas: u32,
    /// Reachable from outside the cluster through the context's ingress.
    #[serde(default)]
    pub expose: bool,
}

impl ServiceSpec {
    pub fn new(name: impl Into<String>, image: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            port,
            replicas: default_replicas(),
            expose: false,
        }
    }

    pub fn exposed(mut self) -> Self {
        self.expose = true;
        self
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.name.is_empty() || self.image.is_empty() {
            return Err(CoreError::contract(format!(
                "service needs a name and an image: {:?}",
                self
            )));
        }
        if self.port == 0 {
            return Err(CoreError::contract(format!(
                "service `{}` needs a non-zero port",
                self.name
            )));
        }
        Ok(())
    }

    /// Deployment and Service manifests for the base layer.
    pub fn base_items(&self) -> CoreResult<Vec<ResourceItem>> {
        let labels = json!({ "app": self.name });
        let deployment = json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": { "name": self.name, "labels": labels },
            "spec": {
                "replicas": self.replicas,
                "selector": { "matchLabels": labels },
                "template": {
                    "metadata": { "labels": labels },
                    "spec": {
                        "containers": [{
                            "name": self.name,
                            "image": self.image,
                            "ports": [{ "containerPort": self.port }],
                        }],
                    },
                },
            },
        });
        let service = json!({
            "apiVersion": "v1",
            "kind": "Service",
            "metadata": { "name": self.name, "labels": labels },
            "spec": {
                "selector": labels,
                "ports": [{ "port": self.port, "targetPort": self.port }],
            },
        });

        Ok(vec![
            ResourceItem::resource(
                format!("{}-deployment.yaml", self.name),
                serde_yaml::to_value(deployment)?,
            ),
            ResourceItem::resource(
                format!("{}-service.yaml", self.name),
                serde_yaml::to_value(service)?,
            ),
        ])
    }
}

/// Items a context needs so its exposed services are reachable.
///
/// Node ports are handed out sequentially from the configured one, in
/// service declaration order.
pub fn ingress_items(context: &Context, services: &[ServiceSpec]) -> CoreResult<Vec<ResourceItem>> {
    let Some(ingress) = context.ingress_mode() else {
        return Ok(Vec::new());
    };

    let mut items = Vec::new();
    for (index, service) in services.iter().filter(|s| s.expose).enumerate() {
        let item = match &ingress {
            Ingress::NodePort(first) => node_port_patch(service, u32::from(*first) + index as u32)?,
            Ingress::Iks(iks) => iks_ingress(service, iks)?,
        };
        items.push(item.in_layer(&context.name));
    }
    Ok(items)
}

fn node_port_patch(service: &ServiceSpec, node_port: u32) -> CoreResult<ResourceItem> {
    let patch = json!({
        "apiVersion": "v1",
        "kind": "Service",
        "metadata": { "name": service.name },
        "spec": {
            "type": "NodePort",
            "ports": [{ "port": service.port, "nodePort": node_port }],
        },
    });
    Ok(ResourceItem::structural_patch(
        format!("{}-service-nodeport.yaml", service.name),
        serde_yaml::to_value(patch)?,
    ))
}

fn iks_ingress(service: &ServiceSpec, iks: &IksIngress) -> CoreResult<ResourceItem> {
    let host = format!("{}.{}", service.name, iks.subdomain);
    let ingress = json!({
        "apiVersion": "networking.k8s.io/v1",
        "kind": "Ingress",
        "metadata": { "name": service.name },
        "spec": {
            "tls": [{ "hosts": [host], "secretName": iks.tlssecret }],
            "rules": [{
                "host": host,
                "http": {
                    "paths": [{
                        "path": "/",
                        "pathType": "Prefix",
                        "backend": {
                            "service": {
                                "name": service.name,
                                "port": { "number": service.port },
                            },
                        },
                    }],
                },
            }],
        },
    });
    Ok(ResourceItem::resource(
        format!("{}-ingress.yaml", service.name),
        serde_yaml::to_value(ingress)?,
    ))
}
