use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, PodSpec, PodTemplateSpec, ResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::{Resource, ResourceExt};

use super::{app_labels, SERVING_CONTAINER_NAME};
use crate::api::v1alpha1::{LLMDeployment, LLMModel};

/// Build the child Deployment serving the referenced model.
///
/// The object is rebuilt in full on every reconcile and applied over
/// whatever is currently stored, so the output must be a pure function of
/// the two specs.
pub fn serving_deployment(llm_deployment: &LLMDeployment, model: &LLMModel) -> Deployment {
    let name = llm_deployment.name_any();
    let labels = app_labels(&name);

    Deployment {
        metadata: ObjectMeta {
            name: Some(name),
            namespace: llm_deployment.metadata.namespace.clone(),
            owner_references: llm_deployment
                .controller_owner_ref(&())
                .map(|owner_ref| vec![owner_ref]),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(llm_deployment.spec.replicas),
            selector: LabelSelector {
                match_expressions: None,
                match_labels: Some(labels.clone()),
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: SERVING_CONTAINER_NAME.to_string(),
                        image: Some(model.spec.image.clone()),
                        ports: Some(vec![ContainerPort {
                            container_port: llm_deployment.spec.port,
                            name: Some("http".to_string()),
                            ..Default::default()
                        }]),
                        resources: serving_resources(model),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

// Requests and limits are pinned to the same quantity for each dimension
// the model declares. No separate request/limit tuning exists.
fn serving_resources(model: &LLMModel) -> Option<ResourceRequirements> {
    let mut quantities = BTreeMap::new();
    if let Some(cpu) = &model.spec.resources.cpu {
        quantities.insert("cpu".to_string(), Quantity(cpu.clone()));
    }
    if let Some(memory) = &model.spec.resources.memory {
        quantities.insert("memory".to_string(), Quantity(memory.clone()));
    }

    if quantities.is_empty() {
        return None;
    }

    Some(ResourceRequirements {
        requests: Some(quantities.clone()),
        limits: Some(quantities),
        ..Default::default()
    })
}
