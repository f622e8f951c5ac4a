use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::{Resource, ResourceExt};

use super::app_labels;
use crate::api::v1alpha1::LLMDeployment;

/// Build the Service fronting the serving pods. The client-facing port and
/// the container port are always equal, there is no remapping.
pub fn serving_service(llm_deployment: &LLMDeployment) -> Service {
    let name = llm_deployment.name_any();

    Service {
        metadata: ObjectMeta {
            name: Some(name.clone()),
            namespace: llm_deployment.metadata.namespace.clone(),
            owner_references: llm_deployment
                .controller_owner_ref(&())
                .map(|owner_ref| vec![owner_ref]),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: Some(app_labels(&name)),
            ports: Some(vec![ServicePort {
                name: Some("http".to_string()),
                port: llm_deployment.spec.port,
                target_port: Some(IntOrString::Int(llm_deployment.spec.port)),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}
