use core::fmt;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use kube::api::{Api, Patch, PatchParams};
use kube::ResourceExt;
use tracing::info;

use crate::api::v1alpha1::{LLMDeployment, LLMModel};
use crate::serving::{serving_deployment, serving_service};
use crate::util::errors::{Error, Result};

pub const FIELD_MANAGER: &str = "llm-deployment-controller";

/// Whether a create-or-update found an existing object. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Created,
    Updated,
}

impl fmt::Display for ApplyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ApplyOutcome::Created => write!(f, "created"),
            ApplyOutcome::Updated => write!(f, "updated"),
        }
    }
}

/// Create or update the child Deployment serving the model.
///
/// The desired spec is applied over whatever is stored, unconditionally.
/// Returns the outcome together with the replica count the child currently
/// reports; availability is not awaited here, the poll cadence picks up
/// replica-count changes on later reconciles.
pub async fn apply_serving_deployment(
    client: &kube::Client,
    namespace: &str,
    llm_deployment: &LLMDeployment,
    model: &LLMModel,
) -> Result<(ApplyOutcome, i32)> {
    let deployments: Api<Deployment> = Api::namespaced(client.clone(), namespace);
    let name = llm_deployment.name_any();

    let existing = deployments
        .get_opt(&name)
        .await
        .map_err(Error::KubeError)?;

    let desired = serving_deployment(llm_deployment, model);
    let applied = deployments
        .patch(
            &name,
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Apply(&desired),
        )
        .await
        .map_err(Error::ChildApplyFailed)?;

    let outcome = if existing.is_some() {
        ApplyOutcome::Updated
    } else {
        ApplyOutcome::Created
    };
    info!("Deployment {} {}", name, outcome);

    let available_replicas = applied
        .status
        .and_then(|status| status.available_replicas)
        .unwrap_or(0);

    Ok((outcome, available_replicas))
}

/// Create or update the Service fronting the serving pods.
pub async fn apply_serving_service(
    client: &kube::Client,
    namespace: &str,
    llm_deployment: &LLMDeployment,
) -> Result<ApplyOutcome> {
    let services: Api<Service> = Api::namespaced(client.clone(), namespace);
    let name = llm_deployment.name_any();

    let existing = services.get_opt(&name).await.map_err(Error::KubeError)?;

    let desired = serving_service(llm_deployment);
    services
        .patch(
            &name,
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Apply(&desired),
        )
        .await
        .map_err(Error::ChildApplyFailed)?;

    let outcome = if existing.is_some() {
        ApplyOutcome::Updated
    } else {
        ApplyOutcome::Created
    };
    info!("Service {} {}", name, outcome);

    Ok(outcome)
}
