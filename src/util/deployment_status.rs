use core::fmt;

use chrono::Utc;
use kube::api::{Api, Patch, PatchParams};
use serde_json::json;
use tracing::info;

use crate::api::v1alpha1::{
    DeploymentCondition, LLMDeployment, LLMDeploymentStatus, API_VERSION,
};
use crate::util::errors::{Error, Result};

// Constants for condition types
pub const AVAILABLE_CONDITION: &str = "Available";
pub const MODEL_NOT_FOUND_CONDITION: &str = "ModelNotFound";

// Field manager for status updates - must match the deployment controller's field manager
pub const STATUS_FIELD_MANAGER: &str = "llm-deployment-controller";

// Status reasons for conditions
#[derive(Debug, Clone, PartialEq)]
pub enum StatusReason {
    DeploymentAvailable,
    ModelNotFound,
}

impl fmt::Display for StatusReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StatusReason::DeploymentAvailable => write!(f, "DeploymentAvailable"),
            StatusReason::ModelNotFound => write!(f, "ModelNotFound"),
        }
    }
}

/// Status manager for LLMDeployment resources.
///
/// Writes the status subresource wholesale with what the current reconcile
/// observed: the condition list is rewritten each time, so only the latest
/// condition is kept.
pub struct DeploymentStatusManager<'a> {
    client: &'a kube::Client,
    namespace: String,
    name: String,
    observed: LLMDeploymentStatus,
}

impl<'a> DeploymentStatusManager<'a> {
    pub fn new(client: &'a kube::Client, deployment: &LLMDeployment) -> Result<Self> {
        let namespace = deployment.metadata.namespace.clone().ok_or_else(|| {
            Error::MetadataMissing("LLMDeployment resource has no namespace".to_string())
        })?;
        let name = deployment.metadata.name.clone().unwrap_or_default();
        let observed = deployment.status.clone().unwrap_or_default();

        Ok(Self {
            client,
            namespace,
            name,
            observed,
        })
    }

    // Create a new condition with a fresh transition timestamp
    fn condition(
        &self,
        condition_type: &str,
        status: &str,
        reason: StatusReason,
        message: String,
    ) -> DeploymentCondition {
        DeploymentCondition {
            type_: condition_type.to_string(),
            status: status.to_string(),
            last_transition_time: Some(Utc::now()),
            reason: Some(reason.to_string()),
            message: Some(message),
        }
    }

    /// Record that the referenced model could not be resolved. The available
    /// replica count keeps its last observed value.
    pub async fn set_model_not_found(&self, model_ref: &str) -> Result<()> {
        let condition = self.condition(
            MODEL_NOT_FOUND_CONDITION,
            "False",
            StatusReason::ModelNotFound,
            format!("Referenced model {} not found", model_ref),
        );

        self.patch(LLMDeploymentStatus {
            available_replicas: self.observed.available_replicas,
            conditions: vec![condition],
        })
        .await
    }

    /// Record a converged deployment with the replica count reported by the
    /// child workload.
    pub async fn set_available(&self, available_replicas: i32) -> Result<()> {
        let condition = self.condition(
            AVAILABLE_CONDITION,
            "True",
            StatusReason::DeploymentAvailable,
            "Deployment is available".to_string(),
        );

        self.patch(LLMDeploymentStatus {
            available_replicas,
            conditions: vec![condition],
        })
        .await
    }

    // always overwrite the status object with what we saw
    async fn patch(&self, status: LLMDeploymentStatus) -> Result<()> {
        let deployment_client: Api<LLMDeployment> =
            Api::namespaced(self.client.clone(), &self.namespace);

        let new_status = Patch::Apply(json!({
            "apiVersion": API_VERSION,
            "kind": "LLMDeployment",
            "status": status,
        }));
        let ps = PatchParams::apply(STATUS_FIELD_MANAGER).force();
        deployment_client
            .patch_status(&self.name, &ps, &new_status)
            .await
            .map_err(Error::StatusPersistFailed)?;

        info!("Updated status of LLMDeployment {}", self.name);
        Ok(())
    }
}
