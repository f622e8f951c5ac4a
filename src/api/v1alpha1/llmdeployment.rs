use chrono::{DateTime, Utc};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Generate the Kubernetes wrapper struct `LLMDeployment` from our Spec and Status struct
///
/// This provides a hook for generating the CRD yaml (in crdgen.rs)
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema)]
#[cfg_attr(test, derive(Default))]
#[kube(
    kind = "LLMDeployment",
    group = "llm.example.com",
    version = "v1alpha1",
    namespaced
)]
#[kube(status = "LLMDeploymentStatus", shortname = "llmdeployment")]
#[serde(rename_all = "camelCase")]
pub struct LLMDeploymentSpec {
    /// Name of the LLMModel to deploy, looked up in the same namespace
    pub model_ref: String,

    /// Desired number of serving replicas
    pub replicas: i32,

    /// Port the serving containers and their service listen on
    #[serde(default = "default_port")]
    pub port: i32,
}

fn default_port() -> i32 {
    8080
}

/// The status object of `LLMDeployment`
#[derive(Deserialize, Serialize, Clone, Default, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LLMDeploymentStatus {
    /// Available replica count mirrored from the child Deployment
    pub available_replicas: i32,

    /// Current service state. The list is rewritten on every reconcile, so
    /// it holds at most the latest condition.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<DeploymentCondition>,
}

/// A condition of the deployment
#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentCondition {
    /// Type of deployment condition
    #[serde(rename = "type")]
    pub type_: String,

    /// Status of the condition, one of True, False, Unknown
    pub status: String,

    /// Last time the condition transitioned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,

    /// Brief reason for the condition's last transition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable explanation for the condition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
