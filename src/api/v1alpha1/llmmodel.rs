use core::fmt;
use std::fmt::Display;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Generate the Kubernetes wrapper struct `LLMModel` from our Spec and Status struct
///
/// This provides a hook for generating the CRD yaml (in crdgen.rs)
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema)]
#[cfg_attr(test, derive(Default))]
#[kube(kind = "LLMModel", group = "llm.example.com", version = "v1alpha1", namespaced)]
#[kube(status = "LLMModelStatus", shortname = "llmmodel")]
#[serde(rename_all = "camelCase")]
pub struct LLMModelSpec {
    /// Logical name of the model, informational only
    pub model_name: String,

    /// Container image serving the model
    pub image: String,

    /// Optional cpu/memory quantities applied to the serving container
    #[serde(default)]
    pub resources: ModelResources,
}

/// Resource quantities for the serving container. Each dimension is applied
/// as both request and limit when set.
#[derive(Deserialize, Serialize, Clone, Default, Debug, JsonSchema)]
pub struct ModelResources {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
}

/// The status object of `LLMModel`
#[derive(Deserialize, Serialize, Clone, Default, Debug, JsonSchema)]
pub struct LLMModelStatus {
    pub phase: ModelPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Default, Debug, JsonSchema, PartialEq, Eq)]
pub enum ModelPhase {
    #[default]
    Pending,
    Ready,
    Failed,
}

impl Display for ModelPhase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ModelPhase::Pending => write!(f, "Pending"),
            ModelPhase::Ready => write!(f, "Ready"),
            ModelPhase::Failed => write!(f, "Failed"),
        }
    }
}

impl LLMModel {
    /// Whether this model has been accepted and marked deployable
    pub fn is_ready(&self) -> bool {
        self.status
            .as_ref()
            .is_some_and(|status| status.phase == ModelPhase::Ready)
    }
}
