pub mod llmdeployment;
pub mod llmmodel;

pub use llmdeployment::{DeploymentCondition, LLMDeployment, LLMDeploymentSpec, LLMDeploymentStatus};
pub use llmmodel::{LLMModel, LLMModelSpec, LLMModelStatus, ModelPhase, ModelResources};

pub const API_VERSION: &str = "llm.example.com/v1alpha1";
