use std::collections::BTreeMap;

mod deployment;
mod service;

pub use deployment::serving_deployment;
pub use service::serving_service;

/// Name of the serving container inside the child Deployment
pub const SERVING_CONTAINER_NAME: &str = "llm-model";

/// Pod-selection labels shared by the child Deployment and Service
pub(crate) fn app_labels(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([("app".to_string(), name.to_string())])
}
