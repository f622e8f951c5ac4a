use chrono::{DateTime, Utc};
use futures::StreamExt;
use k8s_openapi::api::{apps::v1::Deployment, core::v1::Service};
use kube::{
    api::{Api, ListParams, ResourceExt},
    client::Client,
    runtime::{
        controller::{Action, Controller},
        watcher::{self, Config},
    },
};
use serde::Serialize;
use std::sync::Arc;
use tokio::{sync::RwLock, time::Duration};
use tracing::*;

use super::deployment::{apply_serving_deployment, apply_serving_service};
use crate::api::v1alpha1::{LLMDeployment, LLMModel};
use crate::util::deployment_status::DeploymentStatusManager;
use crate::util::{errors, errors::Result, metrics, telemetry};

impl LLMDeployment {
    // Reconcile (for non-finalizer related changes)
    async fn reconcile(&self, ctx: Arc<Context>) -> Result<Action, errors::Error> {
        let client = ctx.client.clone();
        let namespace = self.namespace().unwrap(); // LLMDeployment is namespace scoped
        let name = self.name_any();

        let status_manager = DeploymentStatusManager::new(&client, self)?;

        // Resolve the referenced model in the same namespace. The reference is
        // a plain name lookup, deleting the model never cascades here.
        let model_client: Api<LLMModel> = Api::namespaced(client.clone(), &namespace);
        let model = match model_client.get_opt(&self.spec.model_ref).await {
            Ok(Some(model)) => Some(model),
            Ok(None) => {
                info!("Model {} not found", self.spec.model_ref);
                None
            }
            Err(e) => {
                warn!("Unable to fetch referenced model {}: {}", self.spec.model_ref, e);
                None
            }
        };

        let Some(model) = model else {
            // Best effort: a failed status write must not delay the next
            // model lookup, so it is logged instead of returned.
            if let Err(e) = status_manager.set_model_not_found(&self.spec.model_ref).await {
                warn!("Failed to update status of LLMDeployment {}: {}", name, e);
            }
            return Ok(Action::requeue(Duration::from_secs(60)));
        };

        // Workload first, then its service. Nothing depends on this order,
        // it only keeps the logs predictable.
        let (_, available_replicas) =
            apply_serving_deployment(&client, &namespace, self, &model).await?;
        apply_serving_service(&client, &namespace, self).await?;

        // Availability is declared as soon as both applies landed; the
        // replica count may lag the actual rollout until the next poll.
        status_manager.set_available(available_replicas).await?;

        // If no events were received, check back every 5 minutes
        Ok(Action::requeue(Duration::from_secs(5 * 60)))
    }
}

/// State shared between the controller and the web server
#[derive(Clone, Default)]
pub struct State {
    /// Diagnostics populated by the reconciler
    diagnostics: Arc<RwLock<Diagnostics>>,
    /// Metrics registry
    registry: prometheus::Registry,
}

/// State wrapper around the controller outputs for the web server
impl State {
    /// Metrics getter
    pub fn metrics(&self) -> Vec<prometheus::proto::MetricFamily> {
        self.registry.gather()
    }

    /// State getter
    pub async fn diagnostics(&self) -> Diagnostics {
        self.diagnostics.read().await.clone()
    }

    // Create a Controller Context that can update State
    pub fn to_context(&self, client: Client) -> Arc<Context> {
        Arc::new(Context {
            client,
            metrics: metrics::Metrics::default().register(&self.registry).unwrap(),
            diagnostics: self.diagnostics.clone(),
        })
    }
}

// Context for our reconciler
#[derive(Clone)]
pub struct Context {
    /// Kubernetes client
    pub client: Client,
    /// Diagnostics read by the web server
    pub diagnostics: Arc<RwLock<Diagnostics>>,
    /// Prometheus metrics
    pub metrics: metrics::Metrics,
}

#[instrument(skip(ctx, llm_deployment), fields(trace_id))]
pub async fn reconcile(llm_deployment: Arc<LLMDeployment>, ctx: Arc<Context>) -> Result<Action> {
    let trace_id = telemetry::get_trace_id();
    Span::current().record("trace_id", field::display(&trace_id));
    let _timer = ctx.metrics.count_and_measure("deployment");
    ctx.diagnostics.write().await.last_event = Utc::now();

    let ns = llm_deployment.namespace().unwrap(); // llm_deployment is namespace scoped

    info!(
        "Reconciling LLMDeployment \"{}\" in {}",
        llm_deployment.name_any(),
        ns
    );

    llm_deployment.reconcile(ctx.clone()).await
}

/// Diagnostics to be exposed by the web server
#[derive(Clone, Serialize)]
pub struct Diagnostics {
    pub last_event: DateTime<Utc>,
}
impl Default for Diagnostics {
    fn default() -> Self {
        Self {
            last_event: Utc::now(),
        }
    }
}

fn error_policy(llm_deployment: Arc<LLMDeployment>, error: &errors::Error, ctx: Arc<Context>) -> Action {
    warn!("reconcile failed: {:?}", error);
    ctx.metrics.reconcile_deployment_failure(&llm_deployment, error);
    Action::requeue(Duration::from_secs(5 * 60))
}

/// Initialize the controller and shared state (given the crd is installed)
pub async fn run(state: State) {
    let client = Client::try_default().await.expect("failed to create kube Client");

    let llm_deployments = Api::<LLMDeployment>::all(client.clone());
    if let Err(e) = llm_deployments.list(&ListParams::default().limit(1)).await {
        error!("CRD is not queryable; {e:?}. Is the CRD installed?");
        info!("Installation: cargo run --bin crdgen | kubectl apply -f -");
        std::process::exit(1);
    }

    Controller::new(llm_deployments, Config::default().any_semantic())
        .owns(
            Api::<Deployment>::all(client.clone()),
            watcher::Config::default(),
        )
        .owns(Api::<Service>::all(client.clone()), watcher::Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, state.to_context(client))
        .filter_map(|x| async move { std::result::Result::ok(x) })
        .for_each(|_| futures::future::ready(()))
        .await;
}
