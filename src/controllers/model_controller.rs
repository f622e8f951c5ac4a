use chrono::{DateTime, Utc};
use futures::StreamExt;
use kube::{
    api::{Api, ListParams, Patch, PatchParams, ResourceExt},
    client::Client,
    runtime::{
        controller::{Action, Controller},
        watcher::Config,
    },
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tokio::{sync::RwLock, time::Duration};
use tracing::*;

use crate::api::v1alpha1::{LLMModel, LLMModelStatus, ModelPhase, API_VERSION};
use crate::util::{errors, errors::Result, metrics, telemetry};

pub const FIELD_MANAGER: &str = "llm-model-controller";

impl LLMModel {
    // Reconcile (for non-finalizer related changes)
    async fn reconcile(&self, ctx: Arc<Context>) -> Result<Action, errors::Error> {
        let namespace = self.namespace().unwrap(); // LLMModel is namespace scoped
        let name = self.name_any();

        // Accepted models are marked deployable right away. No image or
        // resource validation happens here.
        if !self.is_ready() {
            let model_client: Api<LLMModel> = Api::namespaced(ctx.client.clone(), &namespace);

            let new_status = Patch::Apply(json!({
                "apiVersion": API_VERSION,
                "kind": "LLMModel",
                "status": LLMModelStatus {
                    phase: ModelPhase::Ready,
                    message: Some("Model is ready to be deployed".to_string()),
                },
            }));
            let ps = PatchParams::apply(FIELD_MANAGER).force();
            model_client
                .patch_status(&name, &ps, &new_status)
                .await
                .map_err(errors::Error::StatusPersistFailed)?;

            info!("Marked LLMModel {} as Ready", name);
        }

        Ok(Action::await_change())
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

#[instrument(skip(ctx, llm_model), fields(trace_id))]
pub async fn reconcile(llm_model: Arc<LLMModel>, ctx: Arc<Context>) -> Result<Action> {
    let trace_id = telemetry::get_trace_id();
    Span::current().record("trace_id", field::display(&trace_id));
    let _timer = ctx.metrics.count_and_measure("model");
    ctx.diagnostics.write().await.last_event = Utc::now();

    let ns = llm_model.namespace().unwrap(); // llm_model is namespace scoped

    info!("Reconciling LLMModel \"{}\" in {}", llm_model.name_any(), ns);

    llm_model.reconcile(ctx.clone()).await
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

fn error_policy(llm_model: Arc<LLMModel>, error: &errors::Error, ctx: Arc<Context>) -> Action {
    warn!("reconcile failed: {:?}", error);
    ctx.metrics.reconcile_model_failure(&llm_model, error);
    Action::requeue(Duration::from_secs(5 * 60))
}

/// Initialize the controller and shared state (given the crd is installed)
pub async fn run(state: State) {
    let client = Client::try_default().await.expect("failed to create kube Client");

    let llm_models = Api::<LLMModel>::all(client.clone());
    if let Err(e) = llm_models.list(&ListParams::default().limit(1)).await {
        error!("CRD is not queryable; {e:?}. Is the CRD installed?");
        info!("Installation: cargo run --bin crdgen | kubectl apply -f -");
        std::process::exit(1);
    }

    Controller::new(llm_models, Config::default().any_semantic())
        .shutdown_on_signal()
        .run(reconcile, error_policy, state.to_context(client))
        .filter_map(|x| async move { std::result::Result::ok(x) })
        .for_each(|_| futures::future::ready(()))
        .await;
}
