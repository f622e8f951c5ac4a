//! Helper methods only available for tests
use crate::api::v1alpha1::{
    LLMDeployment, LLMDeploymentSpec, LLMDeploymentStatus, LLMModel, LLMModelSpec, LLMModelStatus,
    ModelPhase, ModelResources,
};
use crate::controllers::{deployment_controller, model_controller};
use crate::util::metrics::Metrics;
use http::{Method, Request, Response};
use hyper::{body::to_bytes, Body};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentStatus};
use k8s_openapi::api::core::v1::Service;
use kube::{Client, ResourceExt};
use std::sync::Arc;
use tower_test::mock::{self, Handle};

impl LLMModel {
    /// A model as it would arrive from the apiserver
    pub fn test() -> Self {
        let mut model = LLMModel::new(
            "m1",
            LLMModelSpec {
                model_name: "llama".to_string(),
                image: "registry/x:v1".to_string(),
                resources: ModelResources::default(),
            },
        );
        model.metadata.namespace = Some("default".to_string());
        model.metadata.uid = Some("9c0f6a2e-3f56-4a1d-9ab6-2f8c2a5e7d41".to_string());
        model
    }

    pub fn with_resources(mut self, cpu: &str, memory: &str) -> Self {
        self.spec.resources = ModelResources {
            cpu: Some(cpu.to_string()),
            memory: Some(memory.to_string()),
        };
        self
    }

    pub fn ready(mut self) -> Self {
        self.status = Some(LLMModelStatus {
            phase: ModelPhase::Ready,
            message: Some("Model is ready to be deployed".to_string()),
        });
        self
    }
}

impl LLMDeployment {
    /// A deployment request as it would arrive from the apiserver
    pub fn test() -> Self {
        let mut llm_deployment = LLMDeployment::new(
            "my-llm",
            LLMDeploymentSpec {
                model_ref: "m1".to_string(),
                replicas: 3,
                port: 8080,
            },
        );
        llm_deployment.metadata.namespace = Some("default".to_string());
        llm_deployment.metadata.uid = Some("52d4dc72-9a1b-4e6f-8f0a-6b3e1c9d4f27".to_string());
        llm_deployment
    }
}

pub fn deployment_test_context() -> (Arc<deployment_controller::Context>, ApiServerVerifier) {
    let (mock_service, handle) = mock::pair::<Request<Body>, Response<Body>>();
    let mock_client = Client::new(mock_service, "default");
    let ctx = deployment_controller::Context {
        client: mock_client,
        metrics: Metrics::default(),
        diagnostics: Arc::default(),
    };
    (Arc::new(ctx), ApiServerVerifier(handle))
}

pub fn model_test_context() -> (Arc<model_controller::Context>, ApiServerVerifier) {
    let (mock_service, handle) = mock::pair::<Request<Body>, Response<Body>>();
    let mock_client = Client::new(mock_service, "default");
    let ctx = model_controller::Context {
        client: mock_client,
        metrics: Metrics::default(),
        diagnostics: Arc::default(),
    };
    (Arc::new(ctx), ApiServerVerifier(handle))
}

type ApiServerHandle = Handle<Request<Body>, Response<Body>>;
pub struct ApiServerVerifier(ApiServerHandle);

/// What the mock apiserver saw while a scenario ran
#[derive(Default)]
pub struct Recorded {
    pub status: LLMDeploymentStatus,
    pub serving_deployment: Option<Deployment>,
    pub serving_service: Option<Service>,
    pub model_status: Option<LLMModelStatus>,
}

/// Scenarios we test for in ApiServerVerifier
pub enum Scenario {
    /// The referenced model cannot be resolved
    ModelMissing(LLMDeployment),
    /// The model resolves and both children are applied
    Converge {
        llm_deployment: LLMDeployment,
        model: LLMModel,
        available_replicas: i32,
    },
    /// A pending model gets its status promoted
    ModelPromotion(LLMModel),
}

pub async fn timeout_after_1s(handle: tokio::task::JoinHandle<Recorded>) -> Recorded {
    tokio::time::timeout(std::time::Duration::from_secs(1), handle)
        .await
        .expect("timeout on mock apiserver")
        .expect("scenario succeeded without panic")
}

impl ApiServerVerifier {
    /// Tests only get the handle to the test apiserver, this runs the
    /// scenario against it and returns everything the reconciler sent.
    pub fn run(mut self, scenario: Scenario) -> tokio::task::JoinHandle<Recorded> {
        tokio::spawn(async move {
            let mut recorded = Recorded::default();
            match scenario {
                Scenario::ModelMissing(llm_deployment) => {
                    self.handle_model_fetch_not_found(&llm_deployment).await;
                    self.handle_deployment_status_patch(&llm_deployment, &mut recorded)
                        .await;
                }
                Scenario::Converge {
                    llm_deployment,
                    model,
                    available_replicas,
                } => {
                    self.handle_model_fetch(&model).await;
                    self.handle_child_deployment_apply(
                        &llm_deployment,
                        available_replicas,
                        &mut recorded,
                    )
                    .await;
                    self.handle_child_service_apply(&llm_deployment, &mut recorded)
                        .await;
                    self.handle_deployment_status_patch(&llm_deployment, &mut recorded)
                        .await;
                }
                Scenario::ModelPromotion(model) => {
                    self.handle_model_status_patch(&model, &mut recorded).await;
                }
            }
            recorded
        })
    }

    async fn handle_model_fetch(&mut self, model: &LLMModel) {
        let (request, send) = self.0.next_request().await.expect("model fetch");
        assert_eq!(request.method(), Method::GET);
        assert_eq!(
            request.uri().path(),
            format!(
                "/apis/llm.example.com/v1alpha1/namespaces/default/llmmodels/{}",
                model.name_any()
            )
        );
        send.send_response(
            Response::builder()
                .body(Body::from(serde_json::to_vec(model).unwrap()))
                .unwrap(),
        );
    }

    async fn handle_model_fetch_not_found(&mut self, llm_deployment: &LLMDeployment) {
        let (request, send) = self.0.next_request().await.expect("model fetch");
        assert_eq!(request.method(), Method::GET);
        assert_eq!(
            request.uri().path(),
            format!(
                "/apis/llm.example.com/v1alpha1/namespaces/default/llmmodels/{}",
                llm_deployment.spec.model_ref
            )
        );
        let status = serde_json::json!({
            "kind": "Status",
            "apiVersion": "v1",
            "metadata": {},
            "status": "Failure",
            "message": format!("llmmodels \"{}\" not found", llm_deployment.spec.model_ref),
            "reason": "NotFound",
            "code": 404,
        });
        send.send_response(
            Response::builder()
                .status(404)
                .body(Body::from(status.to_string()))
                .unwrap(),
        );
    }

    // existence probe (404) followed by the server-side apply
    async fn handle_child_deployment_apply(
        &mut self,
        llm_deployment: &LLMDeployment,
        available_replicas: i32,
        recorded: &mut Recorded,
    ) {
        let path = format!(
            "/apis/apps/v1/namespaces/default/deployments/{}",
            llm_deployment.name_any()
        );

        let (request, send) = self.0.next_request().await.expect("child deployment probe");
        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.uri().path(), path);
        send.send_response(
            Response::builder()
                .status(404)
                .body(Body::from(not_found_status("deployments")))
                .unwrap(),
        );

        let (request, send) = self.0.next_request().await.expect("child deployment apply");
        assert_eq!(request.method(), Method::PATCH);
        assert_eq!(request.uri().path(), path);
        let req_body = to_bytes(request.into_body()).await.unwrap();
        let mut applied: Deployment =
            serde_json::from_slice(&req_body).expect("valid deployment apply body");
        applied.status = Some(DeploymentStatus {
            available_replicas: Some(available_replicas),
            ..Default::default()
        });
        recorded.serving_deployment = Some(applied.clone());
        send.send_response(
            Response::builder()
                .body(Body::from(serde_json::to_vec(&applied).unwrap()))
                .unwrap(),
        );
    }

    async fn handle_child_service_apply(
        &mut self,
        llm_deployment: &LLMDeployment,
        recorded: &mut Recorded,
    ) {
        let path = format!(
            "/api/v1/namespaces/default/services/{}",
            llm_deployment.name_any()
        );

        let (request, send) = self.0.next_request().await.expect("child service probe");
        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.uri().path(), path);
        send.send_response(
            Response::builder()
                .status(404)
                .body(Body::from(not_found_status("services")))
                .unwrap(),
        );

        let (request, send) = self.0.next_request().await.expect("child service apply");
        assert_eq!(request.method(), Method::PATCH);
        assert_eq!(request.uri().path(), path);
        let req_body = to_bytes(request.into_body()).await.unwrap();
        let applied: Service = serde_json::from_slice(&req_body).expect("valid service apply body");
        recorded.serving_service = Some(applied.clone());
        send.send_response(
            Response::builder()
                .body(Body::from(serde_json::to_vec(&applied).unwrap()))
                .unwrap(),
        );
    }

    async fn handle_deployment_status_patch(
        &mut self,
        llm_deployment: &LLMDeployment,
        recorded: &mut Recorded,
    ) {
        let (request, send) = self.0.next_request().await.expect("status patch");
        assert_eq!(request.method(), Method::PATCH);
        assert_eq!(
            request.uri().path(),
            format!(
                "/apis/llm.example.com/v1alpha1/namespaces/default/llmdeployments/{}/status",
                llm_deployment.name_any()
            )
        );
        let req_body = to_bytes(request.into_body()).await.unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&req_body).expect("status patch is json");
        let status: LLMDeploymentStatus =
            serde_json::from_value(json["status"].clone()).expect("valid status in patch");
        recorded.status = status.clone();

        let mut response = llm_deployment.clone();
        response.status = Some(status);
        send.send_response(
            Response::builder()
                .body(Body::from(serde_json::to_vec(&response).unwrap()))
                .unwrap(),
        );
    }

    async fn handle_model_status_patch(&mut self, model: &LLMModel, recorded: &mut Recorded) {
        let (request, send) = self.0.next_request().await.expect("model status patch");
        assert_eq!(request.method(), Method::PATCH);
        assert_eq!(
            request.uri().path(),
            format!(
                "/apis/llm.example.com/v1alpha1/namespaces/default/llmmodels/{}/status",
                model.name_any()
            )
        );
        let req_body = to_bytes(request.into_body()).await.unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&req_body).expect("status patch is json");
        let status: LLMModelStatus =
            serde_json::from_value(json["status"].clone()).expect("valid status in patch");
        recorded.model_status = Some(status.clone());

        let mut response = model.clone();
        response.status = Some(status);
        send.send_response(
            Response::builder()
                .body(Body::from(serde_json::to_vec(&response).unwrap()))
                .unwrap(),
        );
    }
}

fn not_found_status(plural: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "metadata": {},
        "status": "Failure",
        "reason": "NotFound",
        "message": format!("{} not found", plural),
        "code": 404,
    })
    .to_string()
}
