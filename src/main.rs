use actix_web::{get, middleware, web::Data, App, HttpRequest, HttpResponse, HttpServer, Responder};

use controller::controllers::{deployment_controller, model_controller};
use controller::util::telemetry;

use prometheus::{Encoder, TextEncoder};

#[get("/metrics")]
async fn metrics(c: Data<deployment_controller::State>, _req: HttpRequest) -> impl Responder {
    let metrics = c.metrics();
    let encoder = TextEncoder::new();
    let mut buffer = vec![];
    encoder.encode(&metrics, &mut buffer).unwrap();
    HttpResponse::Ok().body(buffer)
}

#[get("/health")]
async fn health(_: HttpRequest) -> impl Responder {
    HttpResponse::Ok().json("healthy")
}

#[get("/")]
async fn index(c: Data<deployment_controller::State>, _req: HttpRequest) -> impl Responder {
    let d = c.diagnostics().await;
    HttpResponse::Ok().json(&d)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init().await;

    // Initiatilize Kubernetes controller state
    let model_state = model_controller::State::default();
    let deployment_state = deployment_controller::State::default();
    let llm_model_controller = model_controller::run(model_state.clone());
    let llm_deployment_controller = deployment_controller::run(deployment_state.clone());

    // Start web server
    let server = HttpServer::new(move || {
        App::new()
            .app_data(Data::new(deployment_state.clone()))
            .wrap(middleware::Logger::default().exclude("/health"))
            .service(index)
            .service(health)
            .service(metrics)
    })
    .bind("0.0.0.0:8080")?
    .shutdown_timeout(5);

    // All runtimes implement graceful shutdown, so poll until all are done
    tokio::join!(llm_model_controller, llm_deployment_controller, server.run()).2?;
    Ok(())
}
