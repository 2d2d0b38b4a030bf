use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use log::info;
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use crate::sink::prometheus::GaugeRegistry;

/// Serves the gauge registry to Prometheus scrapers. The meter loop
/// keeps writing to the registry while this server reads from it; the
/// registry synchronizes internally.
pub struct ApiManager {
    registry: Arc<GaugeRegistry>,
    port: u16,
}

struct StartTime(Instant);

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_seconds: u64,
    pub timestamp: u64,
}

#[utoipa::path(get,
    path = "/metrics",
    summary = "Get the current meter readings in prometheus format",
    responses(
        (status = 200, description = "Returns the current meter readings as prometheus gauges")
    ),
)]
async fn metrics(registry: web::Data<GaugeRegistry>) -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(registry.render())
}

#[utoipa::path(get,
    path = "/health",
    summary = "Health check endpoint for container monitoring",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
)]
async fn health_check(started: web::Data<StartTime>) -> impl Responder {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        uptime_seconds: started.0.elapsed().as_secs(),
        timestamp,
    })
}

impl ApiManager {
    pub fn new(registry: Arc<GaugeRegistry>, port: u16) -> Self {
        Self { registry, port }
    }

    pub async fn start_thread(&self) {
        #[derive(OpenApi)]
        #[openapi(
            info(description = "p1bridge API description"),
            paths(
                metrics,
                health_check,
            )
        )]
        struct ApiDoc;

        info!("Starting metrics exposition on port {}", self.port);

        let registry = self.registry.clone();
        let started = web::Data::new(StartTime(Instant::now()));

        let _ = HttpServer::new(move || {
            App::new()
                .app_data(web::Data::from(registry.clone()))
                .app_data(started.clone())
                .route("/metrics", web::get().to(metrics))
                .route("/health", web::get().to(health_check))
                .service(
                    SwaggerUi::new("/swagger-ui/{_:.*}")
                        .url("/api/v1/openapi.json", ApiDoc::openapi()),
                )
        })
        .bind(format!("0.0.0.0:{}", self.port))
        .unwrap()
        .run()
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MetricSink;
    use actix_web::test;

    #[actix_web::test]
    async fn test_metrics_endpoint_renders_the_registry() {
        let registry = Arc::new(GaugeRegistry::new());
        registry.set_gauge("p1_tarif", &[], 2.0);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::from(registry.clone()))
                .route("/metrics", web::get().to(metrics)),
        )
        .await;

        let req = test::TestRequest::get().uri("/metrics").to_request();
        let body = test::call_and_read_body(&app, req).await;
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("p1_tarif 2\n"));
    }

    #[actix_web::test]
    async fn test_health_endpoint_reports_healthy() {
        let started = web::Data::new(StartTime(Instant::now()));
        let app = test::init_service(
            App::new()
                .app_data(started)
                .route("/health", web::get().to(health_check)),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let body = test::call_and_read_body(&app, req).await;
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["status"], "healthy");
    }
}
