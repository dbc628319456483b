pub mod api;
pub mod config;
pub mod entities;
pub mod infrastructure;
pub mod services;
pub mod utils;

use crate::config::UploadConfig;
use crate::services::redemption::RedemptionService;
use crate::services::storage::StorageService;
use crate::services::work_service::WorkService;
use axum::{
    Router,
    routing::{get, patch, post},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::works::upload_work,
        api::handlers::works::view_work,
        api::handlers::works::deactivate_work,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            api::handlers::works::UploadResponse,
            api::handlers::works::IssuedWorkBody,
            api::handlers::works::ViewWorkResponse,
            api::handlers::works::RedeemedWorkBody,
            api::handlers::works::FileInfo,
            api::handlers::works::DeactivateResponse,
            api::handlers::health::HealthResponse,
        )
    ),
    tags(
        (name = "works", description = "Work upload and access-code redemption"),
        (name = "system", description = "Health and diagnostics")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub storage: Arc<dyn StorageService>,
    pub work_service: Arc<WorkService>,
    pub redemption: Arc<RedemptionService>,
    pub config: UploadConfig,
}

pub fn create_app(state: AppState) -> Router {
    // Uploaders and viewers live on other origins (static frontends), so
    // CORS stays permissive, matching the original deployment.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/upload", post(api::handlers::works::upload_work))
        .route("/view-work", get(api::handlers::works::view_work))
        .route(
            "/works/:code/deactivate",
            patch(api::handlers::works::deactivate_work),
        )
        .route("/health", get(api::handlers::health::health_check))
        .layer(cors)
        .with_state(state)
}
