mod health;
mod objects;
mod utils;
mod viewer;

pub use utils::generate_object_name;

use crate::util::middleware;
use crate::AppState;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::routing::{delete, get};
use axum::Router;
use tower_http::timeout::TimeoutLayer;

pub fn routes(app_state: AppState) -> Router {
    let body_limit = app_state.config.uploads.max_upload_bytes();
    let request_timeout = app_state.config.server.request_timeout();

    let page_routes = Router::new()
        .route("/", get(viewer::upload_form).post(viewer::upload_and_view))
        .route(
            "/params",
            get(viewer::parameter_form).post(viewer::view_with_parameters),
        );

    let api_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/objects", get(objects::list_objects))
        .route("/api/objects/:object_name", delete(objects::delete_object));

    Router::new()
        .merge(page_routes)
        .merge(api_routes)
        .with_state(app_state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        // 全局中间件
        .layer(from_fn(middleware::request_logging_middleware))
}
