// routes.rs
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::get,
    Extension, Json, Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    handler::{
        admin::admin_handler, auth::auth_handler, jobs::jobs_handler, users::users_handler,
        writer::writer_handler,
    },
    middleware::{auth, role_check},
    models::usermodel::UserRole,
    utils::upload::MAX_UPLOAD_BYTES,
    AppState,
};

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running"
    }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Client and writer routes share the /jobs nest; each side carries its
    // own role layer, so the merged router rejects the other role per route.
    let job_routes = Router::new()
        .merge(jobs_handler())
        .merge(writer_handler())
        .layer(middleware::from_fn(auth))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 64 * 1024));

    let admin_routes = admin_handler()
        .layer(middleware::from_fn(|state, req, next| {
            role_check(state, req, next, vec![UserRole::Admin])
        }))
        .layer(middleware::from_fn(auth));

    let api_route = Router::new()
        .nest("/auth", auth_handler())
        .nest("/users", users_handler().layer(middleware::from_fn(auth)))
        .nest("/jobs", job_routes)
        .nest("/admin", admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_route)
}
