// handler/writer.rs
use std::sync::Arc;

use axum::{
    extract::{Multipart, Path},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::jobdb::JobExt,
    dtos::jobdtos::*,
    error::HttpError,
    middleware::{role_check, JWTAuthMiddeware},
    models::usermodel::UserRole,
    utils::upload::parse_multipart,
    AppState,
};

/// Writer-facing job routes; every route requires the writer role.
pub fn writer_handler() -> Router {
    Router::new()
        .route("/available", get(get_available_jobs))
        .route("/assigned", get(get_assigned_jobs))
        .route("/writer/completed", get(get_completed_jobs))
        .route("/:job_id/bids", post(place_bid))
        .route("/:job_id/submissions", post(submit_work))
        .layer(middleware::from_fn(|state, req, next| {
            role_check(state, req, next, vec![UserRole::Writer])
        }))
}

pub async fn get_available_jobs(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let jobs = app_state
        .db_client
        .get_available_jobs(user.user.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;
    let jobs = app_state.job_service.with_signed_urls(jobs).await;

    Ok(Json(JobListResponseDto {
        status: "success".to_string(),
        results: jobs.len(),
        jobs,
    }))
}

pub async fn get_assigned_jobs(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let jobs = app_state
        .db_client
        .get_writer_active_jobs(user.user.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;
    let jobs = app_state.job_service.present_jobs(jobs).await?;

    Ok(Json(JobListResponseDto {
        status: "success".to_string(),
        results: jobs.len(),
        jobs,
    }))
}

pub async fn get_completed_jobs(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let jobs = app_state
        .db_client
        .get_writer_completed_jobs(user.user.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;
    let jobs = app_state.job_service.with_signed_urls(jobs).await;

    Ok(Json(JobListResponseDto {
        status: "success".to_string(),
        results: jobs.len(),
        jobs,
    }))
}

pub async fn place_bid(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(job_id): Path<Uuid>,
    Json(body): Json<PlaceBidDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let bid = app_state
        .job_service
        .place_bid(job_id, user.user.id, body.amount)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(BidResponseDto {
            status: "success".to_string(),
            message: "Bid placed successfully".to_string(),
            bid,
        }),
    ))
}

pub async fn submit_work(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(job_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpError> {
    let (_, file) = parse_multipart::<serde_json::Value>(multipart).await?;
    let file = file.ok_or_else(|| HttpError::bad_request("A file upload is required"))?;

    let (submission, job) = app_state
        .job_service
        .submit_work(user.user.id, job_id, file)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmissionResponseDto {
            status: "success".to_string(),
            message: "Work submitted for review".to_string(),
            submission,
            job,
        }),
    ))
}
