// handler/jobs.rs
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
    dtos::userdtos::Response,
    error::HttpError,
    middleware::{role_check, JWTAuthMiddeware},
    models::usermodel::UserRole,
    utils::upload::parse_multipart,
    AppState,
};

/// Client-facing job routes; every route requires the client role.
pub fn jobs_handler() -> Router {
    Router::new()
        .route("/", post(create_job).get(get_my_jobs))
        .route("/completed", get(get_my_completed_jobs))
        .route("/:job_id", get(get_job).put(update_job).delete(cancel_job))
        .layer(middleware::from_fn(|state, req, next| {
            role_check(state, req, next, vec![UserRole::Client])
        }))
}

pub async fn create_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpError> {
    let (body, file) = parse_multipart::<CreateJobDto>(multipart).await?;
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let job = app_state
        .job_service
        .create_job(user.user.id, body, file)
        .await?;
    let job = app_state.job_service.with_signed_url(job).await;

    Ok((
        StatusCode::CREATED,
        Json(JobResponseDto {
            status: "success".to_string(),
            message: "Job created successfully".to_string(),
            data: JobData { job },
        }),
    ))
}

pub async fn get_my_jobs(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let jobs = app_state
        .db_client
        .get_client_jobs(user.user.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;
    let jobs = app_state.job_service.present_jobs(jobs).await?;

    Ok(Json(JobListResponseDto {
        status: "success".to_string(),
        results: jobs.len(),
        jobs,
    }))
}

pub async fn get_my_completed_jobs(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let jobs = app_state
        .db_client
        .get_client_completed_jobs(user.user.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;
    let jobs = app_state.job_service.with_signed_urls(jobs).await;

    Ok(Json(JobListResponseDto {
        status: "success".to_string(),
        results: jobs.len(),
        jobs,
    }))
}

pub async fn get_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let job = app_state
        .db_client
        .get_job_for_client(job_id, user.user.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Job not found"))?;
    let job = app_state.job_service.present_job(job).await?;

    Ok(Json(JobResponseDto {
        status: "success".to_string(),
        message: "Job retrieved".to_string(),
        data: JobData { job },
    }))
}

pub async fn update_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(job_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpError> {
    let (body, file) = parse_multipart::<UpdateJobDto>(multipart).await?;
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let job = app_state
        .job_service
        .edit_job(user.user.id, job_id, body, file)
        .await?;
    let job = app_state.job_service.with_signed_url(job).await;

    Ok(Json(JobResponseDto {
        status: "success".to_string(),
        message: "Job updated successfully".to_string(),
        data: JobData { job },
    }))
}

pub async fn cancel_job(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    app_state.job_service.cancel_job(&user.user, job_id).await?;

    Ok(Json(Response {
        status: "success",
        message: "Job cancelled successfully".to_string(),
    }))
}
