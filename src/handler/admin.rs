// handler/admin.rs
use std::sync::Arc;

use axum::{
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{jobdb::JobExt, userdb::UserExt},
    dtos::jobdtos::*,
    dtos::userdtos::*,
    error::{ErrorMessage, HttpError},
    middleware::JWTAuthMiddeware,
    models::usermodel::UserRole,
    utils::password,
    AppState,
};

/// Admin surface: writer provisioning, pricing, assignment and review.
/// The admin role check is layered in routes.rs for the whole nest.
pub fn admin_handler() -> Router {
    Router::new()
        .route("/writers", get(get_writers).post(add_writer))
        .route("/jobs/pending", get(get_pending_jobs))
        .route("/jobs/with-bids", get(get_jobs_with_bids))
        .route("/jobs/:job_id/terms", put(set_job_terms))
        .route("/jobs/:job_id/bids", get(get_job_bids))
        .route("/jobs/:job_id", delete(cancel_job))
        .route("/bids/:bid_id/assign", post(assign_writer))
        .route("/submissions/pending", get(get_pending_submissions))
        .route("/submissions/:submission_id", put(review_submission))
}

pub async fn get_writers(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let writers = app_state
        .db_client
        .get_users_by_role(UserRole::Writer)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let users: Vec<FilterUserDto> = writers.iter().map(FilterUserDto::filter_user).collect();

    Ok(Json(serde_json::json!({
        "status": "success",
        "results": users.len(),
        "users": users,
    })))
}

pub async fn add_writer(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<AddWriterDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let hashed_password =
        password::hash(&body.password).map_err(|e| HttpError::server_error(e.to_string()))?;

    let result = app_state
        .db_client
        .save_user(
            body.name.clone(),
            body.email.clone(),
            hashed_password,
            UserRole::Writer,
            body.phone.clone(),
        )
        .await;

    match result {
        Ok(user) => Ok((
            StatusCode::CREATED,
            Json(UserResponseDto {
                status: "success".to_string(),
                data: UserData {
                    user: FilterUserDto::filter_user(&user),
                },
            }),
        )),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            Err(HttpError::conflict(ErrorMessage::EmailExist.to_string()))
        }
        Err(err) => Err(HttpError::server_error(err.to_string())),
    }
}

/// Posted jobs still waiting for the admin to set terms.
pub async fn get_pending_jobs(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let jobs = app_state
        .db_client
        .get_unpriced_jobs()
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;
    let jobs = app_state.job_service.with_signed_urls(jobs).await;

    Ok(Json(JobListResponseDto {
        status: "success".to_string(),
        results: jobs.len(),
        jobs,
    }))
}

pub async fn get_jobs_with_bids(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let jobs = app_state
        .db_client
        .get_jobs_with_pending_bids()
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;
    let jobs = app_state.job_service.with_signed_urls(jobs).await;

    Ok(Json(JobListResponseDto {
        status: "success".to_string(),
        results: jobs.len(),
        jobs,
    }))
}

pub async fn set_job_terms(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(job_id): Path<Uuid>,
    Json(body): Json<SetJobTermsDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let job = app_state
        .job_service
        .set_job_terms(job_id, body.admin_bid_amount, body.expected_return_date)
        .await?;
    let job = app_state.job_service.with_signed_url(job).await;

    Ok(Json(JobResponseDto {
        status: "success".to_string(),
        message: "Job opened for bidding".to_string(),
        data: JobData { job },
    }))
}

pub async fn get_job_bids(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let job = app_state
        .db_client
        .get_job(job_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Job not found"))?;
    let job = app_state.job_service.present_job(job).await?;

    let bids = app_state
        .db_client
        .get_job_bids(job_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(JobBidsResponseDto {
        status: "success".to_string(),
        job,
        bids,
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

pub async fn assign_writer(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(bid_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let job = app_state.job_service.assign_writer(bid_id).await?;
    let job = app_state.job_service.with_signed_url(job).await;

    Ok(Json(JobResponseDto {
        status: "success".to_string(),
        message: "Writer assigned successfully".to_string(),
        data: JobData { job },
    }))
}

pub async fn get_pending_submissions(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let submissions = app_state
        .db_client
        .get_pending_submissions()
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;
    let submissions = app_state.job_service.sign_submissions(submissions).await;

    Ok(Json(SubmissionListResponseDto {
        status: "success".to_string(),
        results: submissions.len(),
        submissions,
    }))
}

pub async fn review_submission(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(submission_id): Path<Uuid>,
    Json(body): Json<ReviewSubmissionDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let (submission, job) = app_state
        .job_service
        .review_submission(submission_id, body)
        .await?;

    Ok(Json(SubmissionResponseDto {
        status: "success".to_string(),
        message: "Submission reviewed".to_string(),
        submission,
        job,
    }))
}
