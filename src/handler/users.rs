// handler/users.rs
use std::sync::Arc;

use axum::{middleware, response::IntoResponse, routing::get, Extension, Json, Router};

use crate::{
    dtos::userdtos::*,
    error::HttpError,
    middleware::{role_check, JWTAuthMiddeware},
    models::usermodel::UserRole,
    AppState,
};

pub fn users_handler() -> Router {
    Router::new().route(
        "/me",
        get(get_me).layer(middleware::from_fn(|state, req, next| {
            role_check(
                state,
                req,
                next,
                vec![UserRole::Client, UserRole::Writer, UserRole::Admin],
            )
        })),
    )
}

pub async fn get_me(
    Extension(_app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        data: UserData {
            user: FilterUserDto::filter_user(&user.user),
        },
    }))
}
