use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;
use crate::users::dto::{CreateUserRequest, Pagination, UpdateUserRequest, UserResponse};
use crate::users::services;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

const MIN_PASSWORD_LEN: usize = 8;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id", get(get_user))
}

pub fn write_routes() -> Router<AppState> {
    Router::new().route("/users", post(create_user)).route(
        "/users/:id",
        put(update_user).patch(update_user).delete(delete_user),
    )
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let users = services::list_users(&state.db, p.skip, p.limit).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::Validation("Invalid email".into()));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AppError::Validation("Password too short".into()));
    }

    let user = services::create_user(&state.db, payload).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, AppError> {
    let user = services::get_user(&state.db, id).await?;
    Ok(Json(UserResponse::from(user)))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    if let Some(email) = payload.email.as_deref() {
        if !is_valid_email(email) {
            warn!(%email, "invalid email");
            return Err(AppError::Validation("Invalid email".into()));
        }
    }
    if let Some(password) = payload.password.as_deref() {
        if password.len() < MIN_PASSWORD_LEN {
            warn!("password too short");
            return Err(AppError::Validation("Password too short".into()));
        }
    }

    let user = services::update_user(&state.db, id, payload).await?;
    Ok(Json(UserResponse::from(user)))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, AppError> {
    let user = services::delete_user(&state.db, id).await?;
    Ok(Json(UserResponse::from(user)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@b.com"));
        assert!(is_valid_email("first.last@example.co.uk"));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("spaces in@mail.com"));
        assert!(!is_valid_email("missing@tld"));
    }
}
