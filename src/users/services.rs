use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::error::AppError;
use crate::users::dto::{CreateUserRequest, UpdateUserRequest};
use crate::users::repo::{NewUser, User, UserChanges};

/// Create a user, rejecting an already-registered email.
pub async fn create_user(db: &PgPool, input: CreateUserRequest) -> Result<User, AppError> {
    if User::find_by_email(db, &input.email).await?.is_some() {
        warn!(email = %input.email, "email already registered");
        return Err(AppError::DuplicateEmail("Email already registered".into()));
    }

    let hashed_password = hash_password(&input.password)?;
    let new = NewUser {
        email: input.email,
        hashed_password,
        full_name: input.full_name,
        is_active: input.is_active.unwrap_or(true),
    };

    // Two concurrent creates can both pass the pre-check; the unique
    // constraint settles the race.
    let user = User::create(db, &new).await.map_err(|e| match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::DuplicateEmail("Email already registered".into())
        }
        _ => AppError::Storage(e),
    })?;

    info!(user_id = %user.id, email = %user.email, "user created");
    Ok(user)
}

pub async fn get_user(db: &PgPool, id: Uuid) -> Result<User, AppError> {
    User::find(db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id {id} not found")))
}

pub async fn list_users(db: &PgPool, skip: i64, limit: i64) -> Result<Vec<User>, AppError> {
    Ok(User::list(db, skip, limit).await?)
}

/// Partial update. A supplied password is re-hashed; everything else is
/// applied field-by-field only when present.
pub async fn update_user(
    db: &PgPool,
    id: Uuid,
    input: UpdateUserRequest,
) -> Result<User, AppError> {
    let hashed_password = match input.password.as_deref() {
        Some(plain) => Some(hash_password(plain)?),
        None => None,
    };
    let changes = UserChanges {
        email: input.email,
        hashed_password,
        full_name: input.full_name,
        is_active: input.is_active,
    };

    let user = User::update(db, id, &changes)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id {id} not found")))?;

    info!(user_id = %user.id, "user updated");
    Ok(user)
}

/// Hard delete; returns the removed user.
pub async fn delete_user(db: &PgPool, id: Uuid) -> Result<User, AppError> {
    let user = User::delete(db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id {id} not found")))?;

    info!(user_id = %user.id, "user deleted");
    Ok(user)
}

/// `None` for an unknown email, a deactivated account, or a bad password.
/// Callers cannot tell which.
pub async fn authenticate(
    db: &PgPool,
    email: &str,
    password: &str,
) -> Result<Option<User>, AppError> {
    let Some(user) = User::find_by_email(db, email).await? else {
        return Ok(None);
    };
    if !user.is_active {
        warn!(user_id = %user.id, "login attempt on inactive user");
        return Ok(None);
    }
    if !verify_password(password, &user.hashed_password) {
        return Ok(None);
    }
    Ok(Some(user))
}
