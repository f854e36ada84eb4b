use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::repo::User;

/// Request body for `POST /users`.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub is_active: Option<bool>,
}

/// Request body for `PUT`/`PATCH /users/:id`. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
    pub is_active: Option<bool>,
}

/// User as returned to clients. No password material.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub is_superuser: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            is_active: user.is_active,
            is_superuser: user.is_superuser,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults() {
        let p: Pagination = serde_json::from_str("{}").unwrap();
        assert_eq!(p.skip, 0);
        assert_eq!(p.limit, 100);
    }

    #[test]
    fn update_request_fields_default_to_absent() {
        let input: UpdateUserRequest = serde_json::from_str(r#"{"full_name":"B"}"#).unwrap();
        assert_eq!(input.full_name.as_deref(), Some("B"));
        assert!(input.email.is_none());
        assert!(input.password.is_none());
        assert!(input.is_active.is_none());
    }

    #[test]
    fn user_response_has_no_password_field() {
        let user = User {
            id: Uuid::new_v4(),
            email: "a@b.com".into(),
            hashed_password: "secret-hash".into(),
            full_name: None,
            is_active: true,
            is_superuser: false,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_string(&UserResponse::from(user)).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("secret-hash"));
        assert!(json.contains("\"is_active\":true"));
    }
}
