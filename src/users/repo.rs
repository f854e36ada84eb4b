use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_password: String, // Argon2 hash, not exposed in JSON
    pub full_name: Option<String>,
    pub is_active: bool,
    pub is_superuser: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Fields required to insert a user. Id and timestamps come from the database.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub hashed_password: String,
    pub full_name: Option<String>,
    pub is_active: bool,
}

/// Partial update: a `None` field keeps its stored value.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub hashed_password: Option<String>,
    pub full_name: Option<String>,
    pub is_active: Option<bool>,
}

impl User {
    /// Find a user by id.
    pub async fn find(db: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, hashed_password, full_name, is_active, is_superuser,
                   created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }

    /// Find a user by email (exact match).
    pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, hashed_password, full_name, is_active, is_superuser,
                   created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await
    }

    pub async fn list(db: &PgPool, skip: i64, limit: i64) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, hashed_password, full_name, is_active, is_superuser,
                   created_at, updated_at
            FROM users
            ORDER BY created_at
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(skip)
        .fetch_all(db)
        .await
    }

    /// Insert a new user with an already-hashed password.
    pub async fn create(db: &PgPool, new: &NewUser) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, hashed_password, full_name, is_active)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, hashed_password, full_name, is_active, is_superuser,
                      created_at, updated_at
            "#,
        )
        .bind(&new.email)
        .bind(&new.hashed_password)
        .bind(&new.full_name)
        .bind(new.is_active)
        .fetch_one(db)
        .await
    }

    /// Partial update; unset fields keep their stored value, `updated_at` is
    /// always bumped. Returns `None` when no row matches.
    pub async fn update(
        db: &PgPool,
        id: Uuid,
        changes: &UserChanges,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET email           = COALESCE($2, email),
                hashed_password = COALESCE($3, hashed_password),
                full_name       = COALESCE($4, full_name),
                is_active       = COALESCE($5, is_active),
                updated_at      = now()
            WHERE id = $1
            RETURNING id, email, hashed_password, full_name, is_active, is_superuser,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&changes.email)
        .bind(&changes.hashed_password)
        .bind(&changes.full_name)
        .bind(changes.is_active)
        .fetch_optional(db)
        .await
    }

    /// Hard delete. Returns the removed row, `None` when no row matches.
    pub async fn delete(db: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            DELETE FROM users
            WHERE id = $1
            RETURNING id, email, hashed_password, full_name, is_active, is_superuser,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "a@b.com".into(),
            hashed_password: "$argon2id$v=19$m=19456,t=2,p=1$abc$def".into(),
            full_name: Some("A".into()),
            is_active: true,
            is_superuser: false,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn serialized_user_never_contains_password() {
        let json = serde_json::to_string(&sample_user()).unwrap();
        assert!(!json.contains("hashed_password"));
        assert!(!json.contains("argon2"));
        assert!(json.contains("a@b.com"));
    }

    #[test]
    fn empty_changes_leave_every_field_unset() {
        let changes = UserChanges::default();
        assert!(changes.email.is_none());
        assert!(changes.hashed_password.is_none());
        assert!(changes.full_name.is_none());
        assert!(changes.is_active.is_none());
    }
}
