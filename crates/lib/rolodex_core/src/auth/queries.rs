//! Admin allowlist queries.

use sqlx::PgPool;
use uuid::Uuid;

use super::AuthError;
use crate::models::auth::Admin;

/// Fetch an admin by email (case-insensitive).
pub async fn find_admin_by_email(pool: &PgPool, email: &str) -> Result<Option<Admin>, AuthError> {
    let row = sqlx::query_as::<_, Admin>(
        "SELECT id, email, username, created_at, created_by \
         FROM admins WHERE lower(email) = lower($1)",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Fetch an admin by ID.
pub async fn find_admin_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Admin>, AuthError> {
    let row = sqlx::query_as::<_, Admin>(
        "SELECT id, email, username, created_at, created_by FROM admins WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Check whether an email belongs to an admin (case-insensitive).
pub async fn is_admin_email(pool: &PgPool, email: &str) -> Result<bool, AuthError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM admins WHERE lower(email) = lower($1))",
    )
    .bind(email)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

/// List all admins, oldest first.
pub async fn list_admins(pool: &PgPool) -> Result<Vec<Admin>, AuthError> {
    let rows = sqlx::query_as::<_, Admin>(
        "SELECT id, email, username, created_at, created_by FROM admins ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Create a new admin, returning the stored row.
pub async fn create_admin(
    pool: &PgPool,
    email: &str,
    username: Option<&str>,
    created_by: &str,
) -> Result<Admin, AuthError> {
    let row = sqlx::query_as::<_, Admin>(
        "INSERT INTO admins (id, email, username, created_by) \
         VALUES ($1, lower($2), $3, $4) \
         RETURNING id, email, username, created_at, created_by",
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(username)
    .bind(created_by)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Delete an admin by ID. Returns whether a row was removed.
pub async fn delete_admin(pool: &PgPool, id: Uuid) -> Result<bool, AuthError> {
    let result = sqlx::query("DELETE FROM admins WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Idempotently seed the initial admin. Returns whether a row was inserted.
pub async fn seed_admin(pool: &PgPool, email: &str) -> Result<bool, AuthError> {
    let result = sqlx::query(
        "INSERT INTO admins (id, email, created_by) VALUES ($1, lower($2), 'bootstrap') \
         ON CONFLICT (lower(email)) DO NOTHING",
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
