use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;

/// Dashboard account. The role is kept as its raw tag; unknown tags are
/// resolved to a role without permissions by the permission layer.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct AdminUser {
    pub id: String,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AdminUser {
    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, AdminUser>(
            r#"SELECT id, email, role, created_at, updated_at
            FROM admin_users
            WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn upsert(
        pool: &SqlitePool,
        id: &str,
        email: &str,
        role: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, AdminUser>(
            r#"INSERT INTO admin_users (id, email, role)
            VALUES ($1, $2, $3)
            ON CONFLICT(id) DO UPDATE SET
                email = excluded.email,
                role = excluded.role,
                updated_at = datetime('now', 'subsec')
            RETURNING id, email, role, created_at, updated_at"#,
        )
        .bind(id)
        .bind(email)
        .bind(role)
        .fetch_one(pool)
        .await
    }
}
