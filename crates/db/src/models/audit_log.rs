use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

/// Operator-visible catalog maintenance actions
#[derive(Debug, Clone, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display)]
#[sqlx(type_name = "audit_action", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuditAction {
    ConnectorsIngested,
    RelationshipsSynced,
    RelationshipsSyncFailed,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct AuditLog {
    pub id: Uuid,
    pub actor: Option<String>, // Admin user id, None for CLI runs
    pub action: AuditAction,
    pub details: Option<String>, // JSON payload
    pub created_at: DateTime<Utc>,
}

impl AuditLog {
    pub async fn create(
        pool: &SqlitePool,
        actor: Option<&str>,
        action: AuditAction,
        details: Option<serde_json::Value>,
    ) -> Result<Self, sqlx::Error> {
        let id = Uuid::new_v4();
        let details = details.map(|value| value.to_string());
        sqlx::query_as::<_, AuditLog>(
            r#"INSERT INTO audit_logs (id, actor, action, details)
            VALUES ($1, $2, $3, $4)
            RETURNING id, actor, action, details, created_at"#,
        )
        .bind(id)
        .bind(actor)
        .bind(action)
        .bind(details)
        .fetch_one(pool)
        .await
    }

    pub async fn find_recent(pool: &SqlitePool, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, AuditLog>(
            r#"SELECT id, actor, action, details, created_at
            FROM audit_logs
            ORDER BY created_at DESC
            LIMIT $1"#,
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}
