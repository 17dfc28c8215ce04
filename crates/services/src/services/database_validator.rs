//! Schema check run before maintenance jobs touch the catalog

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};

/// Tables the catalog services read and write
pub const REQUIRED_TABLES: &[&str] = &["connectors", "admin_users", "audit_logs"];

#[derive(Debug, Error)]
pub enum DatabaseValidationError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("database not ready: {0}")]
    NotReady(String),
}

pub struct DatabaseValidator {
    pool: SqlitePool,
}

impl DatabaseValidator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn validate(&self) -> Result<ValidationResult, DatabaseValidationError> {
        if !self.table_exists("_sqlx_migrations").await? {
            warn!("Catalog database has no migration history");
            return Ok(ValidationResult {
                is_initialized: false,
                migrations_applied: 0,
                latest_migration: None,
                missing_tables: REQUIRED_TABLES.iter().map(|t| t.to_string()).collect(),
            });
        }

        let migrations_applied: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
                .fetch_one(&self.pool)
                .await?;
        let latest_migration: Option<String> = sqlx::query_scalar(
            "SELECT description FROM _sqlx_migrations WHERE success = 1 ORDER BY version DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        let mut missing_tables = Vec::new();
        for table in REQUIRED_TABLES {
            if !self.table_exists(table).await? {
                missing_tables.push(table.to_string());
            }
        }

        info!(
            migrations_applied,
            missing_tables = missing_tables.len(),
            "Catalog database validation complete"
        );

        Ok(ValidationResult {
            is_initialized: true,
            migrations_applied: migrations_applied as usize,
            latest_migration,
            missing_tables,
        })
    }

    /// Validate and turn an unusable schema into an error
    pub async fn ensure_ready(&self) -> Result<ValidationResult, DatabaseValidationError> {
        let result = self.validate().await?;
        if result.is_ok() {
            Ok(result)
        } else {
            Err(DatabaseValidationError::NotReady(result.summary()))
        }
    }

    async fn table_exists(&self, table: &str) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(table)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }
}

#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_initialized: bool,
    pub migrations_applied: usize,
    pub latest_migration: Option<String>,
    pub missing_tables: Vec<String>,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.is_initialized && self.missing_tables.is_empty()
    }

    pub fn summary(&self) -> String {
        if !self.is_initialized {
            "database not initialized - migrations need to be run".to_string()
        } else if !self.missing_tables.is_empty() {
            format!("missing tables: {}", self.missing_tables.join(", "))
        } else {
            format!("{} migrations applied", self.migrations_applied)
        }
    }
}
