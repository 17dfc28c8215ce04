//! Batch pass that recomputes and persists connector relationships.

use async_trait::async_trait;
use db::{
    DBService,
    models::{
        audit_log::{AuditAction, AuditLog},
        connector::Connector,
    },
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};
use ts_rs::TS;

use super::compatibility::{self, ResolvedRelationships};

#[derive(Debug, Error)]
pub enum RelationshipSyncError {
    #[error("failed to fetch connectors: {0}")]
    Fetch(#[source] sqlx::Error),
}

/// Record store capabilities the pass needs
#[async_trait]
pub trait ConnectorStore: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<Connector>, sqlx::Error>;

    async fn update_relationships(
        &self,
        relationships: &ResolvedRelationships,
    ) -> Result<(), sqlx::Error>;
}

pub struct SqliteConnectorStore {
    pool: SqlitePool,
}

impl SqliteConnectorStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConnectorStore for SqliteConnectorStore {
    async fn fetch_all(&self) -> Result<Vec<Connector>, sqlx::Error> {
        Connector::find_all(&self.pool).await
    }

    async fn update_relationships(
        &self,
        relationships: &ResolvedRelationships,
    ) -> Result<(), sqlx::Error> {
        Connector::update_relationships(
            &self.pool,
            &relationships.connector_id,
            relationships.mates_with.as_deref(),
            relationships.assembly_variants.as_deref(),
        )
        .await
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct SyncFailure {
    pub connector_id: String,
    pub error: String,
}

/// Outcome of one pass
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct SyncReport {
    pub dry_run: bool,
    pub total: usize,
    pub updated: usize,
    /// Directed edges, so every mating pair counts twice
    pub mate_links: usize,
    pub variant_links: usize,
    /// Connectors whose stored gender label disagrees with their type
    pub inconsistent_gender: Vec<String>,
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct RelationshipSyncService<S> {
    store: S,
}

impl<S: ConnectorStore> RelationshipSyncService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Fetch every connector, resolve relationships over the full set and
    /// write them back one record at a time. A failed fetch aborts before
    /// anything is computed; a failed write is recorded and the pass goes on.
    pub async fn run(&self, dry_run: bool) -> Result<SyncReport, RelationshipSyncError> {
        let connectors = self
            .store
            .fetch_all()
            .await
            .map_err(RelationshipSyncError::Fetch)?;

        let mut report = SyncReport {
            dry_run,
            total: connectors.len(),
            ..Default::default()
        };

        for connector in connectors.iter().filter(|c| !c.has_consistent_gender()) {
            warn!(
                connector_id = %connector.id,
                connector_type = %connector.connector_type,
                gender = %connector.gender,
                "Relationship sync: stored gender disagrees with connector type"
            );
            report.inconsistent_gender.push(connector.id.clone());
        }

        let resolved = compatibility::resolve_connectors(&connectors);
        info!(
            connectors = connectors.len(),
            dry_run, "Relationship sync: resolved relationships"
        );

        for relationships in &resolved {
            report.mate_links += relationships.mates_with().len();
            report.variant_links += relationships.assembly_variants().len();

            if dry_run {
                continue;
            }

            match self.store.update_relationships(relationships).await {
                Ok(()) => report.updated += 1,
                Err(e) => {
                    warn!(
                        connector_id = %relationships.connector_id,
                        error = %e,
                        "Relationship sync: failed to persist relationships"
                    );
                    report.failures.push(SyncFailure {
                        connector_id: relationships.connector_id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            total = report.total,
            updated = report.updated,
            failed = report.failures.len(),
            mate_links = report.mate_links,
            variant_links = report.variant_links,
            "Relationship sync complete"
        );

        Ok(report)
    }
}

/// Run the pass against the catalog database and record the outcome in the
/// audit log. Audit write failures are logged only.
pub async fn sync_with_audit(
    db: &DBService,
    actor: Option<&str>,
    dry_run: bool,
) -> Result<SyncReport, RelationshipSyncError> {
    let service = RelationshipSyncService::new(SqliteConnectorStore::new(db.pool.clone()));
    let outcome = service.run(dry_run).await;

    let (action, details) = match &outcome {
        Ok(report) => (
            AuditAction::RelationshipsSynced,
            serde_json::to_value(report).ok(),
        ),
        Err(e) => (
            AuditAction::RelationshipsSyncFailed,
            Some(serde_json::json!({ "error": e.to_string() })),
        ),
    };
    if let Err(e) = AuditLog::create(&db.pool, actor, action, details).await {
        warn!(error = %e, "Relationship sync: failed to write audit log");
    }

    outcome
}
