//! Connector ingestion from a source folder tree.
//!
//! Each subdirectory of the source root is one connector; its folder name is
//! the connector id. The folder holds a `connector.toml` with the immutable
//! catalog fields, next to whatever media the catalog ships for that part.

use std::{
    fs,
    path::{Path, PathBuf},
};

use db::models::{
    audit_log::{AuditAction, AuditLog},
    connector::{Connector, ConnectorType, CreateConnector, Orientation},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info, warn};
use ts_rs::TS;
use walkdir::WalkDir;

pub const MANIFEST_FILE: &str = "connector.toml";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("source directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    #[error("folder name is not valid UTF-8: {}", .0.display())]
    NonUtf8FolderName(PathBuf),
    #[error("{folder}: missing connector.toml")]
    MissingManifest { folder: String },
    #[error("{folder}: invalid connector.toml: {message}")]
    InvalidManifest { folder: String, message: String },
    #[error("{folder}: pole count must be positive, got {pole_count}")]
    InvalidPoleCount { folder: String, pole_count: i64 },
}

/// Contents of `connector.toml`. Gender is intentionally absent: it is
/// always derived from the type code.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConnectorManifest {
    name: Option<String>,
    description: Option<String>,
    pole_count: i64,
    connector_type: ConnectorType,
    orientation: Option<Orientation>,
    pitch_mm: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct IngestIssue {
    pub folder: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct IngestReport {
    pub created: Vec<String>,
    /// Already present; stored fields are never overwritten
    pub skipped_existing: Vec<String>,
    pub invalid: Vec<IngestIssue>,
}

/// Parse a single connector folder
pub fn read_connector_folder(folder: &Path) -> Result<CreateConnector, IngestError> {
    let name = folder
        .file_name()
        .ok_or_else(|| IngestError::NotADirectory(folder.to_path_buf()))?;
    // The folder name is the permanent id, so it must round-trip exactly
    let id = name
        .to_str()
        .ok_or_else(|| IngestError::NonUtf8FolderName(folder.to_path_buf()))?
        .to_string();

    let manifest_path = folder.join(MANIFEST_FILE);
    if !manifest_path.is_file() {
        return Err(IngestError::MissingManifest { folder: id });
    }

    let raw = fs::read_to_string(&manifest_path)?;
    let manifest: ConnectorManifest =
        toml::from_str(&raw).map_err(|e| IngestError::InvalidManifest {
            folder: id.clone(),
            message: e.to_string(),
        })?;

    if manifest.pole_count <= 0 {
        return Err(IngestError::InvalidPoleCount {
            folder: id,
            pole_count: manifest.pole_count,
        });
    }

    let name = manifest.name.unwrap_or_else(|| {
        format!(
            "RAST 5 {}-pole {} housing",
            manifest.pole_count, manifest.connector_type
        )
    });

    Ok(CreateConnector {
        id,
        name,
        description: manifest.description,
        pole_count: manifest.pole_count,
        connector_type: manifest.connector_type,
        orientation: manifest.orientation,
        pitch_mm: manifest.pitch_mm,
    })
}

/// Parse every connector folder directly under `root`, sorted by folder name
pub fn scan_source_dir(
    root: &Path,
) -> Result<Vec<(String, Result<CreateConnector, IngestError>)>, IngestError> {
    if !root.is_dir() {
        return Err(IngestError::NotADirectory(root.to_path_buf()));
    }

    let mut entries = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            debug!(path = %entry.path().display(), "Ingest: skipping non-directory entry");
            continue;
        }
        // Lossy only for the report label; the folder itself is rejected below
        let folder = entry.file_name().to_string_lossy().into_owned();
        entries.push((folder, read_connector_folder(entry.path())));
    }
    Ok(entries)
}

pub struct ConnectorIngestService {
    pool: SqlitePool,
}

impl ConnectorIngestService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a record for every valid folder not yet in the catalog. Invalid
    /// folders are reported and skipped; database errors abort.
    pub async fn ingest_dir(
        &self,
        root: &Path,
        actor: Option<&str>,
    ) -> Result<IngestReport, IngestError> {
        let mut report = IngestReport::default();

        for (folder, parsed) in scan_source_dir(root)? {
            let data = match parsed {
                Ok(data) => data,
                Err(e) => {
                    warn!(folder = %folder, error = %e, "Ingest: skipping invalid connector folder");
                    report.invalid.push(IngestIssue {
                        folder,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            if Connector::exists(&self.pool, &data.id).await? {
                debug!(connector_id = %data.id, "Ingest: connector already present");
                report.skipped_existing.push(data.id);
                continue;
            }

            let connector = Connector::create(&self.pool, &data).await?;
            info!(
                connector_id = %connector.id,
                pole_count = connector.pole_count,
                connector_type = %connector.connector_type,
                "Ingest: created connector"
            );
            report.created.push(connector.id);
        }

        info!(
            created = report.created.len(),
            skipped = report.skipped_existing.len(),
            invalid = report.invalid.len(),
            "Ingest complete"
        );

        if let Err(e) = AuditLog::create(
            &self.pool,
            actor,
            AuditAction::ConnectorsIngested,
            serde_json::to_value(&report).ok(),
        )
        .await
        {
            warn!(error = %e, "Ingest: failed to write audit log");
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use db::{DBService, models::connector::Gender};
    use tempfile::TempDir;

    use super::*;

    fn write_folder(root: &Path, name: &str, manifest: Option<&str>) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        if let Some(manifest) = manifest {
            fs::write(dir.join(MANIFEST_FILE), manifest).unwrap();
        }
    }

    #[test]
    fn test_read_connector_folder() {
        let tmp = TempDir::new().unwrap();
        write_folder(
            tmp.path(),
            "RAST5-4P-T-V",
            Some(
                r#"
pole_count = 4
connector_type = "T"
orientation = "Vertical"
"#,
            ),
        );

        let data = read_connector_folder(&tmp.path().join("RAST5-4P-T-V")).unwrap();
        assert_eq!(data.id, "RAST5-4P-T-V");
        assert_eq!(data.pole_count, 4);
        assert_eq!(data.connector_type, ConnectorType::T);
        assert_eq!(data.orientation, Some(Orientation::Vertical));
        assert_eq!(data.name, "RAST 5 4-pole T housing");
    }

    #[test]
    fn test_manifest_rejects_gender_field() {
        let tmp = TempDir::new().unwrap();
        write_folder(
            tmp.path(),
            "bad",
            Some("pole_count = 2\nconnector_type = \"R\"\ngender = \"Male\"\n"),
        );
        let err = read_connector_folder(&tmp.path().join("bad")).unwrap_err();
        assert!(matches!(err, IngestError::InvalidManifest { .. }));
    }

    #[test]
    fn test_rejects_non_positive_pole_count() {
        let tmp = TempDir::new().unwrap();
        write_folder(
            tmp.path(),
            "zero",
            Some("pole_count = 0\nconnector_type = \"PCB\"\n"),
        );
        let err = read_connector_folder(&tmp.path().join("zero")).unwrap_err();
        assert!(matches!(err, IngestError::InvalidPoleCount { pole_count: 0, .. }));
    }

    #[tokio::test]
    async fn test_ingest_dir_creates_and_skips() {
        let tmp = TempDir::new().unwrap();
        write_folder(
            tmp.path(),
            "2P-PCB-H",
            Some("pole_count = 2\nconnector_type = \"PCB\"\norientation = \"Horizontal\"\nname = \"Header\"\n"),
        );
        write_folder(
            tmp.path(),
            "2P-R",
            Some("pole_count = 2\nconnector_type = \"R\"\n"),
        );
        write_folder(tmp.path(), "media-only", None);
        fs::write(tmp.path().join("README.txt"), "not a connector").unwrap();

        let db = DBService::new_in_memory().await.unwrap();
        let service = ConnectorIngestService::new(db.pool.clone());

        let report = service.ingest_dir(tmp.path(), None).await.unwrap();
        assert_eq!(report.created, vec!["2P-PCB-H".to_string(), "2P-R".to_string()]);
        assert_eq!(report.invalid.len(), 1);
        assert_eq!(report.invalid[0].folder, "media-only");

        let header = Connector::find_by_id(&db.pool, "2P-PCB-H")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(header.gender, Gender::PcbHeader);
        assert_eq!(header.name, "Header");

        let again = service.ingest_dir(tmp.path(), None).await.unwrap();
        assert!(again.created.is_empty());
        assert_eq!(again.skipped_existing.len(), 2);

        let logs = AuditLog::find_recent(&db.pool, 10).await.unwrap();
        assert_eq!(logs.len(), 2);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_utf8_folder_is_reported_invalid() {
        use std::{ffi::OsStr, os::unix::ffi::OsStrExt};

        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join(OsStr::from_bytes(b"4P-R-\xff"));
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join(MANIFEST_FILE),
            "pole_count = 4\nconnector_type = \"R\"\n",
        )
        .unwrap();

        let err = read_connector_folder(&dir).unwrap_err();
        assert!(matches!(err, IngestError::NonUtf8FolderName(_)));

        let db = DBService::new_in_memory().await.unwrap();
        let report = ConnectorIngestService::new(db.pool.clone())
            .ingest_dir(tmp.path(), None)
            .await
            .unwrap();
        assert!(report.created.is_empty());
        assert_eq!(report.invalid.len(), 1);
        assert!(Connector::find_all(&db.pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ingest_missing_root() {
        let db = DBService::new_in_memory().await.unwrap();
        let service = ConnectorIngestService::new(db.pool.clone());
        let result = service
            .ingest_dir(Path::new("/definitely/not/here"), None)
            .await;
        assert!(matches!(result, Err(IngestError::NotADirectory(_))));
    }
}
