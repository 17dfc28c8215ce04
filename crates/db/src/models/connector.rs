use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumIter, EnumString};
use ts_rs::TS;

/// RAST 5 pitch in millimetres, used when a source folder does not state one.
pub const RAST5_PITCH_MM: f64 = 5.0;

const CONNECTOR_COLUMNS: &str = r#"
    id,
    name,
    description,
    pole_count,
    connector_type,
    gender,
    orientation,
    pitch_mm,
    mates_with,
    assembly_variants,
    created_at,
    updated_at
"#;

/// Connector type code as printed in the part number
#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, Hash, TS, EnumString, Display, EnumIter,
)]
pub enum ConnectorType {
    /// Female socket housing
    R,
    /// Female socket housing, alternative latch
    S,
    /// Male tab housing
    T,
    /// Board-mounted header
    #[sqlx(rename = "PCB")]
    #[serde(rename = "PCB")]
    #[strum(serialize = "PCB")]
    Pcb,
}

impl ConnectorType {
    pub fn gender(self) -> Gender {
        match self {
            ConnectorType::R | ConnectorType::S => Gender::Female,
            ConnectorType::T => Gender::Male,
            ConnectorType::Pcb => Gender::PcbHeader,
        }
    }

    pub fn is_female_family(self) -> bool {
        matches!(self, ConnectorType::R | ConnectorType::S)
    }

    pub fn is_male_family(self) -> bool {
        self == ConnectorType::T
    }
}

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, Hash, TS, EnumString, Display, EnumIter,
)]
pub enum Gender {
    Female,
    Male,
    #[sqlx(rename = "PCB Header")]
    #[serde(rename = "PCB Header")]
    #[strum(serialize = "PCB Header")]
    PcbHeader,
}

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, Hash, TS, EnumString, Display, EnumIter,
)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Connector {
    pub id: String, // Source folder name
    pub name: String,
    pub description: Option<String>,
    pub pole_count: i64,
    pub connector_type: ConnectorType,
    pub gender: Gender,
    pub orientation: Option<Orientation>,
    pub pitch_mm: f64,
    pub mates_with: Option<String>,        // JSON-serialized Vec<String>, NULL when empty
    pub assembly_variants: Option<String>, // JSON-serialized Vec<String>, NULL when empty
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Connector {
    /// Parse the mates_with JSON into a list of connector ids
    pub fn mates_with_ids(&self) -> Vec<String> {
        parse_id_list(self.mates_with.as_deref())
    }

    /// Parse the assembly_variants JSON into a list of connector ids
    pub fn assembly_variant_ids(&self) -> Vec<String> {
        parse_id_list(self.assembly_variants.as_deref())
    }

    /// Whether the stored gender label agrees with the type code
    pub fn has_consistent_gender(&self) -> bool {
        self.connector_type.gender() == self.gender
    }
}

fn parse_id_list(json: Option<&str>) -> Vec<String> {
    json.and_then(|json| serde_json::from_str(json).ok())
        .unwrap_or_default()
}

/// Encode a relationship list for storage. Empty lists are stored as NULL.
pub fn encode_id_list(ids: Option<&[String]>) -> Result<Option<String>, serde_json::Error> {
    match ids {
        Some(ids) if !ids.is_empty() => serde_json::to_string(ids).map(Some),
        _ => Ok(None),
    }
}

/// Data needed to ingest a connector. Gender is always derived from the type.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateConnector {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub pole_count: i64,
    pub connector_type: ConnectorType,
    pub orientation: Option<Orientation>,
    pub pitch_mm: Option<f64>,
}

/// Catalog listing filter; unset fields do not constrain the result
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct ConnectorFilter {
    pub pole_count: Option<i64>,
    pub connector_type: Option<ConnectorType>,
    pub gender: Option<Gender>,
    pub orientation: Option<Orientation>,
}

/// Compact projection used for compatibility lists on the detail page
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ConnectorSummary {
    pub id: String,
    pub name: String,
    pub pole_count: i64,
    pub connector_type: ConnectorType,
    pub gender: Gender,
    pub orientation: Option<Orientation>,
}

impl From<&Connector> for ConnectorSummary {
    fn from(connector: &Connector) -> Self {
        Self {
            id: connector.id.clone(),
            name: connector.name.clone(),
            pole_count: connector.pole_count,
            connector_type: connector.connector_type,
            gender: connector.gender,
            orientation: connector.orientation,
        }
    }
}

impl Connector {
    pub async fn create(pool: &SqlitePool, data: &CreateConnector) -> Result<Self, sqlx::Error> {
        let gender = data.connector_type.gender();
        let pitch_mm = data.pitch_mm.unwrap_or(RAST5_PITCH_MM);
        sqlx::query_as::<_, Connector>(&format!(
            r#"INSERT INTO connectors (id, name, description, pole_count, connector_type, gender, orientation, pitch_mm)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {CONNECTOR_COLUMNS}"#
        ))
        .bind(&data.id)
        .bind(&data.name)
        .bind(&data.description)
        .bind(data.pole_count)
        .bind(data.connector_type)
        .bind(gender)
        .bind(data.orientation)
        .bind(pitch_mm)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Connector>(&format!(
            "SELECT {CONNECTOR_COLUMNS} FROM connectors WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Connector>(&format!(
            "SELECT {CONNECTOR_COLUMNS} FROM connectors ORDER BY pole_count ASC, id ASC"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_ids(pool: &SqlitePool, ids: &[String]) -> Result<Vec<Self>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {CONNECTOR_COLUMNS} FROM connectors WHERE id IN ("
        ));
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(") ORDER BY pole_count ASC, id ASC");

        builder.build_query_as::<Connector>().fetch_all(pool).await
    }

    pub async fn find_filtered(
        pool: &SqlitePool,
        filter: &ConnectorFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {CONNECTOR_COLUMNS} FROM connectors WHERE 1 = 1"
        ));
        if let Some(pole_count) = filter.pole_count {
            builder.push(" AND pole_count = ").push_bind(pole_count);
        }
        if let Some(connector_type) = filter.connector_type {
            builder.push(" AND connector_type = ").push_bind(connector_type);
        }
        if let Some(gender) = filter.gender {
            builder.push(" AND gender = ").push_bind(gender);
        }
        if let Some(orientation) = filter.orientation {
            builder.push(" AND orientation = ").push_bind(orientation);
        }
        builder.push(" ORDER BY pole_count ASC, id ASC");

        builder.build_query_as::<Connector>().fetch_all(pool).await
    }

    /// Overwrite both computed relationship columns of a single connector
    pub async fn update_relationships(
        pool: &SqlitePool,
        id: &str,
        mates_with: Option<&[String]>,
        assembly_variants: Option<&[String]>,
    ) -> Result<(), sqlx::Error> {
        let mates_with =
            encode_id_list(mates_with).map_err(|e| sqlx::Error::Protocol(e.to_string()))?;
        let assembly_variants =
            encode_id_list(assembly_variants).map_err(|e| sqlx::Error::Protocol(e.to_string()))?;

        let result = sqlx::query(
            r#"UPDATE connectors
            SET mates_with = $2,
                assembly_variants = $3,
                updated_at = datetime('now', 'subsec')
            WHERE id = $1"#,
        )
        .bind(id)
        .bind(mates_with)
        .bind(assembly_variants)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }
        Ok(())
    }

    pub async fn exists(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM connectors WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await?;
        Ok(count > 0)
    }
}
