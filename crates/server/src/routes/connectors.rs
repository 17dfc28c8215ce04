//! Public catalog routes.

use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use chrono::{DateTime, Utc};
use db::models::connector::{
    Connector, ConnectorFilter, ConnectorSummary, ConnectorType, Gender, Orientation,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

/// Catalog record as served to clients, relationship columns decoded
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ConnectorResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub pole_count: i64,
    pub connector_type: ConnectorType,
    pub gender: Gender,
    pub orientation: Option<Orientation>,
    pub pitch_mm: f64,
    pub mates_with: Option<Vec<String>>,
    pub assembly_variants: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn non_empty(ids: Vec<String>) -> Option<Vec<String>> {
    (!ids.is_empty()).then_some(ids)
}

impl From<Connector> for ConnectorResponse {
    fn from(connector: Connector) -> Self {
        Self {
            mates_with: non_empty(connector.mates_with_ids()),
            assembly_variants: non_empty(connector.assembly_variant_ids()),
            id: connector.id,
            name: connector.name,
            description: connector.description,
            pole_count: connector.pole_count,
            connector_type: connector.connector_type,
            gender: connector.gender,
            orientation: connector.orientation,
            pitch_mm: connector.pitch_mm,
            created_at: connector.created_at,
            updated_at: connector.updated_at,
        }
    }
}

/// Connector with the records it mates with and its assembly variants
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ConnectorDetail {
    #[serde(flatten)]
    #[ts(flatten)]
    pub connector: ConnectorResponse,
    pub mates: Vec<ConnectorSummary>,
    pub variants: Vec<ConnectorSummary>,
}

/// GET /api/connectors
pub async fn list_connectors(
    State(state): State<AppState>,
    Query(filter): Query<ConnectorFilter>,
) -> Result<ResponseJson<ApiResponse<Vec<ConnectorResponse>>>, ApiError> {
    if filter.pole_count.is_some_and(|poles| poles <= 0) {
        return Err(ApiError::BadRequest(
            "pole_count must be positive".to_string(),
        ));
    }
    let connectors = Connector::find_filtered(&state.db.pool, &filter).await?;
    Ok(ResponseJson(ApiResponse::success(
        connectors.into_iter().map(ConnectorResponse::from).collect(),
    )))
}

/// GET /api/connectors/{connector_id}
pub async fn get_connector(
    State(state): State<AppState>,
    Path(connector_id): Path<String>,
) -> Result<ResponseJson<ApiResponse<ConnectorDetail>>, ApiError> {
    let connector = Connector::find_by_id(&state.db.pool, &connector_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("connector '{connector_id}' not found")))?;

    let mates = Connector::find_by_ids(&state.db.pool, &connector.mates_with_ids()).await?;
    let variants =
        Connector::find_by_ids(&state.db.pool, &connector.assembly_variant_ids()).await?;

    Ok(ResponseJson(ApiResponse::success(ConnectorDetail {
        connector: connector.into(),
        mates: mates.iter().map(ConnectorSummary::from).collect(),
        variants: variants.iter().map(ConnectorSummary::from).collect(),
    })))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/connectors", get(list_connectors))
        .route("/connectors/{connector_id}", get(get_connector))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use db::{
        DBService,
        models::connector::{ConnectorType, CreateConnector, Orientation},
    };
    use serde_json::Value;
    use services::services::relationship_sync::sync_with_audit;
    use tower::ServiceExt;

    use crate::{AppState, app, auth::test_support::TEST_SECRET};

    use super::*;

    async fn seeded_state() -> AppState {
        let db = DBService::new_in_memory().await.unwrap();
        for (id, pole_count, connector_type, orientation) in [
            ("4P-R-H", 4, ConnectorType::R, Some(Orientation::Horizontal)),
            ("4P-S-H", 4, ConnectorType::S, Some(Orientation::Horizontal)),
            ("4P-T-H", 4, ConnectorType::T, Some(Orientation::Horizontal)),
            ("2P-PCB-V", 2, ConnectorType::Pcb, Some(Orientation::Vertical)),
        ] {
            Connector::create(
                &db.pool,
                &CreateConnector {
                    id: id.to_string(),
                    name: id.to_string(),
                    description: None,
                    pole_count,
                    connector_type,
                    orientation,
                    pitch_mm: None,
                },
            )
            .await
            .unwrap();
        }
        sync_with_audit(&db, None, false).await.unwrap();
        AppState::with_secret(db, TEST_SECRET)
    }

    async fn get_json(state: AppState, uri: &str) -> (StatusCode, Value) {
        let response = app(state)
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_list_with_filter() {
        let state = seeded_state().await;
        let (status, body) = get_json(state, "/api/connectors?gender=Female").await;
        assert_eq!(status, StatusCode::OK);
        let ids: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["4P-R-H", "4P-S-H"]);
        assert_eq!(
            body["data"][0]["mates_with"],
            serde_json::json!(["4P-T-H"])
        );
    }

    #[tokio::test]
    async fn test_list_rejects_non_positive_pole_count() {
        let state = seeded_state().await;
        let (status, body) = get_json(state, "/api/connectors?pole_count=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_detail_includes_mates_and_variants() {
        let state = seeded_state().await;
        let (status, body) = get_json(state, "/api/connectors/4P-T-H").await;
        assert_eq!(status, StatusCode::OK);

        let data = &body["data"];
        assert_eq!(data["id"], "4P-T-H");
        assert_eq!(data["gender"], "Male");
        assert!(data["mates_with"].is_array());
        assert_eq!(data["mates_with"], serde_json::json!(["4P-R-H", "4P-S-H"]));
        let mates: Vec<&str> = data["mates"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["id"].as_str().unwrap())
            .collect();
        assert_eq!(mates, vec!["4P-R-H", "4P-S-H"]);
        assert!(data["variants"].as_array().unwrap().is_empty());
        assert_eq!(data["assembly_variants"], Value::Null);
    }

    #[tokio::test]
    async fn test_detail_for_pcb_header() {
        let state = seeded_state().await;
        let (status, body) = get_json(state, "/api/connectors/2P-PCB-V").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["gender"], "PCB Header");
        assert_eq!(body["data"]["mates_with"], Value::Null);
    }

    #[tokio::test]
    async fn test_unknown_connector_is_404() {
        let state = seeded_state().await;
        let (status, _) = get_json(state, "/api/connectors/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
