//! Dashboard routes gated by role permissions.

use axum::{
    Router,
    extract::{Query, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::audit_log::AuditLog;
use serde::{Deserialize, Serialize};
use services::services::{
    permissions::{
        Permission, can_access_audit_logs, can_manage_content, can_manage_system,
        can_manage_users, is_super_admin, permissions_for,
    },
    relationship_sync::{SyncReport, sync_with_audit},
};
use tracing::info;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{AppState, auth::CurrentUser, error::ApiError};

const DEFAULT_AUDIT_LOG_LIMIT: i64 = 50;
const MAX_AUDIT_LOG_LIMIT: i64 = 200;

/// What the dashboard may render for the current user
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct MeResponse {
    pub id: String,
    pub email: String,
    pub role: String,
    pub permissions: Vec<Permission>,
    pub is_super_admin: bool,
    pub can_manage_content: bool,
    pub can_manage_users: bool,
    pub can_manage_system: bool,
    pub can_access_audit_logs: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncParams {
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditLogParams {
    pub limit: Option<i64>,
}

/// GET /api/admin/me
pub async fn get_me(current: CurrentUser) -> Result<ResponseJson<ApiResponse<MeResponse>>, ApiError> {
    let user = current.require_authenticated()?;
    let me = Some(user);

    Ok(ResponseJson(ApiResponse::success(MeResponse {
        id: user.id.clone(),
        email: user.email.clone(),
        role: user.role.to_string(),
        permissions: permissions_for(me).to_vec(),
        is_super_admin: is_super_admin(me),
        can_manage_content: can_manage_content(me),
        can_manage_users: can_manage_users(me),
        can_manage_system: can_manage_system(me),
        can_access_audit_logs: can_access_audit_logs(me),
    })))
}

/// POST /api/admin/relationships/sync
/// Recompute mates/variants for the whole catalog
pub async fn sync_relationships(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(params): Query<SyncParams>,
) -> Result<ResponseJson<ApiResponse<SyncReport>>, ApiError> {
    let user = current.require(Permission::SystemMigrate)?;
    info!(user_id = %user.id, dry_run = params.dry_run, "Relationship sync requested");

    let report = sync_with_audit(&state.db, Some(&user.id), params.dry_run).await?;
    Ok(ResponseJson(ApiResponse::success(report)))
}

/// GET /api/admin/audit-logs
pub async fn list_audit_logs(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(params): Query<AuditLogParams>,
) -> Result<ResponseJson<ApiResponse<Vec<AuditLog>>>, ApiError> {
    current.require(Permission::AuditLogsRead)?;

    let limit = params
        .limit
        .unwrap_or(DEFAULT_AUDIT_LOG_LIMIT)
        .clamp(1, MAX_AUDIT_LOG_LIMIT);
    let logs = AuditLog::find_recent(&state.db.pool, limit).await?;
    Ok(ResponseJson(ApiResponse::success(logs)))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new().nest(
        "/admin",
        Router::new()
            .route("/me", get(get_me))
            .route("/relationships/sync", post(sync_relationships))
            .route("/audit-logs", get(list_audit_logs)),
    )
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header::AUTHORIZATION},
    };
    use db::{
        DBService,
        models::{
            admin_user::AdminUser,
            connector::{Connector, ConnectorType, CreateConnector},
        },
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::{
        app,
        auth::test_support::{TEST_SECRET, token_for},
    };

    use super::*;

    async fn state() -> AppState {
        let db = DBService::new_in_memory().await.unwrap();
        for (id, connector_type) in [("3P-R", ConnectorType::R), ("3P-T", ConnectorType::T)] {
            Connector::create(
                &db.pool,
                &CreateConnector {
                    id: id.to_string(),
                    name: id.to_string(),
                    description: None,
                    pole_count: 3,
                    connector_type,
                    orientation: None,
                    pitch_mm: None,
                },
            )
            .await
            .unwrap();
        }
        AppState::with_secret(db, TEST_SECRET)
    }

    async fn call(
        state: AppState,
        method: &str,
        uri: &str,
        token: Option<String>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let response = app(state)
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_me_requires_session() {
        let (status, body) = call(state().await, "GET", "/api/admin/me", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);

        let (status, _) = call(
            state().await,
            "GET",
            "/api/admin/me",
            Some("not-a-jwt".to_string()),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_me_lists_role_permissions() {
        let token = token_for("t1", "translator");
        let (status, body) = call(state().await, "GET", "/api/admin/me", Some(token)).await;
        assert_eq!(status, StatusCode::OK);

        let data = &body["data"];
        assert_eq!(data["role"], "translator");
        assert_eq!(
            data["permissions"],
            serde_json::json!(["connectors:read", "translations:read", "translations:update"])
        );
        assert_eq!(data["can_manage_content"], false);
        assert_eq!(data["is_super_admin"], false);
    }

    #[tokio::test]
    async fn test_unknown_role_gets_nothing() {
        let token = token_for("x1", "owner");
        let (status, body) = call(state().await, "GET", "/api/admin/me", Some(token.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["permissions"], serde_json::json!([]));

        let (status, _) = call(
            state().await,
            "POST",
            "/api/admin/relationships/sync",
            Some(token),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_sync_requires_migrate_permission() {
        let token = token_for("c1", "content_manager");
        let (status, body) = call(
            state().await,
            "POST",
            "/api/admin/relationships/sync",
            Some(token),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(
            body["message"],
            "role 'content_manager' lacks permission 'system:migrate'"
        );
    }

    #[tokio::test]
    async fn test_super_admin_runs_sync_and_reads_audit_log() {
        let state = state().await;
        let token = token_for("root", "super_admin");

        let (status, body) = call(
            state.clone(),
            "POST",
            "/api/admin/relationships/sync",
            Some(token.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["updated"], 2);
        assert_eq!(body["data"]["mate_links"], 2);

        let stored = Connector::find_by_id(&state.db.pool, "3P-R")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.mates_with_ids(), vec!["3P-T".to_string()]);

        let (status, body) = call(state, "GET", "/api/admin/audit-logs", Some(token)).await;
        assert_eq!(status, StatusCode::OK);
        let logs = body["data"].as_array().unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0]["action"], "relationships_synced");
        assert_eq!(logs[0]["actor"], "root");
    }

    #[tokio::test]
    async fn test_stored_role_overrides_token_claim() {
        let state = state().await;
        AdminUser::upsert(&state.db.pool, "demoted", "d@example.com", "sales_viewer")
            .await
            .unwrap();
        let token = token_for("demoted", "super_admin");

        let (status, _) = call(
            state.clone(),
            "GET",
            "/api/admin/audit-logs",
            Some(token.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (_, body) = call(state, "GET", "/api/admin/me", Some(token)).await;
        assert_eq!(body["data"]["role"], "sales_viewer");
    }
}
