//! Session resolution for dashboard requests.
//!
//! The session layer issues HS256 tokens carrying the user id, email and role.
//! When the user has a row in `admin_users`, the stored role replaces the
//! token claim. Anything that cannot be verified resolves to "no user".

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use db::models::admin_user::AdminUser;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use services::services::permissions::{
    Permission, PermissionError, PermissionUser, Role, require_permission,
};
use tracing::{debug, warn};

use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub email: String,
    pub role: String,
    pub exp: u64,
}

#[derive(Clone)]
pub struct SessionVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl SessionVerifier {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
        decode::<SessionClaims>(token, &self.key, &self.validation).map(|data| data.claims)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// The authenticated user, if any. Never rejects; handlers decide whether a
/// missing user is an error.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<PermissionUser>);

impl CurrentUser {
    pub fn user(&self) -> Option<&PermissionUser> {
        self.0.as_ref()
    }

    pub fn require(&self, permission: Permission) -> Result<&PermissionUser, PermissionError> {
        require_permission(self.user(), permission)?;
        self.require_authenticated()
    }

    pub fn require_authenticated(&self) -> Result<&PermissionUser, PermissionError> {
        self.user().ok_or(PermissionError::Unauthenticated)
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(&parts.headers) else {
            return Ok(CurrentUser(None));
        };

        let claims = match state.sessions.verify(token) {
            Ok(claims) => claims,
            Err(e) => {
                debug!(error = %e, "Rejected session token");
                return Ok(CurrentUser(None));
            }
        };

        let role_tag = match AdminUser::find_by_id(&state.db.pool, &claims.sub).await {
            Ok(Some(stored)) => stored.role,
            Ok(None) => claims.role.clone(),
            Err(e) => {
                warn!(user_id = %claims.sub, error = %e, "Failed to load admin user");
                return Ok(CurrentUser(None));
            }
        };

        let role = Role::from_tag(&role_tag);
        if !role.is_known() {
            warn!(user_id = %claims.sub, role = %role, "Session carries an unknown role");
        }

        Ok(CurrentUser(Some(PermissionUser::new(
            claims.sub,
            role,
            claims.email,
        ))))
    }
}
