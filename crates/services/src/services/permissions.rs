//! Role-based access control for the admin dashboard.
//!
//! Roles map to a static set of permissions. Every check fails closed: a
//! missing user, an unrecognised role tag or an unparseable permission tag is
//! never granted anything.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use thiserror::Error;
use ts_rs::TS;

/// A `resource:action` capability
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    TS,
    EnumString,
    Display,
    EnumIter,
    AsRefStr,
)]
pub enum Permission {
    #[serde(rename = "connectors:read")]
    #[strum(serialize = "connectors:read")]
    ConnectorsRead,
    #[serde(rename = "connectors:create")]
    #[strum(serialize = "connectors:create")]
    ConnectorsCreate,
    #[serde(rename = "connectors:update")]
    #[strum(serialize = "connectors:update")]
    ConnectorsUpdate,
    #[serde(rename = "connectors:delete")]
    #[strum(serialize = "connectors:delete")]
    ConnectorsDelete,
    #[serde(rename = "media:upload")]
    #[strum(serialize = "media:upload")]
    MediaUpload,
    #[serde(rename = "media:delete")]
    #[strum(serialize = "media:delete")]
    MediaDelete,
    #[serde(rename = "translations:read")]
    #[strum(serialize = "translations:read")]
    TranslationsRead,
    #[serde(rename = "translations:update")]
    #[strum(serialize = "translations:update")]
    TranslationsUpdate,
    #[serde(rename = "users:read")]
    #[strum(serialize = "users:read")]
    UsersRead,
    #[serde(rename = "users:manage")]
    #[strum(serialize = "users:manage")]
    UsersManage,
    #[serde(rename = "system:settings")]
    #[strum(serialize = "system:settings")]
    SystemSettings,
    #[serde(rename = "system:migrate")]
    #[strum(serialize = "system:migrate")]
    SystemMigrate,
    #[serde(rename = "audit_logs:read")]
    #[strum(serialize = "audit_logs:read")]
    AuditLogsRead,
    #[serde(rename = "analytics:read")]
    #[strum(serialize = "analytics:read")]
    AnalyticsRead,
}

const SUPER_ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::ConnectorsRead,
    Permission::ConnectorsCreate,
    Permission::ConnectorsUpdate,
    Permission::ConnectorsDelete,
    Permission::MediaUpload,
    Permission::MediaDelete,
    Permission::TranslationsRead,
    Permission::TranslationsUpdate,
    Permission::UsersRead,
    Permission::UsersManage,
    Permission::SystemSettings,
    Permission::SystemMigrate,
    Permission::AuditLogsRead,
    Permission::AnalyticsRead,
];

const CONTENT_MANAGER_PERMISSIONS: &[Permission] = &[
    Permission::ConnectorsRead,
    Permission::ConnectorsCreate,
    Permission::ConnectorsUpdate,
    Permission::ConnectorsDelete,
    Permission::MediaUpload,
    Permission::MediaDelete,
    Permission::TranslationsRead,
    Permission::TranslationsUpdate,
    Permission::AnalyticsRead,
];

const TRANSLATOR_PERMISSIONS: &[Permission] = &[
    Permission::ConnectorsRead,
    Permission::TranslationsRead,
    Permission::TranslationsUpdate,
];

const SALES_VIEWER_PERMISSIONS: &[Permission] =
    &[Permission::ConnectorsRead, Permission::AnalyticsRead];

/// Dashboard role. Any tag outside the known set becomes `Unknown`, which
/// holds no permissions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(from = "String", into = "String")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    ContentManager,
    Translator,
    SalesViewer,
    #[strum(disabled)]
    Unknown(String),
}

impl Role {
    pub fn from_tag(tag: &str) -> Self {
        Role::from_str(tag).unwrap_or_else(|_| Role::Unknown(tag.to_string()))
    }

    pub fn as_tag(&self) -> &str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::ContentManager => "content_manager",
            Role::Translator => "translator",
            Role::SalesViewer => "sales_viewer",
            Role::Unknown(tag) => tag,
        }
    }

    /// The static permission table
    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            Role::SuperAdmin => SUPER_ADMIN_PERMISSIONS,
            Role::ContentManager => CONTENT_MANAGER_PERMISSIONS,
            Role::Translator => TRANSLATOR_PERMISSIONS,
            Role::SalesViewer => SALES_VIEWER_PERMISSIONS,
            Role::Unknown(_) => &[],
        }
    }

    pub fn has(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Role::Unknown(_))
    }
}

impl From<String> for Role {
    fn from(tag: String) -> Self {
        Role::from_tag(&tag)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_tag().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// Authenticated dashboard user as seen by permission checks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionUser {
    pub id: String,
    pub role: Role,
    pub email: String,
}

impl PermissionUser {
    pub fn new(id: impl Into<String>, role: Role, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            email: email.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermissionError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("role '{role}' lacks permission '{permission}'")]
    Forbidden { role: String, permission: Permission },
}

pub fn has_permission(user: Option<&PermissionUser>, permission: Permission) -> bool {
    user.is_some_and(|user| user.role.has(permission))
}

/// Check an untyped `resource:action` tag. Unknown tags are never held.
pub fn has_permission_tag(user: Option<&PermissionUser>, tag: &str) -> bool {
    Permission::from_str(tag).is_ok_and(|permission| has_permission(user, permission))
}

/// True when every listed permission is held; vacuously true for an empty
/// list as long as there is a user.
pub fn has_all_permissions(user: Option<&PermissionUser>, permissions: &[Permission]) -> bool {
    user.is_some_and(|user| permissions.iter().all(|p| user.role.has(*p)))
}

pub fn has_any_permission(user: Option<&PermissionUser>, permissions: &[Permission]) -> bool {
    user.is_some_and(|user| permissions.iter().any(|p| user.role.has(*p)))
}

pub fn require_permission(
    user: Option<&PermissionUser>,
    permission: Permission,
) -> Result<(), PermissionError> {
    let user = user.ok_or(PermissionError::Unauthenticated)?;
    if user.role.has(permission) {
        Ok(())
    } else {
        Err(PermissionError::Forbidden {
            role: user.role.to_string(),
            permission,
        })
    }
}

pub fn permissions_for(user: Option<&PermissionUser>) -> &'static [Permission] {
    user.map(|user| user.role.permissions()).unwrap_or(&[])
}

pub fn is_super_admin(user: Option<&PermissionUser>) -> bool {
    user.is_some_and(|user| user.role == Role::SuperAdmin)
}

pub fn can_manage_content(user: Option<&PermissionUser>) -> bool {
    has_any_permission(
        user,
        &[
            Permission::ConnectorsCreate,
            Permission::ConnectorsUpdate,
            Permission::ConnectorsDelete,
            Permission::MediaUpload,
        ],
    )
}

pub fn can_manage_users(user: Option<&PermissionUser>) -> bool {
    has_permission(user, Permission::UsersManage)
}

pub fn can_manage_system(user: Option<&PermissionUser>) -> bool {
    has_all_permissions(
        user,
        &[Permission::SystemSettings, Permission::SystemMigrate],
    )
}

pub fn can_access_audit_logs(user: Option<&PermissionUser>) -> bool {
    has_permission(user, Permission::AuditLogsRead)
}
