use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Role, Token, UserId, WorkspaceId};

// Admin surface

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateUserTokenRequest {
    #[serde(default)]
    pub expires_in_seconds: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub id: String,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl From<Token> for TokenResponse {
    fn from(token: Token) -> Self {
        Self {
            id: token.id,
            is_admin: token.is_admin,
            user_id: token.user_id,
            created_at: token.created_at,
            expires_at: token.expires_at,
            last_used_at: token.last_used_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateTokenResponse {
    pub token: String,
    pub metadata: TokenResponse,
}

#[derive(Debug, Deserialize)]
pub struct CreateWorkspaceRequest {
    pub id: WorkspaceId,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub is_owner_role: bool,
}

#[derive(Debug, Serialize)]
pub struct RoleResponse {
    pub id: String,
    pub workspace_id: WorkspaceId,
    pub name: String,
    pub permissions: Vec<&'static str>,
    pub is_owner_role: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Role> for RoleResponse {
    fn from(role: Role) -> Self {
        Self {
            id: role.id,
            workspace_id: role.workspace_id,
            name: role.name,
            permissions: role.permissions.to_strings(),
            is_owner_role: role.is_owner_role,
            created_at: role.created_at,
        }
    }
}

// Workspace surface

#[derive(Debug, Serialize)]
pub struct WorkspaceOverview {
    pub id: WorkspaceId,
    pub name: String,
    pub role: RoleResponse,
    pub is_admin: bool,
    /// Effective permission tokens after admin and owner bypass.
    pub permissions: Vec<&'static str>,
    pub features: BTreeMap<&'static str, bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListPromotionsParams {
    #[serde(default)]
    pub sort: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePromotionRequest {
    pub target_user_id: UserId,
    pub current_role_id: String,
    pub recommended_role_id: String,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub is_upvote: bool,
    pub justification: String,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub id: String,
    pub deleted: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeatureToggle {
    pub enabled: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct AuditParams {
    #[serde(default)]
    pub limit: Option<i64>,
}
