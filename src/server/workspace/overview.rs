use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};

use super::guard::{require_member, require_permission};
use crate::access::{FeatureGate, FeatureKey, Grant};
use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::{AuditParams, WorkspaceOverview};
use crate::server::response::{ApiError, ApiResponse};
use crate::server::validation::parse_workspace_id;
use crate::types::Permission;

const DEFAULT_AUDIT_LIMIT: i64 = 50;
const MAX_AUDIT_LIMIT: i64 = 200;

/// The caller's view of a workspace: role, effective permissions and toggles.
pub async fn get_workspace(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(workspace_id): Path<String>,
) -> impl IntoResponse {
    let workspace_id = parse_workspace_id(&workspace_id)?;
    let membership = require_member(&state, user.id, workspace_id)?;

    let workspace = state
        .store
        .get_workspace(workspace_id)?
        .ok_or_else(ApiError::not_found)?;

    let gate = FeatureGate::new(state.store.as_ref());
    let mut features = std::collections::BTreeMap::new();
    for key in FeatureKey::ALL {
        features.insert(key.as_str(), gate.is_enabled(workspace_id, key)?);
    }

    let effective = Grant::for_membership(&membership).effective();

    Ok::<_, ApiError>(Json(ApiResponse::success(WorkspaceOverview {
        id: workspace.id,
        name: workspace.name,
        role: membership.role.into(),
        is_admin: membership.is_admin,
        permissions: effective.to_strings(),
        features,
    })))
}

pub async fn list_audit(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(workspace_id): Path<String>,
    Query(params): Query<AuditParams>,
) -> impl IntoResponse {
    let workspace_id = parse_workspace_id(&workspace_id)?;
    let membership = require_member(&state, user.id, workspace_id)?;
    require_permission(&membership, Permission::ADMIN)?;

    let limit = params
        .limit
        .unwrap_or(DEFAULT_AUDIT_LIMIT)
        .clamp(1, MAX_AUDIT_LIMIT);
    let entries = state.store.list_audit_entries(workspace_id, limit)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(entries)))
}
