use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    response::IntoResponse,
};
use serde_json::json;

use super::guard::{require_member, require_permission};
use crate::access::{FeatureGate, FeatureKey};
use crate::audit;
use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::FeatureToggle;
use crate::server::response::{ApiError, ApiResponse};
use crate::server::validation::parse_workspace_id;
use crate::types::Permission;

fn parse_feature(raw: &str) -> Result<FeatureKey, ApiError> {
    FeatureKey::parse(raw).ok_or_else(ApiError::not_found)
}

/// Public: clients read toggles before deciding what to render.
pub async fn get_setting(
    State(state): State<Arc<AppState>>,
    Path((workspace_id, feature)): Path<(String, String)>,
) -> impl IntoResponse {
    let workspace_id = parse_workspace_id(&workspace_id)?;
    let key = parse_feature(&feature)?;

    let enabled = FeatureGate::new(state.store.as_ref())
        .toggle(workspace_id, key)?
        .ok_or_else(ApiError::not_found)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(FeatureToggle { enabled })))
}

pub async fn update_setting(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((workspace_id, feature)): Path<(String, String)>,
    body: Result<Json<FeatureToggle>, JsonRejection>,
) -> impl IntoResponse {
    let workspace_id = parse_workspace_id(&workspace_id)?;
    let key = parse_feature(&feature)?;
    let membership = require_member(&state, user.id, workspace_id)?;
    require_permission(&membership, Permission::ADMIN)?;

    let Json(req) = body.map_err(|_| ApiError::bad_request("Invalid settings data"))?;

    let before = FeatureGate::new(state.store.as_ref()).set(workspace_id, key, req.enabled)?;

    tracing::info!(
        "Feature '{key}' set to {} in workspace {workspace_id} by user {}",
        req.enabled,
        user.id
    );
    audit::record(
        state.store.as_ref(),
        workspace_id,
        Some(user.id),
        "settings.update",
        key.as_str(),
        json!({
            "before": before.map(|enabled| json!({ "enabled": enabled })),
            "after": { "enabled": req.enabled },
        }),
    );

    Ok::<_, ApiError>(Json(ApiResponse::success(FeatureToggle {
        enabled: req.enabled,
    })))
}
