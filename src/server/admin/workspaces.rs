use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::RequireAdmin;
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{CreateRoleRequest, CreateWorkspaceRequest, RoleResponse};
use crate::server::response::{ApiError, ApiResponse};
use crate::server::validation::{
    parse_user_id, parse_workspace_id, validate_role_name, validate_workspace_name,
};
use crate::types::{Permission, Role, UserId, Workspace, WorkspaceId};

// Path parameter names match the route: /workspaces/{id}/...

fn require_workspace(state: &AppState, workspace_id: WorkspaceId) -> Result<Workspace, ApiError> {
    state
        .store
        .get_workspace(workspace_id)?
        .ok_or_else(ApiError::not_found)
}

fn require_user(state: &AppState, user_id: UserId) -> Result<(), ApiError> {
    state
        .store
        .get_user(user_id)?
        .map(|_| ())
        .ok_or_else(ApiError::not_found)
}

pub async fn create_workspace(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateWorkspaceRequest>,
) -> impl IntoResponse {
    if req.id <= 0 {
        return Err(ApiError::bad_request("Invalid workspace ID"));
    }
    validate_workspace_name(&req.name)?;

    let workspace = Workspace {
        id: req.id,
        name: req.name.trim().to_string(),
        created_at: Utc::now(),
    };

    state.store.create_workspace(&workspace).map_err(|e| match e {
        Error::AlreadyExists => ApiError::conflict("Workspace already exists"),
        other => ApiError::from(other),
    })?;

    tracing::info!("Created workspace {} ({})", workspace.id, workspace.name);

    Ok((StatusCode::CREATED, Json(ApiResponse::success(workspace))))
}

pub async fn list_roles(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(workspace_id): Path<String>,
) -> impl IntoResponse {
    let workspace_id = parse_workspace_id(&workspace_id)?;
    require_workspace(&state, workspace_id)?;

    let roles: Vec<RoleResponse> = state
        .store
        .list_roles(workspace_id)?
        .into_iter()
        .map(RoleResponse::from)
        .collect();

    Ok::<_, ApiError>(Json(ApiResponse::success(roles)))
}

pub async fn create_role(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(workspace_id): Path<String>,
    Json(req): Json<CreateRoleRequest>,
) -> impl IntoResponse {
    let workspace_id = parse_workspace_id(&workspace_id)?;
    require_workspace(&state, workspace_id)?;
    validate_role_name(&req.name)?;

    let permissions = Permission::parse_many(req.permissions.as_slice())
        .map_err(|p| ApiError::from(Error::InvalidPermission(p)))?;

    let role = Role {
        id: Uuid::new_v4().to_string(),
        workspace_id,
        name: req.name.trim().to_string(),
        permissions,
        is_owner_role: req.is_owner_role,
        created_at: Utc::now(),
    };

    state.store.create_role(&role).map_err(|e| match e {
        Error::AlreadyExists => ApiError::conflict("Role name already used in this workspace"),
        other => ApiError::from(other),
    })?;

    tracing::info!(
        "Created role '{}' in workspace {workspace_id} with [{}]",
        role.name,
        role.permissions
    );

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(RoleResponse::from(role))),
    ))
}

pub async fn assign_role(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path((workspace_id, role_id, user_id)): Path<(String, String, String)>,
) -> impl IntoResponse {
    let workspace_id = parse_workspace_id(&workspace_id)?;
    let user_id = parse_user_id(&user_id)?;

    let role = state
        .store
        .get_role(workspace_id, &role_id)?
        .ok_or_else(ApiError::not_found)?;
    require_user(&state, user_id)?;

    state.store.assign_role(user_id, &role.id)?;
    tracing::info!("Assigned role {} to user {user_id} in workspace {workspace_id}", role.id);

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn unassign_role(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path((workspace_id, role_id, user_id)): Path<(String, String, String)>,
) -> impl IntoResponse {
    let workspace_id = parse_workspace_id(&workspace_id)?;
    let user_id = parse_user_id(&user_id)?;

    let role = state
        .store
        .get_role(workspace_id, &role_id)?
        .ok_or_else(ApiError::not_found)?;

    if !state.store.unassign_role(user_id, &role.id)? {
        return Err(ApiError::not_found());
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn grant_admin(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path((workspace_id, user_id)): Path<(String, String)>,
) -> impl IntoResponse {
    set_admin(&state, &workspace_id, &user_id, true)
}

pub async fn revoke_admin(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path((workspace_id, user_id)): Path<(String, String)>,
) -> impl IntoResponse {
    set_admin(&state, &workspace_id, &user_id, false)
}

fn set_admin(
    state: &AppState,
    workspace_id: &str,
    user_id: &str,
    is_admin: bool,
) -> Result<StatusCode, ApiError> {
    let workspace_id = parse_workspace_id(workspace_id)?;
    let user_id = parse_user_id(user_id)?;
    require_workspace(state, workspace_id)?;
    require_user(state, user_id)?;

    state
        .store
        .set_workspace_admin(workspace_id, user_id, is_admin)?;
    tracing::info!("Workspace {workspace_id} admin flag for user {user_id} set to {is_admin}");

    Ok(StatusCode::NO_CONTENT)
}
