use crate::access::{FeatureGate, FeatureKey, authorize, resolve_membership};
use crate::error::Error;
use crate::server::AppState;
use crate::server::response::ApiError;
use crate::types::{Membership, Permission, UserId, WorkspaceId};

/// 404 unless the feature is on. Runs before any membership or id checks so
/// a disabled surface looks the same whether or not the resource exists.
pub fn require_feature(
    state: &AppState,
    workspace_id: WorkspaceId,
    key: FeatureKey,
) -> Result<(), ApiError> {
    FeatureGate::new(state.store.as_ref())
        .require(workspace_id, key)
        .map_err(ApiError::from)
}

pub fn require_member(
    state: &AppState,
    user_id: UserId,
    workspace_id: WorkspaceId,
) -> Result<Membership, ApiError> {
    resolve_membership(state.store.as_ref(), user_id, workspace_id)?.ok_or_else(|| {
        tracing::debug!("User {user_id} is not a member of workspace {workspace_id}");
        ApiError::from(Error::Forbidden)
    })
}

pub fn require_permission(membership: &Membership, required: Permission) -> Result<(), ApiError> {
    authorize(Some(membership), required)
        .into_result()
        .map_err(|e| {
            tracing::debug!(
                "User {} lacks '{required}' in workspace {}",
                membership.user_id,
                membership.workspace_id
            );
            ApiError::from(e)
        })
}
