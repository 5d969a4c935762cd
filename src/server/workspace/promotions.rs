use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use super::guard::{require_feature, require_member, require_permission};
use crate::access::FeatureKey;
use crate::auth::RequireUser;
use crate::promotion::{self, NewPromotion};
use crate::server::AppState;
use crate::server::dto::{
    CreatePromotionRequest, DeletedResponse, ListPromotionsParams, VoteRequest,
};
use crate::server::response::{ApiError, ApiResponse};
use crate::server::validation::{parse_promotion_id, parse_workspace_id};
use crate::store::PromotionSort;
use crate::types::Permission;

pub async fn list_promotions(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(workspace_id): Path<String>,
    Query(params): Query<ListPromotionsParams>,
) -> impl IntoResponse {
    let workspace_id = parse_workspace_id(&workspace_id)?;
    require_feature(&state, workspace_id, FeatureKey::Promotions)?;
    let membership = require_member(&state, user.id, workspace_id)?;
    require_permission(&membership, Permission::VIEW_PROMOTIONS)?;

    let sort = match params.sort.as_deref() {
        None => PromotionSort::default(),
        Some(raw) => PromotionSort::parse(raw)
            .ok_or_else(|| ApiError::bad_request(format!("Invalid sort: {raw}")))?,
    };

    let promotions = promotion::list_promotions(state.store.as_ref(), workspace_id, sort)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(promotions)))
}

pub async fn create_promotion(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(workspace_id): Path<String>,
    body: Result<Json<CreatePromotionRequest>, JsonRejection>,
) -> impl IntoResponse {
    let workspace_id = parse_workspace_id(&workspace_id)?;
    require_feature(&state, workspace_id, FeatureKey::Promotions)?;
    let membership = require_member(&state, user.id, workspace_id)?;
    require_permission(&membership, Permission::VIEW_PROMOTIONS)?;

    let Json(req) = body.map_err(|e| {
        tracing::debug!("Rejected promotion body: {e}");
        ApiError::bad_request("Invalid promotion data")
    })?;

    let created = promotion::create_promotion(
        state.store.as_ref(),
        NewPromotion {
            workspace_id,
            recommender_id: user.id,
            target_user_id: req.target_user_id,
            current_role_id: req.current_role_id,
            recommended_role_id: req.recommended_role_id,
            reason: req.reason,
        },
    )?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

pub async fn get_promotion(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((workspace_id, promotion_id)): Path<(String, String)>,
) -> impl IntoResponse {
    let workspace_id = parse_workspace_id(&workspace_id)?;
    require_feature(&state, workspace_id, FeatureKey::Promotions)?;
    require_member(&state, user.id, workspace_id)?;
    let promotion_id = parse_promotion_id(&promotion_id)?;

    let detail = promotion::promotion_detail(
        state.store.as_ref(),
        state.identity.as_ref(),
        workspace_id,
        &promotion_id,
        state.identity_budget(),
    )
    .await?;

    Ok::<_, ApiError>(Json(ApiResponse::success(detail)))
}

pub async fn delete_promotion(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((workspace_id, promotion_id)): Path<(String, String)>,
) -> impl IntoResponse {
    let workspace_id = parse_workspace_id(&workspace_id)?;
    require_feature(&state, workspace_id, FeatureKey::Promotions)?;
    let membership = require_member(&state, user.id, workspace_id)?;
    require_permission(&membership, Permission::MANAGE_PROMOTIONS)?;
    let promotion_id = parse_promotion_id(&promotion_id)?;

    promotion::delete_promotion(state.store.as_ref(), workspace_id, &promotion_id, user.id)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(DeletedResponse {
        id: promotion_id,
        deleted: true,
    })))
}

pub async fn vote(
    RequireUser { user, .. }: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((workspace_id, promotion_id)): Path<(String, String)>,
    body: Result<Json<VoteRequest>, JsonRejection>,
) -> impl IntoResponse {
    let workspace_id = parse_workspace_id(&workspace_id)?;
    require_feature(&state, workspace_id, FeatureKey::Promotions)?;
    require_member(&state, user.id, workspace_id)?;
    let promotion_id = parse_promotion_id(&promotion_id)?;

    let Json(req) = body.map_err(|e| {
        tracing::debug!("Rejected vote body: {e}");
        ApiError::bad_request("Invalid vote data")
    })?;

    let tally = promotion::submit_vote(
        state.store.as_ref(),
        workspace_id,
        &promotion_id,
        user.id,
        req.is_upvote,
        &req.justification,
    )?;

    Ok::<_, ApiError>(Json(ApiResponse::success(tally)))
}
