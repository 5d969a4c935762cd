use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Duration, Utc};

use crate::auth::{RequireAdmin, TokenGenerator, mint_token};
use crate::server::AppState;
use crate::server::dto::{
    CreateTokenResponse, CreateUserRequest, CreateUserTokenRequest, TokenResponse,
};
use crate::server::response::{ApiError, ApiResponse};
use crate::server::validation::{parse_user_id, validate_username};
use crate::types::User;

pub async fn create_user(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> impl IntoResponse {
    if req.id <= 0 {
        return Err(ApiError::bad_request("Invalid user ID"));
    }
    validate_username(&req.username)?;

    let user = User {
        id: req.id,
        username: req.username,
        avatar_url: req.avatar_url.filter(|url| !url.trim().is_empty()),
        created_at: Utc::now(),
    };

    state.store.create_user(&user).map_err(|e| match e {
        crate::error::Error::AlreadyExists => ApiError::conflict("User already exists"),
        other => ApiError::from(other),
    })?;

    tracing::info!("Created user {} ({})", user.id, user.username);

    Ok((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

pub async fn get_user(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let id = parse_user_id(&id)?;
    let user = state.store.get_user(id)?.ok_or_else(ApiError::not_found)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(user)))
}

pub async fn list_user_tokens(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let id = parse_user_id(&id)?;
    state.store.get_user(id)?.ok_or_else(ApiError::not_found)?;

    let tokens: Vec<TokenResponse> = state
        .store
        .list_user_tokens(id)?
        .into_iter()
        .map(TokenResponse::from)
        .collect();

    Ok::<_, ApiError>(Json(ApiResponse::success(tokens)))
}

pub async fn create_user_token(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CreateUserTokenRequest>,
) -> impl IntoResponse {
    let id = parse_user_id(&id)?;
    let user = state.store.get_user(id)?.ok_or_else(ApiError::not_found)?;

    let expires_at = match req.expires_in_seconds {
        Some(secs) if secs <= 0 => {
            return Err(ApiError::bad_request("expires_in_seconds must be positive"));
        }
        Some(secs) => Some(Utc::now() + Duration::seconds(secs)),
        None => None,
    };

    let generator = TokenGenerator::new();
    let (token, raw_token) = mint_token(&generator, false, Some(user.id), expires_at)?;
    state.store.create_token(&token)?;

    tracing::info!("Issued token {} for user {}", token.id, user.id);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(CreateTokenResponse {
            token: raw_token,
            metadata: token.into(),
        })),
    ))
}
