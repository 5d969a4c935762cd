use uuid::Uuid;

use crate::server::response::ApiError;
use crate::types::{UserId, WorkspaceId};

const MAX_WORKSPACE_NAME_LEN: usize = 100;
const MAX_ROLE_NAME_LEN: usize = 64;
const MAX_USERNAME_LEN: usize = 32;

pub fn parse_workspace_id(raw: &str) -> Result<WorkspaceId, ApiError> {
    raw.parse::<WorkspaceId>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::bad_request("Invalid workspace ID"))
}

pub fn parse_user_id(raw: &str) -> Result<UserId, ApiError> {
    raw.parse::<UserId>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::bad_request("Invalid user ID"))
}

/// Promotion ids are UUIDs; the canonical hyphenated form is returned.
pub fn parse_promotion_id(raw: &str) -> Result<String, ApiError> {
    Uuid::parse_str(raw)
        .map(|id| id.to_string())
        .map_err(|_| ApiError::bad_request("Invalid promotion ID"))
}

fn validate_display_name(name: &str, entity: &str, max_len: usize) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err(format!("{entity} name cannot be empty"));
    }
    if name.chars().count() > max_len {
        return Err(format!("{entity} name cannot exceed {max_len} characters"));
    }
    if name.chars().any(char::is_control) {
        return Err(format!("{entity} name cannot contain control characters"));
    }
    Ok(())
}

pub fn validate_workspace_name(name: &str) -> Result<(), ApiError> {
    validate_display_name(name, "Workspace", MAX_WORKSPACE_NAME_LEN).map_err(ApiError::bad_request)
}

pub fn validate_role_name(name: &str) -> Result<(), ApiError> {
    validate_display_name(name, "Role", MAX_ROLE_NAME_LEN).map_err(ApiError::bad_request)
}

pub fn validate_username(name: &str) -> Result<(), ApiError> {
    validate_display_name(name, "User", MAX_USERNAME_LEN)?;
    if name.contains(char::is_whitespace) {
        return Err(ApiError::bad_request("User name cannot contain whitespace"));
    }
    Ok(())
}

impl From<String> for ApiError {
    fn from(message: String) -> Self {
        ApiError::bad_request(message)
    }
}
