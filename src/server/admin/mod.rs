mod tokens;
mod users;
mod workspaces;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::server::AppState;

pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        // User routes
        .route("/users", post(users::create_user))
        .route("/users/{id}", get(users::get_user))
        .route("/users/{id}/tokens", get(users::list_user_tokens))
        .route("/users/{id}/tokens", post(users::create_user_token))
        // Token routes
        .route("/tokens/{id}", delete(tokens::delete_token))
        // Workspace routes
        .route("/workspaces", post(workspaces::create_workspace))
        .route("/workspaces/{id}/roles", get(workspaces::list_roles))
        .route("/workspaces/{id}/roles", post(workspaces::create_role))
        .route(
            "/workspaces/{id}/roles/{role_id}/members/{user_id}",
            put(workspaces::assign_role).delete(workspaces::unassign_role),
        )
        .route(
            "/workspaces/{id}/admins/{user_id}",
            put(workspaces::grant_admin).delete(workspaces::revoke_admin),
        )
}
