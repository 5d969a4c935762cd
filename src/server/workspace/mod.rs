mod guard;
mod overview;
mod promotions;
mod settings;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::server::AppState;

pub fn workspace_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/workspaces/{id}", get(overview::get_workspace))
        .route("/workspaces/{id}/audit", get(overview::list_audit))
        // Feature toggles
        .route(
            "/workspaces/{id}/settings/{feature}",
            get(settings::get_setting).patch(settings::update_setting),
        )
        // Promotions
        .route(
            "/workspaces/{id}/promotions",
            get(promotions::list_promotions).post(promotions::create_promotion),
        )
        .route(
            "/workspaces/{id}/promotions/{promotion_id}",
            get(promotions::get_promotion).delete(promotions::delete_promotion),
        )
        .route(
            "/workspaces/{id}/promotions/{promotion_id}/vote",
            post(promotions::vote),
        )
}
