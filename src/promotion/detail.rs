use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::identity::{Identity, IdentityLookup, resolve_or_placeholder};
use crate::store::Store;
use crate::types::{PromotionStatus, UserId, WorkspaceId};

#[derive(Debug, Clone, Serialize)]
pub struct PromotionVoter {
    pub user_id: UserId,
    pub username: String,
    pub avatar: String,
}

/// A vote's justification rendered as a comment.
#[derive(Debug, Clone, Serialize)]
pub struct PromotionComment {
    pub id: i64,
    pub user_id: UserId,
    pub username: String,
    pub avatar: String,
    pub content: String,
    pub is_upvote: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PromotionDetail {
    pub id: String,
    pub recommender_id: UserId,
    pub recommender_name: String,
    pub recommender_avatar: String,
    pub target_user_id: UserId,
    pub target_username: String,
    pub target_avatar: String,
    /// Role name when the ref names a workspace role, the raw ref otherwise.
    pub current_role: String,
    pub current_role_id: String,
    pub recommended_role: String,
    pub recommended_role_id: String,
    pub reason: String,
    pub upvotes: i64,
    pub downvotes: i64,
    pub status: PromotionStatus,
    pub created_at: DateTime<Utc>,
    pub voters: Vec<PromotionVoter>,
    /// Newest first.
    pub comments: Vec<PromotionComment>,
}

/// Resolves each distinct user once, all concurrently. A lookup that fails
/// or outlives `budget` yields the placeholder.
async fn resolve_identities(
    lookup: &dyn IdentityLookup,
    user_ids: impl IntoIterator<Item = UserId>,
    budget: Duration,
) -> HashMap<UserId, Identity> {
    let mut distinct: Vec<UserId> = user_ids.into_iter().collect();
    distinct.sort_unstable();
    distinct.dedup();

    let resolved = join_all(distinct.iter().map(|&user_id| async move {
        match tokio::time::timeout(budget, resolve_or_placeholder(lookup, user_id)).await {
            Ok(identity) => identity,
            Err(_) => {
                tracing::debug!("Identity lookup for user {user_id} timed out");
                Identity::placeholder()
            }
        }
    }))
    .await;

    distinct.into_iter().zip(resolved).collect()
}

fn identity_of(identities: &HashMap<UserId, Identity>, user_id: UserId) -> Identity {
    identities
        .get(&user_id)
        .cloned()
        .unwrap_or_else(Identity::placeholder)
}

fn role_label(store: &dyn Store, workspace_id: WorkspaceId, role_ref: &str) -> String {
    match store.get_role(workspace_id, role_ref) {
        Ok(Some(role)) => role.name,
        Ok(None) => role_ref.to_string(),
        Err(e) => {
            tracing::warn!("Failed to resolve role '{role_ref}': {e}");
            role_ref.to_string()
        }
    }
}

/// Loads a promotion with its votes and decorates it with identities.
/// Identity failures and lookups slower than `identity_budget` degrade to
/// placeholders; only storage errors fail.
pub async fn promotion_detail(
    store: &dyn Store,
    lookup: &dyn IdentityLookup,
    workspace_id: WorkspaceId,
    promotion_id: &str,
    identity_budget: Duration,
) -> Result<PromotionDetail> {
    let promotion = store
        .get_promotion(workspace_id, promotion_id)?
        .ok_or(Error::NotFound)?;
    let votes = store.list_promotion_votes(promotion_id)?;

    let current_role = role_label(store, workspace_id, &promotion.current_role_id);
    let recommended_role = role_label(store, workspace_id, &promotion.recommended_role_id);

    let user_ids = votes
        .iter()
        .map(|v| v.voter_id)
        .chain([promotion.recommender_id, promotion.target_user_id]);
    let identities = resolve_identities(lookup, user_ids, identity_budget).await;

    let mut voters = Vec::new();
    let mut comments = Vec::with_capacity(votes.len());
    for vote in votes {
        let identity = identity_of(&identities, vote.voter_id);
        if !voters.iter().any(|v: &PromotionVoter| v.user_id == vote.voter_id) {
            voters.push(PromotionVoter {
                user_id: vote.voter_id,
                username: identity.username.clone(),
                avatar: identity.avatar_url.clone(),
            });
        }
        comments.push(PromotionComment {
            id: vote.id,
            user_id: vote.voter_id,
            username: identity.username,
            avatar: identity.avatar_url,
            content: vote.justification,
            is_upvote: vote.is_upvote,
            created_at: vote.created_at,
        });
    }

    let recommender = identity_of(&identities, promotion.recommender_id);
    let target = identity_of(&identities, promotion.target_user_id);

    Ok(PromotionDetail {
        id: promotion.id,
        recommender_id: promotion.recommender_id,
        recommender_name: recommender.username,
        recommender_avatar: recommender.avatar_url,
        target_user_id: promotion.target_user_id,
        target_username: target.username,
        target_avatar: target.avatar_url,
        current_role,
        current_role_id: promotion.current_role_id,
        recommended_role,
        recommended_role_id: promotion.recommended_role_id,
        reason: promotion.reason,
        upvotes: promotion.upvotes,
        downvotes: promotion.downvotes,
        status: promotion.status,
        created_at: promotion.created_at,
        voters,
        comments,
    })
}
