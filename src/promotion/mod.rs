//! Promotion recommendations: creation, listing, enriched reads and deletion.
//! Votes live in [`votes`].

mod detail;
mod votes;

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

pub use detail::{PromotionComment, PromotionDetail, PromotionVoter, promotion_detail};
pub use votes::submit_vote;

use crate::audit;
use crate::error::{Error, Result};
use crate::store::{PromotionSort, Store};
use crate::types::{Promotion, PromotionStatus, UserId, WorkspaceId};

/// Fields a recommender supplies. Role refs are recorded as given; the
/// recommendation does not have to match anyone's current roles.
#[derive(Debug, Clone)]
pub struct NewPromotion {
    pub workspace_id: WorkspaceId,
    pub recommender_id: UserId,
    pub target_user_id: UserId,
    pub current_role_id: String,
    pub recommended_role_id: String,
    pub reason: String,
}

fn require_text(value: &str, message: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation(message.to_string()));
    }
    Ok(trimmed.to_string())
}

pub fn create_promotion(store: &dyn Store, new: NewPromotion) -> Result<Promotion> {
    let current_role_id = require_text(&new.current_role_id, "Current role is required")?;
    let recommended_role_id =
        require_text(&new.recommended_role_id, "Recommended role is required")?;
    let reason = require_text(&new.reason, "Reason is required")?;

    let now = Utc::now();
    let promotion = Promotion {
        id: Uuid::new_v4().to_string(),
        workspace_id: new.workspace_id,
        recommender_id: new.recommender_id,
        target_user_id: new.target_user_id,
        current_role_id,
        recommended_role_id,
        reason,
        upvotes: 0,
        downvotes: 0,
        status: PromotionStatus::Pending,
        created_at: now,
        updated_at: now,
    };

    store.create_promotion(&promotion)?;

    tracing::info!(
        "Promotion {} created in workspace {} for user {}",
        promotion.id,
        promotion.workspace_id,
        promotion.target_user_id
    );
    audit::record(
        store,
        promotion.workspace_id,
        Some(promotion.recommender_id),
        "promotions.create",
        &promotion.id,
        json!({ "before": null, "after": &promotion }),
    );

    Ok(promotion)
}

pub fn list_promotions(
    store: &dyn Store,
    workspace_id: WorkspaceId,
    sort: PromotionSort,
) -> Result<Vec<Promotion>> {
    store.list_promotions(workspace_id, sort)
}

/// Deletes the promotion together with every vote cast on it.
pub fn delete_promotion(
    store: &dyn Store,
    workspace_id: WorkspaceId,
    promotion_id: &str,
    actor_id: UserId,
) -> Result<()> {
    let before = store
        .get_promotion(workspace_id, promotion_id)?
        .ok_or(Error::NotFound)?;

    if !store.delete_promotion(workspace_id, promotion_id)? {
        return Err(Error::NotFound);
    }

    tracing::info!("Promotion {promotion_id} deleted from workspace {workspace_id} by user {actor_id}");
    audit::record(
        store,
        workspace_id,
        Some(actor_id),
        "promotions.delete",
        promotion_id,
        json!({ "before": before, "after": null }),
    );

    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;
    use tempfile::TempDir;

    use crate::store::{SqliteStore, Store};
    use crate::types::Workspace;

    pub fn store_with_workspace(workspace_id: i64) -> (TempDir, SqliteStore) {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        store
            .create_workspace(&Workspace {
                id: workspace_id,
                name: "Group".to_string(),
                created_at: Utc::now(),
            })
            .unwrap();
        (temp, store)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::store_with_workspace;
    use super::*;

    fn new_promotion(reason: &str) -> NewPromotion {
        NewPromotion {
            workspace_id: 100,
            recommender_id: 1,
            target_user_id: 2,
            current_role_id: "moderator".to_string(),
            recommended_role_id: "senior-moderator".to_string(),
            reason: reason.to_string(),
        }
    }

    #[test]
    fn test_create_trims_and_starts_pending() {
        let (_temp, store) = store_with_workspace(100);

        let created = create_promotion(&store, new_promotion("  great mentor  ")).unwrap();
        assert_eq!(created.reason, "great mentor");
        assert_eq!(created.status, PromotionStatus::Pending);
        assert_eq!((created.upvotes, created.downvotes), (0, 0));

        let fetched = store.get_promotion(100, &created.id).unwrap().unwrap();
        assert_eq!(fetched.recommended_role_id, "senior-moderator");

        let audit = store.list_audit_entries(100, 10).unwrap();
        assert_eq!(audit[0].action, "promotions.create");
    }

    #[test]
    fn test_create_rejects_blank_reason() {
        let (_temp, store) = store_with_workspace(100);

        let err = create_promotion(&store, new_promotion(" \n\t ")).unwrap_err();
        assert!(matches!(err, Error::Validation(msg) if msg == "Reason is required"));
        assert!(
            store
                .list_promotions(100, PromotionSort::Newest)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_delete_then_not_found() {
        let (_temp, store) = store_with_workspace(100);
        let created = create_promotion(&store, new_promotion("ready")).unwrap();

        submit_vote(&store, 100, &created.id, 3, true, "agree").unwrap();
        delete_promotion(&store, 100, &created.id, 9).unwrap();

        assert!(store.get_promotion(100, &created.id).unwrap().is_none());
        assert!(store.list_promotion_votes(&created.id).unwrap().is_empty());
        assert!(matches!(
            delete_promotion(&store, 100, &created.id, 9),
            Err(Error::NotFound)
        ));
    }

    #[test]
    fn test_delete_is_workspace_scoped() {
        let (_temp, store) = store_with_workspace(100);
        let created = create_promotion(&store, new_promotion("ready")).unwrap();

        assert!(matches!(
            delete_promotion(&store, 200, &created.id, 9),
            Err(Error::NotFound)
        ));
        assert!(store.get_promotion(100, &created.id).unwrap().is_some());
    }
}
