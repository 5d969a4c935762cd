use crate::error::{Error, Result};
use crate::store::{Store, VoteInput};
use crate::types::{UserId, VoteTally, WorkspaceId};

/// Casts or replaces `voter_id`'s vote and returns the recomputed tally.
///
/// A voter has at most one vote per promotion; voting again overwrites the
/// direction and justification. Counters are always recomputed from the
/// vote rows, never incremented.
pub fn submit_vote(
    store: &dyn Store,
    workspace_id: WorkspaceId,
    promotion_id: &str,
    voter_id: UserId,
    is_upvote: bool,
    justification: &str,
) -> Result<VoteTally> {
    if justification.trim().is_empty() {
        return Err(Error::Validation("Justification is required".to_string()));
    }

    if store.get_promotion(workspace_id, promotion_id)?.is_none() {
        return Err(Error::NotFound);
    }

    let tally = store.submit_vote(&VoteInput {
        promotion_id,
        voter_id,
        is_upvote,
        justification,
    })?;

    tracing::debug!(
        "Vote by {voter_id} on promotion {promotion_id}: up={} down={}",
        tally.upvotes,
        tally.downvotes
    );

    Ok(tally)
}
