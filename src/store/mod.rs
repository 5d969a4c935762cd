mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Ordering for promotion listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromotionSort {
    #[default]
    Newest,
    /// Most upvoted first, newest first among ties.
    Votes,
}

impl PromotionSort {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "newest" => Some(PromotionSort::Newest),
            "votes" => Some(PromotionSort::Votes),
            _ => None,
        }
    }
}

/// Input for a new vote or a replacement of the voter's existing vote.
#[derive(Debug, Clone)]
pub struct VoteInput<'a> {
    pub promotion_id: &'a str,
    pub voter_id: UserId,
    pub is_upvote: bool,
    pub justification: &'a str,
}

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, id: UserId) -> Result<Option<User>>;

    // Token operations
    fn create_token(&self, token: &Token) -> Result<()>;
    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>>;
    fn list_user_tokens(&self, user_id: UserId) -> Result<Vec<Token>>;
    fn delete_token(&self, id: &str) -> Result<bool>;
    fn update_token_last_used(&self, id: &str) -> Result<()>;
    fn has_admin_token(&self) -> Result<bool>;

    // Workspace operations
    fn create_workspace(&self, workspace: &Workspace) -> Result<()>;
    fn get_workspace(&self, id: WorkspaceId) -> Result<Option<Workspace>>;

    // Role operations
    fn create_role(&self, role: &Role) -> Result<()>;
    fn get_role(&self, workspace_id: WorkspaceId, role_id: &str) -> Result<Option<Role>>;
    fn list_roles(&self, workspace_id: WorkspaceId) -> Result<Vec<Role>>;

    // Role assignment operations (many-to-many users <-> roles)
    fn assign_role(&self, user_id: UserId, role_id: &str) -> Result<()>;
    fn unassign_role(&self, user_id: UserId, role_id: &str) -> Result<bool>;
    /// Roles the user holds in one workspace, in storage order.
    fn list_user_roles(&self, user_id: UserId, workspace_id: WorkspaceId) -> Result<Vec<Role>>;

    // Workspace admin override
    fn set_workspace_admin(
        &self,
        workspace_id: WorkspaceId,
        user_id: UserId,
        is_admin: bool,
    ) -> Result<()>;
    fn is_workspace_admin(&self, workspace_id: WorkspaceId, user_id: UserId) -> Result<bool>;

    // Config operations (feature gate backing store)
    fn get_config(&self, workspace_id: WorkspaceId, key: &str) -> Result<Option<String>>;
    fn set_config(&self, workspace_id: WorkspaceId, key: &str, value: &str) -> Result<()>;

    // Promotion operations
    fn create_promotion(&self, promotion: &Promotion) -> Result<()>;
    fn get_promotion(&self, workspace_id: WorkspaceId, id: &str) -> Result<Option<Promotion>>;
    fn list_promotions(
        &self,
        workspace_id: WorkspaceId,
        sort: PromotionSort,
    ) -> Result<Vec<Promotion>>;
    /// Deletes the promotion and its votes in one transaction.
    fn delete_promotion(&self, workspace_id: WorkspaceId, id: &str) -> Result<bool>;

    // Vote operations
    /// Upserts the vote and recomputes the promotion's counters from the full
    /// vote set, atomically. Returns `NotFound` if the promotion is gone.
    fn submit_vote(&self, vote: &VoteInput<'_>) -> Result<VoteTally>;
    /// Votes newest first.
    fn list_promotion_votes(&self, promotion_id: &str) -> Result<Vec<PromotionVote>>;

    // Audit log operations
    fn record_audit(&self, entry: &AuditEntry) -> Result<()>;
    fn list_audit_entries(&self, workspace_id: WorkspaceId, limit: i64) -> Result<Vec<AuditEntry>>;
}
