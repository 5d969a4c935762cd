use chrono::Utc;
use serde_json::Value;

use crate::store::Store;
use crate::types::{AuditEntry, UserId, WorkspaceId};

/// Records an audit entry. Failures are logged and swallowed so that auditing
/// never fails the action being audited.
pub fn record(
    store: &dyn Store,
    workspace_id: WorkspaceId,
    actor_id: Option<UserId>,
    action: &str,
    subject: &str,
    detail: Value,
) {
    let entry = AuditEntry {
        id: 0,
        workspace_id,
        actor_id,
        action: action.to_string(),
        subject: subject.to_string(),
        detail,
        created_at: Utc::now(),
    };

    if let Err(e) = store.record_audit(&entry) {
        tracing::warn!("Failed to record audit entry '{action}' for workspace {workspace_id}: {e}");
    }
}
