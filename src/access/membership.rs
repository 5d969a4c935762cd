use std::cmp::Ordering;

use crate::error::Result;
use crate::store::Store;
use crate::types::{Membership, Role, UserId, WorkspaceId};

/// Total order used to pick a user's authoritative role.
///
/// Owner roles sort first, then the oldest role, then the lowest role id, so
/// the choice never depends on the order rows come back from storage.
pub fn role_priority(a: &Role, b: &Role) -> Ordering {
    b.is_owner_role
        .cmp(&a.is_owner_role)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Picks the authoritative role out of a user's assignments in one workspace.
pub fn select_authoritative_role(roles: Vec<Role>) -> Option<Role> {
    roles.into_iter().min_by(role_priority)
}

/// Resolves the user's membership in a workspace.
///
/// `Ok(None)` means "not a member" and is not an error. A workspace admin flag
/// without any role assignment does not make someone a member.
pub fn resolve_membership(
    store: &dyn Store,
    user_id: UserId,
    workspace_id: WorkspaceId,
) -> Result<Option<Membership>> {
    let roles = store.list_user_roles(user_id, workspace_id)?;

    let Some(role) = select_authoritative_role(roles) else {
        return Ok(None);
    };

    let is_admin = store.is_workspace_admin(workspace_id, user_id)?;

    Ok(Some(Membership {
        user_id,
        workspace_id,
        role,
        is_admin,
    }))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    use super::*;
    use crate::store::SqliteStore;
    use crate::types::{Permission, User, Workspace};

    fn role(id: &str, owner: bool, age_minutes: i64) -> Role {
        Role {
            id: id.to_string(),
            workspace_id: 100,
            name: id.to_string(),
            permissions: Permission::default(),
            is_owner_role: owner,
            created_at: Utc::now() - Duration::minutes(age_minutes),
        }
    }

    #[test]
    fn test_owner_role_wins_regardless_of_input_order() {
        let picks: Vec<String> = [
            vec![role("staff", false, 60), role("owner", true, 0)],
            vec![role("owner", true, 0), role("staff", false, 60)],
        ]
        .into_iter()
        .map(|roles| select_authoritative_role(roles).unwrap().id)
        .collect();

        assert_eq!(picks, vec!["owner", "owner"]);
    }

    #[test]
    fn test_older_role_breaks_owner_tie() {
        let picked =
            select_authoritative_role(vec![role("newer", false, 1), role("older", false, 30)])
                .unwrap();
        assert_eq!(picked.id, "older");
    }

    #[test]
    fn test_role_id_is_final_tie_break() {
        let a = role("b-role", false, 0);
        let b = Role {
            id: "a-role".to_string(),
            ..a.clone()
        };

        assert_eq!(role_priority(&b, &a), Ordering::Less);
        let picked = select_authoritative_role(vec![a, b]).unwrap();
        assert_eq!(picked.id, "a-role");
    }

    #[test]
    fn test_no_roles_selects_nothing() {
        assert!(select_authoritative_role(Vec::new()).is_none());
    }

    fn setup() -> (TempDir, SqliteStore) {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        store
            .create_workspace(&Workspace {
                id: 100,
                name: "Group".to_string(),
                created_at: Utc::now(),
            })
            .unwrap();
        for id in [1, 2] {
            store
                .create_user(&User {
                    id,
                    username: format!("user{id}"),
                    avatar_url: None,
                    created_at: Utc::now(),
                })
                .unwrap();
        }
        (temp, store)
    }

    #[test]
    fn test_resolve_membership_from_store() {
        let (_temp, store) = setup();
        store.create_role(&role("staff", false, 10)).unwrap();
        store.create_role(&role("owner", true, 0)).unwrap();
        store.assign_role(1, "staff").unwrap();
        store.assign_role(1, "owner").unwrap();

        let membership = resolve_membership(&store, 1, 100).unwrap().unwrap();
        assert_eq!(membership.role.id, "owner");
        assert!(!membership.is_admin);

        store.set_workspace_admin(100, 1, true).unwrap();
        let membership = resolve_membership(&store, 1, 100).unwrap().unwrap();
        assert!(membership.is_admin);
    }

    #[test]
    fn test_admin_flag_alone_is_not_membership() {
        let (_temp, store) = setup();
        store.set_workspace_admin(100, 2, true).unwrap();

        assert!(resolve_membership(&store, 2, 100).unwrap().is_none());
    }
}
