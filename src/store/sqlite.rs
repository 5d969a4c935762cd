use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};

use super::schema::SCHEMA;
use super::{PromotionSort, Store, VoteInput};
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Rewrites a promotion's counters from its current vote rows.
    #[cfg(test)]
    fn recompute_promotion_tally(&self, promotion_id: &str) -> Result<VoteTally> {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let tally = recompute_tally(&tx, promotion_id)?;
        tx.commit()?;
        Ok(tally)
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

/// Fixed-width so that text ordering in SQL matches time ordering.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

const TOKEN_COLUMNS: &str =
    "id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at, last_used_at";

fn token_from_row(row: &Row<'_>) -> rusqlite::Result<Token> {
    Ok(Token {
        id: row.get(0)?,
        token_hash: row.get(1)?,
        token_lookup: row.get(2)?,
        is_admin: row.get(3)?,
        user_id: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        expires_at: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
        last_used_at: row.get::<_, Option<String>>(7)?.map(|s| parse_datetime(&s)),
    })
}

fn role_from_row(row: &Row<'_>) -> rusqlite::Result<Role> {
    Ok(Role {
        id: row.get(0)?,
        workspace_id: row.get(1)?,
        name: row.get(2)?,
        permissions: Permission::from(row.get::<_, i64>(3)?),
        is_owner_role: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

const PROMOTION_COLUMNS: &str = "id, workspace_id, recommender_id, target_user_id, current_role_id, \
     recommended_role_id, reason, upvotes, downvotes, status, created_at, updated_at";

fn promotion_from_row(row: &Row<'_>) -> rusqlite::Result<Promotion> {
    let status: String = row.get(9)?;
    Ok(Promotion {
        id: row.get(0)?,
        workspace_id: row.get(1)?,
        recommender_id: row.get(2)?,
        target_user_id: row.get(3)?,
        current_role_id: row.get(4)?,
        recommended_role_id: row.get(5)?,
        reason: row.get(6)?,
        upvotes: row.get(7)?,
        downvotes: row.get(8)?,
        status: PromotionStatus::parse(&status).unwrap_or_else(|| {
            tracing::warn!("Unknown promotion status in database: '{status}'");
            PromotionStatus::default()
        }),
        created_at: parse_datetime(&row.get::<_, String>(10)?),
        updated_at: parse_datetime(&row.get::<_, String>(11)?),
    })
}

/// Single-statement aggregate update; the caller owns the transaction.
fn recompute_tally(conn: &Connection, promotion_id: &str) -> Result<VoteTally> {
    let rows = conn.execute(
        "UPDATE promotions SET
            upvotes = (SELECT COUNT(*) FROM promotion_votes WHERE promotion_id = ?1 AND is_upvote = 1),
            downvotes = (SELECT COUNT(*) FROM promotion_votes WHERE promotion_id = ?1 AND is_upvote = 0),
            updated_at = ?2
         WHERE id = ?1",
        params![promotion_id, format_datetime(&Utc::now())],
    )?;

    if rows == 0 {
        return Err(Error::NotFound);
    }

    conn.query_row(
        "SELECT upvotes, downvotes FROM promotions WHERE id = ?1",
        params![promotion_id],
        |row| {
            Ok(VoteTally {
                upvotes: row.get(0)?,
                downvotes: row.get(1)?,
            })
        },
    )
    .map_err(Error::from)
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, user: &User) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO users (id, username, avatar_url, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                user.id,
                user.username,
                user.avatar_url,
                format_datetime(&user.created_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(Error::AlreadyExists),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, username, avatar_url, created_at FROM users WHERE id = ?1",
            params![id],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    avatar_url: row.get(2)?,
                    created_at: parse_datetime(&row.get::<_, String>(3)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    // Token operations

    fn create_token(&self, token: &Token) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO tokens (id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                token.id,
                token.token_hash,
                token.token_lookup,
                token.is_admin,
                token.user_id,
                format_datetime(&token.created_at),
                token.expires_at.as_ref().map(format_datetime),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(Error::TokenLookupCollision),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {TOKEN_COLUMNS} FROM tokens WHERE token_lookup = ?1"),
            params![lookup],
            token_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_user_tokens(&self, user_id: UserId) -> Result<Vec<Token>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TOKEN_COLUMNS} FROM tokens WHERE user_id = ?1 ORDER BY created_at DESC"
        ))?;

        let rows = stmt.query_map(params![user_id], token_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_token(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM tokens WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn update_token_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE tokens SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    fn has_admin_token(&self) -> Result<bool> {
        let conn = self.conn();
        let count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM tokens WHERE is_admin = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // Workspace operations

    fn create_workspace(&self, workspace: &Workspace) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO workspaces (id, name, created_at) VALUES (?1, ?2, ?3)",
            params![
                workspace.id,
                workspace.name,
                format_datetime(&workspace.created_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(Error::AlreadyExists),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_workspace(&self, id: WorkspaceId) -> Result<Option<Workspace>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name, created_at FROM workspaces WHERE id = ?1",
            params![id],
            |row| {
                Ok(Workspace {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: parse_datetime(&row.get::<_, String>(2)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    // Role operations

    fn create_role(&self, role: &Role) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO roles (id, workspace_id, name, permissions, is_owner_role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                role.id,
                role.workspace_id,
                role.name,
                i64::from(role.permissions),
                role.is_owner_role,
                format_datetime(&role.created_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(Error::AlreadyExists),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_role(&self, workspace_id: WorkspaceId, role_id: &str) -> Result<Option<Role>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, workspace_id, name, permissions, is_owner_role, created_at
             FROM roles WHERE workspace_id = ?1 AND id = ?2",
            params![workspace_id, role_id],
            role_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_roles(&self, workspace_id: WorkspaceId) -> Result<Vec<Role>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, workspace_id, name, permissions, is_owner_role, created_at
             FROM roles WHERE workspace_id = ?1 ORDER BY is_owner_role DESC, name",
        )?;

        let rows = stmt.query_map(params![workspace_id], role_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Role assignment operations

    fn assign_role(&self, user_id: UserId, role_id: &str) -> Result<()> {
        self.conn().execute(
            "INSERT INTO role_assignments (user_id, role_id, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT (user_id, role_id) DO NOTHING",
            params![user_id, role_id, format_datetime(&Utc::now())],
        )?;
        Ok(())
    }

    fn unassign_role(&self, user_id: UserId, role_id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM role_assignments WHERE user_id = ?1 AND role_id = ?2",
            params![user_id, role_id],
        )?;
        Ok(rows > 0)
    }

    fn list_user_roles(&self, user_id: UserId, workspace_id: WorkspaceId) -> Result<Vec<Role>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT r.id, r.workspace_id, r.name, r.permissions, r.is_owner_role, r.created_at
             FROM roles r
             INNER JOIN role_assignments a ON a.role_id = r.id
             WHERE a.user_id = ?1 AND r.workspace_id = ?2",
        )?;

        let rows = stmt.query_map(params![user_id, workspace_id], role_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Workspace admin override

    fn set_workspace_admin(
        &self,
        workspace_id: WorkspaceId,
        user_id: UserId,
        is_admin: bool,
    ) -> Result<()> {
        let conn = self.conn();
        if is_admin {
            conn.execute(
                "INSERT INTO workspace_admins (workspace_id, user_id, created_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT (workspace_id, user_id) DO NOTHING",
                params![workspace_id, user_id, format_datetime(&Utc::now())],
            )?;
        } else {
            conn.execute(
                "DELETE FROM workspace_admins WHERE workspace_id = ?1 AND user_id = ?2",
                params![workspace_id, user_id],
            )?;
        }
        Ok(())
    }

    fn is_workspace_admin(&self, workspace_id: WorkspaceId, user_id: UserId) -> Result<bool> {
        let conn = self.conn();
        let count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM workspace_admins WHERE workspace_id = ?1 AND user_id = ?2",
            params![workspace_id, user_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // Config operations

    fn get_config(&self, workspace_id: WorkspaceId, key: &str) -> Result<Option<String>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT value FROM workspace_config WHERE workspace_id = ?1 AND key = ?2",
            params![workspace_id, key],
            |row| row.get(0),
        )
        .optional()
        .map_err(Error::from)
    }

    fn set_config(&self, workspace_id: WorkspaceId, key: &str, value: &str) -> Result<()> {
        self.conn().execute(
            "INSERT INTO workspace_config (workspace_id, key, value, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (workspace_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
            params![workspace_id, key, value, format_datetime(&Utc::now())],
        )?;
        Ok(())
    }

    // Promotion operations

    fn create_promotion(&self, promotion: &Promotion) -> Result<()> {
        self.conn().execute(
            &format!(
                "INSERT INTO promotions ({PROMOTION_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
            ),
            params![
                promotion.id,
                promotion.workspace_id,
                promotion.recommender_id,
                promotion.target_user_id,
                promotion.current_role_id,
                promotion.recommended_role_id,
                promotion.reason,
                promotion.upvotes,
                promotion.downvotes,
                promotion.status.as_str(),
                format_datetime(&promotion.created_at),
                format_datetime(&promotion.updated_at),
            ],
        )?;
        Ok(())
    }

    fn get_promotion(&self, workspace_id: WorkspaceId, id: &str) -> Result<Option<Promotion>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {PROMOTION_COLUMNS} FROM promotions WHERE id = ?1 AND workspace_id = ?2"
            ),
            params![id, workspace_id],
            promotion_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_promotions(
        &self,
        workspace_id: WorkspaceId,
        sort: PromotionSort,
    ) -> Result<Vec<Promotion>> {
        let order = match sort {
            PromotionSort::Newest => "created_at DESC, id",
            PromotionSort::Votes => "upvotes DESC, created_at DESC, id",
        };

        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROMOTION_COLUMNS} FROM promotions WHERE workspace_id = ?1 ORDER BY {order}"
        ))?;

        let rows = stmt.query_map(params![workspace_id], promotion_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_promotion(&self, workspace_id: WorkspaceId, id: &str) -> Result<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            "DELETE FROM promotion_votes WHERE promotion_id IN
                (SELECT id FROM promotions WHERE id = ?1 AND workspace_id = ?2)",
            params![id, workspace_id],
        )?;
        let rows = tx.execute(
            "DELETE FROM promotions WHERE id = ?1 AND workspace_id = ?2",
            params![id, workspace_id],
        )?;

        tx.commit()?;
        Ok(rows > 0)
    }

    // Vote operations

    fn submit_vote(&self, vote: &VoteInput<'_>) -> Result<VoteTally> {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let exists = tx
            .query_row(
                "SELECT 1 FROM promotions WHERE id = ?1",
                params![vote.promotion_id],
                |_| Ok(()),
            )
            .optional()?;
        if exists.is_none() {
            return Err(Error::NotFound);
        }

        let now = format_datetime(&Utc::now());
        tx.execute(
            "INSERT INTO promotion_votes (promotion_id, voter_id, is_upvote, justification, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT (promotion_id, voter_id) DO UPDATE SET
                is_upvote = excluded.is_upvote,
                justification = excluded.justification,
                updated_at = excluded.updated_at",
            params![
                vote.promotion_id,
                vote.voter_id,
                vote.is_upvote,
                vote.justification,
                now,
            ],
        )?;

        let tally = recompute_tally(&tx, vote.promotion_id)?;
        tx.commit()?;
        Ok(tally)
    }

    fn list_promotion_votes(&self, promotion_id: &str) -> Result<Vec<PromotionVote>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, promotion_id, voter_id, is_upvote, justification, created_at, updated_at
             FROM promotion_votes WHERE promotion_id = ?1
             ORDER BY created_at DESC, id DESC",
        )?;

        let rows = stmt.query_map(params![promotion_id], |row| {
            Ok(PromotionVote {
                id: row.get(0)?,
                promotion_id: row.get(1)?,
                voter_id: row.get(2)?,
                is_upvote: row.get(3)?,
                justification: row.get(4)?,
                created_at: parse_datetime(&row.get::<_, String>(5)?),
                updated_at: parse_datetime(&row.get::<_, String>(6)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Audit log operations

    fn record_audit(&self, entry: &AuditEntry) -> Result<()> {
        self.conn().execute(
            "INSERT INTO audit_log (workspace_id, actor_id, action, subject, detail, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.workspace_id,
                entry.actor_id,
                entry.action,
                entry.subject,
                entry.detail.to_string(),
                format_datetime(&entry.created_at),
            ],
        )?;
        Ok(())
    }

    fn list_audit_entries(&self, workspace_id: WorkspaceId, limit: i64) -> Result<Vec<AuditEntry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, workspace_id, actor_id, action, subject, detail, created_at
             FROM audit_log WHERE workspace_id = ?1
             ORDER BY created_at DESC, id DESC LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![workspace_id, limit], |row| {
            let detail: String = row.get(5)?;
            Ok(AuditEntry {
                id: row.get(0)?,
                workspace_id: row.get(1)?,
                actor_id: row.get(2)?,
                action: row.get(3)?,
                subject: row.get(4)?,
                detail: serde_json::from_str(&detail).unwrap_or(serde_json::Value::Null),
                created_at: parse_datetime(&row.get::<_, String>(6)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, SqliteStore) {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();

        store
            .create_workspace(&Workspace {
                id: 100,
                name: "Test Group".to_string(),
                created_at: Utc::now(),
            })
            .unwrap();

        (temp, store)
    }

    fn promotion(id: &str, workspace_id: WorkspaceId) -> Promotion {
        let now = Utc::now();
        Promotion {
            id: id.to_string(),
            workspace_id,
            recommender_id: 1,
            target_user_id: 2,
            current_role_id: "role-a".to_string(),
            recommended_role_id: "role-b".to_string(),
            reason: "consistently helpful".to_string(),
            upvotes: 0,
            downvotes: 0,
            status: PromotionStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    fn vote<'a>(promotion_id: &'a str, voter_id: UserId, up: bool, why: &'a str) -> VoteInput<'a> {
        VoteInput {
            promotion_id,
            voter_id,
            is_upvote: up,
            justification: why,
        }
    }

    fn vote_rows(store: &SqliteStore, promotion_id: &str) -> i64 {
        store
            .conn()
            .query_row(
                "SELECT COUNT(*) FROM promotion_votes WHERE promotion_id = ?1",
                params![promotion_id],
                |row| row.get(0),
            )
            .unwrap()
    }

    #[test]
    fn test_initialize_creates_tables() {
        let (_temp, store) = setup();

        let conn = store.conn();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        for table in [
            "workspaces",
            "users",
            "tokens",
            "roles",
            "role_assignments",
            "workspace_admins",
            "workspace_config",
            "promotions",
            "promotion_votes",
            "audit_log",
        ] {
            assert!(tables.contains(&table.to_string()), "missing {table}");
        }
    }

    #[test]
    fn test_token_lookup_collision() {
        let (_temp, store) = setup();

        let token = |id: &str| Token {
            id: id.to_string(),
            token_hash: "hash".to_string(),
            token_lookup: "lookup123".to_string(),
            is_admin: true,
            user_id: None,
            created_at: Utc::now(),
            expires_at: None,
            last_used_at: None,
        };

        store.create_token(&token("token-1")).unwrap();
        let result = store.create_token(&token("token-2"));
        assert!(matches!(result, Err(Error::TokenLookupCollision)));
    }

    #[test]
    fn test_list_user_roles_is_workspace_scoped() {
        let (_temp, store) = setup();
        store
            .create_workspace(&Workspace {
                id: 200,
                name: "Other".to_string(),
                created_at: Utc::now(),
            })
            .unwrap();
        store
            .create_user(&User {
                id: 7,
                username: "seven".to_string(),
                avatar_url: None,
                created_at: Utc::now(),
            })
            .unwrap();

        for (id, ws) in [("r-100", 100), ("r-200", 200)] {
            store
                .create_role(&Role {
                    id: id.to_string(),
                    workspace_id: ws,
                    name: "Staff".to_string(),
                    permissions: Permission::VIEW_MEMBERS,
                    is_owner_role: false,
                    created_at: Utc::now(),
                })
                .unwrap();
            store.assign_role(7, id).unwrap();
        }
        // Assigning twice is a no-op.
        store.assign_role(7, "r-100").unwrap();

        let roles = store.list_user_roles(7, 100).unwrap();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].id, "r-100");
        assert_eq!(roles[0].permissions, Permission::VIEW_MEMBERS);

        assert!(store.list_user_roles(7, 300).unwrap().is_empty());
    }

    #[test]
    fn test_config_upsert() {
        let (_temp, store) = setup();

        assert!(store.get_config(100, "promotions").unwrap().is_none());
        store
            .set_config(100, "promotions", r#"{"enabled":true}"#)
            .unwrap();
        store
            .set_config(100, "promotions", r#"{"enabled":false}"#)
            .unwrap();

        assert_eq!(
            store.get_config(100, "promotions").unwrap().as_deref(),
            Some(r#"{"enabled":false}"#)
        );
    }

    #[test]
    fn test_vote_overwrites_in_place() {
        let (_temp, store) = setup();
        store.create_promotion(&promotion("p1", 100)).unwrap();

        let tally = store.submit_vote(&vote("p1", 1, true, "solid work")).unwrap();
        assert_eq!(tally, VoteTally { upvotes: 1, downvotes: 0 });

        let tally = store.submit_vote(&vote("p1", 1, false, "reconsidered")).unwrap();
        assert_eq!(tally, VoteTally { upvotes: 0, downvotes: 1 });

        let votes = store.list_promotion_votes("p1").unwrap();
        assert_eq!(votes.len(), 1);
        assert!(!votes[0].is_upvote);
        assert_eq!(votes[0].justification, "reconsidered");
        assert!(votes[0].updated_at >= votes[0].created_at);
    }

    #[test]
    fn test_tally_matches_vote_rows() {
        let (_temp, store) = setup();
        store.create_promotion(&promotion("p1", 100)).unwrap();

        store.submit_vote(&vote("p1", 1, true, "yes")).unwrap();
        store.submit_vote(&vote("p1", 2, true, "yes")).unwrap();
        store.submit_vote(&vote("p1", 3, false, "not yet")).unwrap();
        let tally = store.submit_vote(&vote("p1", 2, false, "changed mind")).unwrap();

        assert_eq!(tally, VoteTally { upvotes: 1, downvotes: 2 });
        let stored = store.get_promotion(100, "p1").unwrap().unwrap();
        assert_eq!((stored.upvotes, stored.downvotes), (1, 2));
        assert_eq!(vote_rows(&store, "p1"), 3);
    }

    #[test]
    fn test_recompute_heals_drifted_counters() {
        let (_temp, store) = setup();
        store.create_promotion(&promotion("p1", 100)).unwrap();
        store.submit_vote(&vote("p1", 1, true, "yes")).unwrap();

        store
            .conn()
            .execute(
                "UPDATE promotions SET upvotes = 41, downvotes = 9 WHERE id = 'p1'",
                [],
            )
            .unwrap();

        let tally = store.submit_vote(&vote("p1", 2, false, "no")).unwrap();
        assert_eq!(tally, VoteTally { upvotes: 1, downvotes: 1 });

        store
            .conn()
            .execute("UPDATE promotions SET upvotes = 5 WHERE id = 'p1'", [])
            .unwrap();
        let tally = store.recompute_promotion_tally("p1").unwrap();
        assert_eq!(tally, VoteTally { upvotes: 1, downvotes: 1 });
    }

    #[test]
    fn test_vote_on_missing_promotion_writes_nothing() {
        let (_temp, store) = setup();

        let result = store.submit_vote(&vote("missing", 1, true, "yes"));
        assert!(matches!(result, Err(Error::NotFound)));
        assert_eq!(vote_rows(&store, "missing"), 0);
    }

    #[test]
    fn test_delete_promotion_cascades_votes() {
        let (_temp, store) = setup();
        store.create_promotion(&promotion("p1", 100)).unwrap();
        store.create_promotion(&promotion("p2", 100)).unwrap();
        store.submit_vote(&vote("p1", 1, true, "yes")).unwrap();
        store.submit_vote(&vote("p1", 2, false, "no")).unwrap();
        store.submit_vote(&vote("p2", 1, true, "yes")).unwrap();

        // Wrong workspace deletes nothing.
        assert!(!store.delete_promotion(999, "p1").unwrap());
        assert_eq!(vote_rows(&store, "p1"), 2);

        assert!(store.delete_promotion(100, "p1").unwrap());
        assert!(store.get_promotion(100, "p1").unwrap().is_none());
        assert_eq!(vote_rows(&store, "p1"), 0);
        assert_eq!(vote_rows(&store, "p2"), 1);

        assert!(!store.delete_promotion(100, "p1").unwrap());
    }

    #[test]
    fn test_list_promotions_sorting() {
        let (_temp, store) = setup();
        let mut older = promotion("old", 100);
        older.created_at = Utc::now() - chrono::Duration::hours(1);
        store.create_promotion(&older).unwrap();
        store.create_promotion(&promotion("new", 100)).unwrap();
        store.submit_vote(&vote("old", 1, true, "yes")).unwrap();

        let newest: Vec<String> = store
            .list_promotions(100, PromotionSort::Newest)
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(newest, vec!["new", "old"]);

        let by_votes: Vec<String> = store
            .list_promotions(100, PromotionSort::Votes)
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(by_votes, vec!["old", "new"]);
    }

    #[test]
    fn test_audit_entries_round_trip_detail() {
        let (_temp, store) = setup();
        store
            .record_audit(&AuditEntry {
                id: 0,
                workspace_id: 100,
                actor_id: Some(1),
                action: "settings.promotions.update".to_string(),
                subject: "promotions".to_string(),
                detail: serde_json::json!({"before": null, "after": {"enabled": true}}),
                created_at: Utc::now(),
            })
            .unwrap();

        let entries = store.list_audit_entries(100, 10).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].detail["after"]["enabled"], true);
        assert!(store.list_audit_entries(200, 10).unwrap().is_empty());
    }
}
