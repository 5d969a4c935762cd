use std::fmt;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::WorkspaceId;

/// Workspace features that can be switched off as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKey {
    Promotions,
    Sessions,
    Guides,
    Leaderboard,
    Notices,
    Policies,
    Allies,
    LiveServers,
}

impl FeatureKey {
    pub const ALL: [FeatureKey; 8] = [
        FeatureKey::Promotions,
        FeatureKey::Sessions,
        FeatureKey::Guides,
        FeatureKey::Leaderboard,
        FeatureKey::Notices,
        FeatureKey::Policies,
        FeatureKey::Allies,
        FeatureKey::LiveServers,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FeatureKey::Promotions => "promotions",
            FeatureKey::Sessions => "sessions",
            FeatureKey::Guides => "guides",
            FeatureKey::Leaderboard => "leaderboard",
            FeatureKey::Notices => "notices",
            FeatureKey::Policies => "policies",
            FeatureKey::Allies => "allies",
            FeatureKey::LiveServers => "live_servers",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == s)
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reads `enabled` out of a stored toggle value.
///
/// Values may be a JSON object or a JSON string that itself holds an object.
/// Anything that is not an object with a boolean `enabled` reads as off.
pub fn parse_enabled(raw: &str) -> bool {
    let value = match serde_json::from_str::<Value>(raw) {
        Ok(Value::String(inner)) => serde_json::from_str::<Value>(&inner).unwrap_or(Value::Null),
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Unparsable feature toggle value, treating as disabled: {e}");
            return false;
        }
    };

    value
        .get("enabled")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Per-workspace feature toggles, read through on every call.
pub struct FeatureGate<'a> {
    store: &'a dyn Store,
}

impl<'a> FeatureGate<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Returns `Ok(None)` when the toggle was never written.
    pub fn toggle(&self, workspace_id: WorkspaceId, key: FeatureKey) -> Result<Option<bool>> {
        let raw = self.store.get_config(workspace_id, key.as_str())?;
        Ok(raw.as_deref().map(parse_enabled))
    }

    pub fn is_enabled(&self, workspace_id: WorkspaceId, key: FeatureKey) -> Result<bool> {
        Ok(self.toggle(workspace_id, key)?.unwrap_or(false))
    }

    /// Errors with `FeatureDisabled` unless the feature is on.
    pub fn require(&self, workspace_id: WorkspaceId, key: FeatureKey) -> Result<()> {
        if self.is_enabled(workspace_id, key)? {
            Ok(())
        } else {
            Err(Error::FeatureDisabled)
        }
    }

    /// Writes `{"enabled": <bool>}` and returns the previous toggle, if any.
    pub fn set(
        &self,
        workspace_id: WorkspaceId,
        key: FeatureKey,
        enabled: bool,
    ) -> Result<Option<bool>> {
        let before = self.toggle(workspace_id, key)?;
        let value = serde_json::json!({ "enabled": enabled }).to_string();
        self.store.set_config(workspace_id, key.as_str(), &value)?;
        Ok(before)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tempfile::TempDir;

    use super::*;
    use crate::store::SqliteStore;
    use crate::types::Workspace;

    #[test]
    fn test_parse_enabled_variants() {
        assert!(parse_enabled(r#"{"enabled":true}"#));
        assert!(parse_enabled(r#""{\"enabled\":true}""#));
        assert!(!parse_enabled(r#"{"enabled":false}"#));
        assert!(!parse_enabled(r#"{"enabled":"yes"}"#));
        assert!(!parse_enabled(r#"{"enabled":1}"#));
        assert!(!parse_enabled(r#"{}"#));
        assert!(!parse_enabled("[true]"));
        assert!(!parse_enabled("true"));
        assert!(!parse_enabled(r#""not json""#));
        assert!(!parse_enabled("{enabled: true"));
        assert!(!parse_enabled(""));
    }

    #[test]
    fn test_feature_key_parse() {
        for key in FeatureKey::ALL {
            assert_eq!(FeatureKey::parse(key.as_str()), Some(key));
        }
        assert_eq!(FeatureKey::parse("Promotions"), None);
        assert_eq!(FeatureKey::parse("home"), None);
    }

    #[test]
    fn test_gate_reads_through_store() {
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

        let gate = FeatureGate::new(&store);
        assert_eq!(gate.toggle(100, FeatureKey::Promotions).unwrap(), None);
        assert!(matches!(
            gate.require(100, FeatureKey::Promotions),
            Err(Error::FeatureDisabled)
        ));

        assert_eq!(gate.set(100, FeatureKey::Promotions, true).unwrap(), None);
        assert!(gate.require(100, FeatureKey::Promotions).is_ok());
        assert!(!gate.is_enabled(100, FeatureKey::Sessions).unwrap());

        store.set_config(100, "promotions", "{corrupt").unwrap();
        assert!(!gate.is_enabled(100, FeatureKey::Promotions).unwrap());
        assert_eq!(gate.toggle(100, FeatureKey::Promotions).unwrap(), Some(false));

        assert_eq!(
            gate.set(100, FeatureKey::Promotions, true).unwrap(),
            Some(false)
        );
    }
}
