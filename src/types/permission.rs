use std::fmt;

use serde::{Deserialize, Serialize};

/// Permission is a bitmask over the fixed, workspace-independent token vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(u32);

const VOCABULARY: [(&str, Permission); 8] = [
    ("admin", Permission::ADMIN),
    ("view_members", Permission::VIEW_MEMBERS),
    ("manage_members", Permission::MANAGE_MEMBERS),
    ("view_promotions", Permission::VIEW_PROMOTIONS),
    ("manage_promotions", Permission::MANAGE_PROMOTIONS),
    ("manage_sessions", Permission::MANAGE_SESSIONS),
    ("view_activity", Permission::VIEW_ACTIVITY),
    ("manage_docs", Permission::MANAGE_DOCS),
];

impl Permission {
    pub const ADMIN: Permission = Permission(1 << 0); // 1
    pub const VIEW_MEMBERS: Permission = Permission(1 << 1); // 2
    pub const MANAGE_MEMBERS: Permission = Permission(1 << 2); // 4
    pub const VIEW_PROMOTIONS: Permission = Permission(1 << 3); // 8
    pub const MANAGE_PROMOTIONS: Permission = Permission(1 << 4); // 16
    pub const MANAGE_SESSIONS: Permission = Permission(1 << 5); // 32
    pub const VIEW_ACTIVITY: Permission = Permission(1 << 6); // 64
    pub const MANAGE_DOCS: Permission = Permission(1 << 7); // 128

    /// Every token in the vocabulary.
    pub const ALL: Permission = Permission((1 << 8) - 1);

    pub const fn new(bits: u32) -> Self {
        Self(bits & Self::ALL.0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns true if this bitmask contains every bit of `required`.
    #[must_use]
    pub const fn has(self, required: Permission) -> bool {
        self.0 & required.0 == required.0
    }

    #[must_use]
    pub const fn union(self, other: Permission) -> Permission {
        Permission(self.0 | other.0)
    }

    /// An explicit `admin` token implies the rest of the vocabulary.
    #[must_use]
    pub const fn expand_implied(self) -> Permission {
        if self.has(Self::ADMIN) {
            Self::ALL
        } else {
            self
        }
    }

    /// Converts a permission token to its bitmask value.
    pub fn parse(s: &str) -> Option<Permission> {
        VOCABULARY
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(_, perm)| *perm)
    }

    /// Converts a list of tokens to a combined bitmask, failing on the first unknown token.
    pub fn parse_many<S: AsRef<str>>(strs: &[S]) -> Result<Permission, String> {
        let mut result = Permission::default();
        for s in strs {
            let s = s.as_ref();
            result = result.union(Self::parse(s).ok_or_else(|| s.to_string())?);
        }
        Ok(result)
    }

    /// Returns the tokens in this bitmask, in vocabulary order.
    #[must_use]
    pub fn to_strings(self) -> Vec<&'static str> {
        VOCABULARY
            .iter()
            .filter(|(_, perm)| self.has(*perm))
            .map(|(name, _)| *name)
            .collect()
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_strings().join(", "))
    }
}

impl From<i64> for Permission {
    fn from(bits: i64) -> Self {
        Self::new(bits as u32)
    }
}

impl From<Permission> for i64 {
    fn from(p: Permission) -> Self {
        i64::from(p.0)
    }
}
