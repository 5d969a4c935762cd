use crate::error::{Error, Result};
use crate::types::{Membership, Permission};

/// What a membership is allowed to do, before looking at any particular request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    /// Workspace admin or owner role: everything is allowed.
    Bypass,
    /// Only the role's explicit tokens (with `admin` implying the rest).
    Explicit(Permission),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    #[must_use]
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }

    /// `Err(Error::Forbidden)` on deny.
    pub fn into_result(self) -> Result<()> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny => Err(Error::Forbidden),
        }
    }
}

impl From<bool> for Decision {
    fn from(allowed: bool) -> Self {
        if allowed {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }
}

impl Grant {
    #[must_use]
    pub fn for_membership(membership: &Membership) -> Grant {
        if membership.is_admin || membership.role.is_owner_role {
            Grant::Bypass
        } else {
            Grant::Explicit(membership.role.permissions.expand_implied())
        }
    }

    /// An empty requirement is never satisfied by an explicit set.
    #[must_use]
    pub fn allows(self, required: Permission) -> bool {
        match self {
            Grant::Bypass => true,
            Grant::Explicit(granted) => !required.is_empty() && granted.has(required),
        }
    }

    /// Effective tokens, for display.
    #[must_use]
    pub fn effective(self) -> Permission {
        match self {
            Grant::Bypass => Permission::ALL,
            Grant::Explicit(granted) => granted,
        }
    }
}

/// Fails closed: no membership denies everything.
#[must_use]
pub fn authorize(membership: Option<&Membership>, required: Permission) -> Decision {
    membership
        .map(|m| Grant::for_membership(m).allows(required))
        .unwrap_or(false)
        .into()
}

/// Like [`authorize`] for a raw token string. Tokens outside the vocabulary
/// are denied unless the membership bypasses checks entirely.
#[must_use]
pub fn authorize_token(membership: Option<&Membership>, token: &str) -> Decision {
    let Some(membership) = membership else {
        return Decision::Deny;
    };

    match (Grant::for_membership(membership), Permission::parse(token)) {
        (Grant::Bypass, _) => Decision::Allow,
        (grant, Some(required)) => grant.allows(required).into(),
        (Grant::Explicit(_), None) => Decision::Deny,
    }
}
