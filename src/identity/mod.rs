//! Display identities for user ids. Lookups are best effort: callers always
//! get something renderable back.

mod http;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use http::HttpIdentityLookup;

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::UserId;

pub const UNKNOWN_USERNAME: &str = "Unknown User";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    pub avatar_url: String,
}

impl Identity {
    pub fn placeholder() -> Self {
        Self {
            username: UNKNOWN_USERNAME.to_string(),
            avatar_url: String::new(),
        }
    }
}

#[async_trait]
pub trait IdentityLookup: Send + Sync {
    async fn resolve(&self, user_id: UserId) -> Result<Identity>;
}

/// Resolves an identity, substituting the placeholder on any failure.
pub async fn resolve_or_placeholder(lookup: &dyn IdentityLookup, user_id: UserId) -> Identity {
    match lookup.resolve(user_id).await {
        Ok(identity) => identity,
        Err(e) => {
            tracing::debug!("Identity lookup for user {user_id} failed: {e}");
            Identity::placeholder()
        }
    }
}

/// Reads identities from the local users table.
pub struct StoreIdentityLookup {
    store: Arc<dyn Store>,
}

impl StoreIdentityLookup {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl IdentityLookup for StoreIdentityLookup {
    async fn resolve(&self, user_id: UserId) -> Result<Identity> {
        let user = self.store.get_user(user_id)?.ok_or(Error::NotFound)?;
        Ok(Identity {
            username: user.username,
            avatar_url: user.avatar_url.unwrap_or_default(),
        })
    }
}
