use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{Identity, IdentityLookup};
use crate::error::{Error, Result};
use crate::types::UserId;

/// Resolves identities from an upstream directory at `{base_url}/users/{id}`.
#[derive(Clone)]
pub struct HttpIdentityLookup {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct DirectoryUser {
    username: String,
    #[serde(default)]
    avatar_url: Option<String>,
}

impl HttpIdentityLookup {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build identity client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn user_url(&self, user_id: UserId) -> String {
        format!("{}/users/{}", self.base_url, user_id)
    }
}

#[async_trait]
impl IdentityLookup for HttpIdentityLookup {
    async fn resolve(&self, user_id: UserId) -> Result<Identity> {
        let resp = self
            .client
            .get(self.user_url(user_id))
            .send()
            .await
            .map_err(|e| Error::Identity(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Error::Identity(format!(
                "directory returned {} for user {user_id}",
                resp.status()
            )));
        }

        let user: DirectoryUser = resp
            .json()
            .await
            .map_err(|e| Error::Identity(e.to_string()))?;

        Ok(Identity {
            username: user.username,
            avatar_url: user.avatar_url.unwrap_or_default(),
        })
    }
}
