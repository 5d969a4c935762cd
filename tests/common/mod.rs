#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use rankhall::auth::{TokenGenerator, mint_token};
use rankhall::identity::{IdentityLookup, StoreIdentityLookup};
use rankhall::server::{AppState, create_router};
use rankhall::store::{SqliteStore, Store};
use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::task::JoinHandle;

pub const WORKSPACE_ID: i64 = 100;

/// An in-process server on an ephemeral port, backed by a temp database.
pub struct TestServer {
    pub temp_dir: TempDir,
    pub base_url: String,
    pub admin_token: String,
    pub client: Client,
    server_task: JoinHandle<()>,
}

/// Tokens for a workspace seeded with one user per access level.
pub struct Guild {
    /// Holds the owner role.
    pub owner: String,
    /// `view_promotions` only.
    pub member: String,
    /// `view_promotions` and `manage_promotions`.
    pub moderator: String,
    /// Empty role plus the workspace admin override.
    pub overseer: String,
    /// Has a token but no role in the workspace.
    pub outsider: String,
    pub target_user_id: i64,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(None, Duration::from_secs(30)).await
    }

    pub async fn start_with(
        identity: Option<Arc<dyn IdentityLookup>>,
        request_timeout: Duration,
    ) -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let store = SqliteStore::new(temp_dir.path().join("rankhall.db")).expect("open store");
        store.initialize().expect("initialize schema");

        let (token, admin_token) =
            mint_token(&TokenGenerator::new(), true, None, None).expect("mint admin token");
        store.create_token(&token).expect("store admin token");

        let store: Arc<dyn Store> = Arc::new(store);
        let identity: Arc<dyn IdentityLookup> = match identity {
            Some(identity) => identity,
            None => Arc::new(StoreIdentityLookup::new(store.clone())),
        };
        let state = Arc::new(AppState {
            store,
            identity,
            request_timeout,
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let app = create_router(state);
        let server_task = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });

        Self {
            temp_dir,
            base_url: format!("http://{addr}"),
            admin_token,
            client: Client::new(),
            server_task,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn send(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = self.client.request(method, self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.expect("send request");
        let status = response.status();
        let text = response.text().await.expect("read body");
        let body = if text.is_empty() {
            Value::Null
        } else {
            match serde_json::from_str(&text) {
                Ok(value) => value,
                Err(_) => Value::String(text),
            }
        };
        (status, body)
    }

    pub async fn get(&self, path: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, path, Some(token), None).await
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, path, Some(token), Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, path, Some(token), None).await
    }

    pub async fn admin(&self, method: Method, path: &str, body: Option<Value>) -> (StatusCode, Value) {
        let path = format!("/api/v1/admin{path}");
        self.send(method, &path, Some(self.admin_token.as_str()), body)
            .await
    }

    pub async fn create_user(&self, id: i64, username: &str) -> String {
        let (status, _) = self
            .admin(
                Method::POST,
                "/users",
                Some(json!({ "id": id, "username": username })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create user {username}");

        let (status, body) = self
            .admin(Method::POST, &format!("/users/{id}/tokens"), Some(json!({})))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create token for {username}");
        body["data"]["token"]
            .as_str()
            .expect("raw token")
            .to_string()
    }

    pub async fn create_role(&self, name: &str, permissions: &[&str], owner: bool) -> String {
        let (status, body) = self
            .admin(
                Method::POST,
                &format!("/workspaces/{WORKSPACE_ID}/roles"),
                Some(json!({
                    "name": name,
                    "permissions": permissions,
                    "is_owner_role": owner,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create role {name}");
        body["data"]["id"].as_str().expect("role id").to_string()
    }

    pub async fn assign(&self, role_id: &str, user_id: i64) {
        let (status, _) = self
            .admin(
                Method::PUT,
                &format!("/workspaces/{WORKSPACE_ID}/roles/{role_id}/members/{user_id}"),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    /// Creates workspace 100 and one user per access level.
    pub async fn seed_guild(&self) -> Guild {
        let (status, _) = self
            .admin(
                Method::POST,
                "/workspaces",
                Some(json!({ "id": WORKSPACE_ID, "name": "Guild" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let owner_role = self.create_role("Owner", &[], true).await;
        let member_role = self.create_role("Member", &["view_promotions"], false).await;
        let moderator_role = self
            .create_role("Moderator", &["view_promotions", "manage_promotions"], false)
            .await;
        let bare_role = self.create_role("Recruit", &[], false).await;

        let owner = self.create_user(1, "founder").await;
        let member = self.create_user(2, "member").await;
        let moderator = self.create_user(3, "moderator").await;
        let overseer = self.create_user(4, "overseer").await;
        let outsider = self.create_user(5, "outsider").await;
        self.create_user(6, "candidate").await;

        self.assign(&owner_role, 1).await;
        self.assign(&member_role, 2).await;
        self.assign(&member_role, 6).await;
        self.assign(&moderator_role, 3).await;
        self.assign(&bare_role, 4).await;

        let (status, _) = self
            .admin(
                Method::PUT,
                &format!("/workspaces/{WORKSPACE_ID}/admins/4"),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        Guild {
            owner,
            member,
            moderator,
            overseer,
            outsider,
            target_user_id: 6,
        }
    }

    pub async fn set_feature(&self, token: &str, feature: &str, enabled: bool) -> StatusCode {
        let (status, _) = self
            .send(
                Method::PATCH,
                &format!("/api/v1/workspaces/{WORKSPACE_ID}/settings/{feature}"),
                Some(token),
                Some(json!({ "enabled": enabled })),
            )
            .await;
        status
    }

    pub async fn create_promotion(&self, token: &str, target_user_id: i64, reason: &str) -> String {
        let (status, body) = self
            .post(
                &format!("/api/v1/workspaces/{WORKSPACE_ID}/promotions"),
                token,
                json!({
                    "target_user_id": target_user_id,
                    "current_role_id": "member",
                    "recommended_role_id": "moderator",
                    "reason": reason,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create promotion: {body}");
        body["data"]["id"].as_str().expect("promotion id").to_string()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server_task.abort();
    }
}
