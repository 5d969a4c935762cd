//! # Rankhall
//!
//! Workspace role-based access control with a promotion-voting board,
//! usable both as a standalone server binary and as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! rankhall = { version = "0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use rankhall::identity::StoreIdentityLookup;
//! use rankhall::server::{AppState, create_router};
//! use rankhall::store::{SqliteStore, Store};
//!
//! let store: Arc<dyn Store> = Arc::new(SqliteStore::new("./data/rankhall.db").unwrap());
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState {
//!     identity: Arc::new(StoreIdentityLookup::new(store.clone())),
//!     store,
//!     request_timeout: Duration::from_secs(30),
//! });
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Builds the `rankhall` binary. Disable with `default-features = false`.

pub mod access;
pub mod audit;
pub mod auth;
pub mod config;
pub mod error;
pub mod identity;
pub mod promotion;
pub mod server;
pub mod store;
pub mod types;
