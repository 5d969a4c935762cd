mod admin;
pub mod dto;
pub mod response;
mod router;
pub mod validation;
mod workspace;

pub use admin::admin_router;
pub use router::{AppState, create_router};
pub use workspace::workspace_router;
