//! Workspace access control: who is a member, what their role lets them do,
//! and which feature surfaces are switched on.

mod evaluator;
mod gate;
mod membership;

pub use evaluator::{Decision, Grant, authorize, authorize_token};
pub use gate::{FeatureGate, FeatureKey, parse_enabled};
pub use membership::{resolve_membership, role_priority, select_authoritative_role};
