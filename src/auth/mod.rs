mod helpers;
mod middleware;
mod token;

pub use helpers::{TokenValidationError, ValidatedToken, extract_bearer_token, validate_token};
pub use middleware::{AuthError, RequireAdmin, RequireUser};
pub use token::{IssuedToken, TokenGenerator, mint_token, parse_token};
