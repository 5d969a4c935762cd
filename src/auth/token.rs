use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{Token, UserId};

const ARGON2_MEMORY: u32 = 19 * 1024; // 19 MiB
const ARGON2_ITERATIONS: u32 = 2;
const ARGON2_PARALLELISM: u32 = 1;
const ARGON2_OUTPUT_LEN: usize = 32;

const TOKEN_PREFIX: &str = "rankhall";
const LOOKUP_LENGTH: usize = 8;
const SECRET_BYTES: usize = 16;
const SECRET_LENGTH: usize = SECRET_BYTES * 2;

/// A freshly minted session token. `raw` is shown to the caller once; only
/// `lookup` and `hash` are persisted.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub raw: String,
    pub lookup: String,
    pub hash: String,
}

pub struct TokenGenerator {
    argon2: Argon2<'static>,
}

impl Default for TokenGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenGenerator {
    #[must_use]
    pub fn new() -> Self {
        let params = match Params::new(
            ARGON2_MEMORY,
            ARGON2_ITERATIONS,
            ARGON2_PARALLELISM,
            Some(ARGON2_OUTPUT_LEN),
        ) {
            Ok(params) => params,
            Err(e) => {
                tracing::error!("Invalid argon2 params, using library defaults: {e}");
                Params::default()
            }
        };

        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }

    /// Mints a token of the form `rankhall_<lookup>_<secret>`.
    pub fn issue(&self) -> Result<IssuedToken> {
        let lookup = generate_lookup();
        let secret = generate_secret();
        let raw = format!("{TOKEN_PREFIX}_{lookup}_{secret}");
        let hash = self.hash(&raw)?;
        Ok(IssuedToken { raw, lookup, hash })
    }

    pub fn hash(&self, token: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(token.as_bytes(), &salt)
            .map_err(|e| Error::Config(format!("failed to hash token: {e}")))?;
        Ok(hash.to_string())
    }

    pub fn verify(&self, token: &str, hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| Error::Config(format!("invalid hash format: {e}")))?;

        match self.argon2.verify_password(token.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(Error::Config(format!("failed to verify token: {e}"))),
        }
    }
}

fn generate_lookup() -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    uuid[..LOOKUP_LENGTH].to_string()
}

fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::thread_rng().fill(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Splits a raw token into its lookup key, rejecting anything not shaped
/// like a token this server could have issued.
pub fn parse_token(token: &str) -> Result<String> {
    let rest = token
        .strip_prefix(TOKEN_PREFIX)
        .and_then(|r| r.strip_prefix('_'))
        .ok_or(Error::InvalidTokenFormat)?;

    let (lookup, secret) = rest.split_once('_').ok_or(Error::InvalidTokenFormat)?;

    let well_formed = lookup.len() == LOOKUP_LENGTH
        && secret.len() == SECRET_LENGTH
        && lookup.chars().all(|c| c.is_ascii_hexdigit())
        && secret.chars().all(|c| c.is_ascii_hexdigit());

    if !well_formed {
        return Err(Error::InvalidTokenFormat);
    }

    Ok(lookup.to_string())
}

/// Issues a token and builds its storage record. Returns the record and the
/// raw token, which is never persisted.
pub fn mint_token(
    generator: &TokenGenerator,
    is_admin: bool,
    user_id: Option<UserId>,
    expires_at: Option<DateTime<Utc>>,
) -> Result<(Token, String)> {
    let issued = generator.issue()?;
    let token = Token {
        id: Uuid::new_v4().to_string(),
        token_hash: issued.hash,
        token_lookup: issued.lookup,
        is_admin,
        user_id,
        created_at: Utc::now(),
        expires_at,
        last_used_at: None,
    };
    Ok((token, issued.raw))
}
