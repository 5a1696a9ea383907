//! Credentials: salted password digests and signed bearer tokens.
//!
//! Passwords are stored as `pbkdf2-sha256$<rounds>$<hex salt>$<hex key>`.
//! Verification reads the rounds back from the stored string, so raising
//! `PASSWORD_ROUNDS` leaves existing hashes usable.
//!
//! Tokens are `<hex(json claims)>.<hex(blake3 keyed hash)>`. The signing key
//! is derived from the configured secret, so rotating `JWT_SECRET`
//! invalidates every outstanding token.

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::models;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

const PASSWORD_SCHEME: &str = "pbkdf2-sha256";
const PASSWORD_ROUNDS: u32 = 100_000;
const SALT_BYTES: usize = 16;
const TOKEN_KEY_CONTEXT: &str = "knowledge-fabric 2026-10-01 bearer token signing";
const INVALID_CREDENTIALS: &str = "Invalid authentication credentials";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub kind: TokenKind,
    /// Expiry, epoch seconds.
    pub exp: u64,
}

// ── Passwords ───────────────────────────────────────────────────

pub fn hash_password(password: &str) -> CoreResult<String> {
    let mut salt = [0u8; SALT_BYTES];
    getrandom::getrandom(&mut salt).map_err(|err| {
        CoreError::Runtime(worker::Error::RustError(format!(
            "failed to generate salt: {err}"
        )))
    })?;
    Ok(encode_password(password, &salt, PASSWORD_ROUNDS))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(scheme), Some(rounds), Some(salt), Some(digest), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };
    if scheme != PASSWORD_SCHEME {
        return false;
    }
    let (Ok(rounds), Ok(salt), Ok(expected)) =
        (rounds.parse::<u32>(), hex::decode(salt), hex::decode(digest))
    else {
        return false;
    };
    if rounds == 0 {
        return false;
    }
    constant_time_eq(&password_digest(password, &salt, rounds), &expected)
}

fn encode_password(password: &str, salt: &[u8], rounds: u32) -> String {
    let digest = password_digest(password, salt, rounds);
    format!(
        "{PASSWORD_SCHEME}${rounds}${}${}",
        hex::encode(salt),
        hex::encode(digest)
    )
}

fn password_digest(password: &str, salt: &[u8], rounds: u32) -> [u8; 32] {
    let mut key = [0u8; 32];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, rounds, &mut key);
    key
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

// ── Tokens ──────────────────────────────────────────────────────

pub fn issue_token(
    secret: &str,
    user_id: &str,
    kind: TokenKind,
    now_secs: u64,
    ttl_secs: u64,
) -> CoreResult<String> {
    let claims = Claims {
        sub: user_id.to_string(),
        kind,
        exp: now_secs.saturating_add(ttl_secs),
    };
    let payload = serde_json::to_vec(&claims).map_err(worker::Error::from)?;
    let payload_hex = hex::encode(payload);
    let signature = sign(secret, payload_hex.as_bytes());
    Ok(format!("{payload_hex}.{}", signature.to_hex()))
}

pub fn verify_token(secret: &str, token: &str, now_secs: u64) -> CoreResult<Claims> {
    let invalid = || CoreError::unauthenticated(INVALID_CREDENTIALS);

    let (payload_hex, signature_hex) = token.split_once('.').ok_or_else(invalid)?;
    let presented = blake3::Hash::from_hex(signature_hex).map_err(|_| invalid())?;
    // blake3::Hash equality is constant time.
    if sign(secret, payload_hex.as_bytes()) != presented {
        return Err(invalid());
    }

    let payload = hex::decode(payload_hex).map_err(|_| invalid())?;
    let claims: Claims = serde_json::from_slice(&payload).map_err(|_| invalid())?;
    if claims.exp <= now_secs {
        return Err(CoreError::unauthenticated("Token has expired"));
    }
    Ok(claims)
}

/// Issue the access/refresh pair handed out by register, login and refresh.
pub fn issue_pair(config: &Config, user_id: &str, now_secs: u64) -> CoreResult<models::TokenResponse> {
    Ok(models::TokenResponse {
        access_token: issue_token(
            &config.jwt_secret,
            user_id,
            TokenKind::Access,
            now_secs,
            config.access_token_ttl_secs,
        )?,
        refresh_token: issue_token(
            &config.jwt_secret,
            user_id,
            TokenKind::Refresh,
            now_secs,
            config.refresh_token_ttl_secs,
        )?,
        token_type: "bearer".into(),
    })
}

/// Exchange a refresh token for a new pair for the same subject.
pub fn refresh_pair(config: &Config, refresh_token: &str, now_secs: u64) -> CoreResult<models::TokenResponse> {
    let claims = verify_token(&config.jwt_secret, refresh_token, now_secs)?;
    if claims.kind != TokenKind::Refresh {
        return Err(CoreError::unauthenticated("Invalid refresh token"));
    }
    issue_pair(config, &claims.sub, now_secs)
}

fn sign(secret: &str, message: &[u8]) -> blake3::Hash {
    let key = blake3::derive_key(TOKEN_KEY_CONTEXT, secret.as_bytes());
    blake3::keyed_hash(&key, message)
}
