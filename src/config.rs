use crate::error::{CoreError, CoreResult};
use worker::Env;

pub const DB_BINDING: &str = "DB";

const JWT_SECRET_VAR: &str = "JWT_SECRET";
const ACCESS_TTL_VAR: &str = "ACCESS_TOKEN_EXPIRE_MINUTES";
const REFRESH_TTL_VAR: &str = "REFRESH_TOKEN_EXPIRE_DAYS";
const ALLOWED_ORIGINS_VAR: &str = "ALLOWED_ORIGINS";

const DEFAULT_ACCESS_TTL_MINUTES: u64 = 30;
const DEFAULT_REFRESH_TTL_DAYS: u64 = 7;
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:3001";

const SECS_PER_MINUTE: u64 = 60;
const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Worker configuration, built once per `fetch` and handed to every
/// operation that needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub jwt_secret: String,
    pub access_token_ttl_secs: u64,
    pub refresh_token_ttl_secs: u64,
}

impl Config {
    pub fn from_env(env: &Env) -> CoreResult<Self> {
        Self::from_lookup(env_lookup(env))
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CoreResult<Self> {
        let jwt_secret = lookup(JWT_SECRET_VAR)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| CoreError::Config(format!("{JWT_SECRET_VAR} is not set")))?;

        Ok(Self {
            jwt_secret,
            access_token_ttl_secs: ttl_secs(
                &lookup,
                ACCESS_TTL_VAR,
                DEFAULT_ACCESS_TTL_MINUTES,
                SECS_PER_MINUTE,
            )?,
            refresh_token_ttl_secs: ttl_secs(
                &lookup,
                REFRESH_TTL_VAR,
                DEFAULT_REFRESH_TTL_DAYS,
                SECS_PER_DAY,
            )?,
        })
    }
}

/// CORS allow-list. Resolved apart from `Config` so that a request can still
/// carry CORS headers when the rest of the configuration is unusable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedOrigins(Vec<String>);

impl AllowedOrigins {
    pub fn from_env(env: &Env) -> Self {
        Self::from_lookup(env_lookup(env))
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let raw = lookup(ALLOWED_ORIGINS_VAR).unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.into());
        Self(
            raw.split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(ToString::to_string)
                .collect(),
        )
    }

    /// Exact match; no wildcards.
    pub fn allows(&self, origin: &str) -> bool {
        self.0.iter().any(|o| o == origin)
    }
}

/// Secrets first, then plain vars.
fn env_lookup(env: &Env) -> impl Fn(&str) -> Option<String> + '_ {
    move |key| {
        env.secret(key)
            .map(|s| s.to_string())
            .or_else(|_| env.var(key).map(|v| v.to_string()))
            .ok()
    }
}

fn ttl_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: u64,
    unit_secs: u64,
) -> CoreResult<u64> {
    parse_u64(lookup, key, default)?
        .checked_mul(unit_secs)
        .ok_or_else(|| CoreError::Config(format!("{key} is too large")))
}

fn parse_u64(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> CoreResult<u64> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| CoreError::Config(format!("{key} must be a whole number, got {raw:?}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let config = Config::from_lookup(lookup_from(&[("JWT_SECRET", "s3cret")])).unwrap();
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.access_token_ttl_secs, 30 * 60);
        assert_eq!(config.refresh_token_ttl_secs, 7 * 24 * 60 * 60);

        let origins = AllowedOrigins::from_lookup(lookup_from(&[]));
        assert!(origins.allows("http://localhost:3000"));
        assert!(origins.allows("http://localhost:3001"));
    }

    #[test]
    fn overrides_are_honoured() {
        let config = Config::from_lookup(lookup_from(&[
            ("JWT_SECRET", "k"),
            ("ACCESS_TOKEN_EXPIRE_MINUTES", "5"),
            ("REFRESH_TOKEN_EXPIRE_DAYS", " 1 "),
            ("ALLOWED_ORIGINS", "https://app.example.com, ,https://admin.example.com"),
        ]))
        .unwrap();
        assert_eq!(config.access_token_ttl_secs, 300);
        assert_eq!(config.refresh_token_ttl_secs, 86_400);
    }

    #[test]
    fn origin_list_is_split_and_trimmed() {
        let origins = AllowedOrigins::from_lookup(lookup_from(&[(
            "ALLOWED_ORIGINS",
            "https://app.example.com, ,https://admin.example.com",
        )]));
        assert_eq!(
            origins,
            AllowedOrigins(vec![
                "https://app.example.com".into(),
                "https://admin.example.com".into()
            ])
        );
        assert!(!origins.allows("http://localhost:3000"));
    }

    #[test]
    fn origins_resolve_without_a_usable_secret() {
        let vars = [("ALLOWED_ORIGINS", "https://app.example.com")];
        assert!(Config::from_lookup(lookup_from(&vars)).is_err());
        assert!(AllowedOrigins::from_lookup(lookup_from(&vars)).allows("https://app.example.com"));
    }

    #[test]
    fn missing_or_blank_secret_is_rejected() {
        assert!(matches!(
            Config::from_lookup(lookup_from(&[])),
            Err(CoreError::Config(_))
        ));
        assert!(matches!(
            Config::from_lookup(lookup_from(&[("JWT_SECRET", "   ")])),
            Err(CoreError::Config(_))
        ));
    }

    #[test]
    fn origin_check_is_exact() {
        let origins = AllowedOrigins::from_lookup(lookup_from(&[]));
        assert!(origins.allows("http://localhost:3000"));
        assert!(!origins.allows("http://localhost:3000/"));
        assert!(!origins.allows("https://evil.example"));
    }

    #[test]
    fn non_numeric_ttl_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("JWT_SECRET", "k"),
            ("ACCESS_TOKEN_EXPIRE_MINUTES", "thirty"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("ACCESS_TOKEN_EXPIRE_MINUTES"));
    }

    #[test]
    fn ttl_overflow_is_a_config_error() {
        let max = u64::MAX.to_string();
        for key in ["ACCESS_TOKEN_EXPIRE_MINUTES", "REFRESH_TOKEN_EXPIRE_DAYS"] {
            let err = Config::from_lookup(lookup_from(&[("JWT_SECRET", "k"), (key, max.as_str())]))
                .unwrap_err();
            assert!(matches!(&err, CoreError::Config(msg) if *msg == format!("{key} is too large")));
        }

        let largest_minutes = (u64::MAX / 60).to_string();
        let config = Config::from_lookup(lookup_from(&[
            ("JWT_SECRET", "k"),
            ("ACCESS_TOKEN_EXPIRE_MINUTES", largest_minutes.as_str()),
        ]))
        .unwrap();
        assert_eq!(config.access_token_ttl_secs, u64::MAX / 60 * 60);
    }
}
