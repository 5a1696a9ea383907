use thiserror::Error;

/// Failure outcomes of the knowledge core.
///
/// `NotFound` is also what a caller sees for an entity that exists under
/// another organization.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("request body exceeds max size")]
    PayloadTooLarge,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("runtime error: {0}")]
    Runtime(#[from] worker::Error),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;

impl CoreError {
    pub fn unauthenticated(msg: &str) -> Self {
        Self::Unauthenticated(msg.to_string())
    }

    /// HTTP status the transport layer answers with.
    pub fn status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 400,
            Self::Unauthenticated(_) => 401,
            Self::Validation(_) => 422,
            Self::PayloadTooLarge => 413,
            Self::Config(_) | Self::Runtime(_) => 500,
        }
    }

    /// Message safe to hand back to a client. Server-side causes stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::Config(_) | Self::Runtime(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_follows_taxonomy() {
        assert_eq!(CoreError::NotFound("Artifact").status(), 404);
        assert_eq!(CoreError::Conflict("dup".into()).status(), 400);
        assert_eq!(CoreError::unauthenticated("nope").status(), 401);
        assert_eq!(CoreError::Validation("bad".into()).status(), 422);
        assert_eq!(CoreError::PayloadTooLarge.status(), 413);
        assert_eq!(CoreError::Config("x".into()).status(), 500);
        assert_eq!(
            CoreError::Runtime(worker::Error::RustError("d1 down".into())).status(),
            500
        );
    }

    #[test]
    fn not_found_message_names_entity() {
        assert_eq!(CoreError::NotFound("Template").to_string(), "Template not found");
    }

    #[test]
    fn internal_causes_are_not_exposed() {
        let err = CoreError::Runtime(worker::Error::RustError(
            "D1_ERROR: no such table: artifacts".into(),
        ));
        assert_eq!(err.public_message(), "internal error");
        assert!(err.to_string().contains("no such table"));

        let err = CoreError::Config("JWT_SECRET is not set".into());
        assert_eq!(err.public_message(), "internal error");
    }

    #[test]
    fn router_failure_renders_as_internal_error() {
        let err = CoreError::from(worker::Error::RustError("route handler panicked".into()));
        assert!(matches!(err, CoreError::Runtime(_)));
        assert_eq!(err.status(), 500);
        assert_eq!(err.public_message(), "internal error");
    }

    #[test]
    fn client_errors_keep_their_message() {
        let err = CoreError::Conflict("Email already registered".into());
        assert_eq!(err.public_message(), "Email already registered");
    }
}
