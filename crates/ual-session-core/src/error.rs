use thiserror::Error;

use crate::authenticator::AuthenticatorError;

#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("Render configuration is required when no auto login authenticator is provided")]
    MissingRenderConfig,

    #[error("No active authenticator defined, did you login before attempting to logout?")]
    NoActiveAuthenticator,

    #[error("Unknown authenticator: {0}")]
    UnknownAuthenticator(String),

    #[error("Authenticator already registered: {0}")]
    DuplicateAuthenticator(String),

    #[error("Authenticator {0} stopped before it finished loading")]
    AuthenticatorUnavailable(String),

    #[error(transparent)]
    Authenticator(#[from] AuthenticatorError),

    #[error("Session storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to render authenticator selection: {0}")]
    Render(#[source] std::io::Error),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse storage file: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Keychain error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("Could not find cache directory")]
    NoCacheDir,

    #[error("Storage lock poisoned")]
    Poisoned,
}

impl CoordinatorError {
    /// Whether the failure came from the authenticator itself rather than local bookkeeping
    pub fn is_authenticator_failure(&self) -> bool {
        matches!(
            self,
            CoordinatorError::Authenticator(_) | CoordinatorError::AuthenticatorUnavailable(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authenticator::AuthenticatorErrorKind;

    #[test]
    fn test_missing_render_config_message() {
        let err = CoordinatorError::MissingRenderConfig;
        assert!(err.to_string().contains("Render configuration is required"));
    }

    #[test]
    fn test_authenticator_failure_classification() {
        let err: CoordinatorError =
            AuthenticatorError::new(AuthenticatorErrorKind::Login, "rejected").into();
        assert!(err.is_authenticator_failure());
        assert_eq!(err.to_string(), "Login error: rejected");

        assert!(!CoordinatorError::NoActiveAuthenticator.is_authenticator_failure());
        assert!(CoordinatorError::AuthenticatorUnavailable("anchor".into()).is_authenticator_failure());
    }
}
