//! Authenticator plugin contract.
//!
//! This module provides:
//! - `Authenticator`: the capability set every login method implements
//! - `Readiness`: the notification an authenticator uses to announce it finished loading
//! - `AuthenticatorRegistry`: authenticators keyed by a stable identifier, populated at startup
//!
//! Authenticators are shared as `Arc<dyn Authenticator>`; the coordinator never owns them.

pub mod readiness;
pub mod registry;

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use thiserror::Error;
use tokio::sync::watch;

pub use readiness::Readiness;
pub use registry::{AuthenticatorRegistry, AuthenticatorSet};

/// A logged-in account handed back by `Authenticator::login`
pub trait User: Send + Sync + fmt::Debug {
    fn account_name(&self) -> &str;
    fn chain_id(&self) -> &str;
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Stable identifier, also written to the session record
    fn name(&self) -> &str;

    /// Watch channel that flips to `true` once the authenticator has finished loading
    fn readiness(&self) -> watch::Receiver<bool>;

    fn is_loading(&self) -> bool {
        let rx = self.readiness();
        let ready = *rx.borrow();
        !ready
    }

    /// How long a session started with this authenticator stays resumable
    fn should_invalidate_after(&self) -> Duration;

    /// Whether this authenticator should log in without showing a selection UI
    fn should_auto_login(&self) -> bool {
        false
    }

    /// Whether this authenticator should be offered in the selection UI
    fn should_render(&self) -> bool {
        true
    }

    async fn login(&self, account_name: Option<&str>) -> Result<Vec<Arc<dyn User>>, AuthenticatorError>;

    async fn logout(&self) -> Result<(), AuthenticatorError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticatorErrorKind {
    Login,
    Logout,
    Initialization,
}

impl fmt::Display for AuthenticatorErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AuthenticatorErrorKind::Login => "Login",
            AuthenticatorErrorKind::Logout => "Logout",
            AuthenticatorErrorKind::Initialization => "Initialization",
        };
        f.write_str(label)
    }
}

/// Failure reported by an authenticator, with the underlying cause when there is one
#[derive(Error, Debug)]
#[error("{kind} error: {message}")]
pub struct AuthenticatorError {
    pub kind: AuthenticatorErrorKind,
    pub message: String,
    #[source]
    pub cause: Option<Box<dyn StdError + Send + Sync>>,
}

impl AuthenticatorError {
    pub fn new(kind: AuthenticatorErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: impl StdError + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn login(message: impl Into<String>) -> Self {
        Self::new(AuthenticatorErrorKind::Login, message)
    }

    pub fn logout(message: impl Into<String>) -> Self {
        Self::new(AuthenticatorErrorKind::Logout, message)
    }

    /// Cause rendered for logging, empty when there is none
    pub fn cause_display(&self) -> String {
        self.cause
            .as_ref()
            .map(|c| c.to_string())
            .unwrap_or_default()
    }
}
