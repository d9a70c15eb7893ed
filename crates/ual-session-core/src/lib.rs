//! Session coordination for pluggable blockchain-account authenticators.
//!
//! This crate provides:
//! - `SessionCoordinator`: picks an authenticator (autologin, resumed session, or UI
//!   selection) and drives the login/logout lifecycle
//! - `Authenticator` / `AuthenticatorRegistry`: the plugin contract and its startup registry
//! - `SessionStore`: the three-entry session record kept in a `SessionStorage` backend
//! - `UiRenderer`: the seam for whatever presents the authenticator list to the user
//!
//! Sessions expire after the interval the authenticator asks for via
//! `should_invalidate_after`.

pub mod authenticator;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod renderer;
pub mod session;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;

pub use authenticator::{
    Authenticator, AuthenticatorError, AuthenticatorErrorKind, AuthenticatorRegistry,
    AuthenticatorSet, Readiness, User,
};
pub use config::{CoordinatorConfig, StorageKind};
pub use coordinator::{InitOutcome, ResumeOutcome, SessionCoordinator, SessionPhase, UserCallback};
pub use error::{CoordinatorError, StorageError};
pub use renderer::{LoginRequest, LoginSelector, RenderConfig, RendererContext, RendererFactory, UiRenderer};
pub use session::{Clock, SessionRecord, SessionStore, StoredSession, SystemClock};
pub use storage::{FileStorage, KeyringStorage, MemoryStorage, SessionStorage};
