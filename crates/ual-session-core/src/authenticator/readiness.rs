use tokio::sync::watch;
use tracing::debug;

use super::Authenticator;
use crate::error::CoordinatorError;

/// Loading flag an authenticator owns and flips once its own initialization is done.
///
/// Subscribers wait on the channel instead of polling `is_loading`.
#[derive(Debug)]
pub struct Readiness {
    tx: watch::Sender<bool>,
}

impl Readiness {
    /// Start in the loading state
    pub fn pending() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Start already loaded
    pub fn ready() -> Self {
        let (tx, _rx) = watch::channel(true);
        Self { tx }
    }

    pub fn mark_ready(&self) {
        self.tx.send_replace(true);
    }

    pub fn mark_loading(&self) {
        self.tx.send_replace(false);
    }

    pub fn is_ready(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for Readiness {
    fn default() -> Self {
        Self::pending()
    }
}

/// Wait until the authenticator reports it has finished loading.
///
/// No timeout: a slow authenticator is waited on indefinitely. Fails only if the
/// authenticator drops its readiness sender while still loading.
pub(crate) async fn wait_until_ready(authenticator: &dyn Authenticator) -> Result<(), CoordinatorError> {
    let mut rx = authenticator.readiness();
    if *rx.borrow_and_update() {
        return Ok(());
    }

    debug!(authenticator = authenticator.name(), "Waiting for authenticator to load");
    rx.wait_for(|ready| *ready)
        .await
        .map(|_| ())
        .map_err(|_| CoordinatorError::AuthenticatorUnavailable(authenticator.name().to_string()))
}
