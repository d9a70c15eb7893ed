//! Seam between the coordinator and whatever shows the authenticator list.
//!
//! A renderer is built by a `RendererFactory` once `init` decides a selection UI is
//! needed. It reports the user's choice back through its `LoginSelector`; the
//! coordinator picks those requests up in `next_selection` / `run_selections`.

use std::io;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::authenticator::Authenticator;

/// Buffer size for pending login selections.
/// A user can only click so fast; 8 leaves room for double clicks.
pub(crate) const SELECTION_BUFFER_SIZE: usize = 8;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct RenderConfig {
    /// Where the renderer should attach its UI (element id, terminal name, ...)
    pub container_element: String,
    /// Skip the default button styling
    #[serde(default)]
    pub button_style_override: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRequest {
    pub authenticator: String,
    pub account_name: Option<String>,
}

/// Handle a renderer uses to ask for a login
#[derive(Debug, Clone)]
pub struct LoginSelector {
    tx: mpsc::Sender<LoginRequest>,
}

impl LoginSelector {
    pub(crate) fn channel() -> (Self, mpsc::Receiver<LoginRequest>) {
        let (tx, rx) = mpsc::channel(SELECTION_BUFFER_SIZE);
        (Self { tx }, rx)
    }

    /// Queue a login for the named authenticator. Fails if the coordinator is gone or
    /// the queue is full.
    pub fn select(&self, authenticator: &str, account_name: Option<&str>) -> Result<(), LoginRequest> {
        let request = LoginRequest {
            authenticator: authenticator.to_string(),
            account_name: account_name.map(str::to_string),
        };
        self.tx.try_send(request).map_err(|e| match e {
            mpsc::error::TrySendError::Full(r) | mpsc::error::TrySendError::Closed(r) => r,
        })
    }

    /// Like `select`, but waits for queue space
    pub async fn select_async(&self, authenticator: &str, account_name: Option<&str>) -> Result<(), LoginRequest> {
        let request = LoginRequest {
            authenticator: authenticator.to_string(),
            account_name: account_name.map(str::to_string),
        };
        self.tx.send(request).await.map_err(|e| e.0)
    }

    /// Like `select_async`, for renderers running on their own thread.
    /// Must not be called from inside the async runtime.
    pub fn select_blocking(&self, authenticator: &str, account_name: Option<&str>) -> Result<(), LoginRequest> {
        let request = LoginRequest {
            authenticator: authenticator.to_string(),
            account_name: account_name.map(str::to_string),
        };
        self.tx.blocking_send(request).map_err(|e| e.0)
    }
}

/// Everything a renderer is built with
pub struct RendererContext {
    pub selector: LoginSelector,
    pub authenticators: Vec<Arc<dyn Authenticator>>,
    pub container_element: String,
    pub button_style_override: bool,
}

pub trait UiRenderer: Send {
    /// Build and show the selection UI
    fn generate_ui(&mut self) -> io::Result<()>;

    /// Return the UI to its initial state after a login attempt
    fn reset(&mut self);
}

pub type RendererFactory = Box<dyn Fn(RendererContext) -> Box<dyn UiRenderer> + Send + Sync>;
