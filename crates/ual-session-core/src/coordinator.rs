//! Login coordinator.
//!
//! `SessionCoordinator` decides at startup whether to auto-login, resume a stored
//! session, or hand the authenticator list to a renderer, and then owns the single
//! active authenticator for the login/logout lifecycle. Progress is published as a
//! `SessionPhase` on a watch channel so the host can follow along.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::authenticator::readiness::wait_until_ready;
use crate::authenticator::{Authenticator, AuthenticatorRegistry, User};
use crate::config::CoordinatorConfig;
use crate::error::CoordinatorError;
use crate::renderer::{LoginRequest, LoginSelector, RenderConfig, RendererContext, RendererFactory, UiRenderer};
use crate::session::{Clock, SessionStore, StoredSession, SystemClock};
use crate::storage::SessionStorage;

/// Delay before `init` inspects the authenticators, unless configured otherwise
const DEFAULT_INIT_DELAY: Duration = Duration::from_millis(500);

/// Called with the logged-in users after every successful login
pub type UserCallback = Box<dyn Fn(&[Arc<dyn User>]) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub enum SessionPhase {
    Idle,
    AwaitingSelection,
    AwaitingAuthenticatorReady,
    LoggingIn,
    LoggedIn,
    LoggingOut,
    Failed,
}

/// Result of trying to pick up a stored session
#[derive(Debug)]
pub enum ResumeOutcome {
    NoSession,
    /// The stored session had expired; storage was cleared
    Expired,
    /// The stored authenticator is not among the available ones; nothing was changed
    Skipped { authenticator: String },
    Resumed(Vec<Arc<dyn User>>),
}

#[derive(Debug)]
pub enum InitOutcome {
    /// An auto-login authenticator logged in; no UI was built
    AutoLogin(Vec<Arc<dyn User>>),
    /// The selection UI was generated after the resume attempt
    SelectionRendered {
        resume: Result<ResumeOutcome, CoordinatorError>,
    },
}

pub struct SessionCoordinator {
    registry: AuthenticatorRegistry,
    store: SessionStore,
    clock: Arc<dyn Clock>,
    init_delay: Duration,
    render_config: Option<RenderConfig>,
    renderer_factory: Option<RendererFactory>,
    renderer: Option<Box<dyn UiRenderer>>,
    selections: Option<mpsc::Receiver<LoginRequest>>,
    on_users: UserCallback,
    active: Option<Arc<dyn Authenticator>>,
    is_autologin: bool,
    phase: watch::Sender<SessionPhase>,
}

impl SessionCoordinator {
    pub fn new<F>(registry: AuthenticatorRegistry, storage: Arc<dyn SessionStorage>, on_users: F) -> Self
    where
        F: Fn(&[Arc<dyn User>]) + Send + Sync + 'static,
    {
        let (phase, _rx) = watch::channel(SessionPhase::Idle);
        Self {
            registry,
            store: SessionStore::new(storage),
            clock: Arc::new(SystemClock),
            init_delay: DEFAULT_INIT_DELAY,
            render_config: None,
            renderer_factory: None,
            renderer: None,
            selections: None,
            on_users: Box::new(on_users),
            active: None,
            is_autologin: false,
            phase,
        }
    }

    /// Take the startup delay and render configuration from a loaded config
    pub fn with_config(mut self, config: &CoordinatorConfig) -> Self {
        self.init_delay = config.init_delay();
        self.render_config = config.render.clone();
        self
    }

    pub fn with_init_delay(mut self, delay: Duration) -> Self {
        self.init_delay = delay;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_render_config(mut self, config: RenderConfig) -> Self {
        self.render_config = Some(config);
        self
    }

    /// Factory used to build the selection UI when `init` needs one
    pub fn with_renderer_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(RendererContext) -> Box<dyn UiRenderer> + Send + Sync + 'static,
    {
        self.renderer_factory = Some(Box::new(factory));
        self
    }

    pub fn registry(&self) -> &AuthenticatorRegistry {
        &self.registry
    }

    pub fn session_store(&self) -> &SessionStore {
        &self.store
    }

    pub fn active_authenticator(&self) -> Option<&Arc<dyn Authenticator>> {
        self.active.as_ref()
    }

    pub fn is_autologin(&self) -> bool {
        self.is_autologin
    }

    pub fn has_renderer(&self) -> bool {
        self.renderer.is_some()
    }

    pub fn phase(&self) -> SessionPhase {
        *self.phase.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionPhase> {
        self.phase.subscribe()
    }

    fn set_phase(&self, phase: SessionPhase) {
        let previous = self.phase.send_replace(phase);
        if previous != phase {
            debug!(from = ?previous, to = ?phase, "Session phase changed");
        }
    }

    // =========================================================================
    // Startup
    // =========================================================================

    /// Wait for authenticators to register, then auto-login, or resume a stored
    /// session and build the selection UI.
    pub async fn init(&mut self) -> Result<InitOutcome, CoordinatorError> {
        tokio::time::sleep(self.init_delay).await;

        let set = self.registry.authenticators();
        debug!(available = ?set.names(), auto = set.auto_login.is_some(), "Authenticators resolved");

        if let Some(auto) = set.auto_login {
            info!(authenticator = auto.name(), "Logging in with auto login authenticator");
            self.is_autologin = true;
            let users = self.login_user(auto, None).await?;
            return Ok(InitOutcome::AutoLogin(users));
        }

        let resume = self.attempt_session_login(&set.available).await;
        if let Err(ref e) = resume {
            error!(error = %e, "Session resume failed");
        }

        let (Some(config), Some(factory)) = (self.render_config.as_ref(), self.renderer_factory.as_ref()) else {
            return Err(CoordinatorError::MissingRenderConfig);
        };

        let (selector, rx) = LoginSelector::channel();
        let mut renderer = factory(RendererContext {
            selector,
            authenticators: set.available.clone(),
            container_element: config.container_element.clone(),
            button_style_override: config.button_style_override,
        });
        renderer.generate_ui().map_err(CoordinatorError::Render)?;
        self.renderer = Some(renderer);
        self.selections = Some(rx);

        if !matches!(resume, Ok(ResumeOutcome::Resumed(_))) {
            self.set_phase(SessionPhase::AwaitingSelection);
        }

        Ok(InitOutcome::SelectionRendered { resume })
    }

    /// Resume a stored session with one of `authenticators`, if it has not expired
    pub async fn attempt_session_login(
        &mut self,
        authenticators: &[Arc<dyn Authenticator>],
    ) -> Result<ResumeOutcome, CoordinatorError> {
        let record = match self.store.load(self.clock.now())? {
            StoredSession::None => {
                debug!("No stored session");
                return Ok(ResumeOutcome::NoSession);
            }
            StoredSession::Expired => {
                info!("Stored session expired, clearing storage");
                self.store.clear_all()?;
                return Ok(ResumeOutcome::Expired);
            }
            StoredSession::Active(record) => record,
        };

        let Some(authenticator) = authenticators
            .iter()
            .find(|a| a.name() == record.authenticator)
            .cloned()
        else {
            warn!(authenticator = %record.authenticator, "Stored authenticator not available, skipping session resume");
            return Ok(ResumeOutcome::Skipped {
                authenticator: record.authenticator,
            });
        };

        info!(authenticator = %record.authenticator, account = ?record.account_name, "Resuming session");
        let users = self
            .login_user(authenticator, record.account_name.as_deref())
            .await?;
        Ok(ResumeOutcome::Resumed(users))
    }

    // =========================================================================
    // Login / Logout
    // =========================================================================

    /// Log in with `authenticator`, recording the session as soon as the attempt starts.
    ///
    /// On failure the session entries are removed before the error is returned.
    pub async fn login_user(
        &mut self,
        authenticator: Arc<dyn Authenticator>,
        account_name: Option<&str>,
    ) -> Result<Vec<Arc<dyn User>>, CoordinatorError> {
        let account_name = account_name.filter(|name| !name.is_empty());
        self.active = Some(Arc::clone(&authenticator));

        let result = match self.attempt_login(authenticator.as_ref(), account_name).await {
            Ok(users) => {
                info!(authenticator = authenticator.name(), users = users.len(), "Login successful");
                self.set_phase(SessionPhase::LoggedIn);
                (self.on_users)(&users);
                Ok(users)
            }
            Err(e) => {
                match &e {
                    CoordinatorError::Authenticator(auth_err) => error!(
                        authenticator = authenticator.name(),
                        error = %auth_err,
                        cause = %auth_err.cause_display(),
                        "Login failed"
                    ),
                    other => error!(authenticator = authenticator.name(), error = %other, "Login failed"),
                }
                if let Err(clear_err) = self.store.clear_keys() {
                    warn!(error = %clear_err, "Failed to clear session storage after login failure");
                }
                self.set_phase(SessionPhase::Failed);
                Err(e)
            }
        };

        // No UI exists in autologin mode
        if !self.is_autologin {
            if let Some(renderer) = self.renderer.as_mut() {
                renderer.reset();
            }
        }

        result
    }

    async fn attempt_login(
        &self,
        authenticator: &dyn Authenticator,
        account_name: Option<&str>,
    ) -> Result<Vec<Arc<dyn User>>, CoordinatorError> {
        let expires_at = self.clock.now() + authenticator.should_invalidate_after();
        self.store.begin(authenticator.name(), expires_at)?;

        self.set_phase(SessionPhase::AwaitingAuthenticatorReady);
        wait_until_ready(authenticator).await?;

        self.set_phase(SessionPhase::LoggingIn);
        let users = match account_name {
            Some(account) => {
                let users = authenticator.login(Some(account)).await?;
                // Already logged in; a resume without the account name is still possible
                if let Err(e) = self.store.set_account_name(account) {
                    warn!(authenticator = authenticator.name(), error = %e, "Failed to store account name");
                }
                users
            }
            None => authenticator.login(None).await?,
        };
        Ok(users)
    }

    /// Log in with the authenticator registered under `id`
    pub async fn login_with(
        &mut self,
        id: &str,
        account_name: Option<&str>,
    ) -> Result<Vec<Arc<dyn User>>, CoordinatorError> {
        let authenticator = self
            .registry
            .get(id)
            .ok_or_else(|| CoordinatorError::UnknownAuthenticator(id.to_string()))?;
        self.login_user(authenticator, account_name).await
    }

    pub async fn logout_user(&mut self) -> Result<(), CoordinatorError> {
        let Some(authenticator) = self.active.clone() else {
            return Err(CoordinatorError::NoActiveAuthenticator);
        };

        self.set_phase(SessionPhase::LoggingOut);
        let logout = authenticator.logout().await;
        let cleared = self.clear_storage_keys();

        if let Err(e) = logout {
            error!(authenticator = authenticator.name(), error = %e, cause = %e.cause_display(), "Logout failed");
            self.set_phase(SessionPhase::Failed);
            return Err(e.into());
        }
        cleared?;

        info!(authenticator = authenticator.name(), "Logged out");
        self.active = None;
        if self.renderer.is_some() {
            self.set_phase(SessionPhase::AwaitingSelection);
        } else {
            self.set_phase(SessionPhase::Idle);
        }
        Ok(())
    }

    /// Make the stored session's authenticator active without logging in again,
    /// so `logout_user` can reach it. `None` when there is no live session or its
    /// authenticator is not registered.
    pub fn restore_active_authenticator(&mut self) -> Result<Option<Arc<dyn Authenticator>>, CoordinatorError> {
        let StoredSession::Active(record) = self.store.load(self.clock.now())? else {
            return Ok(None);
        };
        let Some(authenticator) = self.registry.get(&record.authenticator) else {
            warn!(authenticator = %record.authenticator, "Stored authenticator not registered");
            return Ok(None);
        };
        debug!(authenticator = %record.authenticator, "Restored active authenticator");
        self.active = Some(Arc::clone(&authenticator));
        Ok(Some(authenticator))
    }

    /// Remove the session entries from storage
    pub fn clear_storage_keys(&self) -> Result<(), CoordinatorError> {
        self.store.clear_keys()?;
        Ok(())
    }

    // =========================================================================
    // Renderer selections
    // =========================================================================

    /// Next login request from the renderer; `None` once the renderer is gone
    /// or was never built.
    pub async fn next_selection(&mut self) -> Option<LoginRequest> {
        self.selections.as_mut()?.recv().await
    }

    pub async fn process_selection(&mut self, request: LoginRequest) -> Result<Vec<Arc<dyn User>>, CoordinatorError> {
        debug!(authenticator = %request.authenticator, "Processing login selection");
        self.login_with(&request.authenticator, request.account_name.as_deref())
            .await
    }

    /// Handle renderer selections until one logs in. Failed attempts are logged and the
    /// renderer stays up for another try. Returns `None` if the renderer closes first.
    pub async fn run_selections(&mut self) -> Option<Vec<Arc<dyn User>>> {
        while let Some(request) = self.next_selection().await {
            match self.process_selection(request).await {
                Ok(users) => return Some(users),
                Err(e) => {
                    warn!(error = %e, "Selected login failed, waiting for another selection");
                    if self.renderer.is_some() {
                        self.set_phase(SessionPhase::AwaitingSelection);
                    }
                }
            }
        }
        None
    }
}
