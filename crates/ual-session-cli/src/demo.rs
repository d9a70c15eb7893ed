//! Demo authenticators for trying the login flow without a wallet.
//!
//! Each one pretends to load for a short while before it accepts logins.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::Duration;
use tokio::sync::watch;
use tracing::debug;

use ual_session_core::{
    Authenticator, AuthenticatorError, AuthenticatorRegistry, CoordinatorError, Readiness, User,
};

/// Chain id reported by demo users
const DEMO_CHAIN_ID: &str = "demo-chain";

/// Sessions from demo authenticators stay resumable for one hour
const DEMO_SESSION_SECS: i64 = 3600;

#[derive(Debug)]
pub struct DemoUser {
    account: String,
}

impl User for DemoUser {
    fn account_name(&self) -> &str {
        &self.account
    }

    fn chain_id(&self) -> &str {
        DEMO_CHAIN_ID
    }
}

pub struct DemoAuthenticator {
    name: String,
    readiness: Arc<Readiness>,
    default_account: String,
    auto_login: bool,
    rejects: bool,
}

impl DemoAuthenticator {
    /// Start loading in the background; ready after `load_time`
    pub fn spawn(name: &str, load_time: StdDuration) -> Self {
        let readiness = Arc::new(Readiness::pending());
        let loader = Arc::clone(&readiness);
        let loader_name = name.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(load_time).await;
            debug!(authenticator = %loader_name, "Demo authenticator loaded");
            loader.mark_ready();
        });

        Self {
            name: name.to_string(),
            readiness,
            default_account: format!("{}.demo", name),
            auto_login: false,
            rejects: false,
        }
    }

    pub fn auto_login(mut self) -> Self {
        self.auto_login = true;
        self
    }

    /// Refuse every login, to exercise the failure path
    pub fn rejecting(mut self) -> Self {
        self.rejects = true;
        self
    }
}

#[async_trait]
impl Authenticator for DemoAuthenticator {
    fn name(&self) -> &str {
        &self.name
    }

    fn readiness(&self) -> watch::Receiver<bool> {
        self.readiness.subscribe()
    }

    fn should_invalidate_after(&self) -> Duration {
        Duration::seconds(DEMO_SESSION_SECS)
    }

    fn should_auto_login(&self) -> bool {
        self.auto_login
    }

    async fn login(&self, account_name: Option<&str>) -> Result<Vec<Arc<dyn User>>, AuthenticatorError> {
        if self.rejects {
            return Err(AuthenticatorError::login(format!("{} declined the request", self.name)));
        }
        let account = account_name.unwrap_or(&self.default_account).to_string();
        Ok(vec![Arc::new(DemoUser { account }) as Arc<dyn User>])
    }

    async fn logout(&self) -> Result<(), AuthenticatorError> {
        debug!(authenticator = %self.name, "Demo logout");
        Ok(())
    }
}

/// Registry used by the CLI. With `auto`, an embedded authenticator claims auto-login.
pub fn registry(auto: bool) -> Result<AuthenticatorRegistry, CoordinatorError> {
    let mut authenticators: Vec<Arc<dyn Authenticator>> = vec![
        Arc::new(DemoAuthenticator::spawn("anchor", StdDuration::from_millis(200))),
        Arc::new(DemoAuthenticator::spawn("scatter", StdDuration::from_millis(800))),
        Arc::new(DemoAuthenticator::spawn("ledger", StdDuration::from_millis(400)).rejecting()),
    ];
    if auto {
        authenticators.push(Arc::new(
            DemoAuthenticator::spawn("embedded", StdDuration::ZERO).auto_login(),
        ));
    }
    AuthenticatorRegistry::from_authenticators(authenticators)
}
