//! Test doubles shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::watch;

use crate::authenticator::{Authenticator, AuthenticatorError, Readiness, User};
use crate::error::StorageError;
use crate::storage::{MemoryStorage, SessionStorage};
use crate::renderer::{LoginSelector, RendererContext, UiRenderer};
use crate::session::Clock;

#[derive(Debug)]
pub(crate) struct MockUser {
    account: String,
}

impl User for MockUser {
    fn account_name(&self) -> &str {
        &self.account
    }

    fn chain_id(&self) -> &str {
        "test-chain"
    }
}

pub(crate) struct MockAuthenticator {
    name: String,
    readiness: Mutex<Option<Arc<Readiness>>>,
    rx: watch::Receiver<bool>,
    invalidate_after: Duration,
    auto_login: bool,
    render: bool,
    users: Vec<String>,
    login_error: Option<String>,
    logout_error: Option<String>,
    login_calls: Mutex<Vec<Option<String>>>,
    logout_calls: AtomicUsize,
}

impl MockAuthenticator {
    fn build(name: &str, readiness: Readiness) -> Self {
        let rx = readiness.subscribe();
        Self {
            name: name.to_string(),
            readiness: Mutex::new(Some(Arc::new(readiness))),
            rx,
            invalidate_after: Duration::hours(1),
            auto_login: false,
            render: true,
            users: vec!["tester".to_string()],
            login_error: None,
            logout_error: None,
            login_calls: Mutex::new(Vec::new()),
            logout_calls: AtomicUsize::new(0),
        }
    }

    /// Already loaded
    pub(crate) fn new(name: &str) -> Self {
        Self::build(name, Readiness::ready())
    }

    /// Still loading until `readiness_handle().mark_ready()`
    pub(crate) fn loading(name: &str) -> Self {
        Self::build(name, Readiness::pending())
    }

    pub(crate) fn auto_login(mut self) -> Self {
        self.auto_login = true;
        self
    }

    pub(crate) fn hidden(mut self) -> Self {
        self.render = false;
        self
    }

    pub(crate) fn invalidate_after_secs(mut self, secs: i64) -> Self {
        self.invalidate_after = Duration::seconds(secs);
        self
    }

    pub(crate) fn with_users(mut self, accounts: &[&str]) -> Self {
        self.users = accounts.iter().map(|a| a.to_string()).collect();
        self
    }

    pub(crate) fn failing_login(mut self, message: &str) -> Self {
        self.login_error = Some(message.to_string());
        self
    }

    pub(crate) fn failing_logout(mut self, message: &str) -> Self {
        self.logout_error = Some(message.to_string());
        self
    }

    pub(crate) fn readiness_handle(&self) -> Arc<Readiness> {
        self.readiness
            .lock()
            .unwrap()
            .clone()
            .expect("readiness already dropped")
    }

    /// Drop the readiness sender without ever becoming ready
    pub(crate) fn drop_readiness(&self) {
        self.readiness.lock().unwrap().take();
    }

    pub(crate) fn login_calls(&self) -> Vec<Option<String>> {
        self.login_calls.lock().unwrap().clone()
    }

    pub(crate) fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Authenticator for MockAuthenticator {
    fn name(&self) -> &str {
        &self.name
    }

    fn readiness(&self) -> watch::Receiver<bool> {
        self.rx.clone()
    }

    fn should_invalidate_after(&self) -> Duration {
        self.invalidate_after
    }

    fn should_auto_login(&self) -> bool {
        self.auto_login
    }

    fn should_render(&self) -> bool {
        self.render
    }

    async fn login(&self, account_name: Option<&str>) -> Result<Vec<Arc<dyn User>>, AuthenticatorError> {
        self.login_calls
            .lock()
            .unwrap()
            .push(account_name.map(str::to_string));
        if let Some(ref message) = self.login_error {
            return Err(AuthenticatorError::login(message.clone()));
        }
        Ok(self
            .users
            .iter()
            .map(|account| Arc::new(MockUser { account: account.clone() }) as Arc<dyn User>)
            .collect())
    }

    async fn logout(&self) -> Result<(), AuthenticatorError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        match self.logout_error {
            Some(ref message) => Err(AuthenticatorError::logout(message.clone())),
            None => Ok(()),
        }
    }
}

/// Records what the coordinator asked of the renderer
#[derive(Default)]
pub(crate) struct RendererProbe {
    generated: AtomicUsize,
    resets: AtomicUsize,
    authenticators: Mutex<Vec<String>>,
    container: Mutex<String>,
    selector: Mutex<Option<LoginSelector>>,
}

impl RendererProbe {
    pub(crate) fn factory(
        probe: &Arc<Self>,
    ) -> impl Fn(RendererContext) -> Box<dyn UiRenderer> + Send + Sync + 'static {
        let probe = Arc::clone(probe);
        move |ctx: RendererContext| {
            *probe.authenticators.lock().unwrap() =
                ctx.authenticators.iter().map(|a| a.name().to_string()).collect();
            *probe.container.lock().unwrap() = ctx.container_element.clone();
            *probe.selector.lock().unwrap() = Some(ctx.selector);
            Box::new(RecordingRenderer {
                probe: Arc::clone(&probe),
            }) as Box<dyn UiRenderer>
        }
    }

    pub(crate) fn generated(&self) -> usize {
        self.generated.load(Ordering::SeqCst)
    }

    pub(crate) fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    pub(crate) fn authenticators(&self) -> Vec<String> {
        self.authenticators.lock().unwrap().clone()
    }

    pub(crate) fn container(&self) -> String {
        self.container.lock().unwrap().clone()
    }

    pub(crate) fn selector(&self) -> Option<LoginSelector> {
        self.selector.lock().unwrap().clone()
    }

    pub(crate) fn drop_selector(&self) {
        self.selector.lock().unwrap().take();
    }
}

struct RecordingRenderer {
    probe: Arc<RendererProbe>,
}

impl UiRenderer for RecordingRenderer {
    fn generate_ui(&mut self) -> std::io::Result<()> {
        self.probe.generated.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn reset(&mut self) {
        self.probe.resets.fetch_add(1, Ordering::SeqCst);
    }
}

pub(crate) struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub(crate) fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub(crate) fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Memory storage that refuses writes to one key
pub(crate) struct RefusingStorage {
    inner: MemoryStorage,
    refused_key: String,
}

impl RefusingStorage {
    pub(crate) fn new(refused_key: &str) -> Self {
        Self {
            inner: MemoryStorage::new(),
            refused_key: refused_key.to_string(),
        }
    }
}

impl SessionStorage for RefusingStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if key == self.refused_key {
            return Err(StorageError::Io(std::io::Error::other("disk full")));
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key)
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.inner.clear()
    }
}
