use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::Authenticator;
use crate::error::CoordinatorError;

/// Authenticators handed out by the registry for one `init` pass
#[derive(Clone, Default)]
pub struct AuthenticatorSet {
    /// Authenticators that should be offered for selection
    pub available: Vec<Arc<dyn Authenticator>>,
    /// The one authenticator that logs in without a selection, if any
    pub auto_login: Option<Arc<dyn Authenticator>>,
}

impl AuthenticatorSet {
    pub fn names(&self) -> Vec<&str> {
        self.available.iter().map(|a| a.name()).collect()
    }
}

/// Authenticators keyed by their stable identifier, in registration order
#[derive(Clone, Default)]
pub struct AuthenticatorRegistry {
    entries: Vec<Arc<dyn Authenticator>>,
    by_id: HashMap<String, usize>,
}

impl AuthenticatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a list, rejecting duplicate identifiers
    pub fn from_authenticators(
        authenticators: impl IntoIterator<Item = Arc<dyn Authenticator>>,
    ) -> Result<Self, CoordinatorError> {
        let mut registry = Self::new();
        for authenticator in authenticators {
            registry.register(authenticator)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, authenticator: Arc<dyn Authenticator>) -> Result<(), CoordinatorError> {
        let id = authenticator.name().to_string();
        if self.by_id.contains_key(&id) {
            return Err(CoordinatorError::DuplicateAuthenticator(id));
        }
        debug!(authenticator = %id, "Registered authenticator");
        self.by_id.insert(id, self.entries.len());
        self.entries.push(authenticator);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Authenticator>> {
        self.by_id.get(id).map(|&idx| Arc::clone(&self.entries[idx]))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Authenticator>> {
        self.entries.iter()
    }

    /// Split registered authenticators into the selectable list and the auto-login choice.
    ///
    /// Auto-login only happens when exactly one authenticator asks for it.
    pub fn authenticators(&self) -> AuthenticatorSet {
        let available: Vec<_> = self
            .entries
            .iter()
            .filter(|a| a.should_render())
            .cloned()
            .collect();

        let mut auto_candidates = self.entries.iter().filter(|a| a.should_auto_login());
        let auto_login = match (auto_candidates.next(), auto_candidates.next()) {
            (Some(only), None) => Some(Arc::clone(only)),
            _ => None,
        };

        AuthenticatorSet {
            available,
            auto_login,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockAuthenticator;

    fn registry(auths: Vec<MockAuthenticator>) -> AuthenticatorRegistry {
        AuthenticatorRegistry::from_authenticators(
            auths.into_iter().map(|a| Arc::new(a) as Arc<dyn Authenticator>),
        )
        .expect("unique names")
    }

    #[test]
    fn test_lookup_by_id() {
        let reg = registry(vec![MockAuthenticator::new("anchor"), MockAuthenticator::new("scatter")]);
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.get("scatter").map(|a| a.name().to_string()), Some("scatter".to_string()));
        assert!(reg.get("Scatter").is_none());
    }

    #[test]
    fn test_duplicate_rejected() {
        let result = AuthenticatorRegistry::from_authenticators(vec![
            Arc::new(MockAuthenticator::new("anchor")) as Arc<dyn Authenticator>,
            Arc::new(MockAuthenticator::new("anchor")) as Arc<dyn Authenticator>,
        ]);
        assert!(matches!(result, Err(CoordinatorError::DuplicateAuthenticator(id)) if id == "anchor"));
    }

    #[test]
    fn test_set_keeps_registration_order() {
        let reg = registry(vec![
            MockAuthenticator::new("ledger"),
            MockAuthenticator::new("anchor").hidden(),
            MockAuthenticator::new("scatter"),
        ]);
        let set = reg.authenticators();
        assert_eq!(set.names(), vec!["ledger", "scatter"]);
        assert!(set.auto_login.is_none());
    }

    #[test]
    fn test_single_auto_login_selected() {
        let reg = registry(vec![
            MockAuthenticator::new("anchor"),
            MockAuthenticator::new("embedded").auto_login(),
        ]);
        let set = reg.authenticators();
        assert_eq!(set.auto_login.map(|a| a.name().to_string()), Some("embedded".to_string()));
    }

    #[test]
    fn test_multiple_auto_login_ignored() {
        let reg = registry(vec![
            MockAuthenticator::new("one").auto_login(),
            MockAuthenticator::new("two").auto_login(),
        ]);
        assert!(reg.authenticators().auto_login.is_none());
    }
}
