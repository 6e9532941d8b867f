use std::collections::HashMap;
use std::sync::Arc;

use crate::checks::handlers::*;
use crate::checks::kind::CheckKind;

/// Kind label to handler lookup, built once at startup and shared.
#[derive(Clone, Default)]
pub struct Registry {
    handlers: HashMap<&'static str, Arc<dyn CheckHandler>>,
}

impl Registry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// All nine built-in kinds.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        for kind in CheckKind::ALL {
            let handler: Arc<dyn CheckHandler> = match kind {
                CheckKind::Connection => Arc::new(ConnectionHandler),
                CheckKind::Stream => Arc::new(StreamHandler),
                CheckKind::Consumer => Arc::new(ConsumerHandler),
                CheckKind::Message => Arc::new(MessageHandler),
                CheckKind::Meta => Arc::new(MetaHandler),
                CheckKind::JetStream => Arc::new(JetStreamHandler),
                CheckKind::Server => Arc::new(ServerHandler),
                CheckKind::Kv => Arc::new(KvHandler),
                CheckKind::Credential => Arc::new(CredentialHandler),
            };
            registry.register(kind.label(), handler);
        }
        registry
    }

    /// Add or replace the handler for `kind`.
    pub fn register(&mut self, kind: &'static str, handler: Arc<dyn CheckHandler>) {
        self.handlers.insert(kind, handler);
    }

    /// Exact, case-sensitive lookup.
    pub fn get(&self, kind: &str) -> Option<Arc<dyn CheckHandler>> {
        self.handlers.get(kind).cloned()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        let mut kinds: Vec<_> = self.handlers.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").field("kinds", &self.kinds()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry_has_all_kinds() {
        let registry = Registry::standard();
        assert_eq!(registry.kinds().len(), 9);
        for kind in CheckKind::ALL {
            assert!(registry.get(kind.label()).is_some(), "{}", kind);
        }
    }

    #[test]
    fn test_lookup_is_exact() {
        let registry = Registry::standard();
        assert!(registry.get("Stream").is_none());
        assert!(registry.get("").is_none());
        assert!(registry.get("bogus").is_none());
    }
}
