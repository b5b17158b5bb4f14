use crate::notify_trait::Notifier;
use std::collections::HashMap;
use vigil_core::DeliveryError;

pub struct NotifierRegistry {
    factories: HashMap<String, fn() -> Box<dyn Notifier>>,
}

impl NotifierRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register("file", || Box::new(crate::file_notifier::FileNotifier::new()));
        registry
    }

    pub fn register(&mut self, name: &str, factory: fn() -> Box<dyn Notifier>) {
        self.factories.insert(name.to_string(), factory);
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn Notifier>, DeliveryError> {
        self.factories
            .get(name)
            .map(|f| f())
            .ok_or_else(|| DeliveryError::NotFound(name.to_string()))
    }

    pub fn list_notifiers(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for NotifierRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_new_has_file_notifier() {
        let registry = NotifierRegistry::new();
        let notifier = registry.create("file").unwrap();
        assert_eq!(notifier.name(), "file");
    }

    #[test]
    fn test_registry_create_unknown_returns_error() {
        let registry = NotifierRegistry::new();
        match registry.create("carrier-pigeon") {
            Err(DeliveryError::NotFound(name)) => assert_eq!(name, "carrier-pigeon"),
            _ => panic!("expected NotFound error"),
        }
    }

    #[test]
    fn test_registry_list_notifiers_includes_file() {
        let registry = NotifierRegistry::new();
        assert!(registry.list_notifiers().contains(&"file"));
    }
}
