use crate::classifier_trait::Classifier;
use std::collections::HashMap;
use vigil_core::ClassifyError;

pub struct ClassifierRegistry {
    factories: HashMap<String, fn() -> Box<dyn Classifier>>,
}

impl ClassifierRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register("null", || {
            Box::new(crate::null_classifier::NullClassifier::new())
        });
        registry.register("energy", || {
            Box::new(crate::energy_classifier::EnergyClassifier::new())
        });
        registry
    }

    pub fn register(&mut self, name: &str, factory: fn() -> Box<dyn Classifier>) {
        self.factories.insert(name.to_string(), factory);
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn Classifier>, ClassifyError> {
        self.factories
            .get(name)
            .map(|f| f())
            .ok_or_else(|| ClassifyError::EngineNotFound(name.to_string()))
    }

    pub fn list_engines(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for ClassifierRegistry {
    fn default() -> Self {
        Self::new()
    }
}
