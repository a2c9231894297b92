//! Factories that create models, features and constraints, and the explicit
//! policy for what happens when a requested factory is not registered.

use std::collections::HashMap;
use std::rc::Rc;

use log::debug;
use thiserror::Error;

use crate::constraint::Constraint;
use crate::expr::Expr;
use crate::model::FeatureModel;
use crate::types::FeatureId;

pub const DEFAULT_FACTORY_ID: &str = "fm-rs.factory.default";

pub trait FeatureModelFactory {
    fn id(&self) -> &str;

    fn create_feature_model(&self) -> FeatureModel {
        FeatureModel::with_factory_id(self.id())
    }

    /// Creates a feature in `model`, or `None` if the name is already taken.
    fn create_feature(&self, model: &mut FeatureModel, name: &str) -> Option<FeatureId> {
        model.try_create_feature(name)
    }

    fn create_constraint(&self, formula: Expr) -> Constraint {
        Constraint::new(formula)
    }
}

#[derive(Debug, Default, Copy, Clone)]
pub struct DefaultFeatureModelFactory;

impl FeatureModelFactory for DefaultFeatureModelFactory {
    fn id(&self) -> &str {
        DEFAULT_FACTORY_ID
    }
}

/// What to do when a factory id is not registered.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub enum FallbackPolicy {
    /// Silently use the default factory.
    #[default]
    UseDefault,
    /// Report [`FactoryError::NoSuchFactory`].
    Fail,
}

#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum FactoryError {
    #[error("no factory registered with id '{0}'")]
    NoSuchFactory(String),
}

/// Registered factories, plus the assignment of format ids to factory ids.
pub struct FactoryRegistry {
    factories: HashMap<String, Rc<dyn FeatureModelFactory>>,
    assignments: HashMap<String, String>,
    default: Rc<dyn FeatureModelFactory>,
}

impl FactoryRegistry {
    pub fn new() -> Self {
        let default: Rc<dyn FeatureModelFactory> = Rc::new(DefaultFeatureModelFactory);
        let mut factories = HashMap::new();
        factories.insert(default.id().to_string(), Rc::clone(&default));
        Self {
            factories,
            assignments: HashMap::new(),
            default,
        }
    }

    pub fn register(&mut self, factory: Rc<dyn FeatureModelFactory>) {
        self.factories.insert(factory.id().to_string(), factory);
    }

    /// Makes `format_id` use the factory registered as `factory_id`.
    pub fn assign(&mut self, format_id: impl Into<String>, factory_id: impl Into<String>) {
        self.assignments.insert(format_id.into(), factory_id.into());
    }

    pub fn default_factory(&self) -> Rc<dyn FeatureModelFactory> {
        Rc::clone(&self.default)
    }

    pub fn factory_by_id(&self, id: &str) -> Option<Rc<dyn FeatureModelFactory>> {
        self.factories.get(id).cloned()
    }

    /// Looks up a factory by id, applying `policy` if it is missing.
    pub fn resolve(&self, id: &str, policy: FallbackPolicy) -> Result<Rc<dyn FeatureModelFactory>, FactoryError> {
        match (self.factory_by_id(id), policy) {
            (Some(factory), _) => Ok(factory),
            (None, FallbackPolicy::UseDefault) => {
                debug!("No factory '{}', falling back to '{}'", id, self.default.id());
                Ok(self.default_factory())
            }
            (None, FallbackPolicy::Fail) => Err(FactoryError::NoSuchFactory(id.to_string())),
        }
    }

    /// Looks up the factory assigned to a format, applying `policy` if there is none.
    pub fn resolve_for_format(
        &self,
        format_id: &str,
        policy: FallbackPolicy,
    ) -> Result<Rc<dyn FeatureModelFactory>, FactoryError> {
        match self.assignments.get(format_id) {
            Some(factory_id) => self.resolve(factory_id, policy),
            None => self.resolve(format_id, policy),
        }
    }
}

impl Default for FactoryRegistry {
    fn default() -> Self {
        FactoryRegistry::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    struct Named(&'static str);

    impl FeatureModelFactory for Named {
        fn id(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn test_default_factory_creates_models() {
        let factory = DefaultFeatureModelFactory;
        let mut fm = factory.create_feature_model();
        assert_eq!(fm.factory_id(), DEFAULT_FACTORY_ID);
        let a = factory.create_feature(&mut fm, "A");
        assert!(a.is_some());
        assert_eq!(factory.create_feature(&mut fm, "A"), None);
    }

    #[test]
    fn test_fallback_policy() {
        let registry = FactoryRegistry::new();
        let factory = registry.resolve("missing", FallbackPolicy::UseDefault).unwrap();
        assert_eq!(factory.id(), DEFAULT_FACTORY_ID);
        assert_eq!(
            registry.resolve("missing", FallbackPolicy::Fail).err(),
            Some(FactoryError::NoSuchFactory("missing".to_string()))
        );
    }

    #[test]
    fn test_format_assignment() {
        let mut registry = FactoryRegistry::new();
        registry.register(Rc::new(Named("multi")));
        registry.assign("format.uvl", "multi");
        let factory = registry.resolve_for_format("format.uvl", FallbackPolicy::Fail).unwrap();
        assert_eq!(factory.id(), "multi");
        assert_eq!(factory.create_feature_model().factory_id(), "multi");
        assert!(registry.resolve_for_format("format.xml", FallbackPolicy::Fail).is_err());
    }
}
