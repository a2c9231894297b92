//! Features and their typed attributes.

use std::collections::BTreeMap;
use std::fmt;

use crate::structure::FeatureStructure;
use crate::types::FeatureId;

/// A typed attribute value attached to a feature.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureAttribute {
    Bool(bool),
    Long(i64),
    Double(f64),
    String(String),
}

impl FeatureAttribute {
    pub fn type_name(&self) -> &'static str {
        match self {
            FeatureAttribute::Bool(_) => "boolean",
            FeatureAttribute::Long(_) => "long",
            FeatureAttribute::Double(_) => "double",
            FeatureAttribute::String(_) => "string",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FeatureAttribute::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            FeatureAttribute::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FeatureAttribute::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FeatureAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureAttribute::Bool(b) => write!(f, "{}", b),
            FeatureAttribute::Long(v) => write!(f, "{}", v),
            FeatureAttribute::Double(v) => write!(f, "{}", v),
            FeatureAttribute::String(s) => write!(f, "'{}'", s),
        }
    }
}

/// A named unit of variability together with its tree node.
#[derive(Debug, Clone)]
pub struct Feature {
    id: FeatureId,
    pub(crate) name: String,
    description: Option<String>,
    attributes: BTreeMap<String, FeatureAttribute>,
    pub(crate) structure: FeatureStructure,
}

impl Feature {
    pub(crate) fn new(id: FeatureId, name: String) -> Self {
        Self {
            id,
            name,
            description: None,
            attributes: BTreeMap::new(),
            structure: FeatureStructure::new(id),
        }
    }

    pub fn id(&self) -> FeatureId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    pub fn clear_description(&mut self) {
        self.description = None;
    }

    pub fn attributes(&self) -> &BTreeMap<String, FeatureAttribute> {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&FeatureAttribute> {
        self.attributes.get(key)
    }

    /// Sets an attribute, returning the previous value.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: FeatureAttribute) -> Option<FeatureAttribute> {
        self.attributes.insert(key.into(), value)
    }

    pub fn remove_attribute(&mut self, key: &str) -> Option<FeatureAttribute> {
        self.attributes.remove(key)
    }

    pub fn structure(&self) -> &FeatureStructure {
        &self.structure
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::expr::fmt_name(f, &self.name)
    }
}
