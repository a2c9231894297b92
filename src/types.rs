//! Type-safe handles for features and constraints.
//!
//! A [`FeatureModel`][crate::model::FeatureModel] stores its features and
//! constraints in flat arenas. These newtypes are indices into those arenas,
//! so a feature id can never be confused with a constraint id or a child
//! position.
use std::fmt;

/// Index of a feature (and its tree node) inside one feature model.
///
/// # Invariants
///
/// - An id is only meaningful for the model that issued it
/// - Ids are never reused while the model lives (until [`reset`][crate::model::FeatureModel::reset])
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FeatureId(usize);

impl FeatureId {
    pub(crate) const fn new(index: usize) -> Self {
        FeatureId(index)
    }

    /// Returns the raw arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}", self.0)
    }
}

impl From<FeatureId> for usize {
    fn from(id: FeatureId) -> Self {
        id.0
    }
}

/// Position of a constraint in the model's ordered constraint list.
///
/// Removing a constraint shifts later ones down, exactly like removing from a `Vec`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ConstraintId(usize);

impl ConstraintId {
    pub(crate) const fn new(index: usize) -> Self {
        ConstraintId(index)
    }

    /// Returns the raw position.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ConstraintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

impl From<ConstraintId> for usize {
    fn from(id: ConstraintId) -> Self {
        id.0
    }
}
