//! Structural-change notifications.
//!
//! Every mutation of the feature tree that a presentation layer may care about
//! raises a [`FeatureEvent`]. Listeners are called synchronously, on the call
//! stack of the mutating operation, in registration order.

use crate::types::FeatureId;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum EventKind {
    /// Children were added, removed or reordered, or the group type changed.
    ChildrenChanged,
    MandatoryChanged,
    HiddenChanged,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct FeatureEvent {
    /// The feature whose node was mutated (for child changes: the parent).
    pub feature: FeatureId,
    pub kind: EventKind,
}

impl FeatureEvent {
    pub fn new(feature: FeatureId, kind: EventKind) -> Self {
        Self { feature, kind }
    }
}

pub trait FeatureModelListener {
    fn on_event(&self, event: &FeatureEvent);
}

impl<F> FeatureModelListener for F
where
    F: Fn(&FeatureEvent),
{
    fn on_event(&self, event: &FeatureEvent) {
        self(event)
    }
}
