//! Tree node data of a feature.
//!
//! A [`FeatureStructure`] holds everything about a feature's position in the
//! tree: group type, mandatory flag, ordered children, parent and the logical
//! edge to the parent. All mutations go through
//! [`FeatureModel`][crate::model::FeatureModel], which keeps the two sides of
//! every edge consistent.

use std::fmt;

use crate::types::{ConstraintId, FeatureId};

/// Group type of a node, derived from its `(and, multiple)` flags.
///
/// | and   | multiple | group       |
/// |-------|----------|-------------|
/// | true  | false    | AND         |
/// | false | false    | ALTERNATIVE |
/// | false | true     | OR          |
///
/// `(true, true)` is not produced by any operation and reads as AND.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum GroupType {
    And,
    Or,
    Alternative,
}

impl GroupType {
    pub fn from_flags(and: bool, multiple: bool) -> Self {
        match (and, multiple) {
            (true, _) => GroupType::And,
            (false, true) => GroupType::Or,
            (false, false) => GroupType::Alternative,
        }
    }

    /// The `(and, multiple)` pair encoding this group type.
    pub fn flags(self) -> (bool, bool) {
        match self {
            GroupType::And => (true, false),
            GroupType::Or => (false, true),
            GroupType::Alternative => (false, false),
        }
    }
}

impl fmt::Display for GroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupType::And => write!(f, "and"),
            GroupType::Or => write!(f, "or"),
            GroupType::Alternative => write!(f, "alternative"),
        }
    }
}

/// The logical edge from a node to its parent.
///
/// The connection is owned by the child (`source`). The parent only lists the
/// sources of the connections that target it.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FeatureConnection {
    source: FeatureId,
    target: Option<FeatureId>,
}

impl FeatureConnection {
    pub(crate) fn new(source: FeatureId) -> Self {
        Self { source, target: None }
    }

    pub fn source(&self) -> FeatureId {
        self.source
    }

    pub fn target(&self) -> Option<FeatureId> {
        self.target
    }

    pub(crate) fn set_target(&mut self, target: Option<FeatureId>) {
        self.target = target;
    }
}

#[derive(Debug, Clone)]
pub struct FeatureStructure {
    pub(crate) mandatory: bool,
    pub(crate) concrete: bool,
    pub(crate) and: bool,
    pub(crate) multiple: bool,
    pub(crate) hidden: bool,
    pub(crate) children: Vec<FeatureId>,
    pub(crate) parent: Option<FeatureId>,
    pub(crate) parent_connection: FeatureConnection,
    /// Sources of the connections targeting this node (non-owning).
    pub(crate) target_connections: Vec<FeatureId>,
    pub(crate) relevant_constraints: Vec<ConstraintId>,
}

impl FeatureStructure {
    pub(crate) fn new(feature: FeatureId) -> Self {
        Self {
            mandatory: false,
            concrete: true,
            and: true,
            multiple: false,
            hidden: false,
            children: Vec::new(),
            parent: None,
            parent_connection: FeatureConnection::new(feature),
            target_connections: Vec::new(),
            relevant_constraints: Vec::new(),
        }
    }

    pub fn children(&self) -> &[FeatureId] {
        &self.children
    }

    pub fn parent(&self) -> Option<FeatureId> {
        self.parent
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_and(&self) -> bool {
        self.and
    }

    pub fn is_multiple(&self) -> bool {
        self.multiple
    }

    pub fn is_or(&self) -> bool {
        !self.and && self.multiple
    }

    pub fn is_alternative(&self) -> bool {
        !self.and && !self.multiple
    }

    pub fn group_type(&self) -> GroupType {
        GroupType::from_flags(self.and, self.multiple)
    }

    /// The stored mandatory flag, regardless of the parent's group type.
    pub fn is_mandatory_set(&self) -> bool {
        self.mandatory
    }

    pub fn is_concrete(&self) -> bool {
        self.concrete
    }

    pub fn is_abstract(&self) -> bool {
        !self.concrete
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn children_count(&self) -> usize {
        self.children.len()
    }

    pub fn child_index(&self, child: FeatureId) -> Option<usize> {
        self.children.iter().position(|&c| c == child)
    }

    pub fn first_child(&self) -> Option<FeatureId> {
        self.children.first().copied()
    }

    pub fn last_child(&self) -> Option<FeatureId> {
        self.children.last().copied()
    }

    pub fn is_first_child(&self, child: FeatureId) -> bool {
        self.first_child() == Some(child)
    }

    pub fn parent_connection(&self) -> &FeatureConnection {
        &self.parent_connection
    }

    /// Outgoing connections of this node: its parent connection, or nothing for the root.
    pub fn source_connections(&self) -> Vec<FeatureConnection> {
        if self.parent.is_some() {
            vec![self.parent_connection]
        } else {
            Vec::new()
        }
    }

    pub fn target_connections(&self) -> &[FeatureId] {
        &self.target_connections
    }

    pub fn relevant_constraints(&self) -> &[ConstraintId] {
        &self.relevant_constraints
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    #[test]
    fn test_group_type_flags() {
        for group in [GroupType::And, GroupType::Or, GroupType::Alternative] {
            let (and, multiple) = group.flags();
            assert_eq!(GroupType::from_flags(and, multiple), group);
        }
        assert_eq!(GroupType::from_flags(true, true), GroupType::And);
    }

    #[test]
    fn test_new_structure_defaults() {
        let s = FeatureStructure::new(FeatureId::new(0));
        assert!(s.is_and());
        assert!(!s.is_multiple());
        assert!(s.is_concrete());
        assert!(!s.is_hidden());
        assert!(!s.is_mandatory_set());
        assert!(s.is_root());
        assert_eq!(s.parent_connection().source(), FeatureId::new(0));
        assert_eq!(s.parent_connection().target(), None);
        assert!(s.source_connections().is_empty());
    }
}
