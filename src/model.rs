//! The feature model: an arena of features, the tree over them, and the
//! cross-tree constraints.
//!
//! All structural operations live on [`FeatureModel`] because they touch more
//! than one node: a child and its parent must always agree about their edge.
//!
//! # Invariants
//!
//! For every feature `n` with parent `p`:
//!
//! - `p.children` contains `n` exactly once
//! - `n.parent_connection.target == Some(p)`
//! - `p.target_connections` contains `n` exactly once
//!
//! A feature without a parent has no connection target. Operations that would
//! break these rules (adding a node below itself, removing a non-child) are
//! programming errors and panic.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use log::debug;

use crate::constraint::Constraint;
use crate::event::{EventKind, FeatureEvent, FeatureModelListener};
use crate::factory::DEFAULT_FACTORY_ID;
use crate::feature::Feature;
use crate::structure::{FeatureStructure, GroupType};
use crate::types::{ConstraintId, FeatureId};

/// An imported model recorded on its importing model.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ImportedModel {
    pub alias: String,
    pub namespace: String,
}

pub struct FeatureModel {
    features: Vec<Feature>,
    names: HashMap<String, FeatureId>,
    root: Option<FeatureId>,
    constraints: Vec<Constraint>,
    instances: Vec<ImportedModel>,
    source_path: Option<PathBuf>,
    factory_id: String,
    listeners: Vec<Box<dyn FeatureModelListener>>,
}

impl FeatureModel {
    pub fn new() -> Self {
        Self::with_factory_id(DEFAULT_FACTORY_ID)
    }

    pub fn with_factory_id(factory_id: impl Into<String>) -> Self {
        Self {
            features: Vec::new(),
            names: HashMap::new(),
            root: None,
            constraints: Vec::new(),
            instances: Vec::new(),
            source_path: None,
            factory_id: factory_id.into(),
            listeners: Vec::new(),
        }
    }
}

impl Default for FeatureModel {
    fn default() -> Self {
        FeatureModel::new()
    }
}

impl fmt::Debug for FeatureModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureModel")
            .field("features", &self.features.len())
            .field("root", &self.root)
            .field("constraints", &self.constraints.len())
            .field("instances", &self.instances)
            .field("source_path", &self.source_path)
            .field("factory_id", &self.factory_id)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

// Provenance, listeners, reset.
impl FeatureModel {
    pub fn factory_id(&self) -> &str {
        &self.factory_id
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn set_source_path(&mut self, path: impl Into<PathBuf>) {
        self.source_path = Some(path.into());
    }

    pub fn add_listener<L>(&mut self, listener: L)
    where
        L: FeatureModelListener + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    pub fn clear_listeners(&mut self) {
        self.listeners.clear();
    }

    fn fire(&self, feature: FeatureId, kind: EventKind) {
        let event = FeatureEvent::new(feature, kind);
        for listener in &self.listeners {
            listener.on_event(&event);
        }
    }

    /// Drops all features, constraints and imports.
    ///
    /// Provenance, factory id and listeners are kept.
    pub fn reset(&mut self) {
        self.features.clear();
        self.names.clear();
        self.root = None;
        self.constraints.clear();
        self.instances.clear();
    }
}

// Features.
impl FeatureModel {
    /// Creates and registers a new detached feature.
    ///
    /// # Panics
    ///
    /// Panics if a feature with this name already exists.
    pub fn create_feature(&mut self, name: impl Into<String>) -> FeatureId {
        let name = name.into();
        match self.try_create_feature(name.clone()) {
            Some(id) => id,
            None => panic!("Feature '{}' already exists", name),
        }
    }

    /// Creates a new detached feature, or returns `None` if the name is taken.
    pub fn try_create_feature(&mut self, name: impl Into<String>) -> Option<FeatureId> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return None;
        }
        let id = FeatureId::new(self.features.len());
        self.names.insert(name.clone(), id);
        self.features.push(Feature::new(id, name));
        Some(id)
    }

    pub fn feature(&self, id: FeatureId) -> &Feature {
        &self.features[id.index()]
    }

    pub fn feature_mut(&mut self, id: FeatureId) -> &mut Feature {
        &mut self.features[id.index()]
    }

    pub fn feature_by_name(&self, name: &str) -> Option<FeatureId> {
        self.names.get(name).copied()
    }

    pub fn features(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    pub fn num_features(&self) -> usize {
        self.features.len()
    }

    /// Renames a feature and every constraint literal naming it.
    ///
    /// Returns `false` (and changes nothing) if `new_name` is taken by another feature.
    pub fn rename_feature(&mut self, id: FeatureId, new_name: impl Into<String>) -> bool {
        let new_name = new_name.into();
        let old_name = self.feature(id).name.clone();
        if old_name == new_name {
            return true;
        }
        if self.names.contains_key(&new_name) {
            return false;
        }
        self.names.remove(&old_name);
        self.names.insert(new_name.clone(), id);
        self.features[id.index()].name = new_name.clone();
        for constraint in &mut self.constraints {
            constraint.formula_mut().rename_literals(&mut |name: &str| {
                if name == old_name {
                    new_name.clone()
                } else {
                    name.to_string()
                }
            });
        }
        true
    }

    pub fn structure(&self, id: FeatureId) -> &FeatureStructure {
        &self.features[id.index()].structure
    }

    fn structure_mut(&mut self, id: FeatureId) -> &mut FeatureStructure {
        &mut self.features[id.index()].structure
    }

    pub fn root(&self) -> Option<FeatureId> {
        self.root
    }

    /// Installs `id` as the tree root, detaching it from its parent first.
    pub fn set_root(&mut self, id: FeatureId) {
        if let Some(parent) = self.structure(id).parent {
            self.remove_child(parent, id);
        }
        self.root = Some(id);
    }

    /// Features of the subtree rooted at `id`, in pre-order.
    pub fn preorder(&self, id: FeatureId) -> Vec<FeatureId> {
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            result.push(node);
            stack.extend(self.structure(node).children.iter().rev());
        }
        result
    }
}

// Parent/child edges.
impl FeatureModel {
    /// Appends `child` to the children of `parent`.
    ///
    /// A child still attached elsewhere is detached from its old parent first.
    ///
    /// # Panics
    ///
    /// Panics if `child` is `parent`, an ancestor of `parent`, or the model root.
    pub fn add_child(&mut self, parent: FeatureId, child: FeatureId) {
        self.attach(parent, None, child);
        self.fire(parent, EventKind::ChildrenChanged);
    }

    /// Inserts `child` at position `index` among the children of `parent`.
    ///
    /// # Panics
    ///
    /// Same as [`add_child`][Self::add_child], and if `index` is past the end.
    pub fn add_child_at(&mut self, parent: FeatureId, index: usize, child: FeatureId) {
        self.attach(parent, Some(index), child);
        self.fire(parent, EventKind::ChildrenChanged);
    }

    /// Detaches `child` from `parent`.
    ///
    /// # Panics
    ///
    /// Panics if `child` is not a child of `parent`.
    pub fn remove_child(&mut self, parent: FeatureId, child: FeatureId) {
        let index = match self.structure(parent).child_index(child) {
            Some(index) => index,
            None => panic!(
                "Feature '{}' is not a child of '{}'",
                self.feature(child).name(),
                self.feature(parent).name()
            ),
        };
        self.structure_mut(parent).children.remove(index);
        self.connect_parent(child, None);
        self.fire(parent, EventKind::ChildrenChanged);
    }

    pub fn remove_last_child(&mut self, parent: FeatureId) -> Option<FeatureId> {
        let child = self.structure_mut(parent).children.pop()?;
        self.connect_parent(child, None);
        self.fire(parent, EventKind::ChildrenChanged);
        Some(child)
    }

    /// Puts `new_child` at the position of `old_child`, which becomes detached.
    ///
    /// # Panics
    ///
    /// Panics if `old_child` is not a child of `parent`, if `new_child` already is,
    /// or if `new_child` would create a cycle.
    pub fn replace_child(&mut self, parent: FeatureId, old_child: FeatureId, new_child: FeatureId) {
        let index = match self.structure(parent).child_index(old_child) {
            Some(index) => index,
            None => panic!(
                "Feature '{}' is not a child of '{}'",
                self.feature(old_child).name(),
                self.feature(parent).name()
            ),
        };
        assert!(
            self.structure(parent).child_index(new_child).is_none(),
            "Feature '{}' is already a child of '{}'",
            self.feature(new_child).name(),
            self.feature(parent).name()
        );
        self.check_attachable(parent, new_child);
        self.detach_from_old_parent(new_child);
        self.structure_mut(parent).children[index] = new_child;
        self.connect_parent(old_child, None);
        self.connect_parent(new_child, Some(parent));
        self.fire(parent, EventKind::ChildrenChanged);
    }

    /// Replaces all children of `parent` with `children`, in order.
    pub fn set_children(&mut self, parent: FeatureId, children: Vec<FeatureId>) {
        let old = std::mem::take(&mut self.structure_mut(parent).children);
        for child in old {
            self.connect_parent(child, None);
        }
        for child in children {
            self.attach(parent, None, child);
        }
        self.fire(parent, EventKind::ChildrenChanged);
    }

    /// Re-hangs `child` below `new_parent` (appended last), or detaches it for `None`.
    ///
    /// Does nothing if the parent is unchanged.
    pub fn set_parent(&mut self, child: FeatureId, new_parent: Option<FeatureId>) {
        let old_parent = self.structure(child).parent;
        if old_parent == new_parent {
            return;
        }
        match (old_parent, new_parent) {
            (_, Some(parent)) => self.add_child(parent, child),
            (Some(parent), None) => self.remove_child(parent, child),
            (None, None) => {}
        }
    }

    fn check_attachable(&self, parent: FeatureId, child: FeatureId) {
        assert_ne!(
            parent,
            child,
            "Feature '{}' cannot be its own child",
            self.feature(child).name()
        );
        assert!(
            !self.is_ancestor_of(child, parent),
            "Adding '{}' below '{}' would create a cycle",
            self.feature(child).name(),
            self.feature(parent).name()
        );
        assert_ne!(
            self.root,
            Some(child),
            "The root feature '{}' cannot become a child",
            self.feature(child).name()
        );
    }

    fn detach_from_old_parent(&mut self, child: FeatureId) {
        if let Some(old) = self.structure(child).parent {
            self.structure_mut(old).children.retain(|&c| c != child);
            self.fire(old, EventKind::ChildrenChanged);
        }
    }

    fn attach(&mut self, parent: FeatureId, index: Option<usize>, child: FeatureId) {
        self.check_attachable(parent, child);
        self.detach_from_old_parent(child);
        let children = &mut self.structure_mut(parent).children;
        match index {
            Some(index) => {
                assert!(
                    index <= children.len(),
                    "Child index {} out of bounds (0..={})",
                    index,
                    children.len()
                );
                children.insert(index, child);
            }
            None => children.push(child),
        }
        self.connect_parent(child, Some(parent));
    }

    /// Moves the parent connection of `child` to `new_parent`.
    ///
    /// This is the only place where connections and parent pointers change.
    fn connect_parent(&mut self, child: FeatureId, new_parent: Option<FeatureId>) {
        let old_parent = self.structure(child).parent;
        if old_parent == new_parent {
            return;
        }
        if let Some(old) = old_parent {
            self.structure_mut(old).target_connections.retain(|&source| source != child);
            self.structure_mut(child).parent_connection.set_target(None);
        }
        self.structure_mut(child).parent = new_parent;
        if let Some(parent) = new_parent {
            self.structure_mut(child).parent_connection.set_target(Some(parent));
            self.structure_mut(parent).target_connections.push(child);
        }
    }
}

// Group type and flags.
impl FeatureModel {
    pub fn change_to_and(&mut self, id: FeatureId) {
        self.set_and(id);
        self.fire(id, EventKind::ChildrenChanged);
    }

    pub fn change_to_or(&mut self, id: FeatureId) {
        self.set_or(id);
        self.fire(id, EventKind::ChildrenChanged);
    }

    pub fn change_to_alternative(&mut self, id: FeatureId) {
        self.set_alternative(id);
        self.fire(id, EventKind::ChildrenChanged);
    }

    pub fn change_group_type(&mut self, id: FeatureId, group: GroupType) {
        match group {
            GroupType::And => self.change_to_and(id),
            GroupType::Or => self.change_to_or(id),
            GroupType::Alternative => self.change_to_alternative(id),
        }
    }

    /// Makes `id` an AND group without notifying listeners.
    pub fn set_and(&mut self, id: FeatureId) {
        let s = self.structure_mut(id);
        s.and = true;
        s.multiple = false;
    }

    /// Makes `id` an OR group without notifying listeners.
    pub fn set_or(&mut self, id: FeatureId) {
        let s = self.structure_mut(id);
        s.and = false;
        s.multiple = true;
    }

    /// Makes `id` an ALTERNATIVE group without notifying listeners.
    pub fn set_alternative(&mut self, id: FeatureId) {
        let s = self.structure_mut(id);
        s.and = false;
        s.multiple = false;
    }

    pub fn set_and_flag(&mut self, id: FeatureId, and: bool) {
        self.structure_mut(id).and = and;
        self.fire(id, EventKind::ChildrenChanged);
    }

    pub fn set_multiple(&mut self, id: FeatureId, multiple: bool) {
        self.structure_mut(id).multiple = multiple;
        self.fire(id, EventKind::ChildrenChanged);
    }

    pub fn set_mandatory(&mut self, id: FeatureId, mandatory: bool) {
        self.structure_mut(id).mandatory = mandatory;
        self.fire(id, EventKind::MandatoryChanged);
    }

    pub fn set_abstract(&mut self, id: FeatureId, value: bool) {
        self.structure_mut(id).concrete = !value;
        self.fire(id, EventKind::ChildrenChanged);
    }

    pub fn set_hidden(&mut self, id: FeatureId, hidden: bool) {
        self.structure_mut(id).hidden = hidden;
        self.fire(id, EventKind::HiddenChanged);
    }
}

// Queries.
impl FeatureModel {
    pub fn children(&self, id: FeatureId) -> &[FeatureId] {
        &self.structure(id).children
    }

    pub fn parent(&self, id: FeatureId) -> Option<FeatureId> {
        self.structure(id).parent
    }

    pub fn is_root(&self, id: FeatureId) -> bool {
        self.structure(id).is_root()
    }

    pub fn group_type(&self, id: FeatureId) -> GroupType {
        self.structure(id).group_type()
    }

    /// Effective mandatory status.
    ///
    /// The root and every child of an OR or ALTERNATIVE group are mandatory by
    /// group semantics; below an AND group the stored flag decides.
    pub fn is_mandatory(&self, id: FeatureId) -> bool {
        match self.structure(id).parent {
            None => true,
            Some(parent) => !self.structure(parent).is_and() || self.structure(id).mandatory,
        }
    }

    /// `true` iff `ancestor` lies strictly above `node` in the tree.
    pub fn is_ancestor_of(&self, ancestor: FeatureId, node: FeatureId) -> bool {
        let mut current = self.structure(node).parent;
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.structure(p).parent;
        }
        false
    }

    /// `true` if `id` or one of its non-root ancestors is hidden.
    pub fn has_hidden_parent(&self, id: FeatureId) -> bool {
        let s = self.structure(id);
        if s.hidden {
            return true;
        }
        let mut current = s.parent;
        while let Some(p) = current {
            let ps = self.structure(p);
            if ps.is_root() {
                break;
            }
            if ps.hidden {
                return true;
            }
            current = ps.parent;
        }
        false
    }

    pub fn is_and_possible(&self, id: FeatureId) -> bool {
        let s = self.structure(id);
        match s.parent {
            None => false,
            Some(parent) if self.structure(parent).is_and() => false,
            Some(_) => !s.children.iter().any(|&c| self.structure(c).is_and()),
        }
    }

    pub fn is_or_possible(&self, id: FeatureId) -> bool {
        let s = self.structure(id);
        s.children_count() > 1 && !s.is_or()
    }

    pub fn is_alternative_possible(&self, id: FeatureId) -> bool {
        let s = self.structure(id);
        s.children_count() > 1 && !s.is_alternative()
    }

    /// `true` if the node's rule can be written inline, like `Ab [Cd] Ef :: Gh`.
    pub fn has_inline_rule(&self, id: FeatureId) -> bool {
        let s = self.structure(id);
        s.children_count() > 1 && s.and && self.is_mandatory(id) && !s.multiple
    }

    /// Distance from the root (the root has depth 0).
    pub fn depth(&self, id: FeatureId) -> usize {
        let mut depth = 0;
        let mut current = self.structure(id).parent;
        while let Some(p) = current {
            depth += 1;
            current = self.structure(p).parent;
        }
        depth
    }
}

// Constraints and imports.
impl FeatureModel {
    pub fn add_constraint(&mut self, constraint: impl Into<Constraint>) -> ConstraintId {
        self.constraints.push(constraint.into());
        ConstraintId::new(self.constraints.len() - 1)
    }

    /// Removes and returns a constraint; later constraints shift down by one.
    pub fn remove_constraint(&mut self, id: ConstraintId) -> Constraint {
        self.constraints.remove(id.index())
    }

    pub fn constraint(&self, id: ConstraintId) -> &Constraint {
        &self.constraints[id.index()]
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Recomputes which constraints mention the feature `id` (exact name match).
    pub fn set_relevant_constraints(&mut self, id: FeatureId) {
        let name = self.feature(id).name();
        let relevant: Vec<ConstraintId> = self
            .constraints
            .iter()
            .enumerate()
            .filter(|(_, c)| c.mentions(name))
            .map(|(i, _)| ConstraintId::new(i))
            .collect();
        self.structure_mut(id).relevant_constraints = relevant;
    }

    /// Recomputes the relevant constraints of every feature.
    pub fn update_relevant_constraints(&mut self) {
        for index in 0..self.features.len() {
            self.set_relevant_constraints(FeatureId::new(index));
        }
    }

    pub fn relevant_constraints(&self, id: FeatureId) -> Vec<&Constraint> {
        self.structure(id)
            .relevant_constraints
            .iter()
            .filter_map(|c| self.constraints.get(c.index()))
            .collect()
    }

    /// Constraint literals that name no feature of this model, each reported once.
    pub fn dangling_references(&self) -> Vec<String> {
        let mut result: Vec<String> = Vec::new();
        for constraint in &self.constraints {
            for name in constraint.formula().literals() {
                if !self.names.contains_key(name) && !result.iter().any(|r| r == name) {
                    result.push(name.to_string());
                }
            }
        }
        result
    }

    pub fn add_instance(&mut self, alias: impl Into<String>, namespace: impl Into<String>) {
        self.instances.push(ImportedModel {
            alias: alias.into(),
            namespace: namespace.into(),
        });
    }

    pub fn instances(&self) -> &[ImportedModel] {
        &self.instances
    }
}

// Copies.
impl FeatureModel {
    /// Deep-copies the subtree rooted at `id` into `target` and returns the copy's root.
    ///
    /// Features are re-created by name in `target`; descriptions, attributes and
    /// all structural flags are copied. The copied root is left detached.
    ///
    /// # Panics
    ///
    /// Panics if `target` already has a feature with one of the copied names.
    pub fn clone_subtree(&self, id: FeatureId, target: &mut FeatureModel) -> FeatureId {
        let source = self.feature(id);
        let copy = target.create_feature(source.name());
        {
            let feature = target.feature_mut(copy);
            if let Some(description) = source.description() {
                feature.set_description(description);
            }
            for (key, value) in source.attributes() {
                feature.set_attribute(key.clone(), value.clone());
            }
        }
        let (s, t) = (&source.structure, target.structure_mut(copy));
        t.mandatory = s.mandatory;
        t.concrete = s.concrete;
        t.and = s.and;
        t.multiple = s.multiple;
        t.hidden = s.hidden;

        for &child in &s.children {
            let child_copy = self.clone_subtree(child, target);
            target.structure_mut(copy).children.push(child_copy);
            target.connect_parent(child_copy, Some(copy));
        }
        copy
    }

    /// Independent copy of the tree, constraints, imports and provenance.
    ///
    /// Listeners are not copied, nor are features detached from the tree.
    pub fn clone_model(&self) -> FeatureModel {
        let mut copy = FeatureModel::with_factory_id(self.factory_id.clone());
        copy.source_path = self.source_path.clone();
        if let Some(root) = self.root {
            let new_root = self.clone_subtree(root, &mut copy);
            copy.root = Some(new_root);
        }
        copy.constraints = self.constraints.clone();
        copy.instances = self.instances.clone();
        copy.update_relevant_constraints();
        debug!(
            "Cloned model with {} features and {} constraints",
            copy.num_features(),
            copy.num_constraints()
        );
        copy
    }

    /// Asserts the tree invariants for every feature of the model.
    ///
    /// # Panics
    ///
    /// Panics with a description of the first violation found.
    pub fn check_invariants(&self) {
        if let Some(root) = self.root {
            assert!(self.structure(root).parent.is_none(), "Root has a parent");
        }
        for feature in &self.features {
            let id = feature.id();
            let s = &feature.structure;
            assert_eq!(
                s.parent_connection.target(),
                s.parent,
                "Parent connection of '{}' does not target its parent",
                feature.name()
            );
            if let Some(parent) = s.parent {
                let ps = self.structure(parent);
                let count = ps.children.iter().filter(|&&c| c == id).count();
                assert_eq!(count, 1, "'{}' appears {} times among its parent's children", feature.name(), count);
                let count = ps.target_connections.iter().filter(|&&c| c == id).count();
                assert_eq!(count, 1, "'{}' is registered {} times with its parent", feature.name(), count);
            }
            for &child in &s.children {
                assert_eq!(
                    self.structure(child).parent,
                    Some(id),
                    "Child '{}' of '{}' has a different parent",
                    self.feature(child).name(),
                    feature.name()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use test_log::test;

    use super::*;
    use crate::expr::Expr;

    /// Car { Engine, Wheels { Front, Back } }
    fn car() -> (FeatureModel, [FeatureId; 5]) {
        let mut fm = FeatureModel::new();
        let car = fm.create_feature("Car");
        let engine = fm.create_feature("Engine");
        let wheels = fm.create_feature("Wheels");
        let front = fm.create_feature("Front");
        let back = fm.create_feature("Back");
        fm.set_root(car);
        fm.add_child(car, engine);
        fm.add_child(car, wheels);
        fm.add_child(wheels, front);
        fm.add_child(wheels, back);
        (fm, [car, engine, wheels, front, back])
    }

    fn recorder(fm: &mut FeatureModel) -> Rc<RefCell<Vec<FeatureEvent>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        fm.add_listener(move |e: &FeatureEvent| sink.borrow_mut().push(*e));
        events
    }

    #[test]
    fn test_add_child_links_both_sides() {
        let (fm, [car, engine, wheels, front, _]) = car();
        fm.check_invariants();
        assert_eq!(fm.children(car), &[engine, wheels]);
        assert_eq!(fm.parent(front), Some(wheels));
        assert_eq!(fm.structure(front).parent_connection().target(), Some(wheels));
        assert_eq!(fm.structure(wheels).target_connections(), fm.children(wheels));
        assert!(fm.is_root(car));
        assert!(fm.structure(car).source_connections().is_empty());
        assert_eq!(fm.structure(engine).source_connections().len(), 1);
    }

    #[test]
    fn test_add_child_at_position() {
        let (mut fm, [car, engine, wheels, ..]) = car();
        let radio = fm.create_feature("Radio");
        fm.add_child_at(car, 1, radio);
        assert_eq!(fm.children(car), &[engine, radio, wheels]);
        fm.check_invariants();
    }

    #[test]
    fn test_remove_child_severs_connection() {
        let (mut fm, [_, _, wheels, front, back]) = car();
        fm.remove_child(wheels, front);
        assert_eq!(fm.children(wheels), &[back]);
        assert_eq!(fm.parent(front), None);
        assert_eq!(fm.structure(front).parent_connection().target(), None);
        assert_eq!(fm.structure(wheels).target_connections(), &[back]);
        fm.check_invariants();
    }

    #[test]
    fn test_remove_last_child() {
        let (mut fm, [_, _, wheels, front, back]) = car();
        assert_eq!(fm.remove_last_child(wheels), Some(back));
        assert_eq!(fm.remove_last_child(wheels), Some(front));
        assert_eq!(fm.remove_last_child(wheels), None);
        fm.check_invariants();
    }

    #[test]
    fn test_moving_child_detaches_from_old_parent() {
        let (mut fm, [car, engine, wheels, front, back]) = car();
        fm.add_child(engine, front);
        assert_eq!(fm.children(wheels), &[back]);
        assert_eq!(fm.children(engine), &[front]);
        fm.set_parent(back, Some(car));
        assert_eq!(fm.children(car), &[engine, wheels, back]);
        fm.set_parent(back, None);
        assert_eq!(fm.parent(back), None);
        fm.check_invariants();
    }

    #[test]
    fn test_replace_and_set_children() {
        let (mut fm, [car, engine, wheels, front, back]) = car();
        let radio = fm.create_feature("Radio");
        fm.replace_child(car, engine, radio);
        assert_eq!(fm.children(car), &[radio, wheels]);
        assert_eq!(fm.parent(engine), None);
        fm.set_children(wheels, vec![back, engine, front]);
        assert_eq!(fm.children(wheels), &[back, engine, front]);
        fm.check_invariants();
    }

    #[test]
    #[should_panic(expected = "would create a cycle")]
    fn test_cycle_panics() {
        let (mut fm, [_, _, wheels, front, _]) = car();
        fm.add_child(front, wheels);
    }

    #[test]
    #[should_panic(expected = "cannot be its own child")]
    fn test_self_child_panics() {
        let (mut fm, [_, engine, ..]) = car();
        fm.add_child(engine, engine);
    }

    #[test]
    #[should_panic(expected = "is not a child of")]
    fn test_remove_non_child_panics() {
        let (mut fm, [car, _, _, front, _]) = car();
        fm.remove_child(car, front);
    }

    #[test]
    #[should_panic(expected = "already exists")]
    fn test_duplicate_name_panics() {
        let (mut fm, _) = car();
        fm.create_feature("Engine");
    }

    #[test]
    fn test_group_semantics() {
        let (mut fm, [_, _, wheels, front, back]) = car();
        assert!(fm.structure(wheels).is_and());
        assert!(!fm.is_mandatory(front));

        fm.change_to_or(wheels);
        let s = fm.structure(wheels);
        assert!(s.is_or() && !s.is_and() && !s.is_alternative());
        assert!(fm.is_mandatory(front) && fm.is_mandatory(back));
        assert!(!fm.structure(front).is_mandatory_set());

        fm.change_to_alternative(wheels);
        let s = fm.structure(wheels);
        assert!(s.is_alternative() && !s.is_and() && !s.is_or());
        assert_eq!(fm.group_type(wheels), GroupType::Alternative);
        assert!(fm.is_mandatory(front));

        fm.change_to_and(wheels);
        let s = fm.structure(wheels);
        assert!(s.is_and() && !s.is_or() && !s.is_alternative());
        assert!(!fm.is_mandatory(front));
        fm.set_mandatory(front, true);
        assert!(fm.is_mandatory(front));
    }

    #[test]
    fn test_root_is_mandatory() {
        let (fm, [car, ..]) = car();
        assert!(fm.is_mandatory(car));
    }

    #[test]
    fn test_queries() {
        let (mut fm, [car, engine, wheels, front, back]) = car();
        assert!(fm.is_ancestor_of(car, front));
        assert!(fm.is_ancestor_of(wheels, back));
        assert!(!fm.is_ancestor_of(engine, front));
        assert!(!fm.is_ancestor_of(front, front));
        assert_eq!(fm.depth(front), 2);

        assert!(!fm.has_hidden_parent(front));
        fm.set_hidden(wheels, true);
        assert!(fm.has_hidden_parent(front));
        assert!(fm.has_hidden_parent(wheels));
        assert!(!fm.has_hidden_parent(engine));

        // Root is mandatory, AND, and has two children.
        assert!(fm.has_inline_rule(car));
        assert!(!fm.has_inline_rule(wheels));
        fm.set_mandatory(wheels, true);
        assert!(fm.has_inline_rule(wheels));

        assert!(!fm.is_and_possible(car));
        assert!(!fm.is_and_possible(wheels));
        fm.change_to_or(car);
        // Front and Back are still AND nodes.
        assert!(!fm.is_and_possible(wheels));
        fm.change_to_or(front);
        fm.change_to_alternative(back);
        assert!(fm.is_and_possible(wheels));

        assert!(fm.is_or_possible(wheels));
        fm.change_to_or(wheels);
        assert!(!fm.is_or_possible(wheels));
        assert!(fm.is_alternative_possible(wheels));
        assert!(!fm.is_alternative_possible(front));
    }

    #[test]
    fn test_events_are_fired() {
        let (mut fm, [car, engine, wheels, front, _]) = car();
        let events = recorder(&mut fm);

        fm.change_to_or(wheels);
        fm.set_mandatory(engine, true);
        fm.set_hidden(engine, true);
        fm.add_child(engine, front);

        let events = events.borrow();
        assert_eq!(
            *events,
            vec![
                FeatureEvent::new(wheels, EventKind::ChildrenChanged),
                FeatureEvent::new(engine, EventKind::MandatoryChanged),
                FeatureEvent::new(engine, EventKind::HiddenChanged),
                FeatureEvent::new(wheels, EventKind::ChildrenChanged),
                FeatureEvent::new(engine, EventKind::ChildrenChanged),
            ]
        );
        assert!(!events.iter().any(|e| e.feature == car));
    }

    #[test]
    fn test_silent_setters_do_not_fire() {
        let (mut fm, [_, _, wheels, ..]) = car();
        let events = recorder(&mut fm);
        fm.set_or(wheels);
        fm.set_alternative(wheels);
        fm.set_and(wheels);
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn test_relevant_constraints() {
        let (mut fm, [car, engine, wheels, front, _]) = car();
        fm.add_constraint(Expr::implies(Expr::var("Engine"), Expr::var("Wheels")));
        fm.add_constraint(Expr::not(Expr::var("Engine")));
        fm.add_constraint(Expr::var("EngineX"));
        fm.update_relevant_constraints();

        assert_eq!(
            fm.structure(engine).relevant_constraints(),
            &[ConstraintId::new(0), ConstraintId::new(1)]
        );
        assert_eq!(fm.structure(wheels).relevant_constraints(), &[ConstraintId::new(0)]);
        assert!(fm.structure(front).relevant_constraints().is_empty());
        assert!(fm.relevant_constraints(car).is_empty());
        assert_eq!(fm.dangling_references(), vec!["EngineX".to_string()]);
        assert_eq!(fm.constraint(ConstraintId::new(0)).contained_features(&fm), vec![engine, wheels]);

        fm.remove_constraint(ConstraintId::new(0));
        fm.set_relevant_constraints(wheels);
        assert!(fm.structure(wheels).relevant_constraints().is_empty());
    }

    #[test]
    fn test_rename_feature_updates_constraints() {
        let (mut fm, [_, engine, wheels, ..]) = car();
        fm.add_constraint(Expr::implies(Expr::var("Engine"), Expr::var("Wheels")));
        assert!(!fm.rename_feature(engine, "Wheels"));
        assert!(fm.rename_feature(engine, "Motor"));
        assert_eq!(fm.feature_by_name("Motor"), Some(engine));
        assert_eq!(fm.feature_by_name("Engine"), None);
        assert_eq!(fm.constraints()[0].formula().literals(), vec!["Motor", "Wheels"]);
        assert_eq!(fm.feature_by_name("Wheels"), Some(wheels));
    }

    #[test]
    fn test_clone_subtree_into_other_model() {
        let (mut fm, [_, _, wheels, front, _]) = car();
        fm.change_to_alternative(wheels);
        fm.set_abstract(front, true);
        fm.feature_mut(front).set_description("front axle");

        let mut target = FeatureModel::new();
        let copy = fm.clone_subtree(wheels, &mut target);
        target.set_root(copy);
        target.check_invariants();

        assert_eq!(target.num_features(), 3);
        assert_eq!(target.group_type(copy), GroupType::Alternative);
        let names: Vec<&str> = target.children(copy).iter().map(|&c| target.feature(c).name()).collect();
        assert_eq!(names, vec!["Front", "Back"]);
        let front_copy = target.feature_by_name("Front").unwrap();
        assert!(target.structure(front_copy).is_abstract());
        assert_eq!(target.feature(front_copy).description(), Some("front axle"));

        // The copy is independent of the original.
        target.change_to_and(copy);
        assert_eq!(fm.group_type(wheels), GroupType::Alternative);
    }

    #[test]
    fn test_clone_model() {
        let (mut fm, [car, ..]) = car();
        fm.add_constraint(Expr::var("Engine"));
        fm.add_instance("sub", "lib.Sub");
        let copy = fm.clone_model();
        copy.check_invariants();
        assert_eq!(copy.num_features(), 5);
        assert_eq!(copy.num_constraints(), 1);
        assert_eq!(copy.instances(), fm.instances());
        assert_eq!(copy.feature(copy.root().unwrap()).name(), fm.feature(car).name());
        let engine = copy.feature_by_name("Engine").unwrap();
        assert_eq!(copy.structure(engine).relevant_constraints().len(), 1);
    }

    #[test]
    fn test_preorder_and_reset() {
        let (mut fm, [car, engine, wheels, front, back]) = car();
        assert_eq!(fm.preorder(car), vec![car, engine, wheels, front, back]);
        fm.set_source_path("models/car.uvl");
        fm.reset();
        assert_eq!(fm.num_features(), 0);
        assert_eq!(fm.root(), None);
        assert_eq!(fm.source_path(), Some(Path::new("models/car.uvl")));
    }

    #[test]
    fn test_set_root_detaches() {
        let (mut fm, [car, _, wheels, ..]) = car();
        fm.set_root(wheels);
        assert_eq!(fm.root(), Some(wheels));
        assert!(fm.is_root(wheels));
        assert_eq!(fm.children(car).len(), 1);
        fm.check_invariants();
    }
}
