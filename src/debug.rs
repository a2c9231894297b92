//! Debug utilities for inspecting feature model structure.
//!
//! These are primarily useful in tests and during development.

use std::fmt;

use crate::expr::fmt_name;
use crate::model::FeatureModel;
use crate::structure::GroupType;
use crate::types::FeatureId;

/// Detailed information about a single feature.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureInfo {
    pub id: FeatureId,
    pub name: String,
    pub parent: Option<FeatureId>,
    /// Distance from the root (0 for the root and detached features)
    pub depth: usize,
    pub group: GroupType,
    pub mandatory: bool,
    pub is_abstract: bool,
    pub hidden: bool,
    pub children: usize,
    /// Number of constraints mentioning this feature
    pub constraints: usize,
}

impl fmt::Display for FeatureInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_name(f, &self.name)?;
        write!(f, " [{}", self.id)?;
        if self.children > 0 {
            write!(f, ", {}", self.group)?;
        }
        if self.mandatory {
            write!(f, ", mandatory")?;
        }
        if self.is_abstract {
            write!(f, ", abstract")?;
        }
        if self.hidden {
            write!(f, ", hidden")?;
        }
        if self.constraints > 0 {
            write!(f, ", constraints={}", self.constraints)?;
        }
        write!(f, "]")
    }
}

/// The features of a model in pre-order, for printing.
#[derive(Debug, Clone)]
pub struct ModelOutline {
    pub root: Option<FeatureId>,
    pub nodes: Vec<FeatureInfo>,
}

impl fmt::Display for ModelOutline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.root {
            Some(root) => writeln!(f, "Feature tree (root = {}):", root)?,
            None => writeln!(f, "Feature tree (no root):")?,
        }
        for node in &self.nodes {
            writeln!(f, "{:indent$}{}", "", node, indent = 2 * (node.depth + 1))?;
        }
        Ok(())
    }
}

impl FeatureModel {
    /// Get detailed information about a single feature.
    pub fn feature_info(&self, id: FeatureId) -> FeatureInfo {
        let structure = self.structure(id);
        FeatureInfo {
            id,
            name: self.feature(id).name().to_string(),
            parent: structure.parent(),
            depth: self.depth(id),
            group: structure.group_type(),
            mandatory: structure.is_mandatory_set(),
            is_abstract: structure.is_abstract(),
            hidden: structure.is_hidden(),
            children: structure.children_count(),
            constraints: self.constraints().iter().filter(|c| c.mentions(self.feature(id).name())).count(),
        }
    }

    /// Outline of the tree under the root, in pre-order.
    pub fn debug_outline(&self) -> ModelOutline {
        let nodes = match self.root() {
            Some(root) => self.preorder(root).into_iter().map(|id| self.feature_info(id)).collect(),
            None => Vec::new(),
        };
        ModelOutline { root: self.root(), nodes }
    }

    /// Compact dump: the outline followed by the constraints.
    pub fn debug_string(&self) -> String {
        let mut result = self.debug_outline().to_string();
        if !self.constraints().is_empty() {
            result.push_str("Constraints:\n");
            for (i, constraint) in self.constraints().iter().enumerate() {
                result.push_str(&format!("  c{}: {}\n", i, constraint));
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::expr::Expr;

    fn model() -> FeatureModel {
        let mut model = FeatureModel::new();
        let car = model.create_feature("Car");
        let engine = model.create_feature("Engine");
        let gas = model.create_feature("Gas");
        let radio = model.create_feature("My Radio");
        model.set_root(car);
        model.add_child(car, engine);
        model.add_child(engine, gas);
        model.add_child(car, radio);
        model.set_abstract(car, true);
        model.set_mandatory(engine, true);
        model.change_to_or(engine);
        model.add_constraint(Expr::implies(Expr::var("My Radio"), Expr::var("Gas")));
        model
    }

    #[test]
    fn test_feature_info() {
        let model = model();
        let engine = model.feature_by_name("Engine").unwrap();
        let info = model.feature_info(engine);
        assert_eq!(info.name, "Engine");
        assert_eq!(info.parent, model.root());
        assert_eq!(info.depth, 1);
        assert_eq!(info.group, GroupType::Or);
        assert!(info.mandatory);
        assert!(!info.is_abstract);
        assert_eq!(info.children, 1);
        assert_eq!(info.constraints, 0);

        let radio = model.feature_by_name("My Radio").unwrap();
        assert_eq!(model.feature_info(radio).constraints, 1);
    }

    #[test]
    fn test_debug_outline() {
        let model = model();
        let outline = model.debug_outline();
        assert_eq!(outline.root, model.root());
        let names: Vec<&str> = outline.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["Car", "Engine", "Gas", "My Radio"]);

        let text = outline.to_string();
        assert!(text.contains("    Engine [f1, or, mandatory]"), "Unexpected outline: {}", text);
        assert!(text.contains("\"My Radio\""), "Unexpected outline: {}", text);
    }

    #[test]
    fn test_debug_string() {
        let model = model();
        let s = model.debug_string();
        assert!(s.contains("Constraints:"));
        assert!(s.contains("c0: \"My Radio\" => Gas"), "Unexpected dump: {}", s);
    }

    #[test]
    fn test_empty_model() {
        let model = FeatureModel::new();
        assert!(model.debug_outline().nodes.is_empty());
        assert_eq!(model.debug_string(), "Feature tree (no root):\n");
    }
}
