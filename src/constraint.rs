//! Cross-tree constraints.

use std::fmt;

use crate::expr::Expr;
use crate::model::FeatureModel;
use crate::types::FeatureId;

#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    formula: Expr,
    description: Option<String>,
}

impl Constraint {
    pub fn new(formula: Expr) -> Self {
        Self {
            formula,
            description: None,
        }
    }

    pub fn formula(&self) -> &Expr {
        &self.formula
    }

    pub fn formula_mut(&mut self) -> &mut Expr {
        &mut self.formula
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    pub fn mentions(&self, name: &str) -> bool {
        self.formula.contains_literal(name)
    }

    /// Features of `model` named by this constraint, in order of first appearance.
    ///
    /// Literals naming no feature of `model` are skipped.
    pub fn contained_features(&self, model: &FeatureModel) -> Vec<FeatureId> {
        let mut result = Vec::new();
        for name in self.formula.literals() {
            if let Some(id) = model.feature_by_name(name) {
                if !result.contains(&id) {
                    result.push(id);
                }
            }
        }
        result
    }
}

impl From<Expr> for Constraint {
    fn from(formula: Expr) -> Self {
        Constraint::new(formula)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.formula)
    }
}
