//! Propositional formulas over feature names.
//!
//! Cross-tree constraints are stored as [`Expr`] trees. The set of operators is
//! closed: literal, negation, conjunction, disjunction, implication and
//! equivalence. Formulas are only *held* here, never evaluated.

use std::fmt;

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Expr {
    Literal(String),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Implies(Box<Expr>, Box<Expr>),
    Equals(Box<Expr>, Box<Expr>),
}

/// Operator at the top of a formula, ignoring literal names.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Op {
    Literal,
    Not,
    And,
    Or,
    Implies,
    Equals,
}

impl Expr {
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Literal(name.into())
    }

    // Unlike a simplifying constructor, double negation is kept:
    // the structure of a parsed constraint must survive verbatim.
    pub fn not(value: Self) -> Self {
        Expr::Not(Box::new(value))
    }

    pub fn and(lhs: Self, rhs: Self) -> Self {
        Expr::And(Box::new(lhs), Box::new(rhs))
    }

    pub fn or(lhs: Self, rhs: Self) -> Self {
        Expr::Or(Box::new(lhs), Box::new(rhs))
    }

    pub fn implies(lhs: Self, rhs: Self) -> Self {
        Expr::Implies(Box::new(lhs), Box::new(rhs))
    }

    pub fn equals(lhs: Self, rhs: Self) -> Self {
        Expr::Equals(Box::new(lhs), Box::new(rhs))
    }

    pub fn op(&self) -> Op {
        match self {
            Expr::Literal(_) => Op::Literal,
            Expr::Not(_) => Op::Not,
            Expr::And(_, _) => Op::And,
            Expr::Or(_, _) => Op::Or,
            Expr::Implies(_, _) => Op::Implies,
            Expr::Equals(_, _) => Op::Equals,
        }
    }

    /// Bottom-up fold over the formula.
    ///
    /// `leaf` maps a literal name, `node` combines an operator with the already
    /// folded operands (one for `Not`, two for binary operators).
    pub fn fold<R, L, N>(&self, leaf: &mut L, node: &mut N) -> R
    where
        L: FnMut(&str) -> R,
        N: FnMut(Op, Vec<R>) -> R,
    {
        match self {
            Expr::Literal(name) => leaf(name),
            Expr::Not(a) => {
                let a = a.fold(leaf, node);
                node(Op::Not, vec![a])
            }
            Expr::And(a, b) | Expr::Or(a, b) | Expr::Implies(a, b) | Expr::Equals(a, b) => {
                let a = a.fold(leaf, node);
                let b = b.fold(leaf, node);
                node(self.op(), vec![a, b])
            }
        }
    }

    /// Literal names in pre-order (left to right), duplicates included.
    pub fn literals(&self) -> Vec<&str> {
        let mut result = Vec::new();
        self.collect_literals(&mut result);
        result
    }

    fn collect_literals<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Literal(name) => out.push(name),
            Expr::Not(a) => a.collect_literals(out),
            Expr::And(a, b) | Expr::Or(a, b) | Expr::Implies(a, b) | Expr::Equals(a, b) => {
                a.collect_literals(out);
                b.collect_literals(out);
            }
        }
    }

    pub fn contains_literal(&self, name: &str) -> bool {
        match self {
            Expr::Literal(var) => var == name,
            Expr::Not(a) => a.contains_literal(name),
            Expr::And(a, b) | Expr::Or(a, b) | Expr::Implies(a, b) | Expr::Equals(a, b) => {
                a.contains_literal(name) || b.contains_literal(name)
            }
        }
    }

    /// Returns a copy of this formula with every literal renamed by `f`.
    pub fn map_literals<F>(&self, mut f: F) -> Expr
    where
        F: FnMut(&str) -> String,
    {
        let mut copy = self.clone();
        copy.rename_literals(&mut f);
        copy
    }

    /// Renames literals in place.
    pub fn rename_literals<F>(&mut self, f: &mut F)
    where
        F: FnMut(&str) -> String,
    {
        match self {
            Expr::Literal(name) => *name = f(name),
            Expr::Not(a) => a.rename_literals(f),
            Expr::And(a, b) | Expr::Or(a, b) | Expr::Implies(a, b) | Expr::Equals(a, b) => {
                a.rename_literals(f);
                b.rename_literals(f);
            }
        }
    }

    /// `true` iff both formulas have the same operator tree, whatever the literal names.
    pub fn same_shape(&self, other: &Expr) -> bool {
        match (self, other) {
            (Expr::Literal(_), Expr::Literal(_)) => true,
            (Expr::Not(a), Expr::Not(x)) => a.same_shape(x),
            (Expr::And(a, b), Expr::And(x, y))
            | (Expr::Or(a, b), Expr::Or(x, y))
            | (Expr::Implies(a, b), Expr::Implies(x, y))
            | (Expr::Equals(a, b), Expr::Equals(x, y)) => a.same_shape(x) && b.same_shape(y),
            _ => false,
        }
    }

    pub fn depth(&self) -> usize {
        self.fold(&mut |_| 1, &mut |_, operands: Vec<usize>| 1 + operands.into_iter().max().unwrap_or(0))
    }
}

/// `true` if `name` can be written without quotes in UVL: dot-separated identifiers.
pub fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|segment| {
            let mut chars = segment.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

pub(crate) fn fmt_name(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    if is_plain_name(name) {
        write!(f, "{}", name)
    } else {
        write!(f, "\"{}\"", name)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn operand(f: &mut fmt::Formatter<'_>, e: &Expr) -> fmt::Result {
            match e {
                Expr::Literal(_) | Expr::Not(_) => write!(f, "{}", e),
                _ => write!(f, "({})", e),
            }
        }

        let symbol = match self {
            Expr::Literal(name) => return fmt_name(f, name),
            Expr::Not(a) => {
                write!(f, "!")?;
                return operand(f, a);
            }
            Expr::And(_, _) => "&",
            Expr::Or(_, _) => "|",
            Expr::Implies(_, _) => "=>",
            Expr::Equals(_, _) => "<=>",
        };
        if let Expr::And(a, b) | Expr::Or(a, b) | Expr::Implies(a, b) | Expr::Equals(a, b) = self {
            operand(f, a)?;
            write!(f, " {} ", symbol)?;
            operand(f, b)?;
        }
        Ok(())
    }
}
