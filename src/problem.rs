//! Diagnostics reported while reading a feature model.
//!
//! Readers never fail past their boundary: everything that went wrong is
//! collected into a [`ProblemList`] for the caller to render.

use std::fmt;
use std::ops::Index;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Problem {
    pub message: String,
    /// 1-based source line, or 0 when the problem has no location.
    pub line: usize,
    /// 1-based source column, if known.
    pub column: Option<usize>,
    pub severity: Severity,
}

impl Problem {
    pub fn new(message: impl Into<String>, line: usize, severity: Severity) -> Self {
        Self {
            message: message.into(),
            line,
            column: None,
            severity,
        }
    }

    pub fn error(message: impl Into<String>, line: usize) -> Self {
        Self::new(message, line, Severity::Error)
    }

    pub fn warning(message: impl Into<String>, line: usize) -> Self {
        Self::new(message, line, Severity::Warning)
    }

    pub fn with_column(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.severity)?;
        if self.line > 0 {
            write!(f, " (line {}", self.line)?;
            if let Some(column) = self.column {
                write!(f, ", column {}", column)?;
            }
            write!(f, ")")?;
        }
        write!(f, ": {}", self.message)
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ProblemList {
    problems: Vec<Problem>,
}

impl ProblemList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, problem: Problem) {
        self.problems.push(problem);
    }

    pub fn extend(&mut self, other: ProblemList) {
        self.problems.extend(other.problems);
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Problem> {
        self.problems.iter()
    }

    pub fn contains_error(&self) -> bool {
        self.problems.iter().any(|p| p.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Problem> {
        self.problems.iter().filter(|p| p.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Problem> {
        self.problems.iter().filter(|p| p.severity == Severity::Warning)
    }
}

impl Index<usize> for ProblemList {
    type Output = Problem;

    fn index(&self, index: usize) -> &Problem {
        &self.problems[index]
    }
}

impl<'a> IntoIterator for &'a ProblemList {
    type Item = &'a Problem;
    type IntoIter = std::slice::Iter<'a, Problem>;

    fn into_iter(self) -> Self::IntoIter {
        self.problems.iter()
    }
}

impl IntoIterator for ProblemList {
    type Item = Problem;
    type IntoIter = std::vec::IntoIter<Problem>;

    fn into_iter(self) -> Self::IntoIter {
        self.problems.into_iter()
    }
}

impl From<Problem> for ProblemList {
    fn from(problem: Problem) -> Self {
        Self { problems: vec![problem] }
    }
}
