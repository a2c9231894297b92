//! Syntax errors of the UVL reader.

use thiserror::Error;

use crate::problem::Problem;

/// A syntax error with its location and an excerpt of the offending text.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
#[error("Parse error at line {line}, column {column}: {message}")]
pub struct ParseError {
    /// 1-based line.
    pub line: usize,
    /// 1-based column.
    pub column: usize,
    pub message: String,
    /// The offending source line followed by a caret under the error column.
    pub text: String,
    /// Descriptions of the tokens that would have been accepted.
    pub expected: Vec<String>,
}

impl ParseError {
    pub(crate) fn at(source: &str, line: usize, column: usize, message: impl Into<String>, expected: Vec<String>) -> Self {
        let excerpt = source.lines().nth(line.saturating_sub(1)).unwrap_or("");
        let caret = " ".repeat(column.saturating_sub(1));
        Self {
            line,
            column,
            message: message.into(),
            text: format!("{}\n{}^", excerpt.trim_end(), caret),
            expected,
        }
    }

    /// Renders this error as a diagnostic for the problem list.
    pub fn to_problem(&self) -> Problem {
        let mut message = format!(
            "Parse error at line {}, column {}:\n{}\n{}",
            self.line, self.column, self.message, self.text
        );
        if !self.expected.is_empty() {
            message.push_str("\nExpected one of:\n");
            for token in &self.expected {
                message.push_str(token);
                message.push('\n');
            }
        }
        Problem::error(message, self.line).with_column(self.column)
    }
}
