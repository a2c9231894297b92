//! The Universal Variability Language: lexer, parser, import resolution and
//! translation into a [`FeatureModel`](crate::model::FeatureModel).

pub mod ast;
pub mod error;
pub mod format;
pub mod lexer;
pub mod parser;
pub mod resolve;

pub use ast::UvlDocument;
pub use error::ParseError;
pub use format::{UvlConfig, UvlFormat, UVL_FORMAT_ID};
pub use parser::parse;
pub use resolve::ImportLoader;
