//! # fm-rs: Feature Models in Rust
//!
//! **`fm-rs`** is a library for working with **feature models**: trees of
//! product features annotated with group semantics (and, or, alternative),
//! mandatory/abstract/hidden flags, and cross-tree propositional constraints.
//!
//! ## Key Features
//!
//! - **Model-Centric Architecture**: All structural edits go through the [`FeatureModel`][crate::model::FeatureModel], which owns every feature in an arena and keeps parent, child and connection bookkeeping consistent.
//! - **Lightweight Handles**: Features are addressed by copyable [`FeatureId`][crate::types::FeatureId] indices.
//! - **UVL Reader**: The [`uvl`] module reads the Universal Variability Language, including imports of other models, and reports diagnostics instead of failing.
//! - **Anonymization**: The [`obfuscator`] replaces every name and description by a salted SHA-256 pseudonym while keeping the structure and the constraints intact.
//!
//! ## Basic Usage
//!
//! ```rust
//! use fm_rs::format::FeatureModelFormat;
//! use fm_rs::model::FeatureModel;
//! use fm_rs::obfuscator::FeatureModelObfuscator;
//! use fm_rs::uvl::UvlFormat;
//!
//! let source = "
//! features
//!     Car {abstract}
//!         mandatory
//!             Engine
//!         optional
//!             Radio
//! constraints
//!     Radio => Engine
//! ";
//!
//! // 1. Read the model
//! let mut model = FeatureModel::new();
//! let problems = UvlFormat::new().read(&mut model, source);
//! assert!(problems.is_empty());
//!
//! // 2. Inspect it
//! let car = model.root().unwrap();
//! assert_eq!(model.feature(car).name(), "Car");
//! assert_eq!(model.children(car).len(), 2);
//!
//! // 3. Anonymize it
//! let anonymized = FeatureModelObfuscator::new(&model).execute().unwrap();
//! assert_eq!(anonymized.num_features(), 3);
//! assert!(anonymized.feature(anonymized.root().unwrap()).name().starts_with("F_"));
//! ```
//!
//! ## Core Components
//!
//! - **[`model`]**: The [`FeatureModel`][crate::model::FeatureModel] arena and all tree operations.
//! - **[`expr`]** and **[`constraint`]**: Propositional formulas over feature names.
//! - **[`uvl`]**: Lexer, parser and translator for UVL text.
//! - **[`obfuscator`]**: Structure-preserving anonymization.

pub mod constraint;
pub mod debug;
pub mod event;
pub mod expr;
pub mod factory;
pub mod feature;
pub mod format;
pub mod model;
pub mod obfuscator;
pub mod problem;
pub mod structure;
pub mod types;
pub mod uvl;
