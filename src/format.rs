//! Persistent formats that read (and possibly write) feature models.

use std::path::Path;

use thiserror::Error;

use crate::model::FeatureModel;
use crate::problem::ProblemList;

#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum FormatError {
    #[error("format does not support writing")]
    WriteNotSupported,
}

pub trait FeatureModelFormat {
    /// Unique identifier used to assign factories to this format.
    fn id(&self) -> &str;

    /// Human-readable name.
    fn name(&self) -> &str;

    /// File extension, without the dot.
    fn suffix(&self) -> &str;

    fn supports_read(&self) -> bool;

    fn supports_write(&self) -> bool;

    /// Replaces the contents of `model` with the model described by `source`.
    ///
    /// Never fails: syntax errors and other diagnostics end up in the returned list.
    fn read(&mut self, model: &mut FeatureModel, source: &str) -> ProblemList;

    /// Like [`read`](FeatureModelFormat::read), but records `path` as the model's
    /// provenance and resolves imports relative to its directory.
    fn read_with_path(&mut self, model: &mut FeatureModel, source: &str, path: &Path) -> ProblemList;

    fn write(&self, _model: &FeatureModel) -> Result<String, FormatError> {
        Err(FormatError::WriteNotSupported)
    }

    /// Whether `content` looks like this format, i.e. reads without errors.
    fn supports_content(&mut self, content: &str) -> bool {
        let mut scratch = FeatureModel::new();
        !self.read(&mut scratch, content).contains_error()
    }
}
