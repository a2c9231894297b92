//! Resolution of feature references into imported UVL documents.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::{debug, warn};

use crate::problem::{Problem, ProblemList};
use crate::uvl::ast::{FeatureDecl, UvlDocument};
use crate::uvl::parser::parse;

/// Supplies the source text of imported documents.
///
/// The reader itself never touches the file system: whoever reads a model
/// decides where `namespace` lives relative to `base_dir`.
pub trait ImportLoader {
    fn load(&self, namespace: &str, base_dir: &Path) -> Option<String>;
}

impl<F> ImportLoader for F
where
    F: Fn(&str, &Path) -> Option<String>,
{
    fn load(&self, namespace: &str, base_dir: &Path) -> Option<String> {
        self(namespace, base_dir)
    }
}

/// Resolves `alias.name` declarations against imported documents, loading each
/// namespace at most once.
pub(crate) struct Resolver<'a> {
    loader: Option<&'a dyn ImportLoader>,
    base_dir: PathBuf,
    cache: HashMap<String, Result<Rc<UvlDocument>, String>>,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(loader: Option<&'a dyn ImportLoader>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            loader,
            base_dir: base_dir.into(),
            cache: HashMap::new(),
        }
    }

    /// Returns the imported definition for `decl`, or `None` if `decl` is used as is.
    ///
    /// Only bare declarations (no attributes, no groups) whose name starts with
    /// an import alias of `doc` are resolved. Failures are reported as warnings
    /// and leave the declaration untouched.
    pub(crate) fn resolve(
        &mut self,
        decl: &FeatureDecl,
        doc: &UvlDocument,
        problems: &mut ProblemList,
    ) -> Option<FeatureDecl> {
        if !decl.is_reference() || doc.import_for_path(&decl.name).is_none() {
            return None;
        }
        match self.lookup(doc, &decl.name) {
            Ok(mut resolved) => {
                debug!("Resolved '{}' from imported model", decl.name);
                resolved.line = decl.line;
                Some(resolved)
            }
            Err(reason) => {
                warn!("Cannot resolve '{}': {}", decl.name, reason);
                problems.push(Problem::warning(
                    format!("Cannot resolve imported feature '{}': {}", decl.name, reason),
                    decl.line,
                ));
                None
            }
        }
    }

    /// Every hop strips one alias from `path`, so this terminates even for
    /// documents that import each other.
    fn lookup(&mut self, doc: &UvlDocument, path: &str) -> Result<FeatureDecl, String> {
        let import = doc
            .import_for_path(path)
            .ok_or_else(|| format!("no import matches '{}'", path))?;
        let rest = &path[import.alias.len() + 1..];
        let imported = self.load(&import.namespace)?;
        let nested = imported.import_for_path(rest).is_some();
        match imported.find_definition(rest).or_else(|| imported.find_feature(rest)) {
            Some(found) if !(nested && found.is_reference()) => return Ok(found.prefixed(&import.alias)),
            _ => {}
        }
        if nested {
            return self.lookup(&imported, rest).map(|found| found.prefixed(&import.alias));
        }
        Err(format!("feature '{}' not found in imported model '{}'", rest, import.namespace))
    }

    fn load(&mut self, namespace: &str) -> Result<Rc<UvlDocument>, String> {
        if let Some(cached) = self.cache.get(namespace) {
            return cached.clone();
        }
        let result = match self.loader {
            None => Err("no import loader configured".to_string()),
            Some(loader) => match loader.load(namespace, &self.base_dir) {
                None => Err(format!("imported model '{}' could not be loaded", namespace)),
                Some(source) => parse(&source).map(Rc::new).map_err(|e| {
                    format!(
                        "imported model '{}' does not parse (line {}, column {}: {})",
                        namespace, e.line, e.column, e.message
                    )
                }),
            },
        };
        self.cache.insert(namespace.to_string(), result.clone());
        result
    }
}
