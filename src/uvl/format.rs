//! Reading UVL text into a [`FeatureModel`].

use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::rc::Rc;

use log::{debug, warn};

use crate::expr::Expr;
use crate::factory::{FactoryRegistry, FallbackPolicy, FeatureModelFactory, DEFAULT_FACTORY_ID};
use crate::feature::FeatureAttribute;
use crate::format::FeatureModelFormat;
use crate::model::FeatureModel;
use crate::problem::{Problem, ProblemList};
use crate::types::FeatureId;
use crate::uvl::ast::{AttributeValue, ConstraintExpr, FeatureDecl, GroupDecl, GroupKind, UvlDocument};
use crate::uvl::parser::parse;
use crate::uvl::resolve::{ImportLoader, Resolver};

pub const UVL_FORMAT_ID: &str = "fm-rs.format.fm.uvl";
pub const UVL_SUFFIX: &str = "uvl";

/// Name of the feature that becomes the root when a document does not declare exactly one.
pub const SYNTHETIC_ROOT: &str = "Root";

#[derive(Debug, Default, Clone)]
pub struct UvlConfig {
    /// What to do if no factory is registered for this format (default: use the default factory).
    pub fallback: FallbackPolicy,
}

impl UvlConfig {
    pub fn with_fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.fallback = fallback;
        self
    }
}

/// The UVL format: read-only.
pub struct UvlFormat {
    config: UvlConfig,
    registry: FactoryRegistry,
    loader: Option<Box<dyn ImportLoader>>,
    document: Option<UvlDocument>,
}

impl Default for UvlFormat {
    fn default() -> Self {
        UvlFormat::new()
    }
}

impl UvlFormat {
    pub fn new() -> Self {
        let mut registry = FactoryRegistry::new();
        registry.assign(UVL_FORMAT_ID, DEFAULT_FACTORY_ID);
        Self {
            config: UvlConfig::default(),
            registry,
            loader: None,
            document: None,
        }
    }

    pub fn with_config(mut self, config: UvlConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_registry(mut self, registry: FactoryRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_loader<L>(mut self, loader: L) -> Self
    where
        L: ImportLoader + 'static,
    {
        self.loader = Some(Box::new(loader));
        self
    }

    pub fn config(&self) -> &UvlConfig {
        &self.config
    }

    pub fn registry_mut(&mut self) -> &mut FactoryRegistry {
        &mut self.registry
    }

    /// The document produced by the last successful read.
    pub fn document(&self) -> Option<&UvlDocument> {
        self.document.as_ref()
    }

    fn read_from(&mut self, model: &mut FeatureModel, source: &str, base_dir: &Path) -> ProblemList {
        let mut problems = ProblemList::new();
        match parse(source) {
            Ok(document) => {
                self.construct(model, &document, base_dir, &mut problems);
                self.document = Some(document);
            }
            Err(e) => {
                debug!("UVL syntax error at {}:{}: {}", e.line, e.column, e.message);
                problems.push(e.to_problem());
            }
        }
        problems
    }

    fn construct(&self, model: &mut FeatureModel, doc: &UvlDocument, base_dir: &Path, problems: &mut ProblemList) {
        let factory = match self.registry.resolve_for_format(UVL_FORMAT_ID, self.config.fallback) {
            Ok(factory) => factory,
            Err(e) => {
                problems.push(Problem::error(e.to_string(), 1));
                return;
            }
        };
        model.reset();

        let mut builder = Builder {
            model,
            factory,
            doc,
            resolver: Resolver::new(self.loader.as_deref(), base_dir),
            problems,
            expanded: HashSet::new(),
        };
        builder.root();
        for decl in &doc.constraints {
            builder.constraint(&decl.expr, decl.line);
        }
        for import in &doc.imports {
            builder.model.add_instance(import.alias.as_str(), import.namespace.as_str());
        }
        builder.model.update_relevant_constraints();

        debug!(
            "Constructed feature model: {} features, {} constraints, {} imports",
            builder.model.num_features(),
            builder.model.num_constraints(),
            builder.model.instances().len()
        );
    }
}

impl FeatureModelFormat for UvlFormat {
    fn id(&self) -> &str {
        UVL_FORMAT_ID
    }

    fn name(&self) -> &str {
        "UVL"
    }

    fn suffix(&self) -> &str {
        UVL_SUFFIX
    }

    fn supports_read(&self) -> bool {
        true
    }

    fn supports_write(&self) -> bool {
        false
    }

    fn read(&mut self, model: &mut FeatureModel, source: &str) -> ProblemList {
        match model.source_path().map(Path::to_path_buf) {
            Some(path) => self.read_with_path(model, source, &path),
            None => {
                warn!("No path set for model. Can't load imported models.");
                self.read_from(model, source, Path::new("."))
            }
        }
    }

    fn read_with_path(&mut self, model: &mut FeatureModel, source: &str, path: &Path) -> ProblemList {
        model.set_source_path(path);
        let base_dir = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        self.read_from(model, source, &base_dir)
    }
}

/// Translation state for one document.
struct Builder<'a> {
    model: &'a mut FeatureModel,
    factory: Rc<dyn FeatureModelFactory>,
    doc: &'a UvlDocument,
    resolver: Resolver<'a>,
    problems: &'a mut ProblemList,
    /// Names whose local definition was already expanded at a reference.
    expanded: HashSet<String>,
}

impl Builder<'_> {
    fn root(&mut self) {
        let doc = self.doc;
        // Root definitions that are referenced elsewhere get placed at the reference.
        let mut declarations: Vec<&FeatureDecl> = doc
            .root_features
            .iter()
            .filter(|decl| decl.is_reference() || !doc.is_referenced_elsewhere(decl))
            .collect();
        if declarations.is_empty() {
            declarations = doc.root_features.iter().collect();
        }
        let root = match declarations.as_slice() {
            [single] => self.feature(single),
            declarations => {
                let root = self.factory.create_feature(self.model, SYNTHETIC_ROOT);
                if let Some(root) = root {
                    for decl in declarations {
                        if let Some(child) = self.feature(decl) {
                            self.model.add_child(root, child);
                        }
                    }
                }
                root
            }
        };
        if let Some(root) = root {
            self.model.set_root(root);
        }
    }

    fn feature(&mut self, decl: &FeatureDecl) -> Option<FeatureId> {
        let doc = self.doc;
        if self.expanded.contains(&decl.name)
            && doc.find_definition(&decl.name).is_some_and(|d| std::ptr::eq(d, decl))
        {
            debug!("Skipping definition of '{}' on line {}: already expanded", decl.name, decl.line);
            return None;
        }
        let resolved = self
            .resolver
            .resolve(decl, self.doc, self.problems)
            .or_else(|| self.local_definition(decl));
        let decl = resolved.as_ref().unwrap_or(decl);

        let Some(id) = self.factory.create_feature(self.model, &decl.name) else {
            self.problems
                .push(Problem::error(format!("Duplicate feature name '{}'", decl.name), decl.line));
            return None;
        };
        self.model.set_abstract(id, decl.is_abstract());
        self.attributes(id, decl);
        for group in &decl.groups {
            self.group(id, group);
        }
        Some(id)
    }

    /// Expands a bare reference from the first full definition of the same name,
    /// unless that feature is already in the model.
    fn local_definition(&mut self, decl: &FeatureDecl) -> Option<FeatureDecl> {
        if !decl.is_reference() || self.model.feature_by_name(&decl.name).is_some() {
            return None;
        }
        let doc = self.doc;
        let definition = doc.find_definition(&decl.name)?;
        debug!(
            "Expanding '{}' on line {} from its definition on line {}",
            decl.name, decl.line, definition.line
        );
        self.expanded.insert(decl.name.clone());
        Some(definition.clone())
    }

    fn attributes(&mut self, id: FeatureId, decl: &FeatureDecl) {
        for (key, value) in &decl.attributes {
            let attribute = match (key.as_str(), value) {
                ("abstract", _) => continue,
                ("description", AttributeValue::Str(text)) => {
                    self.model.feature_mut(id).set_description(text.as_str());
                    continue;
                }
                ("hidden", AttributeValue::Bool(hidden)) => {
                    self.model.set_hidden(id, *hidden);
                    continue;
                }
                (_, AttributeValue::Bool(b)) => FeatureAttribute::Bool(*b),
                (_, AttributeValue::Int(n)) => FeatureAttribute::Long(*n),
                (_, AttributeValue::Float(x)) => FeatureAttribute::Double(*x),
                (_, AttributeValue::Str(s)) => FeatureAttribute::String(s.clone()),
                (_, AttributeValue::Attributes(_) | AttributeValue::Vector(_)) => {
                    debug!("Skipping compound attribute '{}' of '{}'", key, decl.name);
                    continue;
                }
            };
            self.model.feature_mut(id).set_attribute(key.as_str(), attribute);
        }
    }

    fn group(&mut self, parent: FeatureId, group: &GroupDecl) {
        let mut children = Vec::with_capacity(group.children.len());
        for decl in &group.children {
            if let Some(child) = self.feature(decl) {
                self.model.add_child(parent, child);
                children.push(child);
            }
        }
        match &group.kind {
            GroupKind::Keyword(k) if k == "or" => self.model.set_or(parent),
            GroupKind::Keyword(k) if k == "alternative" => self.model.set_alternative(parent),
            GroupKind::Keyword(k) if k == "optional" => {}
            GroupKind::Keyword(k) if k == "mandatory" => {
                for child in children {
                    self.model.set_mandatory(child, true);
                }
            }
            kind => {
                self.problems.push(Problem::warning(
                    format!(
                        "Unsupported group type '{}' of feature '{}'; its children are kept as optional features",
                        kind.keyword(),
                        self.model.feature(parent).name()
                    ),
                    group.line,
                ));
            }
        }
    }

    fn constraint(&mut self, expr: &ConstraintExpr, line: usize) {
        let formula = to_expr(expr);
        let unknown: BTreeSet<&str> = formula
            .literals()
            .into_iter()
            .filter(|name| self.model.feature_by_name(name).is_none())
            .collect();
        for name in unknown {
            self.problems.push(Problem::warning(
                format!("Constraint references unknown feature '{}'", name),
                line,
            ));
        }
        let constraint = self.factory.create_constraint(formula);
        self.model.add_constraint(constraint);
    }
}

/// Structural mapping from parsed constraint syntax to a propositional formula.
pub fn to_expr(expr: &ConstraintExpr) -> Expr {
    match expr {
        ConstraintExpr::Ref(name) => Expr::var(name.as_str()),
        ConstraintExpr::Not(inner) => Expr::not(to_expr(inner)),
        ConstraintExpr::And(lhs, rhs) => Expr::and(to_expr(lhs), to_expr(rhs)),
        ConstraintExpr::Or(lhs, rhs) => Expr::or(to_expr(lhs), to_expr(rhs)),
        ConstraintExpr::Implies(lhs, rhs) => Expr::implies(to_expr(lhs), to_expr(rhs)),
        ConstraintExpr::Equiv(lhs, rhs) => Expr::equals(to_expr(lhs), to_expr(rhs)),
    }
}
