//! Syntax tree of a UVL document.
//!
//! This is the transient form between the text and a
//! [`FeatureModel`][crate::model::FeatureModel]. Names are kept as written
//! (dotted references joined with `.`, quotes removed).

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UvlDocument {
    pub namespace: Option<String>,
    pub imports: Vec<Import>,
    pub root_features: Vec<FeatureDecl>,
    pub constraints: Vec<ConstraintDecl>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Import {
    pub namespace: String,
    /// Defaults to the namespace when no `as` clause is given.
    pub alias: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureDecl {
    pub name: String,
    pub attributes: Vec<(String, AttributeValue)>,
    pub groups: Vec<GroupDecl>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupDecl {
    pub kind: GroupKind,
    pub children: Vec<FeatureDecl>,
    pub line: usize,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum GroupKind {
    /// `or`, `alternative`, `optional`, `mandatory`, or any other identifier.
    Keyword(String),
    /// `[min..max]`; `max` is `None` for `*`.
    Cardinality { min: u64, max: Option<u64> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Attributes(Vec<(String, AttributeValue)>),
    Vector(Vec<AttributeValue>),
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ConstraintExpr {
    Ref(String),
    Not(Box<ConstraintExpr>),
    And(Box<ConstraintExpr>, Box<ConstraintExpr>),
    Or(Box<ConstraintExpr>, Box<ConstraintExpr>),
    Implies(Box<ConstraintExpr>, Box<ConstraintExpr>),
    Equiv(Box<ConstraintExpr>, Box<ConstraintExpr>),
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ConstraintDecl {
    pub expr: ConstraintExpr,
    pub line: usize,
}

impl GroupKind {
    pub fn keyword(&self) -> &str {
        match self {
            GroupKind::Keyword(k) => k,
            GroupKind::Cardinality { .. } => "cardinality",
        }
    }
}

impl FeatureDecl {
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn is_abstract(&self) -> bool {
        self.attribute("abstract") == Some(&AttributeValue::Bool(true))
    }

    /// A declaration without attributes or groups: it may stand for a definition elsewhere.
    pub fn is_reference(&self) -> bool {
        self.attributes.is_empty() && self.groups.is_empty()
    }

    /// Copy of this subtree with every name prefixed by `alias.`.
    pub fn prefixed(&self, alias: &str) -> FeatureDecl {
        FeatureDecl {
            name: format!("{}.{}", alias, self.name),
            attributes: self.attributes.clone(),
            groups: self
                .groups
                .iter()
                .map(|g| GroupDecl {
                    kind: g.kind.clone(),
                    children: g.children.iter().map(|c| c.prefixed(alias)).collect(),
                    line: g.line,
                })
                .collect(),
            line: self.line,
        }
    }

    fn children(&self) -> impl Iterator<Item = &FeatureDecl> {
        self.groups.iter().flat_map(|g| g.children.iter())
    }

    fn find_by(&self, pred: &dyn Fn(&FeatureDecl) -> bool) -> Option<&FeatureDecl> {
        if pred(self) {
            return Some(self);
        }
        self.children().find_map(|c| c.find_by(pred))
    }

    fn references_outside(&self, name: &str, skip: &FeatureDecl) -> bool {
        if std::ptr::eq(self, skip) {
            return false;
        }
        (self.name == name && self.is_reference()) || self.children().any(|c| c.references_outside(name, skip))
    }
}

impl UvlDocument {
    /// Finds the declaration called `name` anywhere in the feature tree.
    pub fn find_feature(&self, name: &str) -> Option<&FeatureDecl> {
        self.root_features.iter().find_map(|f| f.find_by(&|d: &FeatureDecl| d.name == name))
    }

    /// Finds the first declaration called `name` that has attributes or groups.
    pub fn find_definition(&self, name: &str) -> Option<&FeatureDecl> {
        self.root_features
            .iter()
            .find_map(|f| f.find_by(&|d: &FeatureDecl| d.name == name && !d.is_reference()))
    }

    /// Whether a bare reference to `decl` appears anywhere outside its own subtree.
    pub fn is_referenced_elsewhere(&self, decl: &FeatureDecl) -> bool {
        self.root_features
            .iter()
            .any(|f| f.references_outside(&decl.name, decl))
    }

    /// The import whose alias is the longest prefix (followed by `.`) of `path`.
    pub fn import_for_path(&self, path: &str) -> Option<&Import> {
        self.imports
            .iter()
            .filter(|i| {
                path.len() > i.alias.len() && path.starts_with(&i.alias) && path.as_bytes()[i.alias.len()] == b'.'
            })
            .max_by_key(|i| i.alias.len())
    }
}
