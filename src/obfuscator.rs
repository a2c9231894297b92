//! Structure-preserving anonymization of feature models.
//!
//! Every feature name and description is replaced by a salted SHA-256
//! pseudonym, so the tree shape, the flags and the constraint formulas survive
//! while the vocabulary of the product does not. The same name with the same
//! salt always yields the same pseudonym, which keeps constraints consistent
//! with the renamed tree.
//!
//! ```
//! use fm_rs::model::FeatureModel;
//! use fm_rs::obfuscator::{FeatureModelObfuscator, ObfuscatorConfig};
//!
//! let mut model = FeatureModel::new();
//! let car = model.create_feature("Car");
//! let engine = model.create_feature("Engine");
//! model.add_child(car, engine);
//! model.set_root(car);
//!
//! let config = ObfuscatorConfig::default().with_salt("s3cr3t");
//! let anonymized = FeatureModelObfuscator::new(&model).with_config(config).execute().unwrap();
//! assert_eq!(anonymized.num_features(), 2);
//! assert!(anonymized.feature_by_name("Car").is_none());
//! ```

use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, trace};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::factory::{FactoryRegistry, FallbackPolicy, FeatureModelFactory};
use crate::model::FeatureModel;
use crate::types::FeatureId;

/// Output alphabet, six bits per character.
pub const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

pub const FEATURE_TAG: char = 'F';
pub const DESCRIPTION_TAG: char = 'D';

/// Largest accepted `length_factor`: pseudonyms of up to 4096 characters.
pub const MAX_LENGTH_FACTOR: usize = 1024;

const SALT_BYTES: usize = 24;

#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum ObfuscationError {
    #[error("invalid obfuscator configuration: {0}")]
    InvalidConfig(String),
    #[error("features '{first}' and '{second}' share the pseudonym '{pseudonym}'")]
    PseudonymCollision {
        first: String,
        second: String,
        pseudonym: String,
    },
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ObfuscatorConfig {
    /// Salt prepended to every hashed value (default: empty, which makes pseudonyms guessable).
    pub salt: String,
    /// Pseudonyms carry `4 * length_factor` characters after the tag (default: 8).
    pub length_factor: usize,
}

impl Default for ObfuscatorConfig {
    fn default() -> Self {
        Self {
            salt: String::new(),
            length_factor: 8,
        }
    }
}

impl ObfuscatorConfig {
    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = salt.into();
        self
    }

    pub fn with_length_factor(mut self, length_factor: usize) -> Self {
        self.length_factor = length_factor;
        self
    }

    pub fn validate(&self) -> Result<(), ObfuscationError> {
        if self.length_factor == 0 {
            return Err(ObfuscationError::InvalidConfig(
                "length_factor must be at least 1".to_string(),
            ));
        }
        if self.length_factor > MAX_LENGTH_FACTOR {
            return Err(ObfuscationError::InvalidConfig(format!(
                "length_factor must be at most {}, got {}",
                MAX_LENGTH_FACTOR, self.length_factor
            )));
        }
        Ok(())
    }

    /// Pseudonym for `input`: `tag`, `_`, then `4 * length_factor` characters.
    ///
    /// The factor is capped at [`MAX_LENGTH_FACTOR`].
    pub fn pseudonym(&self, tag: char, input: &str) -> String {
        let factor = self.length_factor.min(MAX_LENGTH_FACTOR);
        let bytes = digest_stream(self.salt.as_bytes(), input.as_bytes(), 3 * factor);
        let mut out = String::with_capacity(2 + 4 * factor);
        out.push(tag);
        out.push('_');
        encode(&bytes, &mut out);
        out
    }
}

/// `H(salt || input) || H(previous block) || ...`, cut to `len` bytes.
fn digest_stream(salt: &[u8], input: &[u8], len: usize) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(input);
    let mut block = hasher.finalize().to_vec();

    let mut bytes = Vec::with_capacity(len + block.len());
    bytes.extend_from_slice(&block);
    while bytes.len() < len {
        block = Sha256::digest(&block).to_vec();
        bytes.extend_from_slice(&block);
    }
    bytes.truncate(len);
    bytes
}

/// Appends four characters per three bytes.
///
/// Each group is read as a little-endian 24-bit integer and emitted least
/// significant six bits first. A trailing partial group is zero-padded.
pub fn encode(bytes: &[u8], out: &mut String) {
    for chunk in bytes.chunks(3) {
        let mut x = 0u32;
        for (i, &b) in chunk.iter().enumerate() {
            x |= (b as u32) << (8 * i);
        }
        for _ in 0..4 {
            out.push(ALPHABET[(x & 0x3f) as usize] as char);
            x >>= 6;
        }
    }
}

/// A fresh 32-character salt drawn from the operating system's RNG.
pub fn random_salt() -> String {
    let mut bytes = [0u8; SALT_BYTES];
    OsRng.fill_bytes(&mut bytes);
    let mut salt = String::with_capacity(SALT_BYTES / 3 * 4);
    encode(&bytes, &mut salt);
    salt
}

pub struct FeatureModelObfuscator<'a> {
    source: &'a FeatureModel,
    config: ObfuscatorConfig,
    registry: FactoryRegistry,
}

impl<'a> FeatureModelObfuscator<'a> {
    pub fn new(source: &'a FeatureModel) -> Self {
        Self {
            source,
            config: ObfuscatorConfig::default(),
            registry: FactoryRegistry::new(),
        }
    }

    pub fn with_config(mut self, config: ObfuscatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Registry used to find the factory named by the source model's factory id.
    pub fn with_registry(mut self, registry: FactoryRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &ObfuscatorConfig {
        &self.config
    }

    /// Builds the anonymized copy. The source model is not modified.
    pub fn execute(&self) -> Result<FeatureModel, ObfuscationError> {
        self.config.validate()?;
        let factory = self
            .registry
            .resolve(self.source.factory_id(), FallbackPolicy::UseDefault)
            .unwrap_or_else(|_| self.registry.default_factory());

        let target = factory.create_feature_model();
        let mut run = Run {
            source: self.source,
            config: &self.config,
            factory,
            target,
            pseudonyms: HashMap::new(),
        };

        if let Some(root) = self.source.root() {
            let new_root = run.structure(root, None)?;
            run.target.set_root(new_root);
        }
        run.constraints();
        run.target.update_relevant_constraints();

        debug!(
            "Obfuscated {} features and {} constraints",
            run.target.num_features(),
            run.target.num_constraints()
        );
        Ok(run.target)
    }
}

struct Run<'a> {
    source: &'a FeatureModel,
    config: &'a ObfuscatorConfig,
    factory: Rc<dyn FeatureModelFactory>,
    target: FeatureModel,
    /// Pseudonym to original name.
    pseudonyms: HashMap<String, String>,
}

impl Run<'_> {
    fn feature_name(&mut self, name: &str) -> Result<String, ObfuscationError> {
        let pseudonym = self.config.pseudonym(FEATURE_TAG, name);
        match self.pseudonyms.get(&pseudonym) {
            Some(first) if first != name => Err(ObfuscationError::PseudonymCollision {
                first: first.clone(),
                second: name.to_string(),
                pseudonym,
            }),
            Some(_) => Ok(pseudonym),
            None => {
                self.pseudonyms.insert(pseudonym.clone(), name.to_string());
                Ok(pseudonym)
            }
        }
    }

    fn structure(&mut self, id: FeatureId, parent: Option<FeatureId>) -> Result<FeatureId, ObfuscationError> {
        let source = self.source;
        let feature = source.feature(id);
        let name = self.feature_name(feature.name())?;
        let copy = match self.factory.create_feature(&mut self.target, &name) {
            Some(copy) => copy,
            None => {
                return Err(ObfuscationError::PseudonymCollision {
                    first: self.pseudonyms.get(&name).cloned().unwrap_or_default(),
                    second: feature.name().to_string(),
                    pseudonym: name,
                })
            }
        };
        trace!("{} -> {}", feature.name(), name);

        if let Some(description) = feature.description().filter(|d| !d.is_empty()) {
            let pseudonym = self.config.pseudonym(DESCRIPTION_TAG, description);
            self.target.feature_mut(copy).set_description(pseudonym);
        }

        let structure = source.structure(id);
        self.target.set_abstract(copy, !structure.is_concrete());
        self.target.set_hidden(copy, structure.is_hidden());
        self.target.set_mandatory(copy, structure.is_mandatory_set());
        self.target.set_and_flag(copy, structure.is_and());
        self.target.set_multiple(copy, structure.is_multiple());

        if let Some(parent) = parent {
            self.target.add_child(parent, copy);
        }
        for &child in source.children(id) {
            self.structure(child, Some(copy))?;
        }
        Ok(copy)
    }

    fn constraints(&mut self) {
        let source = self.source;
        for constraint in source.constraints() {
            let formula = constraint
                .formula()
                .map_literals(|name| self.config.pseudonym(FEATURE_TAG, name));
            let copy = self.factory.create_constraint(formula);
            self.target.add_constraint(copy);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use regex::Regex;
    use test_log::test;

    use crate::expr::Expr;
    use crate::structure::GroupType;

    fn car() -> FeatureModel {
        let mut model = FeatureModel::new();
        let car = model.create_feature("Car");
        let engine = model.create_feature("Engine");
        let electric = model.create_feature("Electric");
        let gas = model.create_feature("Gas");
        let radio = model.create_feature("Radio");
        model.set_root(car);
        model.add_child(car, engine);
        model.add_child(engine, electric);
        model.add_child(engine, gas);
        model.add_child(car, radio);
        model.set_abstract(car, true);
        model.set_mandatory(engine, true);
        model.change_to_alternative(engine);
        model.set_hidden(radio, true);
        model.feature_mut(radio).set_description("FM and DAB");
        model.add_constraint(Expr::implies(Expr::var("Radio"), Expr::var("Electric")));
        model
    }

    fn salted(salt: &str) -> ObfuscatorConfig {
        ObfuscatorConfig {
            salt: salt.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_encode_low_bits_first() {
        let mut out = String::new();
        encode(&[0x01, 0x00, 0x00], &mut out);
        assert_eq!(out, "BAAA");
        out.clear();
        encode(&[0x00, 0x00, 0xfc], &mut out);
        assert_eq!(out, "AAA/");
        out.clear();
        encode(&[0x40, 0x00, 0x00], &mut out);
        assert_eq!(out, "ABAA");
    }

    #[test]
    fn test_pseudonym_shape() {
        let re = Regex::new(r"^F_[A-Za-z0-9+/]{32}$").unwrap();
        let config = salted("salt");
        assert!(re.is_match(&config.pseudonym(FEATURE_TAG, "Car")));
        assert!(config.pseudonym(DESCRIPTION_TAG, "text").starts_with("D_"));

        let long = ObfuscatorConfig {
            length_factor: 20,
            ..salted("salt")
        };
        let p = long.pseudonym(FEATURE_TAG, "Car");
        assert_eq!(p.len(), 2 + 80);
        // The first digest is the same regardless of the length.
        assert_eq!(&p[..34], config.pseudonym(FEATURE_TAG, "Car"));
    }

    #[test]
    fn test_pseudonym_depends_on_salt_and_input() {
        let a = salted("a");
        let b = salted("b");
        assert_eq!(a.pseudonym(FEATURE_TAG, "Car"), a.pseudonym(FEATURE_TAG, "Car"));
        assert_ne!(a.pseudonym(FEATURE_TAG, "Car"), b.pseudonym(FEATURE_TAG, "Car"));
        assert_ne!(a.pseudonym(FEATURE_TAG, "Car"), a.pseudonym(FEATURE_TAG, "Bus"));
    }

    #[test]
    fn test_invalid_length_factor() {
        let model = car();
        let config = ObfuscatorConfig {
            length_factor: 0,
            ..Default::default()
        };
        let err = FeatureModelObfuscator::new(&model).with_config(config).execute().unwrap_err();
        assert!(matches!(err, ObfuscationError::InvalidConfig(_)));
    }

    #[test]
    fn test_oversized_length_factor() {
        let model = car();
        for length_factor in [MAX_LENGTH_FACTOR + 1, usize::MAX / 2, usize::MAX] {
            let config = ObfuscatorConfig::default().with_length_factor(length_factor);
            let err = FeatureModelObfuscator::new(&model).with_config(config).execute().unwrap_err();
            assert!(matches!(err, ObfuscationError::InvalidConfig(_)));
        }

        let largest = ObfuscatorConfig::default().with_length_factor(MAX_LENGTH_FACTOR);
        assert!(largest.validate().is_ok());
        assert_eq!(largest.pseudonym(FEATURE_TAG, "Car").len(), 2 + 4 * MAX_LENGTH_FACTOR);
        let huge = ObfuscatorConfig::default().with_length_factor(usize::MAX);
        assert_eq!(huge.pseudonym(FEATURE_TAG, "Car"), largest.pseudonym(FEATURE_TAG, "Car"));
    }

    #[test]
    fn test_structure_is_mirrored() {
        let model = car();
        let config = salted("pepper");
        let out = FeatureModelObfuscator::new(&model)
            .with_config(config.clone())
            .execute()
            .unwrap();
        out.check_invariants();

        assert_eq!(out.num_features(), model.num_features());
        let src_order = model.preorder(model.root().unwrap());
        let out_order = out.preorder(out.root().unwrap());
        for (&s, &o) in src_order.iter().zip(&out_order) {
            assert_eq!(out.feature(o).name(), config.pseudonym(FEATURE_TAG, model.feature(s).name()));
            assert_eq!(out.children(o).len(), model.children(s).len());
            assert_eq!(out.group_type(o), model.group_type(s));
            assert_eq!(out.is_mandatory(o), model.is_mandatory(s));
            assert_eq!(out.structure(o).is_concrete(), model.structure(s).is_concrete());
            assert_eq!(out.structure(o).is_hidden(), model.structure(s).is_hidden());
        }

        let engine = out.feature_by_name(&config.pseudonym(FEATURE_TAG, "Engine")).unwrap();
        assert_eq!(out.group_type(engine), GroupType::Alternative);

        let radio = out.feature_by_name(&config.pseudonym(FEATURE_TAG, "Radio")).unwrap();
        assert_eq!(
            out.feature(radio).description(),
            Some(config.pseudonym(DESCRIPTION_TAG, "FM and DAB").as_str())
        );
        let car = out.root().unwrap();
        assert_eq!(out.feature(car).description(), None);
    }

    #[test]
    fn test_constraints_are_renamed() {
        let model = car();
        let config = salted("pepper");
        let out = FeatureModelObfuscator::new(&model)
            .with_config(config.clone())
            .execute()
            .unwrap();
        assert_eq!(out.num_constraints(), 1);
        let formula = out.constraints()[0].formula();
        assert!(formula.same_shape(model.constraints()[0].formula()));
        assert_eq!(
            formula.literals(),
            vec![
                config.pseudonym(FEATURE_TAG, "Radio").as_str(),
                config.pseudonym(FEATURE_TAG, "Electric").as_str()
            ]
        );
        assert!(out.dangling_references().is_empty());
        let radio = out.feature_by_name(&config.pseudonym(FEATURE_TAG, "Radio")).unwrap();
        assert_eq!(out.relevant_constraints(radio).len(), 1);
    }

    #[test]
    fn test_deterministic() {
        let model = car();
        let run = || {
            FeatureModelObfuscator::new(&model)
                .with_config(salted("x"))
                .execute()
                .unwrap()
        };
        let (a, b) = (run(), run());
        let names = |m: &FeatureModel| m.features().map(|f| f.name().to_string()).collect::<Vec<_>>();
        assert_eq!(names(&a), names(&b));
        assert_eq!(a.constraints()[0].to_string(), b.constraints()[0].to_string());
    }

    #[test]
    fn test_empty_model() {
        let model = FeatureModel::new();
        let out = FeatureModelObfuscator::new(&model).execute().unwrap();
        assert_eq!(out.num_features(), 0);
        assert_eq!(out.root(), None);
    }

    #[test]
    fn test_random_salt() {
        let re = Regex::new(r"^[A-Za-z0-9+/]{32}$").unwrap();
        let a = random_salt();
        let b = random_salt();
        assert!(re.is_match(&a));
        assert_ne!(a, b);
    }
}
