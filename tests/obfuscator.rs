//! Anonymizing models read from UVL.

use std::rc::Rc;

use fm_rs::expr::{Expr, Op};
use fm_rs::factory::{FactoryRegistry, FeatureModelFactory};
use fm_rs::format::FeatureModelFormat;
use fm_rs::model::FeatureModel;
use fm_rs::obfuscator::{FeatureModelObfuscator, ObfuscationError, ObfuscatorConfig, DESCRIPTION_TAG, FEATURE_TAG};
use fm_rs::types::FeatureId;
use fm_rs::uvl::UvlFormat;
use regex::Regex;

const CAR: &str = r#"
features
    Car
        mandatory
            Engine
            Wheels

constraints
    "Engine" => "Wheels"
"#;

fn read(source: &str) -> FeatureModel {
    let mut model = FeatureModel::new();
    let problems = UvlFormat::new().read(&mut model, source);
    assert!(problems.is_empty(), "{:?}", problems);
    model
}

fn salted(salt: &str) -> ObfuscatorConfig {
    ObfuscatorConfig {
        salt: salt.to_string(),
        ..Default::default()
    }
}

fn shape(model: &FeatureModel, id: FeatureId) -> String {
    let children: Vec<String> = model.children(id).iter().map(|&c| shape(model, c)).collect();
    format!(
        "{}{}{}({})",
        model.group_type(id),
        if model.is_mandatory(id) { "!" } else { "" },
        if model.structure(id).is_abstract() { "a" } else { "" },
        children.join(",")
    )
}

// ─── End-to-end ────────────────────────────────────────────────────────────────

#[test]
fn car_model() {
    let model = read(CAR);
    let config = salted("x");
    let out = FeatureModelObfuscator::new(&model).with_config(config.clone()).execute().unwrap();
    out.check_invariants();

    let re = Regex::new(r"^F_[A-Za-z0-9+/]{32}$").unwrap();
    let root = out.root().unwrap();
    assert!(re.is_match(out.feature(root).name()));
    assert_eq!(out.feature(root).name(), config.pseudonym(FEATURE_TAG, "Car"));
    assert_eq!(shape(&out, root), shape(&model, model.root().unwrap()));

    let formula = out.constraints()[0].formula();
    assert_eq!(formula.op(), Op::Implies);
    assert_eq!(
        formula,
        &Expr::implies(
            Expr::var(config.pseudonym(FEATURE_TAG, "Engine")),
            Expr::var(config.pseudonym(FEATURE_TAG, "Wheels"))
        )
    );
    for name in formula.literals() {
        assert!(re.is_match(name));
        assert!(out.feature_by_name(name).is_some());
    }
}

#[test]
fn source_is_untouched() {
    let model = read(CAR);
    let before = model.debug_string();
    FeatureModelObfuscator::new(&model).with_config(salted("x")).execute().unwrap();
    assert_eq!(model.debug_string(), before);
}

// ─── Larger model ──────────────────────────────────────────────────────────────

const SHOP: &str = r#"
features
    Shop {abstract, description 'Our secret shop'}
        or
            Payment {hidden}
                alternative
                    "Credit Card"
                    Cash
            Search {cost 3}
        optional
            Wishlist
constraints
    Wishlist => Search
    !(Cash & "Credit Card") | Search
"#;

#[test]
fn shop_model_keeps_shape_and_flags() {
    let model = read(SHOP);
    let config = salted("pepper");
    let out = FeatureModelObfuscator::new(&model).with_config(config.clone()).execute().unwrap();

    assert_eq!(shape(&out, out.root().unwrap()), shape(&model, model.root().unwrap()));
    for feature in model.features() {
        let copy = out.feature_by_name(&config.pseudonym(FEATURE_TAG, feature.name())).unwrap();
        assert_eq!(out.structure(copy).is_hidden(), feature.structure().is_hidden());
        // Attributes may identify the product.
        assert!(out.feature(copy).attributes().is_empty());
    }

    let shop = out.root().unwrap();
    assert_eq!(
        out.feature(shop).description(),
        Some(config.pseudonym(DESCRIPTION_TAG, "Our secret shop").as_str())
    );

    assert_eq!(out.num_constraints(), model.num_constraints());
    for (a, b) in model.constraints().iter().zip(out.constraints()) {
        assert!(a.formula().same_shape(b.formula()));
        let renamed = a.formula().map_literals(|name| config.pseudonym(FEATURE_TAG, name));
        assert_eq!(&renamed, b.formula());
    }
}

#[test]
fn salt_changes_every_name() {
    let model = read(SHOP);
    let a = FeatureModelObfuscator::new(&model).with_config(salted("a")).execute().unwrap();
    let b = FeatureModelObfuscator::new(&model).with_config(salted("b")).execute().unwrap();
    for (x, y) in a.features().zip(b.features()) {
        assert_ne!(x.name(), y.name());
    }
}

#[test]
fn length_factor() {
    let model = read(CAR);
    let config = ObfuscatorConfig {
        salt: "x".to_string(),
        length_factor: 12,
    };
    let out = FeatureModelObfuscator::new(&model).with_config(config).execute().unwrap();
    let re = Regex::new(r"^F_[A-Za-z0-9+/]{48}$").unwrap();
    assert!(out.features().all(|f| re.is_match(f.name())));
}

#[test]
fn invalid_length_factor() {
    let model = read(CAR);
    let config = ObfuscatorConfig {
        salt: String::new(),
        length_factor: 0,
    };
    let result = FeatureModelObfuscator::new(&model).with_config(config).execute();
    assert!(matches!(result, Err(ObfuscationError::InvalidConfig(_))));
}

// ─── Factories ─────────────────────────────────────────────────────────────────

struct Custom;

impl FeatureModelFactory for Custom {
    fn id(&self) -> &str {
        "custom"
    }
}

#[test]
fn uses_factory_of_source_model() {
    let mut model = FeatureModel::with_factory_id("custom");
    UvlFormat::new().read(&mut model, CAR);

    let mut registry = FactoryRegistry::new();
    registry.register(Rc::new(Custom));
    let out = FeatureModelObfuscator::new(&model).with_registry(registry).execute().unwrap();
    assert_eq!(out.factory_id(), "custom");

    // Unknown factories fall back to the default one.
    let out = FeatureModelObfuscator::new(&model).execute().unwrap();
    assert_eq!(out.factory_id(), fm_rs::factory::DEFAULT_FACTORY_ID);
    assert_eq!(out.num_features(), 3);
}
