use super::*;
use crate::{error::ErrorKind, value::ScalarKind};

fn product_type() -> EntityTypeModel {
    EntityTypeModel::new("Shop", "Product")
        .with_key("Id", ScalarKind::Int)
        .with_property("Name", ScalarKind::Text)
        .with_nullable("Price", ScalarKind::Float)
        .with_default("Stock", ScalarKind::Uint, 0_u64)
        .with_navigation("Category", "Categories", Multiplicity::One)
}

fn category_type() -> EntityTypeModel {
    EntityTypeModel::new("Shop", "Category")
        .with_key("Id", ScalarKind::Int)
        .with_property("Name", ScalarKind::Text)
        .with_navigation("Products", "Products", Multiplicity::Many)
}

fn shop_model() -> EdmModel {
    EdmModel::builder("Shop")
        .entity_type(product_type())
        .entity_type(category_type())
        .entity_set("Products", "Product")
        .entity_set("Categories", "Category")
        .build()
        .unwrap()
}

#[test]
fn builder_accepts_valid_model() {
    let model = shop_model();

    assert_eq!(model.sets().len(), 2);
    assert_eq!(model.types().len(), 2);
}

#[test]
fn lookups_resolve_set_type_and_navigation() {
    let model = shop_model();

    let ty = model.type_for_set("Products").unwrap();
    assert_eq!(ty.qualified_name(), "Shop.Product");

    let nav = model.resolve_navigation("Products", "Category").unwrap();
    assert_eq!(nav.target_set, "Categories");
    assert!(nav.multiplicity.is_single());
}

#[test]
fn unknown_set_and_navigation_have_distinct_kinds() {
    let model = shop_model();

    assert_eq!(
        model.entity_set("Nothing").unwrap_err().kind,
        ErrorKind::UnknownEntitySet
    );
    assert_eq!(
        model
            .resolve_navigation("Products", "Nothing")
            .unwrap_err()
            .kind,
        ErrorKind::UnknownNavigationProperty
    );
}

#[test]
fn key_shape_preserves_declaration_order() {
    let ty = EntityTypeModel::new("Shop", "OrderLine")
        .with_key("OrderId", ScalarKind::Int)
        .with_key("LineNo", ScalarKind::Int)
        .with_property("Qty", ScalarKind::Uint);

    let shape = ty.key_shape();
    let names: Vec<&str> = shape.properties().iter().map(|p| p.name.as_str()).collect();

    assert_eq!(names, ["OrderId", "LineNo"]);
    assert!(!shape.is_simple());
}

#[test]
fn build_rejects_duplicate_type() {
    let err = EdmModel::builder("Shop")
        .entity_type(product_type())
        .entity_type(product_type())
        .entity_set("Products", "Product")
        .entity_set("Categories", "Category")
        .build()
        .unwrap_err();

    assert!(matches!(err, ModelError::DuplicateType { .. }));
}

#[test]
fn build_rejects_set_with_unknown_type() {
    let err = EdmModel::builder("Shop")
        .entity_type(category_type())
        .entity_set("Products", "Product")
        .entity_set("Categories", "Category")
        .build()
        .unwrap_err();

    assert!(matches!(err, ModelError::UnknownSetType { .. }));
}

#[test]
fn build_rejects_unresolved_navigation_target() {
    let err = EdmModel::builder("Shop")
        .entity_type(product_type())
        .entity_set("Products", "Product")
        .build()
        .unwrap_err();

    assert!(matches!(err, ModelError::UnknownNavigationTarget { .. }));
}

#[test]
fn build_rejects_keyless_type() {
    let ty = EntityTypeModel::new("Shop", "Orphan").with_property("Name", ScalarKind::Text);
    let err = EdmModel::builder("Shop")
        .entity_type(ty)
        .entity_set("Orphans", "Orphan")
        .build()
        .unwrap_err();

    assert!(matches!(err, ModelError::NoKeyProperties { .. }));
}

#[test]
fn build_rejects_float_key() {
    let ty = EntityTypeModel::new("Shop", "Bad").with_key("Id", ScalarKind::Float);
    let err = EdmModel::builder("Shop")
        .entity_type(ty)
        .entity_set("Bads", "Bad")
        .build()
        .unwrap_err();

    assert!(matches!(err, ModelError::KeyKindNotAllowed { .. }));
}

#[test]
fn build_rejects_mismatched_default() {
    let ty = EntityTypeModel::new("Shop", "Bad")
        .with_key("Id", ScalarKind::Int)
        .with_default("Count", ScalarKind::Uint, "zero");
    let err = EdmModel::builder("Shop")
        .entity_type(ty)
        .entity_set("Bads", "Bad")
        .build()
        .unwrap_err();

    assert!(matches!(err, ModelError::DefaultKindMismatch { .. }));
}

#[test]
fn build_rejects_navigation_shadowing_property() {
    let ty = EntityTypeModel::new("Shop", "Bad")
        .with_key("Id", ScalarKind::Int)
        .with_property("Name", ScalarKind::Text)
        .with_navigation("Name", "Bads", Multiplicity::One);
    let err = EdmModel::builder("Shop")
        .entity_type(ty)
        .entity_set("Bads", "Bad")
        .build()
        .unwrap_err();

    assert!(matches!(err, ModelError::DuplicateProperty { .. }));
}
