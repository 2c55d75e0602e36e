mod common;

use std::sync::Arc;

use common::*;
use metaclad::attribute::Attribute;
use metaclad::datatype::{BaseType, DataType};
use metaclad::object::CachedAttribute;
use metaclad::MetacladError;

#[test]
fn own_attribute_ignores_case() {
    let mut model = model();
    let number = model.get_attribute(ORDER, "number").unwrap();
    assert_eq!(number.id(), 12);
    assert_eq!(number.alias(), "NUMBER");
    assert!(number.relation_path().is_empty());
}

#[test]
fn order_customer_name_through_relation() {
    let (mut model, counter) = model_with_counter();
    let name = model.get_attribute(ORDER, "CUSTOMER__NAME").unwrap();
    assert_eq!(name.id(), 22);
    assert_eq!(name.object_id(), CUSTOMER);
    assert_eq!(name.relation_path().to_string(), "CUSTOMER");
    assert_eq!(name.relation_path().start_object_id(), ORDER);
    assert_eq!(name.relation_path().end_object_id(), CUSTOMER);
    assert_eq!(name.alias_with_relation_path(), "CUSTOMER__NAME");
    let loaded = loads(&counter);
    assert_eq!(loaded, 2);

    let again = model.get_attribute(ORDER, "CUSTOMER__NAME").unwrap();
    assert!(Arc::ptr_eq(&name, &again));
    assert_eq!(loads(&counter), loaded);
}

#[test]
fn native_attribute_of_related_object_is_untouched() {
    let mut model = model();
    model.get_attribute(ORDER, "CUSTOMER__NAME").unwrap();
    let native = model.get_attribute(CUSTOMER, "NAME").unwrap();
    assert!(native.relation_path().is_empty());
    assert_eq!(native.relation_path().start_object_id(), CUSTOMER);
}

#[test]
fn multiple_hops() {
    let mut model = model();
    let city = model.get_attribute(ORDER, "CUSTOMER__ADDRESS__CITY").unwrap();
    assert_eq!(city.id(), 42);
    assert_eq!(city.relation_path().len(), 2);
    assert_eq!(city.relation_path().to_string(), "CUSTOMER__ADDRESS");
    assert_eq!(city.relation_path().end_object_id(), ADDRESS);
}

#[test]
fn aggregated_alias_is_cached_as_written() {
    let mut model = model();
    let total = model.get_attribute(ORDER, "TOTAL:SUM").unwrap();
    assert_eq!(total.id(), 14);
    match model.object(ORDER).unwrap().cached_attribute("TOTAL:SUM") {
        CachedAttribute::Resolved(cached) => assert_eq!(cached.id(), 14),
        other => panic!("expected a cached attribute, got {other:?}"),
    }
}

#[test]
fn aggregated_alias_through_reverse_relation() {
    let mut model = model();
    let qty = model.get_attribute(ORDER, "POSITION__QTY:SUM").unwrap();
    assert_eq!(qty.id(), 34);
    assert_eq!(qty.relation_path().to_string(), "POSITION[ORDER]");
    assert!(qty.relation_path().contains_reverse_relations());
}

#[test]
fn formulas_are_no_aliases() {
    let mut model = model();
    let err = model.get_attribute(ORDER, "=Concat(NUMBER)").unwrap_err();
    assert!(matches!(err, MetacladError::AttributeNotFound { .. }));
    assert_eq!(
        model.object(ORDER).unwrap().cached_attribute("=Concat(NUMBER)"),
        CachedAttribute::KnownMissing
    );
}

#[test]
fn misses_are_cached() {
    let mut model = model();
    assert!(!model.has_attribute(ORDER, "NOPE"));
    assert_eq!(
        model.object(ORDER).unwrap().cached_attribute("nope"),
        CachedAttribute::KnownMissing
    );
    let err = model.get_attribute(ORDER, "NOPE").unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn failures_name_the_starting_object() {
    let mut model = model();
    let err = model.get_attribute(ORDER, "CUSTOMER__ADDRESS__NOPE").unwrap_err();
    match &err {
        MetacladError::AttributeNotFound { object, alias, source } => {
            assert_eq!(object, "shop.ORDER");
            assert_eq!(alias, "CUSTOMER__ADDRESS__NOPE");
            assert!(source.is_some());
        }
        other => panic!("unexpected error {other}"),
    }
    assert!(err.to_string().contains("shop.ORDER"));
}

#[test]
fn reverse_relation_alias_is_the_far_key() {
    let mut model = model();
    let key = model.get_attribute(CUSTOMER, "ORDER").unwrap();
    assert_eq!(key.id(), 13);
    assert_eq!(key.object_id(), ORDER);
    let relation = key.relation_path().first_relation().unwrap();
    assert!(relation.is_reverse());
    assert_eq!(key.relation_path().to_string(), "ORDER[CUSTOMER]");
}

#[test]
fn one_to_one_relation_alias_is_the_far_key() {
    let mut model = model();
    let key = model.get_attribute(ORDER, "INVOICE").unwrap();
    assert_eq!(key.id(), 62);
    assert!(key.relation_path().first_relation().unwrap().is_one_to_one());
}

#[test]
fn ambiguity_is_not_cached() {
    let mut model = model();
    let err = model.get_attribute(ORDER, "NOTE").unwrap_err();
    assert!(matches!(err, MetacladError::RelationAmbiguous { .. }));
    assert!(!model.has_attribute(ORDER, "NOTE"));
    assert_eq!(
        model.object(ORDER).unwrap().cached_attribute("NOTE"),
        CachedAttribute::Unknown
    );
}

#[test]
fn adding_an_attribute_clears_the_cache() {
    let mut model = model();
    assert!(!model.has_attribute(ORDER, "EXTRA"));
    assert!(model.object(ORDER).unwrap().cache_len() > 0);
    model
        .object_mut(ORDER)
        .unwrap()
        .add_attribute(Attribute::new(99, ORDER, "EXTRA", DataType::of(BaseType::String)));
    assert_eq!(model.object(ORDER).unwrap().cache_len(), 0);
    assert!(model.has_attribute(ORDER, "EXTRA"));
}

#[test]
fn caches_can_be_cleared_everywhere() {
    let mut model = model();
    model.get_attribute(ORDER, "CUSTOMER__NAME").unwrap();
    assert!(model.object(CUSTOMER).unwrap().cache_len() > 0);
    model.clear_attribute_caches();
    assert_eq!(model.object(ORDER).unwrap().cache_len(), 0);
    assert_eq!(model.object(CUSTOMER).unwrap().cache_len(), 0);
}

#[test]
fn uid_and_label_attributes() {
    let mut model = model();
    assert_eq!(model.uid_attribute(ORDER).unwrap().id(), 11);
    assert_eq!(model.label_attribute(ORDER).unwrap().alias(), "NUMBER");
    assert!(model.label_attribute(POSITION).is_err());
}

#[test]
fn namespaced_data_types_fall_back_to_their_short_name() {
    let mut model = model();
    let created = model.get_attribute(ORDER, "CREATED").unwrap();
    assert_eq!(created.data_type().base(), BaseType::Date);
}

#[test]
fn objects_load_by_alias_once() {
    let (mut model, counter) = model_with_counter();
    let by_full_alias = model.object_id("shop.CUSTOMER").unwrap();
    let by_alias = model.object_id("customer").unwrap();
    assert_eq!(by_full_alias, CUSTOMER);
    assert_eq!(by_alias, CUSTOMER);
    assert_eq!(loads(&counter), 1);
    assert!(matches!(
        model.object_id("shop.NOTHING"),
        Err(MetacladError::ObjectNotFound(_))
    ));
}
