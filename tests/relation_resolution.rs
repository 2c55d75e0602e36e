mod common;

use common::*;
use metaclad::relation::Cardinality;
use metaclad::MetacladError;

#[test]
fn forward_relation() {
    let mut model = model();
    let customer = model.get_relation(ORDER, "CUSTOMER", "").unwrap();
    assert!(customer.is_forward());
    assert_eq!(customer.left_object_id(), ORDER);
    assert_eq!(customer.right_object_id(), CUSTOMER);
    assert_eq!(customer.left_key_alias(), Some("CUSTOMER"));
    assert_eq!(model.relation_left_key(&customer).unwrap().id(), 13);
    assert_eq!(model.relation_right_key(&customer).unwrap().id(), 21);
}

#[test]
fn reverse_relations_are_synthesized() {
    let mut model = model();
    let orders = model.get_relation(CUSTOMER, "ORDER", "").unwrap();
    assert_eq!(orders.cardinality(), Cardinality::OneToN);
    assert_eq!(orders.alias_modifier(), "CUSTOMER");
    assert_eq!(orders.left_object_id(), CUSTOMER);
    assert_eq!(orders.right_object_id(), ORDER);
    assert_eq!(orders.reverse_alias(), "CUSTOMER");
    assert_eq!(model.relation_left_key(&orders).unwrap().id(), 21);
}

#[test]
fn single_required_reverse_relation_wins() {
    let mut model = model();
    let positions = model.get_relation(ORDER, "POSITION", "").unwrap();
    assert_eq!(positions.alias_modifier(), "ORDER");
    assert_eq!(positions.right_key_alias(), Some("ORDER"));
}

#[test]
fn modifiers_select_reverse_relations() {
    let mut model = model();
    let explicit = model.get_relation(ORDER, "POSITION", "REPLACED_ORDER").unwrap();
    assert_eq!(explicit.right_key_alias(), Some("REPLACED_ORDER"));
    let bracketed = model.get_relation(ORDER, "POSITION[REPLACED_ORDER]", "").unwrap();
    assert_eq!(bracketed, explicit);
    assert_eq!(bracketed.alias_with_modifier(), "POSITION[REPLACED_ORDER]");
}

#[test]
fn unknown_modifier_fails() {
    let mut model = model();
    let err = model.get_relation(ORDER, "POSITION", "NOPE").unwrap_err();
    match err {
        MetacladError::RelationNotFound { alias, modifier, .. } => {
            assert_eq!(alias, "POSITION");
            assert_eq!(modifier, "NOPE");
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn reverse_relations_without_required_key_are_ambiguous() {
    let mut model = model();
    let err = model.get_relation(ORDER, "NOTE", "").unwrap_err();
    match err {
        MetacladError::RelationAmbiguous { object, alias, candidates } => {
            assert_eq!(object, "shop.ORDER");
            assert_eq!(alias, "NOTE");
            assert_eq!(candidates, 2);
        }
        other => panic!("unexpected error {other}"),
    }
    assert!(!model.has_relation(ORDER, "NOTE"));
    assert!(model.has_relation(ORDER, "NOTE[ABOUT_ORDER]"));
}

#[test]
fn one_to_one_relation() {
    let mut model = model();
    let invoice = model.get_relation(ORDER, "INVOICE", "").unwrap();
    assert!(invoice.is_one_to_one());
    assert!(invoice.is_reverse());
    let order = model.get_relation(INVOICE, "ORDER", "").unwrap();
    assert!(order.is_forward());
}

#[test]
fn relation_paths_resolve_to_the_last_relation() {
    let mut model = model();
    let address = model.get_relation(ORDER, "CUSTOMER__ADDRESS", "").unwrap();
    assert_eq!(address.alias(), "ADDRESS");
    assert_eq!(address.left_object_id(), CUSTOMER);
    assert_eq!(address.right_object_id(), ADDRESS);
}

#[test]
fn relation_path_failures_name_the_starting_object() {
    let mut model = model();
    let err = model.get_relation(ORDER, "CUSTOMER__NOPE", "").unwrap_err();
    match err {
        MetacladError::RelationNotFound { object, alias, .. } => {
            assert_eq!(object, "shop.ORDER");
            assert_eq!(alias, "CUSTOMER__NOPE");
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn find_relations_by_target_and_cardinality() {
    let mut model = model();
    let to_positions = model.find_relations(ORDER, Some(POSITION), None).unwrap();
    assert_eq!(to_positions.len(), 2);
    let forward = model
        .find_relations(ORDER, None, Some(Cardinality::NToOne))
        .unwrap();
    assert_eq!(forward.len(), 1);
    assert_eq!(forward[0].alias(), "CUSTOMER");
    let all = model.find_relations(ORDER, None, None).unwrap();
    assert_eq!(all.len(), 6);
}

#[test]
fn relation_path_from_string() {
    let mut model = model();
    let path = model.relation_path(ORDER, "CUSTOMER__ADDRESS").unwrap();
    assert_eq!(path.len(), 2);
    assert_eq!(path.start_object_id(), ORDER);
    assert_eq!(path.end_object_id(), ADDRESS);
    let reversed = path.reversed();
    assert_eq!(reversed.start_object_id(), ADDRESS);
    assert_eq!(reversed.end_object_id(), ORDER);
    assert_eq!(reversed.to_string(), "CUSTOMER[ADDRESS]__ORDER[CUSTOMER]");
    // the reversed path resolves to the same relations again
    let resolved = model.relation_path(ADDRESS, &reversed.to_string()).unwrap();
    assert_eq!(resolved, reversed);
}
