mod common;

use common::*;
use metaclad::expression::{Expression, ExpressionKind};
use metaclad::formula::{Formula, FormulaArgument};
use metaclad::object::CachedAttribute;
use metaclad::MetacladError;

#[test]
fn raw_strings_are_classified() {
    let mut model = model();
    let mut parse = |raw: &str| Expression::parse(&mut model, Some(ORDER), raw).unwrap();

    assert!(parse("  ").is_empty());
    assert!(parse("~customer_select").is_widget_reference());
    assert!(parse("=orders_table!NUMBER").is_widget_reference());
    assert!(parse("=Concat(NUMBER, ' ', CUSTOMER__NAME)").is_formula());
    assert_eq!(
        parse("'quoted value'").kind(),
        &ExpressionKind::Literal {
            value: "quoted value".to_string(),
            quoted: true
        }
    );
    assert_eq!(parse("-42.5").literal_value(), Some("-42.5"));
    assert_eq!(parse("customer__name").attribute_alias(), Some("customer__name"));
    assert_eq!(parse("TOTAL:SUM").attribute_alias(), Some("TOTAL:SUM"));
    assert!(parse("HELLO").is_literal());
}

#[test]
fn without_an_object_words_are_literals() {
    let mut model = model();
    let expression = Expression::parse(&mut model, None, "NUMBER").unwrap();
    assert!(expression.is_literal());
    assert_eq!(expression.object_id(), None);
}

#[test]
fn broken_formulas_fail_to_parse() {
    let mut model = model();
    let err = Expression::parse(&mut model, Some(ORDER), "=Concat(NUMBER").unwrap_err();
    assert!(matches!(err, MetacladError::Parse { .. }));
    assert!(Formula::parse("Concat(NUMBER)").is_err());
}

#[test]
fn formulas_print_as_parsed() {
    let raw = "=Concat(NUMBER, ' - ', Upper(CUSTOMER__NAME), 3)";
    let formula = Formula::parse(raw).unwrap();
    assert_eq!(formula.name(), "Concat");
    assert_eq!(formula.to_string(), raw);
    assert_eq!(formula.arguments()[1], FormulaArgument::String("' - '".to_string()));
    assert_eq!(formula.arguments()[3], FormulaArgument::Number("3".to_string()));
    assert!(matches!(formula.arguments()[2], FormulaArgument::Call(_)));
}

#[test]
fn required_attributes_include_nested_calls() {
    let mut model = model();
    let expression = Expression::parse(
        &mut model,
        Some(ORDER),
        "=If(TOTAL:SUM, Concat(NUMBER, CUSTOMER__NAME), 'none')",
    )
    .unwrap();
    assert_eq!(
        expression.required_attributes(),
        vec!["TOTAL:SUM", "NUMBER", "CUSTOMER__NAME"]
    );
    let attribute = Expression::attribute(ORDER, "NUMBER");
    assert_eq!(attribute.required_attributes(), vec!["NUMBER"]);
    assert!(Expression::literal("x").required_attributes().is_empty());
}

#[test]
fn formulas_are_rebased_argument_by_argument() {
    let mut model = model();
    let expression = Expression::parse(
        &mut model,
        Some(ORDER),
        "=Concat(CUSTOMER__NAME, ', ', CUSTOMER__ADDRESS__CITY)",
    )
    .unwrap();
    let rebased = expression.rebase(&mut model, "CUSTOMER", true).unwrap();
    assert_eq!(rebased.to_string(), "=Concat(NAME, ', ', ADDRESS__CITY)");
    assert_eq!(rebased.object_id(), Some(CUSTOMER));
}

#[test]
fn attributes_outside_the_path_cannot_be_rebased_when_dropping() {
    let mut model = model();
    let formula = Expression::parse(&mut model, Some(ORDER), "=Concat(NUMBER, CUSTOMER__NAME)").unwrap();
    let err = formula.rebase(&mut model, "CUSTOMER", true).unwrap_err();
    assert!(matches!(err, MetacladError::ExpressionRebaseImpossible { .. }));

    let rerouted = formula.rebase(&mut model, "CUSTOMER", false).unwrap();
    assert_eq!(rerouted.to_string(), "=Concat(ORDER[CUSTOMER]__NUMBER, NAME)");

    let nowhere = Expression::attribute(ORDER, "NUMBER");
    assert!(nowhere.rebase(&mut model, "NOPE", false).is_err());
}

#[test]
fn other_expressions_rebase_unchanged() {
    let mut model = model();
    let literal = Expression::literal("x");
    assert_eq!(literal.rebase(&mut model, "CUSTOMER", true).unwrap(), literal);
    let attribute = Expression::attribute(ORDER, "NUMBER");
    assert_eq!(attribute.rebase(&mut model, "", true).unwrap(), attribute);
}

#[test]
fn literals_leave_no_misses_in_the_cache() {
    let mut model = model();
    let before = model.object(ORDER).unwrap().cache_len();
    assert!(Expression::parse(&mut model, Some(ORDER), "Bob").unwrap().is_literal());
    let order = model.object(ORDER).unwrap();
    assert!(matches!(order.cached_attribute("Bob"), CachedAttribute::Unknown));
    assert_eq!(order.cache_len(), before);

    assert!(Expression::parse(&mut model, Some(ORDER), "CUSTOMER__NAME").unwrap().is_attribute());
    let order = model.object(ORDER).unwrap();
    assert!(matches!(order.cached_attribute("CUSTOMER__NAME"), CachedAttribute::Resolved(_)));
}
