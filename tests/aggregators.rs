use metaclad::aggregator::{Aggregator, AggregatorFunction};
use metaclad::datatype::{BaseType, DataType};

#[test]
fn plain_aggregators() {
    let (alias, aggregator) = Aggregator::split_alias("POSITION__QTY:SUM").unwrap();
    assert_eq!(alias, "POSITION__QTY");
    assert_eq!(aggregator.function(), AggregatorFunction::Sum);
    assert!(aggregator.arguments().is_empty());
    assert_eq!(aggregator.add_to_alias("QTY"), "QTY:SUM");
}

#[test]
fn function_names_ignore_case() {
    let (_, aggregator) = Aggregator::split_alias("NAME:count_distinct").unwrap();
    assert_eq!(aggregator.function(), AggregatorFunction::CountDistinct);
    assert_eq!(aggregator.to_string(), "COUNT_DISTINCT");
}

#[test]
fn quoted_arguments_keep_their_commas() {
    let (alias, aggregator) = Aggregator::split_alias("NAME:LIST_DISTINCT(', ')").unwrap();
    assert_eq!(alias, "NAME");
    assert_eq!(aggregator.arguments(), &["', '".to_string()]);
    assert_eq!(aggregator.add_to_alias(alias), "NAME:LIST_DISTINCT(', ')");

    let (_, aggregator) = Aggregator::split_alias("QTY:COUNT_IF(QTY > 3, 'a,b')").unwrap();
    assert_eq!(aggregator.arguments(), &["QTY > 3".to_string(), "'a,b'".to_string()]);
}

#[test]
fn unknown_suffixes_are_no_aggregators() {
    assert!(Aggregator::split_alias("NAME").is_none());
    assert!(Aggregator::split_alias("NAME:MEDIAN").is_none());
    assert!(Aggregator::split_alias(":SUM").is_none());
    assert!(!Aggregator::is_aggregated("CUSTOMER__NAME"));
    assert!(Aggregator::is_aggregated("CUSTOMER__NAME:LIST"));
    assert!("MEDIAN".parse::<Aggregator>().is_err());
}

#[test]
fn result_types() {
    let number = DataType::of(BaseType::Number);
    let count: Aggregator = "COUNT".parse().unwrap();
    assert_eq!(count.result_type(&number).base(), BaseType::Integer);
    let list: Aggregator = "LIST".parse().unwrap();
    assert_eq!(list.result_type(&number).base(), BaseType::String);
    let max: Aggregator = "MAX".parse().unwrap();
    assert_eq!(max.result_type(&number), number);
}
