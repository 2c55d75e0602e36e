//! Aggregation functions attached to attribute aliases.
//!
//! An aggregated alias has the form `ALIAS:FUNCTION` or
//! `ALIAS:FUNCTION(arg, ...)`, e.g. `POSITION__VALUE:SUM` or
//! `NAME:LIST_DISTINCT(', ')`. The aggregator is carried next to the
//! resolved attribute and never stored on it.

use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;

use crate::datatype::{BaseType, DataType};
use crate::error::{MetacladError, Result};

pub const AGGREGATION_SEPARATOR: char = ':';

lazy_static! {
    static ref AGGREGATOR: Regex =
        Regex::new(r"^(?P<function>[A-Za-z_]+)(?:\((?P<arguments>.*)\))?$").unwrap();
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AggregatorFunction {
    Sum,
    Avg,
    Min,
    Max,
    Count,
    CountDistinct,
    CountIf,
    List,
    ListDistinct,
    MinOf,
    MaxOf,
}

impl AggregatorFunction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Min => "MIN",
            Self::Max => "MAX",
            Self::Count => "COUNT",
            Self::CountDistinct => "COUNT_DISTINCT",
            Self::CountIf => "COUNT_IF",
            Self::List => "LIST",
            Self::ListDistinct => "LIST_DISTINCT",
            Self::MinOf => "MIN_OF",
            Self::MaxOf => "MAX_OF",
        }
    }
}

impl FromStr for AggregatorFunction {
    type Err = MetacladError;
    fn from_str(s: &str) -> Result<Self> {
        let function = match s.trim().to_uppercase().as_str() {
            "SUM" => Self::Sum,
            "AVG" => Self::Avg,
            "MIN" => Self::Min,
            "MAX" => Self::Max,
            "COUNT" => Self::Count,
            "COUNT_DISTINCT" => Self::CountDistinct,
            "COUNT_IF" => Self::CountIf,
            "LIST" => Self::List,
            "LIST_DISTINCT" => Self::ListDistinct,
            "MIN_OF" => Self::MinOf,
            "MAX_OF" => Self::MaxOf,
            other => {
                return Err(MetacladError::Parse {
                    message: format!("unknown aggregator function \"{other}\""),
                })
            }
        };
        Ok(function)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Aggregator {
    function: AggregatorFunction,
    arguments: Vec<String>,
}

impl Aggregator {
    pub fn new(function: AggregatorFunction, arguments: Vec<String>) -> Self {
        Self {
            function,
            arguments,
        }
    }
    pub fn function(&self) -> AggregatorFunction {
        self.function
    }
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// Splits `ALIAS:FUNCTION(args)` into the bare alias and its aggregator.
    /// Returns `None` if the alias carries no recognizable aggregator suffix.
    pub fn split_alias(alias: &str) -> Option<(&str, Aggregator)> {
        // aliases never contain the separator, but function arguments may
        let position = alias.find(AGGREGATION_SEPARATOR)?;
        let (base, suffix) = (&alias[..position], &alias[position + 1..]);
        if base.is_empty() {
            return None;
        }
        suffix.parse::<Aggregator>().ok().map(|a| (base, a))
    }

    pub fn is_aggregated(alias: &str) -> bool {
        Self::split_alias(alias).is_some()
    }

    /// Appends this aggregator to an alias, e.g. `PRICE` -> `PRICE:SUM`.
    pub fn add_to_alias(&self, alias: &str) -> String {
        format!("{alias}{AGGREGATION_SEPARATOR}{self}")
    }

    /// Data type of the aggregated values: counts are integers, lists are
    /// strings, everything else keeps the type of the aggregated attribute.
    pub fn result_type(&self, aggregated: &DataType) -> DataType {
        match self.function {
            AggregatorFunction::Count
            | AggregatorFunction::CountDistinct
            | AggregatorFunction::CountIf => DataType::of(BaseType::Integer),
            AggregatorFunction::List | AggregatorFunction::ListDistinct => {
                DataType::of(BaseType::String)
            }
            _ => aggregated.clone(),
        }
    }
}

impl FromStr for Aggregator {
    type Err = MetacladError;
    fn from_str(s: &str) -> Result<Self> {
        let captures = AGGREGATOR.captures(s.trim()).ok_or_else(|| MetacladError::Parse {
            message: format!("invalid aggregator \"{s}\""),
        })?;
        let function = captures["function"].parse::<AggregatorFunction>()?;
        let arguments = match captures.name("arguments") {
            Some(a) if !a.as_str().trim().is_empty() => split_arguments(a.as_str()),
            _ => Vec::new(),
        };
        Ok(Self::new(function, arguments))
    }
}

// commas inside quotes do not separate arguments
fn split_arguments(arguments: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for c in arguments.chars() {
        match (c, quote) {
            ('\'' | '"', None) => {
                quote = Some(c);
                current.push(c);
            }
            (q, Some(open)) if q == open => {
                quote = None;
                current.push(c);
            }
            (',', None) => {
                result.push(current.trim().to_string());
                current = String::new();
            }
            _ => current.push(c),
        }
    }
    result.push(current.trim().to_string());
    result
}

impl fmt::Display for Aggregator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.arguments.is_empty() {
            write!(f, "{}", self.function.name())
        } else {
            write!(f, "{}({})", self.function.name(), self.arguments.join(", "))
        }
    }
}
