//! Conditions and condition groups: logical trees over expressions.
//!
//! Groups round-trip through UXON, a nested key-value form used by
//! configuration files and UI definitions:
//!
//! ```json
//! {
//!   "operator": "AND",
//!   "conditions": [
//!     {"expression": "CUSTOMER__NAME", "comparator": "=", "value": "Bob", "object_alias": "shop.ORDER"}
//!   ],
//!   "nested_groups": [{"operator": "OR", "conditions": []}]
//! }
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregator::Aggregator;
use crate::datatype::{BaseType, DataType};
use crate::error::{MetacladError, Result};
use crate::expression::Expression;
use crate::model::Model;
use crate::ObjectId;

pub const VALUE_LIST_DELIMITER: &str = ",";
pub const RANGE_DELIMITER: &str = "..";

// ------------- Comparator -------------
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Comparator {
    /// `=` fuzzy match
    Is,
    /// `!=`
    IsNot,
    /// `==` exact match
    Equals,
    /// `!==`
    EqualsNot,
    LessThan,
    LessThanOrEquals,
    GreaterThan,
    GreaterThanOrEquals,
    /// `[` value is one of a delimited list
    In,
    /// `![`
    NotIn,
    /// `..` value lies within `from..to`
    Between,
}

impl Comparator {
    const ALL: [Comparator; 11] = [
        Comparator::Is,
        Comparator::IsNot,
        Comparator::Equals,
        Comparator::EqualsNot,
        Comparator::LessThan,
        Comparator::LessThanOrEquals,
        Comparator::GreaterThan,
        Comparator::GreaterThanOrEquals,
        Comparator::In,
        Comparator::NotIn,
        Comparator::Between,
    ];
    // longest first, so "!==" is not mistaken for "!="
    const PREFIXES: [Comparator; 10] = [
        Comparator::EqualsNot,
        Comparator::IsNot,
        Comparator::Equals,
        Comparator::LessThanOrEquals,
        Comparator::GreaterThanOrEquals,
        Comparator::NotIn,
        Comparator::Is,
        Comparator::LessThan,
        Comparator::GreaterThan,
        Comparator::In,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Comparator::Is => "=",
            Comparator::IsNot => "!=",
            Comparator::Equals => "==",
            Comparator::EqualsNot => "!==",
            Comparator::LessThan => "<",
            Comparator::LessThanOrEquals => "<=",
            Comparator::GreaterThan => ">",
            Comparator::GreaterThanOrEquals => ">=",
            Comparator::In => "[",
            Comparator::NotIn => "![",
            Comparator::Between => "..",
        }
    }
    pub fn name(&self) -> &'static str {
        match self {
            Comparator::Is => "IS",
            Comparator::IsNot => "IS_NOT",
            Comparator::Equals => "EQUALS",
            Comparator::EqualsNot => "EQUALS_NOT",
            Comparator::LessThan => "LESS_THAN",
            Comparator::LessThanOrEquals => "LESS_THAN_OR_EQUALS",
            Comparator::GreaterThan => "GREATER_THAN",
            Comparator::GreaterThanOrEquals => "GREATER_THAN_OR_EQUALS",
            Comparator::In => "IN",
            Comparator::NotIn => "NOT_IN",
            Comparator::Between => "BETWEEN",
        }
    }
    pub fn is_negated(&self) -> bool {
        matches!(self, Comparator::IsNot | Comparator::EqualsNot | Comparator::NotIn)
    }
    pub fn is_list(&self) -> bool {
        matches!(self, Comparator::In | Comparator::NotIn)
    }
    pub fn negated(&self) -> Option<Comparator> {
        let negated = match self {
            Comparator::Is => Comparator::IsNot,
            Comparator::IsNot => Comparator::Is,
            Comparator::Equals => Comparator::EqualsNot,
            Comparator::EqualsNot => Comparator::Equals,
            Comparator::LessThan => Comparator::GreaterThanOrEquals,
            Comparator::LessThanOrEquals => Comparator::GreaterThan,
            Comparator::GreaterThan => Comparator::LessThanOrEquals,
            Comparator::GreaterThanOrEquals => Comparator::LessThan,
            Comparator::In => Comparator::NotIn,
            Comparator::NotIn => Comparator::In,
            Comparator::Between => return None,
        };
        Some(negated)
    }

    /// Splits a comparator written in front of a value: `"<=5"` gives
    /// `(Some(LessThanOrEquals), "5")`.
    pub fn sniff(value: &str) -> (Option<Comparator>, &str) {
        for comparator in Self::PREFIXES {
            if let Some(rest) = value.strip_prefix(comparator.symbol()) {
                return (Some(comparator), rest);
            }
        }
        (None, value)
    }
}

impl FromStr for Comparator {
    type Err = MetacladError;
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        Self::ALL
            .iter()
            .find(|c| c.symbol() == trimmed || c.name().eq_ignore_ascii_case(trimmed))
            .copied()
            .ok_or_else(|| MetacladError::InvalidComparator(s.to_string()))
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

// ------------- Logical Operator -------------
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LogicalOperator {
    And,
    Or,
    Xor,
}

impl FromStr for LogicalOperator {
    type Err = MetacladError;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "AND" => Ok(LogicalOperator::And),
            "OR" => Ok(LogicalOperator::Or),
            "XOR" => Ok(LogicalOperator::Xor),
            other => Err(MetacladError::Parse {
                message: format!("unknown logical operator \"{other}\""),
            }),
        }
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LogicalOperator::And => write!(f, "AND"),
            LogicalOperator::Or => write!(f, "OR"),
            LogicalOperator::Xor => write!(f, "XOR"),
        }
    }
}

// ------------- UXON -------------
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UxonCondition {
    pub expression: String,
    #[serde(default)]
    pub comparator: String,
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_alias: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UxonConditionGroup {
    #[serde(default = "default_operator")]
    pub operator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_object_alias: Option<String>,
    #[serde(default)]
    pub conditions: Vec<UxonCondition>,
    #[serde(default)]
    pub nested_groups: Vec<UxonConditionGroup>,
}

fn default_operator() -> String {
    LogicalOperator::And.to_string()
}

// ------------- Condition -------------
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Condition {
    expression: Expression,
    comparator: Comparator,
    value: String,
    data_type: DataType,
    value_list_delimiter: String,
}

impl Condition {
    /// Builds a condition, validating and normalizing `value` against
    /// `data_type`. Empty values are kept: such conditions are empty.
    pub fn new(expression: Expression, comparator: Comparator, value: &str, data_type: DataType) -> Result<Self> {
        Self::with_delimiter(expression, comparator, value, data_type, VALUE_LIST_DELIMITER)
    }

    /// Like [`Condition::new`], with value lists split on `value_list_delimiter`.
    pub fn with_delimiter(
        expression: Expression,
        comparator: Comparator,
        value: &str,
        data_type: DataType,
        value_list_delimiter: &str,
    ) -> Result<Self> {
        let value = normalize_value(&data_type, comparator, value, value_list_delimiter)?;
        Ok(Self {
            expression,
            comparator,
            value,
            data_type,
            value_list_delimiter: value_list_delimiter.to_string(),
        })
    }

    /// Parses `expression` relative to `object_id`. Without a comparator
    /// one written in front of the value is used, then `=`.
    pub fn from_string(
        model: &mut Model,
        object_id: ObjectId,
        expression: &str,
        value: &str,
        comparator: Option<Comparator>,
    ) -> Result<Self> {
        let expression = Expression::parse(model, Some(object_id), expression)?;
        let (comparator, value) = match comparator {
            Some(c) => (c, value),
            None => match Comparator::sniff(value) {
                (Some(c), rest) => (c, rest),
                (None, rest) => (Comparator::Is, rest),
            },
        };
        let (data_type, delimiter) = match expression.attribute_alias() {
            Some(alias) => {
                let attribute = model.get_attribute(object_id, alias)?;
                let data_type = match Aggregator::split_alias(alias) {
                    Some((_, aggregator)) => aggregator.result_type(attribute.data_type()),
                    None => attribute.data_type().clone(),
                };
                (data_type, attribute.value_list_delimiter().to_string())
            }
            None => (DataType::of(BaseType::String), VALUE_LIST_DELIMITER.to_string()),
        };
        Self::with_delimiter(expression, comparator, value, data_type, &delimiter)
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }
    pub fn comparator(&self) -> Comparator {
        self.comparator
    }
    pub fn value(&self) -> &str {
        &self.value
    }
    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }
    pub fn value_list_delimiter(&self) -> &str {
        &self.value_list_delimiter
    }
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Same expression, different comparator and value.
    pub fn with_comparator(&self, comparator: Comparator, value: &str) -> Result<Self> {
        Self::with_delimiter(
            self.expression.clone(),
            comparator,
            value,
            self.data_type.clone(),
            &self.value_list_delimiter,
        )
    }

    pub fn rebase(&self, model: &mut Model, relation_path: &str, drop_non_matching: bool) -> Result<Self> {
        Ok(Self {
            expression: self.expression.rebase(model, relation_path, drop_non_matching)?,
            comparator: self.comparator,
            value: self.value.clone(),
            data_type: self.data_type.clone(),
            value_list_delimiter: self.value_list_delimiter.clone(),
        })
    }

    pub fn export_uxon(&self, model: &mut Model) -> Result<UxonCondition> {
        let object_alias = match self.expression.object_id() {
            Some(id) => Some(model.object(id)?.alias_with_namespace()),
            None => None,
        };
        Ok(UxonCondition {
            expression: self.expression.to_string(),
            comparator: self.comparator.symbol().to_string(),
            value: self.value.clone(),
            object_alias,
        })
    }

    pub fn import_uxon(model: &mut Model, base_object_id: Option<ObjectId>, uxon: &UxonCondition) -> Result<Self> {
        let object_id = match &uxon.object_alias {
            Some(alias) => model.object_id(alias)?,
            None => base_object_id.ok_or_else(|| {
                MetacladError::Parse {
                    message: format!("condition \"{}\" has no object", uxon.expression),
                }
            })?,
        };
        let comparator = if uxon.comparator.trim().is_empty() {
            None
        } else {
            Some(uxon.comparator.parse::<Comparator>()?)
        };
        Self::from_string(model, object_id, &uxon.expression, &uxon.value, comparator)
    }
}

fn normalize_value(data_type: &DataType, comparator: Comparator, value: &str, delimiter: &str) -> Result<String> {
    if value.is_empty() || data_type.base() == BaseType::String {
        return Ok(value.to_string());
    }
    match comparator {
        Comparator::In | Comparator::NotIn => {
            let mut parsed = Vec::new();
            for item in value.split(delimiter) {
                parsed.push(data_type.parse(item)?);
            }
            Ok(parsed.join(delimiter))
        }
        Comparator::Between => {
            let (from, to) = value.split_once(RANGE_DELIMITER).ok_or_else(|| MetacladError::InvalidValue {
                value: value.to_string(),
                data_type: data_type.to_string(),
                reason: format!("expected a range like from{RANGE_DELIMITER}to"),
            })?;
            Ok(format!("{}{RANGE_DELIMITER}{}", data_type.parse(from)?, data_type.parse(to)?))
        }
        _ => data_type.parse(value),
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} {}", self.expression, self.comparator, self.value)
    }
}

// ------------- Condition Group -------------
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConditionGroup {
    operator: LogicalOperator,
    conditions: Vec<Condition>,
    nested_groups: Vec<ConditionGroup>,
    base_object_id: Option<ObjectId>,
}

impl ConditionGroup {
    pub fn new(operator: LogicalOperator) -> Self {
        Self {
            operator,
            conditions: Vec::new(),
            nested_groups: Vec::new(),
            base_object_id: None,
        }
    }
    pub fn for_object(operator: LogicalOperator, base_object_id: ObjectId) -> Self {
        let mut group = Self::new(operator);
        group.base_object_id = Some(base_object_id);
        group
    }
    pub fn operator(&self) -> LogicalOperator {
        self.operator
    }
    pub fn set_operator(&mut self, operator: LogicalOperator) {
        self.operator = operator;
    }
    pub fn base_object_id(&self) -> Option<ObjectId> {
        self.base_object_id
    }
    pub fn set_base_object_id(&mut self, base_object_id: Option<ObjectId>) {
        self.base_object_id = base_object_id;
    }
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }
    pub fn nested_groups(&self) -> &[ConditionGroup] {
        &self.nested_groups
    }

    pub fn add_condition(&mut self, condition: Condition) -> &mut Self {
        self.conditions.push(condition);
        self
    }
    pub fn add_nested_group(&mut self, group: ConditionGroup) -> &mut Self {
        self.nested_groups.push(group);
        self
    }
    pub fn add_condition_from_string(
        &mut self,
        model: &mut Model,
        expression: &str,
        value: &str,
        comparator: Option<Comparator>,
    ) -> Result<&mut Self> {
        let object_id = self.base_object_id.ok_or_else(|| {
            MetacladError::Invariant("condition group has no base object".to_string())
        })?;
        let condition = Condition::from_string(model, object_id, expression, value, comparator)?;
        Ok(self.add_condition(condition))
    }

    /// Removes all direct conditions over `expression` and returns how many
    /// were removed.
    pub fn remove_conditions_for(&mut self, expression: &str) -> usize {
        let before = self.conditions.len();
        self.conditions
            .retain(|c| !c.expression().to_string().eq_ignore_ascii_case(expression));
        before - self.conditions.len()
    }

    /// Number of conditions in this group and all nested groups.
    pub fn count_conditions(&self) -> usize {
        self.conditions.len()
            + self
                .nested_groups
                .iter()
                .map(ConditionGroup::count_conditions)
                .sum::<usize>()
    }
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.nested_groups.iter().all(ConditionGroup::is_empty)
    }

    /// Rebases every condition onto the object at the end of
    /// `relation_path`. Conditions that cannot be rebased are dropped.
    pub fn rebase(&self, model: &mut Model, relation_path: &str, drop_non_matching: bool) -> Result<Self> {
        let base_object_id = match self.base_object_id {
            Some(id) => Some(model.relation_path(id, relation_path)?.end_object_id()),
            None => None,
        };
        let mut result = Self {
            operator: self.operator,
            conditions: Vec::new(),
            nested_groups: Vec::new(),
            base_object_id,
        };
        for condition in &self.conditions {
            match condition.rebase(model, relation_path, drop_non_matching) {
                Ok(rebased) => {
                    result.add_condition(rebased);
                }
                Err(MetacladError::ExpressionRebaseImpossible { expression, path }) => {
                    debug!(%expression, %path, "dropping condition that cannot be rebased");
                }
                Err(e) => return Err(e),
            }
        }
        for group in &self.nested_groups {
            let rebased = group.rebase(model, relation_path, drop_non_matching)?;
            if !rebased.is_empty() {
                result.add_nested_group(rebased);
            }
        }
        Ok(result)
    }

    pub fn export_uxon(&self, model: &mut Model) -> Result<UxonConditionGroup> {
        let base_object_alias = match self.base_object_id {
            Some(id) => Some(model.object(id)?.alias_with_namespace()),
            None => None,
        };
        let mut conditions = Vec::with_capacity(self.conditions.len());
        for condition in &self.conditions {
            conditions.push(condition.export_uxon(model)?);
        }
        let mut nested_groups = Vec::with_capacity(self.nested_groups.len());
        for group in &self.nested_groups {
            nested_groups.push(group.export_uxon(model)?);
        }
        Ok(UxonConditionGroup {
            operator: self.operator.to_string(),
            base_object_alias,
            conditions,
            nested_groups,
        })
    }

    pub fn export_json(&self, model: &mut Model) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self.export_uxon(model)?)?)
    }

    pub fn import_uxon(model: &mut Model, base_object_id: Option<ObjectId>, uxon: &UxonConditionGroup) -> Result<Self> {
        let base_object_id = match &uxon.base_object_alias {
            Some(alias) => Some(model.object_id(alias)?),
            None => base_object_id,
        };
        let mut group = Self::new(uxon.operator.parse::<LogicalOperator>()?);
        group.base_object_id = base_object_id;
        for condition in &uxon.conditions {
            group.add_condition(Condition::import_uxon(model, base_object_id, condition)?);
        }
        for nested in &uxon.nested_groups {
            group.add_nested_group(Self::import_uxon(model, base_object_id, nested)?);
        }
        Ok(group)
    }

    pub fn import_json(model: &mut Model, base_object_id: Option<ObjectId>, json: &serde_json::Value) -> Result<Self> {
        let uxon: UxonConditionGroup = serde_json::from_value(json.clone())?;
        Self::import_uxon(model, base_object_id, &uxon)
    }
}

impl fmt::Display for ConditionGroup {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut parts: Vec<String> = self.conditions.iter().map(|c| c.to_string()).collect();
        parts.extend(self.nested_groups.iter().map(|g| g.to_string()));
        write!(f, "({})", parts.join(format!(" {} ", self.operator).as_str()))
    }
}
