//! Compound attributes: one logical value stored as several components.
//!
//! A compound with components `[A(prefix "", suffix "-"), B]` stores
//! `"12-34"` as `A = "12"` and `B = "34"`. Delimiters between components
//! are the suffix of one component followed by the prefix of the next.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::attribute::{Attribute, MetaAttribute, RelatedAttribute};
use crate::condition::{Comparator, Condition, ConditionGroup, LogicalOperator};
use crate::error::{MetacladError, Result};
use crate::expression::Expression;
use crate::model::Model;
use crate::relation_path::RelationPath;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompoundAttributeComponent {
    /// Alias of the component attribute on the object of the compound
    pub attribute: String,
    #[serde(default)]
    pub sequence_index: usize,
    #[serde(default)]
    pub value_prefix: String,
    #[serde(default)]
    pub value_suffix: String,
}

impl CompoundAttributeComponent {
    pub fn new(attribute: &str, sequence_index: usize, value_prefix: &str, value_suffix: &str) -> Self {
        Self {
            attribute: attribute.to_string(),
            sequence_index,
            value_prefix: value_prefix.to_string(),
            value_suffix: value_suffix.to_string(),
        }
    }
}

/// A compound attribute together with its (loaded) components.
#[derive(Clone, Debug)]
pub struct CompoundAttribute {
    attribute: Arc<Attribute>,
    components: Vec<CompoundAttributeComponent>,
}

impl CompoundAttribute {
    pub fn new(attribute: Arc<Attribute>, mut components: Vec<CompoundAttributeComponent>) -> Self {
        components.sort_by_key(|c| c.sequence_index);
        Self {
            attribute,
            components,
        }
    }
    pub fn attribute(&self) -> &Arc<Attribute> {
        &self.attribute
    }
    pub fn components(&self) -> &[CompoundAttributeComponent] {
        &self.components
    }

    fn split_error(&self, value: &str, reason: &str) -> MetacladError {
        MetacladError::CompoundSplit {
            attribute: self.attribute.alias_with_relation_path(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Splits a compound value into one value per component.
    pub fn split_value(&self, value: &str) -> Result<Vec<String>> {
        let (first, last) = match (self.components.first(), self.components.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(self.split_error(value, "no components")),
        };
        let mut rest = value
            .strip_prefix(first.value_prefix.as_str())
            .unwrap_or(value);
        let mut parts = Vec::with_capacity(self.components.len());
        for pair in self.components.windows(2) {
            let delimiter = format!("{}{}", pair[0].value_suffix, pair[1].value_prefix);
            if delimiter.is_empty() {
                return Err(self.split_error(
                    value,
                    &format!(
                        "no delimiter between components \"{}\" and \"{}\"",
                        pair[0].attribute, pair[1].attribute
                    ),
                ));
            }
            let (part, tail) = rest.split_once(delimiter.as_str()).ok_or_else(|| {
                self.split_error(value, &format!("delimiter \"{delimiter}\" not found"))
            })?;
            parts.push(part.to_string());
            rest = tail;
        }
        if !last.value_suffix.is_empty() {
            rest = rest
                .strip_suffix(last.value_suffix.as_str())
                .ok_or_else(|| self.split_error(value, "value left over after last component"))?;
        }
        parts.push(rest.to_string());
        Ok(parts)
    }

    /// Joins component values into the compound value.
    pub fn merge_values<S: AsRef<str>>(&self, values: &[S]) -> Result<String> {
        if values.len() != self.components.len() {
            return Err(MetacladError::CompoundSplit {
                attribute: self.attribute.alias_with_relation_path(),
                value: values.iter().map(|v| v.as_ref()).collect::<Vec<_>>().join(", "),
                reason: format!("expected {} component values", self.components.len()),
            });
        }
        let mut merged = String::new();
        for (component, value) in self.components.iter().zip(values) {
            merged.push_str(&component.value_prefix);
            merged.push_str(value.as_ref());
            merged.push_str(&component.value_suffix);
        }
        Ok(merged)
    }

    /// Component attributes seen through the relation path of the compound.
    pub fn component_attributes(&self, model: &mut Model) -> Result<Vec<RelatedAttribute>> {
        let mut attributes = Vec::with_capacity(self.components.len());
        for component in &self.components {
            let native = model.get_attribute(self.attribute.object_id(), &component.attribute)?;
            attributes.push(RelatedAttribute::new(
                native,
                self.attribute.relation_path().clone(),
            ));
        }
        Ok(attributes)
    }

    /// Turns a condition over the compound into conditions over its
    /// components. Negated comparators combine with OR, the others with AND.
    pub fn split_condition(&self, model: &mut Model, condition: &Condition) -> Result<ConditionGroup> {
        let comparator = condition.comparator();
        match comparator {
            Comparator::Is | Comparator::Equals | Comparator::IsNot | Comparator::EqualsNot => {
                let values = self.split_value(condition.value())?;
                let operator = if comparator.is_negated() {
                    LogicalOperator::Or
                } else {
                    LogicalOperator::And
                };
                let base_object_id = condition
                    .expression()
                    .object_id()
                    .unwrap_or_else(|| self.attribute.start_object_id());
                let mut group = ConditionGroup::new(operator);
                group.set_base_object_id(Some(base_object_id));
                for (component, value) in self.component_attributes(model)?.iter().zip(values) {
                    let expression = Expression::attribute(
                        base_object_id,
                        &component.alias_with_relation_path(),
                    );
                    group.add_condition(Condition::new(
                        expression,
                        comparator,
                        &value,
                        component.data_type().clone(),
                    )?);
                }
                Ok(group)
            }
            Comparator::In | Comparator::NotIn => {
                let delimiter = self.attribute.value_list_delimiter();
                let values: Vec<&str> = condition.value().split(delimiter).collect();
                if values.len() != 1 {
                    return Err(self.split_error(
                        condition.value(),
                        "cannot split a list of values over compound components",
                    ));
                }
                let single = if comparator == Comparator::In {
                    Comparator::Equals
                } else {
                    Comparator::EqualsNot
                };
                let degraded = condition.with_comparator(single, values[0].trim())?;
                self.split_condition(model, &degraded)
            }
            other => Err(self.split_error(
                condition.value(),
                &format!("cannot split conditions with comparator {other}"),
            )),
        }
    }

    /// Relation path prefix shared by all component expressions.
    pub fn relation_path(&self) -> &RelationPath {
        self.attribute.relation_path()
    }
}
