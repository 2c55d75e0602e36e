// used to parse dates and times in condition values
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
// used for decimal numbers
use bigdecimal::BigDecimal;

// used when parsing a string to a number
use std::str::FromStr;
// used to print out readable forms of a data type
use std::fmt;
use std::collections::HashMap;

use crate::OtherHasher;
use crate::error::{MetacladError, Result};

// ------------- Base Types --------------
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BaseType {
    String,
    Integer,
    Number,
    Boolean,
    Date,
    DateTime,
    Time,
    Json,
}

impl BaseType {
    pub fn name(&self) -> &'static str {
        match self {
            BaseType::String => "String",
            BaseType::Integer => "Integer",
            BaseType::Number => "Number",
            BaseType::Boolean => "Boolean",
            BaseType::Date => "Date",
            BaseType::DateTime => "DateTime",
            BaseType::Time => "Time",
            BaseType::Json => "Json",
        }
    }
    const ALL: [BaseType; 8] = [
        BaseType::String,
        BaseType::Integer,
        BaseType::Number,
        BaseType::Boolean,
        BaseType::Date,
        BaseType::DateTime,
        BaseType::Time,
        BaseType::Json,
    ];
}

// ------------- Data Type --------------
/// A data type descriptor as referenced by attributes and conditions.
/// Custom types keep their own alias but validate like their base type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DataType {
    alias: String,
    base: BaseType,
}

impl DataType {
    pub fn new(alias: &str, base: BaseType) -> Self {
        Self {
            alias: alias.to_string(),
            base,
        }
    }
    pub fn of(base: BaseType) -> Self {
        Self::new(base.name(), base)
    }
    pub fn alias(&self) -> &str {
        &self.alias
    }
    pub fn base(&self) -> BaseType {
        self.base
    }
    pub fn is_numeric(&self) -> bool {
        matches!(self.base, BaseType::Integer | BaseType::Number)
    }

    /// Validates a single value and returns its normalized form.
    pub fn parse(&self, value: &str) -> Result<String> {
        let trimmed = value.trim();
        let invalid = |reason: &str| MetacladError::InvalidValue {
            value: value.to_string(),
            data_type: self.alias.clone(),
            reason: reason.to_string(),
        };
        match self.base {
            BaseType::String => Ok(value.to_string()),
            BaseType::Integer => trimmed
                .parse::<i64>()
                .map(|i| i.to_string())
                .map_err(|e| invalid(&e.to_string())),
            BaseType::Number => BigDecimal::from_str(trimmed)
                .map(|d| d.normalized().to_string())
                .map_err(|e| invalid(&e.to_string())),
            BaseType::Boolean => match trimmed.to_lowercase().as_str() {
                "1" | "true" | "yes" => Ok("1".to_string()),
                "0" | "false" | "no" => Ok("0".to_string()),
                _ => Err(invalid("not a boolean")),
            },
            BaseType::Date => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .map(|d| d.format("%Y-%m-%d").to_string())
                .map_err(|e| invalid(&e.to_string())),
            BaseType::DateTime => ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
                .or_else(|| {
                    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                        .ok()
                        .and_then(|d| d.and_hms_opt(0, 0, 0))
                })
                .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
                .ok_or_else(|| invalid("not a date/time")),
            BaseType::Time => ["%H:%M:%S", "%H:%M"]
                .iter()
                .find_map(|format| NaiveTime::parse_from_str(trimmed, format).ok())
                .map(|t| t.format("%H:%M:%S").to_string())
                .ok_or_else(|| invalid("not a time")),
            BaseType::Json => serde_json::from_str::<serde_json::Value>(trimmed)
                .map(|j| j.to_string())
                .map_err(|e| invalid(&e.to_string())),
        }
    }
}

impl Default for DataType {
    fn default() -> Self {
        Self::of(BaseType::String)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.alias)
    }
}

// ------------- Registry --------------
/// Resolves data type aliases referenced by the model. Namespaced aliases
/// (`core.Date`) fall back to their last segment when not registered.
#[derive(Debug, Clone)]
pub struct DataTypeRegistry {
    kept: HashMap<String, DataType, OtherHasher>,
}

impl DataTypeRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            kept: HashMap::default(),
        };
        for base in BaseType::ALL {
            registry.register(DataType::of(base));
        }
        registry
    }
    pub fn register(&mut self, data_type: DataType) {
        self.kept.insert(data_type.alias().to_uppercase(), data_type);
    }
    pub fn resolve(&self, alias: &str) -> Result<DataType> {
        let key = alias.trim().to_uppercase();
        if let Some(data_type) = self.kept.get(&key) {
            return Ok(data_type.clone());
        }
        key.rsplit('.')
            .next()
            .and_then(|short| self.kept.get(short))
            .cloned()
            .ok_or_else(|| MetacladError::DataTypeNotFound(alias.to_string()))
    }
    pub fn len(&self) -> usize {
        self.kept.len()
    }
}

impl Default for DataTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
