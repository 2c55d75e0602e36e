use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetacladError {
    #[error("Attribute \"{alias}\" not found for object \"{object}\"")]
    AttributeNotFound {
        object: String,
        alias: String,
        #[source]
        source: Option<Box<MetacladError>>,
    },
    #[error("Relation \"{alias}\"{} not found for object \"{object}\"", modifier_suffix(.modifier))]
    RelationNotFound {
        object: String,
        alias: String,
        modifier: String,
    },
    #[error("Relation \"{alias}\" of object \"{object}\" is ambiguous: {candidates} candidates, use a modifier (e.g. {alias}[KEY_ALIAS])")]
    RelationAmbiguous {
        object: String,
        alias: String,
        candidates: usize,
    },
    #[error("Object not found: {0}")]
    ObjectNotFound(String),
    #[error("Object alias already taken: {0}")]
    DuplicateObject(String),
    #[error("Cannot split value \"{value}\" of compound attribute \"{attribute}\": {reason}")]
    CompoundSplit {
        attribute: String,
        value: String,
        reason: String,
    },
    #[error("Cannot rebase expression \"{expression}\" to relation path \"{path}\"")]
    ExpressionRebaseImpossible { expression: String, path: String },
    #[error("Invalid comparator: {0}")]
    InvalidComparator(String),
    #[error("Invalid value \"{value}\" for data type {data_type}: {reason}")]
    InvalidValue {
        value: String,
        data_type: String,
        reason: String,
    },
    #[error("Data type not found: {0}")]
    DataTypeNotFound(String),
    #[error("Parse error: {message}")]
    Parse { message: String },
    #[error("Loader error: {0}")]
    Loader(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Internal invariant violated: {0}")]
    Invariant(String),
}

impl MetacladError {
    /// True for the two lookup failures that resolution is allowed to catch
    /// and re-raise with the context of the object where it started.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::AttributeNotFound { .. } | Self::RelationNotFound { .. }
        )
    }
}

fn modifier_suffix(modifier: &str) -> String {
    if modifier.is_empty() {
        String::new()
    } else {
        format!(" (modifier \"{modifier}\")")
    }
}

pub type Result<T> = std::result::Result<T, MetacladError>;

// Helper conversions
impl From<serde_json::Error> for MetacladError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse {
            message: e.to_string(),
        }
    }
}

impl From<config::ConfigError> for MetacladError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}
