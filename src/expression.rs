//! Expressions tell apart what a raw string in a condition or an attribute
//! default means: an attribute alias, a formula, a literal or a reference to
//! a widget. Evaluating them is up to the consumers.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::trace;

use crate::error::{MetacladError, Result};
use crate::formula::Formula;
use crate::model::Model;
use crate::relation_path::{RelationPath, RELATION_SEPARATOR};
use crate::ObjectId;

pub const FORMULA_SIGIL: char = '=';
pub const WIDGET_LINK_SIGIL: char = '~';

lazy_static! {
    static ref WIDGET_LINK: Regex = Regex::new(r"^=[A-Za-z0-9_\-\.\[\]]+!\S*$").unwrap();
    static ref NUMBER: Regex = Regex::new(r"^-?\d+(\.\d+)?$").unwrap();
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExpressionKind {
    Empty,
    Attribute { alias: String },
    Formula(Formula),
    Literal { value: String, quoted: bool },
    WidgetReference { link: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expression {
    kind: ExpressionKind,
    object_id: Option<ObjectId>,
}

impl Expression {
    /// An attribute expression trusted to be valid for `object_id`.
    pub fn attribute(object_id: ObjectId, alias: &str) -> Self {
        Self {
            kind: ExpressionKind::Attribute {
                alias: alias.to_string(),
            },
            object_id: Some(object_id),
        }
    }
    pub fn literal(value: &str) -> Self {
        Self {
            kind: ExpressionKind::Literal {
                value: value.to_string(),
                quoted: false,
            },
            object_id: None,
        }
    }
    pub fn empty() -> Self {
        Self {
            kind: ExpressionKind::Empty,
            object_id: None,
        }
    }

    /// Classifies `raw` relative to `object_id`. Without an object nothing
    /// can be an attribute, so unquoted words become literals.
    pub fn parse(model: &mut Model, object_id: Option<ObjectId>, raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let kind = if trimmed.is_empty() {
            ExpressionKind::Empty
        } else if trimmed.starts_with(WIDGET_LINK_SIGIL) || WIDGET_LINK.is_match(trimmed) {
            ExpressionKind::WidgetReference {
                link: trimmed.to_string(),
            }
        } else if trimmed.starts_with(FORMULA_SIGIL) {
            ExpressionKind::Formula(Formula::parse(trimmed)?)
        } else if let Some(unquoted) = unquote(trimmed) {
            ExpressionKind::Literal {
                value: unquoted.to_string(),
                quoted: true,
            }
        } else if NUMBER.is_match(trimmed) {
            ExpressionKind::Literal {
                value: trimmed.to_string(),
                quoted: false,
            }
        } else if object_id.is_some_and(|id| model.is_attribute_alias(id, trimmed)) {
            ExpressionKind::Attribute {
                alias: trimmed.to_string(),
            }
        } else {
            ExpressionKind::Literal {
                value: trimmed.to_string(),
                quoted: false,
            }
        };
        trace!(expression = trimmed, kind = ?kind, "classified expression");
        Ok(Self { kind, object_id })
    }

    pub fn kind(&self) -> &ExpressionKind {
        &self.kind
    }
    pub fn object_id(&self) -> Option<ObjectId> {
        self.object_id
    }
    pub fn is_empty(&self) -> bool {
        matches!(self.kind, ExpressionKind::Empty)
    }
    pub fn is_attribute(&self) -> bool {
        matches!(self.kind, ExpressionKind::Attribute { .. })
    }
    pub fn is_formula(&self) -> bool {
        matches!(self.kind, ExpressionKind::Formula(_))
    }
    pub fn is_literal(&self) -> bool {
        matches!(self.kind, ExpressionKind::Literal { .. })
    }
    pub fn is_widget_reference(&self) -> bool {
        matches!(self.kind, ExpressionKind::WidgetReference { .. })
    }
    pub fn attribute_alias(&self) -> Option<&str> {
        match &self.kind {
            ExpressionKind::Attribute { alias } => Some(alias),
            _ => None,
        }
    }
    pub fn formula(&self) -> Option<&Formula> {
        match &self.kind {
            ExpressionKind::Formula(formula) => Some(formula),
            _ => None,
        }
    }
    pub fn literal_value(&self) -> Option<&str> {
        match &self.kind {
            ExpressionKind::Literal { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Aliases of all attributes this expression needs to be evaluated.
    pub fn required_attributes(&self) -> Vec<String> {
        match &self.kind {
            ExpressionKind::Attribute { alias } => vec![alias.clone()],
            ExpressionKind::Formula(formula) => {
                formula.references().into_iter().map(str::to_string).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Rewrites the expression relative to the object at the end of
    /// `relation_path`, a path starting at the object of this expression.
    ///
    /// Attributes below the path lose the path prefix. Other attributes are
    /// reached through the reversed path unless `drop_non_matching` is set.
    pub fn rebase(&self, model: &mut Model, relation_path: &str, drop_non_matching: bool) -> Result<Self> {
        if relation_path.is_empty() {
            return Ok(self.clone());
        }
        let impossible = || MetacladError::ExpressionRebaseImpossible {
            expression: self.to_string(),
            path: relation_path.to_string(),
        };
        let object_id = match &self.kind {
            ExpressionKind::Attribute { .. } | ExpressionKind::Formula(_) => {
                self.object_id.ok_or_else(impossible)?
            }
            _ => return Ok(self.clone()),
        };
        let path = model
            .relation_path(object_id, relation_path)
            .map_err(|_| impossible())?;
        let mut rebase = |alias: &str| {
            rebase_alias(model, &path, relation_path, alias, drop_non_matching)
                .map_err(|_| impossible())
        };
        let kind = match &self.kind {
            ExpressionKind::Attribute { alias } => ExpressionKind::Attribute {
                alias: rebase(alias)?,
            },
            ExpressionKind::Formula(formula) => {
                ExpressionKind::Formula(formula.map_references(&mut rebase)?)
            }
            other => other.clone(),
        };
        Ok(Self {
            kind,
            object_id: Some(path.end_object_id()),
        })
    }
}

fn rebase_alias(
    model: &mut Model,
    path: &RelationPath,
    path_string: &str,
    alias: &str,
    drop_non_matching: bool,
) -> Result<String> {
    let segments = RelationPath::segments(alias);
    let depth = path.len();
    if segments.len() >= depth {
        let head = segments[..depth].join(RELATION_SEPARATOR);
        let leads_along_path = model
            .relation_path(path.start_object_id(), &head)
            .is_ok_and(|walked| walked.starts_with(path));
        if leads_along_path && segments.len() > depth {
            return Ok(segments[depth..].join(RELATION_SEPARATOR));
        }
        // a condition over the relation itself becomes one over the key it points to
        if leads_along_path {
            if let Some(relation) = path.last_relation() {
                let key = model.relation_right_key(relation)?;
                return Ok(key.alias().to_string());
            }
        }
    }
    if drop_non_matching {
        return Err(MetacladError::ExpressionRebaseImpossible {
            expression: alias.to_string(),
            path: path_string.to_string(),
        });
    }
    let rerouted = RelationPath::join(&path.reversed().to_string(), alias);
    if model.has_attribute(path.end_object_id(), &rerouted) {
        Ok(rerouted)
    } else {
        Err(MetacladError::ExpressionRebaseImpossible {
            expression: alias.to_string(),
            path: path_string.to_string(),
        })
    }
}

fn unquote(s: &str) -> Option<&str> {
    let first = s.chars().next()?;
    if s.len() >= 2 && (first == '\'' || first == '"') && s.ends_with(first) {
        Some(&s[1..s.len() - 1])
    } else {
        None
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            ExpressionKind::Empty => Ok(()),
            ExpressionKind::Attribute { alias } => write!(f, "{alias}"),
            ExpressionKind::Formula(formula) => write!(f, "{formula}"),
            ExpressionKind::Literal { value, quoted: true } => write!(f, "'{value}'"),
            ExpressionKind::Literal { value, quoted: false } => write!(f, "{value}"),
            ExpressionKind::WidgetReference { link } => write!(f, "{link}"),
        }
    }
}
