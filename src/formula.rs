use std::fmt;

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use crate::error::{MetacladError, Result};

#[derive(Parser)]
#[grammar = "formula.pest"]
struct FormulaParser;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormulaArgument {
    Call(Formula),
    /// Quoted string, quotes included
    String(String),
    Number(String),
    /// Anything unquoted and non-numeric is taken to be an attribute alias
    Reference(String),
}

/// A parsed formula call such as `=Concat(NAME, ' ', CUSTOMER__NAME)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Formula {
    name: String,
    arguments: Vec<FormulaArgument>,
}

impl Formula {
    pub fn parse(raw: &str) -> Result<Self> {
        let mut pairs = FormulaParser::parse(Rule::formula, raw.trim()).map_err(|e| MetacladError::Parse {
            message: format!("invalid formula \"{raw}\": {e}"),
        })?;
        pairs
            .next()
            .and_then(|formula| formula.into_inner().find(|p| p.as_rule() == Rule::call))
            .map(build_call)
            .ok_or_else(|| MetacladError::Parse {
                message: format!("invalid formula \"{raw}\""),
            })
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn arguments(&self) -> &[FormulaArgument] {
        &self.arguments
    }

    /// Attribute references anywhere in the formula, nested calls included.
    pub fn references(&self) -> Vec<&str> {
        let mut references = Vec::new();
        for argument in &self.arguments {
            match argument {
                FormulaArgument::Reference(r) => references.push(r.as_str()),
                FormulaArgument::Call(inner) => references.extend(inner.references()),
                _ => (),
            }
        }
        references
    }

    /// The same formula with every reference replaced by `map(reference)`.
    pub fn map_references<F>(&self, map: &mut F) -> Result<Formula>
    where
        F: FnMut(&str) -> Result<String>,
    {
        let mut arguments = Vec::with_capacity(self.arguments.len());
        for argument in &self.arguments {
            arguments.push(match argument {
                FormulaArgument::Reference(r) => FormulaArgument::Reference(map(r)?),
                FormulaArgument::Call(inner) => FormulaArgument::Call(inner.map_references(map)?),
                other => other.clone(),
            });
        }
        Ok(Formula {
            name: self.name.clone(),
            arguments,
        })
    }

    fn fmt_call(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, argument) in self.arguments.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match argument {
                FormulaArgument::Call(inner) => inner.fmt_call(f)?,
                FormulaArgument::String(s)
                | FormulaArgument::Number(s)
                | FormulaArgument::Reference(s) => write!(f, "{s}")?,
            }
        }
        write!(f, ")")
    }
}

fn build_call(pair: Pair<Rule>) -> Formula {
    let mut inner = pair.into_inner();
    let name = inner.next().map(|p| p.as_str().to_string()).unwrap_or_default();
    let arguments = inner
        .map(|p| match p.as_rule() {
            Rule::call => FormulaArgument::Call(build_call(p)),
            Rule::string => FormulaArgument::String(p.as_str().to_string()),
            Rule::number => FormulaArgument::Number(p.as_str().to_string()),
            _ => FormulaArgument::Reference(p.as_str().to_string()),
        })
        .collect();
    Formula { name, arguments }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "=")?;
        self.fmt_call(f)
    }
}
