//! Relation paths describe how to get from a start object to a related one.
//!
//! The textual form joins relation aliases with [`RELATION_SEPARATOR`], reverse
//! relations may carry a bracketed modifier: `ORDER[CUSTOMER_ID]__POSITION`.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{MetacladError, Result};
use crate::relation::Relation;
use crate::ObjectId;

pub const RELATION_SEPARATOR: &str = "__";

lazy_static! {
    static ref MODIFIED_ALIAS: Regex = Regex::new(r"^(?P<alias>[^\[\]]+)\[(?P<modifier>[^\[\]]+)\]$").unwrap();
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelationPath {
    start_object_id: ObjectId,
    relations: Vec<Relation>,
}

impl RelationPath {
    pub fn new(start_object_id: ObjectId) -> Self {
        Self {
            start_object_id,
            relations: Vec::new(),
        }
    }
    pub fn from_relations(start_object_id: ObjectId, relations: Vec<Relation>) -> Result<Self> {
        let mut path = Self::new(start_object_id);
        for relation in relations {
            path.append_relation(relation)?;
        }
        Ok(path)
    }
    pub fn start_object_id(&self) -> ObjectId {
        self.start_object_id
    }
    pub fn end_object_id(&self) -> ObjectId {
        self.relations
            .last()
            .map(|r| r.right_object_id())
            .unwrap_or(self.start_object_id)
    }
    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }
    pub fn first_relation(&self) -> Option<&Relation> {
        self.relations.first()
    }
    pub fn last_relation(&self) -> Option<&Relation> {
        self.relations.last()
    }
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }
    pub fn len(&self) -> usize {
        self.relations.len()
    }
    pub fn contains_reverse_relations(&self) -> bool {
        self.relations.iter().any(Relation::is_reverse)
    }

    pub fn append_relation(&mut self, relation: Relation) -> Result<&mut Self> {
        if relation.left_object_id() != self.end_object_id() {
            return Err(MetacladError::Invariant(format!(
                "relation \"{}\" does not start at the end of path \"{}\"",
                relation, self
            )));
        }
        self.relations.push(relation);
        Ok(self)
    }

    pub fn prepend_relation(&mut self, relation: Relation) -> Result<&mut Self> {
        if relation.right_object_id() != self.start_object_id {
            return Err(MetacladError::Invariant(format!(
                "relation \"{}\" does not lead to the start of path \"{}\"",
                relation, self
            )));
        }
        self.start_object_id = relation.left_object_id();
        self.relations.insert(0, relation);
        Ok(self)
    }

    pub fn with_prepended(&self, relation: Relation) -> Result<Self> {
        let mut path = self.clone();
        path.prepend_relation(relation)?;
        Ok(path)
    }

    pub fn append_path(&mut self, other: &RelationPath) -> Result<&mut Self> {
        if other.start_object_id != self.end_object_id() {
            return Err(MetacladError::Invariant(format!(
                "path \"{other}\" does not start at the end of path \"{self}\""
            )));
        }
        self.relations.extend(other.relations.iter().cloned());
        Ok(self)
    }

    pub fn combine(first: &RelationPath, second: &RelationPath) -> Result<Self> {
        let mut path = first.clone();
        path.append_path(second)?;
        Ok(path)
    }

    /// The path walked backwards: starts at the end object and uses the
    /// reverse of every relation.
    pub fn reversed(&self) -> Self {
        Self {
            start_object_id: self.end_object_id(),
            relations: self.relations.iter().rev().map(Relation::reversed).collect(),
        }
    }

    /// `length` relations starting at relation `start`; the result starts at
    /// the left object of its first relation.
    pub fn subpath(&self, start: usize, length: Option<usize>) -> Self {
        let start = start.min(self.relations.len());
        let end = match length {
            Some(l) => (start + l).min(self.relations.len()),
            None => self.relations.len(),
        };
        let start_object_id = match self.relations.get(start) {
            Some(r) => r.left_object_id(),
            None => self.end_object_id(),
        };
        Self {
            start_object_id,
            relations: self.relations[start..end].to_vec(),
        }
    }

    pub fn trim_start(&self, count: usize) -> Self {
        self.subpath(count, None)
    }

    pub fn trim_end(&self, count: usize) -> Self {
        let keep = self.relations.len().saturating_sub(count);
        let mut path = self.subpath(0, Some(keep));
        path.start_object_id = self.start_object_id;
        path
    }

    /// True if `other` is a prefix of this path (same start, same edges).
    pub fn starts_with(&self, other: &RelationPath) -> bool {
        self.start_object_id == other.start_object_id
            && other.relations.len() <= self.relations.len()
            && other
                .relations
                .iter()
                .zip(self.relations.iter())
                .all(|(a, b)| a.is_exactly(b))
    }

    // ------------- string helpers -------------

    /// Joins two alias paths, skipping empty parts.
    pub fn join(left: &str, right: &str) -> String {
        match (left.is_empty(), right.is_empty()) {
            (true, _) => right.to_string(),
            (_, true) => left.to_string(),
            _ => format!("{left}{RELATION_SEPARATOR}{right}"),
        }
    }

    /// Splits off the first segment of an alias path. Separators inside a
    /// bracketed modifier do not count.
    pub fn split_first(path: &str) -> Option<(&str, &str)> {
        let position = find_separator(path)?;
        Some((&path[..position], &path[position + RELATION_SEPARATOR.len()..]))
    }

    pub fn segments(path: &str) -> Vec<&str> {
        let mut segments = Vec::new();
        let mut rest = path;
        while let Some((head, tail)) = Self::split_first(rest) {
            segments.push(head);
            rest = tail;
        }
        if !rest.is_empty() {
            segments.push(rest);
        }
        segments
    }

    /// Splits `ALIAS[MODIFIER]` into its parts.
    pub fn parse_modifier(alias: &str) -> Option<(&str, &str)> {
        let captures = MODIFIED_ALIAS.captures(alias)?;
        let alias_part = captures.name("alias")?;
        let modifier = captures.name("modifier")?;
        Some((
            &alias[alias_part.start()..alias_part.end()],
            &alias[modifier.start()..modifier.end()],
        ))
    }
}

fn find_separator(path: &str) -> Option<usize> {
    let mut depth = 0usize;
    let bytes = path.as_bytes();
    let mut i = 0;
    while i + 1 < bytes.len() {
        match bytes[i] {
            b'[' => depth += 1,
            b']' => depth = depth.saturating_sub(1),
            b'_' if depth == 0 && bytes[i + 1] == b'_' => return Some(i),
            _ => (),
        }
        i += 1;
    }
    None
}

impl fmt::Display for RelationPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let aliases: Vec<String> = self
            .relations
            .iter()
            .map(Relation::alias_with_modifier)
            .collect();
        write!(f, "{}", aliases.join(RELATION_SEPARATOR))
    }
}
