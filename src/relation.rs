use std::fmt;

use crate::error::{MetacladError, Result};
use crate::{ObjectId, RelationId};

// ------------- Cardinality -------------
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// n:1, the left object references one right object (forward)
    NToOne,
    /// 1:n, many right objects reference the left object (reverse)
    OneToN,
    /// 1:1, a reverse relation with a uniqueness constraint
    OneToOne,
}

impl Cardinality {
    pub fn reversed(&self) -> Self {
        match self {
            Cardinality::NToOne => Cardinality::OneToN,
            Cardinality::OneToN => Cardinality::NToOne,
            Cardinality::OneToOne => Cardinality::OneToOne,
        }
    }
}

// ------------- Relation -------------
/// An edge between two meta objects as seen from its left object.
///
/// Key attributes are kept as aliases: the left key lives on the left object,
/// the right key on the right object. A missing key stands for the uid
/// attribute of its object and is resolved through the model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relation {
    id: RelationId,
    alias: String,
    alias_modifier: String,
    name: String,
    cardinality: Cardinality,
    left_object_id: ObjectId,
    left_key_alias: Option<String>,
    right_object_id: ObjectId,
    right_key_alias: Option<String>,
    reverse_alias: String,
    inherited_from_object_id: Option<ObjectId>,
}

impl Relation {
    /// Creates a forward (n:1) relation. The left key is the foreign key
    /// attribute of the left object and therefore mandatory.
    pub fn forward(
        id: RelationId,
        alias: &str,
        left_object_id: ObjectId,
        left_key_alias: &str,
        right_object_id: ObjectId,
        right_key_alias: Option<&str>,
        reverse_alias: &str,
    ) -> Result<Self> {
        if left_key_alias.trim().is_empty() {
            return Err(MetacladError::Invariant(format!(
                "forward relation \"{alias}\" needs a left key attribute"
            )));
        }
        Ok(Self {
            id,
            alias: alias.to_string(),
            alias_modifier: String::new(),
            name: alias.to_string(),
            cardinality: Cardinality::NToOne,
            left_object_id,
            left_key_alias: Some(left_key_alias.to_string()),
            right_object_id,
            right_key_alias: right_key_alias.map(str::to_string),
            reverse_alias: reverse_alias.to_string(),
            inherited_from_object_id: None,
        })
    }

    /// Creates a relation of any cardinality with all keys given explicitly.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: RelationId,
        alias: &str,
        alias_modifier: &str,
        cardinality: Cardinality,
        left_object_id: ObjectId,
        left_key_alias: Option<&str>,
        right_object_id: ObjectId,
        right_key_alias: Option<&str>,
        reverse_alias: &str,
    ) -> Result<Self> {
        if cardinality == Cardinality::NToOne && left_key_alias.is_none() {
            return Err(MetacladError::Invariant(format!(
                "forward relation \"{alias}\" needs a left key attribute"
            )));
        }
        Ok(Self {
            id,
            alias: alias.to_string(),
            alias_modifier: alias_modifier.to_string(),
            name: alias.to_string(),
            cardinality,
            left_object_id,
            left_key_alias: left_key_alias.map(str::to_string),
            right_object_id,
            right_key_alias: right_key_alias.map(str::to_string),
            reverse_alias: reverse_alias.to_string(),
            inherited_from_object_id: None,
        })
    }

    pub fn id(&self) -> RelationId {
        self.id
    }
    pub fn alias(&self) -> &str {
        &self.alias
    }
    pub fn alias_modifier(&self) -> &str {
        &self.alias_modifier
    }
    /// The alias including the modifier, e.g. `ORDER[CUSTOMER_ID]`.
    pub fn alias_with_modifier(&self) -> String {
        if self.alias_modifier.is_empty() {
            self.alias.clone()
        } else {
            format!("{}[{}]", self.alias, self.alias_modifier)
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }
    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }
    pub fn is_forward(&self) -> bool {
        self.cardinality == Cardinality::NToOne
    }
    pub fn is_reverse(&self) -> bool {
        !self.is_forward()
    }
    pub fn is_one_to_one(&self) -> bool {
        self.cardinality == Cardinality::OneToOne
    }
    pub fn left_object_id(&self) -> ObjectId {
        self.left_object_id
    }
    pub fn left_key_alias(&self) -> Option<&str> {
        self.left_key_alias.as_deref()
    }
    pub fn right_object_id(&self) -> ObjectId {
        self.right_object_id
    }
    pub fn right_key_alias(&self) -> Option<&str> {
        self.right_key_alias.as_deref()
    }
    pub fn reverse_alias(&self) -> &str {
        &self.reverse_alias
    }
    pub fn inherited_from_object_id(&self) -> Option<ObjectId> {
        self.inherited_from_object_id
    }
    pub fn is_inherited(&self) -> bool {
        self.inherited_from_object_id.is_some()
    }
    pub fn is_self_relation(&self) -> bool {
        self.left_object_id == self.right_object_id
    }

    /// The same edge seen from the right object. Reverse relations are
    /// disambiguated by the alias of the key attribute on their far side.
    pub fn reversed(&self) -> Self {
        let cardinality = self.cardinality.reversed();
        let alias_modifier = match cardinality {
            Cardinality::NToOne => String::new(),
            _ => self.left_key_alias.clone().unwrap_or_default(),
        };
        Self {
            id: self.id,
            alias: self.reverse_alias.clone(),
            alias_modifier,
            name: self.reverse_alias.clone(),
            cardinality,
            left_object_id: self.right_object_id,
            left_key_alias: self.right_key_alias.clone(),
            right_object_id: self.left_object_id,
            right_key_alias: self.left_key_alias.clone(),
            reverse_alias: self.alias.clone(),
            inherited_from_object_id: self.inherited_from_object_id,
        }
    }

    /// Copy owned by `owner`, keeping the right object. Provenance is only
    /// stamped if the relation does not already come from an ancestor.
    pub fn inherited_copy(&self, owner: ObjectId, ancestor: ObjectId) -> Self {
        let mut copy = self.clone();
        copy.left_object_id = owner;
        copy.inherited_from_object_id = self.inherited_from_object_id.or(Some(ancestor));
        copy
    }

    /// A relation of `ancestor` pointing at `ancestor` itself, rebuilt so that
    /// it points left and right at `owner`.
    pub fn inherited_self_relation(&self, owner: ObjectId, ancestor: ObjectId) -> Self {
        Self {
            id: self.id,
            alias: self.alias.clone(),
            alias_modifier: self.alias_modifier.clone(),
            name: self.name.clone(),
            cardinality: self.cardinality,
            left_object_id: owner,
            left_key_alias: self.left_key_alias.clone(),
            right_object_id: owner,
            right_key_alias: self.right_key_alias.clone(),
            reverse_alias: self.reverse_alias.clone(),
            inherited_from_object_id: self.inherited_from_object_id.or(Some(ancestor)),
        }
    }

    /// Same edge in the same direction, regardless of the object it was
    /// copied to.
    pub fn is_exactly(&self, other: &Relation) -> bool {
        self.id == other.id
            && self.cardinality == other.cardinality
            && self.alias.eq_ignore_ascii_case(&other.alias)
            && self.alias_modifier.eq_ignore_ascii_case(&other.alias_modifier)
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.alias_with_modifier())
    }
}
