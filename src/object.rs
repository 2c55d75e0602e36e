use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::attribute::Attribute;
use crate::behavior::{Behavior, BehaviorList};
use crate::relation::Relation;
use crate::{ObjectId, OtherHasher};

// ------------- Attribute Cache -------------
#[derive(Clone, Debug, PartialEq)]
pub enum CachedAttribute {
    Resolved(Arc<Attribute>),
    KnownMissing,
    Unknown,
}

/// Results of alias resolution on one object. Entries stay authoritative
/// until the cache is cleared.
#[derive(Debug, Default)]
pub struct AttributeCache {
    kept: HashMap<String, Option<Arc<Attribute>>, OtherHasher>,
}

impl AttributeCache {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn lookup(&self, alias: &str) -> CachedAttribute {
        match self.kept.get(&alias.to_uppercase()) {
            Some(Some(attribute)) => CachedAttribute::Resolved(Arc::clone(attribute)),
            Some(None) => CachedAttribute::KnownMissing,
            None => CachedAttribute::Unknown,
        }
    }
    pub fn resolved(&mut self, alias: &str, attribute: Arc<Attribute>) {
        self.kept.insert(alias.to_uppercase(), Some(attribute));
    }
    pub fn missing(&mut self, alias: &str) {
        self.kept.insert(alias.to_uppercase(), None);
    }
    pub fn clear(&mut self) {
        self.kept.clear();
    }
    pub fn len(&self) -> usize {
        self.kept.len()
    }
    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }
}

// ------------- Meta Object -------------
/// A business object of the model: its attributes, its relations to other
/// objects and everything it inherited from its parents.
///
/// Objects only know other objects by id. Anything that has to look at more
/// than one object goes through [`crate::model::Model`].
#[derive(Debug)]
pub struct MetaObject {
    id: ObjectId,
    alias: String,
    namespace: String,
    name: String,
    data_address: String,
    data_address_properties: Map<String, Value>,
    readable: bool,
    writable: bool,
    data_source: Option<String>,
    data_source_readable: bool,
    data_source_writable: bool,
    uid_attribute_alias: Option<String>,
    label_attribute_alias: Option<String>,
    short_description: String,
    default_editor: Value,
    inherits_from: Option<ObjectId>,
    attributes: Vec<Arc<Attribute>>,
    attribute_index: HashMap<String, usize, OtherHasher>,
    relations: Vec<Relation>,
    relation_index: HashMap<(String, String), usize, OtherHasher>,
    parents: Vec<ObjectId>,
    behaviors: BehaviorList,
    cache: AttributeCache,
}

impl MetaObject {
    pub fn new(id: ObjectId, alias: &str, namespace: &str) -> Self {
        Self {
            id,
            alias: alias.to_string(),
            namespace: namespace.to_string(),
            name: alias.to_string(),
            data_address: String::new(),
            data_address_properties: Map::new(),
            readable: true,
            writable: true,
            data_source: None,
            data_source_readable: true,
            data_source_writable: true,
            uid_attribute_alias: None,
            label_attribute_alias: None,
            short_description: String::new(),
            default_editor: Value::Null,
            inherits_from: None,
            attributes: Vec::new(),
            attribute_index: HashMap::default(),
            relations: Vec::new(),
            relation_index: HashMap::default(),
            parents: Vec::new(),
            behaviors: BehaviorList::new(),
            cache: AttributeCache::new(),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }
    pub fn alias(&self) -> &str {
        &self.alias
    }
    pub fn namespace(&self) -> &str {
        &self.namespace
    }
    /// `NAMESPACE.ALIAS`, or just the alias outside of any namespace.
    pub fn alias_with_namespace(&self) -> String {
        if self.namespace.is_empty() {
            self.alias.clone()
        } else {
            format!("{}.{}", self.namespace, self.alias)
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }
    pub fn data_address(&self) -> &str {
        &self.data_address
    }
    pub fn set_data_address(&mut self, data_address: &str) {
        self.data_address = data_address.to_string();
    }
    pub fn data_address_properties(&self) -> &Map<String, Value> {
        &self.data_address_properties
    }
    pub fn set_data_address_properties(&mut self, properties: Map<String, Value>) {
        self.data_address_properties = properties;
    }

    // ------------- access -------------
    /// Readable if the object itself and its data source both are.
    pub fn is_readable(&self) -> bool {
        self.readable && self.data_source_readable
    }
    pub fn is_writable(&self) -> bool {
        self.writable && self.data_source_writable
    }
    /// The object's own flags, without its data source.
    pub fn access_flags(&self) -> (bool, bool) {
        (self.readable, self.writable)
    }
    pub fn set_readable(&mut self, readable: bool) {
        self.readable = readable;
    }
    pub fn set_writable(&mut self, writable: bool) {
        self.writable = writable;
    }
    pub fn data_source(&self) -> Option<&str> {
        self.data_source.as_deref()
    }
    pub fn has_data_source(&self) -> bool {
        self.data_source.is_some()
    }
    pub fn set_data_source(&mut self, data_source: Option<&str>, readable: bool, writable: bool) {
        self.data_source = data_source.map(str::to_string);
        self.data_source_readable = readable;
        self.data_source_writable = writable;
    }

    // ------------- presentation -------------
    pub fn uid_attribute_alias(&self) -> Option<&str> {
        self.uid_attribute_alias.as_deref()
    }
    pub fn set_uid_attribute_alias(&mut self, alias: Option<&str>) {
        self.uid_attribute_alias = alias.map(str::to_string);
    }
    pub fn label_attribute_alias(&self) -> Option<&str> {
        self.label_attribute_alias.as_deref()
    }
    pub fn set_label_attribute_alias(&mut self, alias: Option<&str>) {
        self.label_attribute_alias = alias.map(str::to_string);
    }
    pub fn short_description(&self) -> &str {
        &self.short_description
    }
    pub fn set_short_description(&mut self, description: &str) {
        self.short_description = description.to_string();
    }
    pub fn default_editor(&self) -> &Value {
        &self.default_editor
    }
    pub fn set_default_editor(&mut self, editor: Value) {
        self.default_editor = editor;
    }

    // ------------- inheritance -------------
    /// Parent declared by the loader, extended from when the model loads
    /// this object.
    pub fn inherits_from(&self) -> Option<ObjectId> {
        self.inherits_from
    }
    pub fn set_inherits_from(&mut self, parent: Option<ObjectId>) {
        self.inherits_from = parent;
    }
    /// Objects this one was extended from directly, in extension order.
    pub fn parents(&self) -> &[ObjectId] {
        &self.parents
    }
    pub fn has_parent(&self, parent: ObjectId) -> bool {
        self.parents.contains(&parent)
    }
    pub(crate) fn add_parent(&mut self, parent: ObjectId) -> bool {
        if self.has_parent(parent) {
            return false;
        }
        self.parents.push(parent);
        true
    }

    // ------------- attributes -------------
    pub fn attributes(&self) -> &[Arc<Attribute>] {
        &self.attributes
    }
    /// Case-insensitive lookup among the object's own attributes.
    pub fn attribute_exact(&self, alias: &str) -> Option<&Arc<Attribute>> {
        self.attribute_index
            .get(&alias.to_uppercase())
            .map(|&i| &self.attributes[i])
    }
    /// Adds an attribute, replacing one with the same alias in place.
    pub fn add_attribute(&mut self, attribute: Attribute) -> Arc<Attribute> {
        let key = attribute.alias().to_uppercase();
        let attribute = Arc::new(attribute);
        match self.attribute_index.get(&key) {
            Some(&i) => self.attributes[i] = Arc::clone(&attribute),
            None => {
                self.attribute_index.insert(key, self.attributes.len());
                self.attributes.push(Arc::clone(&attribute));
            }
        }
        self.cache.clear();
        attribute
    }

    // ------------- relations -------------
    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }
    /// Adds a relation to the `(alias, modifier)` slot, replacing what was
    /// there.
    pub fn add_relation(&mut self, relation: Relation) {
        let key = relation_key(relation.alias(), relation.alias_modifier());
        match self.relation_index.get(&key) {
            Some(&i) => self.relations[i] = relation,
            None => {
                self.relation_index.insert(key, self.relations.len());
                self.relations.push(relation);
            }
        }
        self.cache.clear();
    }
    /// All relations registered under `alias`, whatever their modifier.
    pub fn relations_by_alias(&self, alias: &str) -> Vec<&Relation> {
        self.relations
            .iter()
            .filter(|r| r.alias().eq_ignore_ascii_case(alias))
            .collect()
    }
    pub fn relation_exact(&self, alias: &str, modifier: &str) -> Option<&Relation> {
        self.relation_index
            .get(&relation_key(alias, modifier))
            .map(|&i| &self.relations[i])
    }

    /// Removes the object's own attributes and relations so they can be put
    /// back after inheriting from a parent.
    pub(crate) fn take_members(&mut self) -> (Vec<Arc<Attribute>>, Vec<Relation>) {
        self.attribute_index.clear();
        self.relation_index.clear();
        self.cache.clear();
        (
            std::mem::take(&mut self.attributes),
            std::mem::take(&mut self.relations),
        )
    }

    // ------------- behaviors -------------
    pub fn behaviors(&self) -> &BehaviorList {
        &self.behaviors
    }
    pub fn add_behavior(&mut self, behavior: Box<dyn Behavior>) {
        self.behaviors.add(behavior);
    }

    // ------------- cache -------------
    pub fn cached_attribute(&self, alias: &str) -> CachedAttribute {
        self.cache.lookup(alias)
    }
    pub(crate) fn cache_resolved(&mut self, alias: &str, attribute: Arc<Attribute>) {
        self.cache.resolved(alias, attribute);
    }
    pub(crate) fn cache_missing(&mut self, alias: &str) {
        self.cache.missing(alias);
    }
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
    pub fn clear_attribute_cache(&mut self) {
        self.cache.clear();
    }
}

fn relation_key(alias: &str, modifier: &str) -> (String, String) {
    (alias.to_uppercase(), modifier.to_uppercase())
}

impl fmt::Display for MetaObject {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.alias_with_namespace())
    }
}
