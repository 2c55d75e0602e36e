//! Model loaders fetch object definitions from wherever the model lives.
//!
//! [`MemoryLoader`] keeps a whole [`ModelDefinition`] in memory, typically
//! read from a JSON file:
//!
//! ```json
//! {"objects": [
//!   {"id": 2, "alias": "CUSTOMER", "namespace": "shop", "uid_attribute": "ID",
//!    "attributes": [{"id": 21, "alias": "ID", "data_type": "Integer"},
//!                   {"id": 22, "alias": "NAME"}]},
//!   {"id": 1, "alias": "ORDER", "namespace": "shop", "uid_attribute": "ID",
//!    "attributes": [{"id": 11, "alias": "ID", "data_type": "Integer"},
//!                   {"id": 12, "alias": "CUSTOMER", "data_type": "Integer"}],
//!    "relations": [{"id": 101, "alias": "CUSTOMER", "left_key": "CUSTOMER", "right_object": 2}]}
//! ]}
//! ```
//!
//! Only forward relations are defined. Every object gets the reverse of each
//! forward relation pointing at it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use roaring::RoaringTreemap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::trace;

use crate::attribute::Attribute;
use crate::compound::CompoundAttributeComponent;
use crate::datatype::DataTypeRegistry;
use crate::error::{MetacladError, Result};
use crate::object::MetaObject;
use crate::relation::{Cardinality, Relation};
use crate::{AttributeId, ObjectId, RelationId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ObjectSelector {
    Id(ObjectId),
    /// `NAMESPACE.ALIAS` or a bare alias
    Alias(String),
}

impl std::fmt::Display for ObjectSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ObjectSelector::Id(id) => write!(f, "#{id}"),
            ObjectSelector::Alias(alias) => write!(f, "{alias}"),
        }
    }
}

pub trait ModelLoader {
    fn load_object(&mut self, selector: &ObjectSelector, data_types: &DataTypeRegistry) -> Result<MetaObject>;
    /// Components of a compound attribute whose components were not given
    /// up front.
    fn load_attribute_components(&mut self, attribute: &Attribute) -> Result<Vec<CompoundAttributeComponent>>;
    fn load_app(&mut self, app: &str) -> Result<()>;
}

// ------------- Definitions -------------
fn yes() -> bool {
    true
}
fn default_data_type() -> String {
    String::from("String")
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ModelDefinition {
    #[serde(default)]
    pub objects: Vec<ObjectDefinition>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ObjectDefinition {
    pub id: ObjectId,
    pub alias: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub data_address: String,
    #[serde(default)]
    pub data_address_properties: Map<String, Value>,
    #[serde(default = "yes")]
    pub readable: bool,
    #[serde(default = "yes")]
    pub writable: bool,
    #[serde(default)]
    pub data_source: Option<String>,
    #[serde(default = "yes")]
    pub data_source_readable: bool,
    #[serde(default = "yes")]
    pub data_source_writable: bool,
    #[serde(default)]
    pub uid_attribute: Option<String>,
    #[serde(default)]
    pub label_attribute: Option<String>,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub default_editor: Value,
    #[serde(default)]
    pub extends: Option<ObjectId>,
    #[serde(default)]
    pub attributes: Vec<AttributeDefinition>,
    #[serde(default)]
    pub relations: Vec<RelationDefinition>,
}

impl ObjectDefinition {
    fn matches(&self, selector: &ObjectSelector) -> bool {
        match selector {
            ObjectSelector::Id(id) => self.id == *id,
            ObjectSelector::Alias(alias) => match alias.rsplit_once('.') {
                Some((namespace, bare)) => {
                    self.namespace.eq_ignore_ascii_case(namespace) && self.alias.eq_ignore_ascii_case(bare)
                }
                None => self.alias.eq_ignore_ascii_case(alias),
            },
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AttributeDefinition {
    pub id: AttributeId,
    pub alias: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_data_type")]
    pub data_type: String,
    #[serde(default)]
    pub data_address: String,
    #[serde(default)]
    pub data_address_properties: Map<String, Value>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default = "yes")]
    pub editable: bool,
    #[serde(default)]
    pub system: bool,
    #[serde(default = "yes")]
    pub filterable: bool,
    #[serde(default = "yes")]
    pub sortable: bool,
    #[serde(default = "yes")]
    pub aggregatable: bool,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub fixed_value: Option<String>,
    #[serde(default)]
    pub default_aggregate_function: Option<String>,
    #[serde(default)]
    pub value_list_delimiter: Option<String>,
    /// Makes this a compound attribute. Components are handed out lazily.
    #[serde(default)]
    pub components: Option<Vec<CompoundAttributeComponent>>,
    /// Makes this a custom attribute with the given source tag.
    #[serde(default)]
    pub custom_source: Option<String>,
}

/// A forward relation: `left_key` on the defining object points at
/// `right_key` (or the uid attribute) of `right_object`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelationDefinition {
    pub id: RelationId,
    pub alias: String,
    #[serde(default)]
    pub name: Option<String>,
    pub left_key: String,
    pub right_object: ObjectId,
    #[serde(default)]
    pub right_key: Option<String>,
    /// Alias of the reverse relation, defaults to the alias of the defining
    /// object.
    #[serde(default)]
    pub reverse_alias: Option<String>,
    #[serde(default)]
    pub one_to_one: bool,
}

// ------------- Memory Loader -------------
#[derive(Debug)]
pub struct MemoryLoader {
    definition: ModelDefinition,
    value_list_delimiter: String,
    loads: Arc<AtomicUsize>,
    apps: Vec<String>,
}

impl MemoryLoader {
    pub fn new(definition: ModelDefinition) -> Self {
        Self {
            definition,
            value_list_delimiter: String::from(","),
            loads: Arc::new(AtomicUsize::new(0)),
            apps: Vec::new(),
        }
    }
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(serde_json::from_str(json)?))
    }
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(Self::new(serde_json::from_value(value)?))
    }
    /// Delimiter for attributes that do not define their own.
    pub fn with_value_list_delimiter(mut self, delimiter: &str) -> Self {
        self.value_list_delimiter = delimiter.to_string();
        self
    }
    /// Shared counter of objects handed out so far.
    pub fn load_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.loads)
    }
    pub fn loaded_apps(&self) -> &[String] {
        &self.apps
    }

    fn find(&self, selector: &ObjectSelector) -> Result<&ObjectDefinition> {
        let mut found = self.definition.objects.iter().filter(|o| o.matches(selector));
        match (found.next(), found.next()) {
            (Some(object), None) => Ok(object),
            (Some(_), Some(_)) => Err(MetacladError::Loader(format!(
                "object selector {selector} matches more than one object"
            ))),
            (None, _) => Err(MetacladError::ObjectNotFound(selector.to_string())),
        }
    }

    /// True if `alias` is an attribute of `object` or of one of its ancestors.
    fn declares_attribute(&self, object: &ObjectDefinition, alias: &str) -> bool {
        let mut visited = RoaringTreemap::new();
        let mut current = Some(object);
        while let Some(definition) = current {
            if !visited.insert(definition.id) {
                return false;
            }
            if definition.attributes.iter().any(|a| a.alias.eq_ignore_ascii_case(alias)) {
                return true;
            }
            current = definition
                .extends
                .and_then(|parent| self.definition.objects.iter().find(|o| o.id == parent));
        }
        false
    }

    fn check_left_key(&self, owner: &ObjectDefinition, relation: &RelationDefinition) -> Result<()> {
        if self.declares_attribute(owner, &relation.left_key) {
            Ok(())
        } else {
            Err(MetacladError::Invariant(format!(
                "left key \"{}\" of relation \"{}\" is no attribute of object \"{}\"",
                relation.left_key, relation.alias, owner.alias
            )))
        }
    }

    fn build_attribute(
        &self,
        object_id: ObjectId,
        definition: &AttributeDefinition,
        data_types: &DataTypeRegistry,
    ) -> Result<Attribute> {
        let data_type = data_types.resolve(&definition.data_type)?;
        let mut attribute = match (&definition.components, &definition.custom_source) {
            (Some(_), _) => Attribute::compound(definition.id, object_id, &definition.alias, data_type, Vec::new()),
            (None, Some(source)) => Attribute::custom(definition.id, object_id, &definition.alias, data_type, source),
            (None, None) => Attribute::new(definition.id, object_id, &definition.alias, data_type),
        };
        if let Some(name) = &definition.name {
            attribute.set_name(name);
        }
        attribute.set_data_address(&definition.data_address);
        attribute.set_data_address_properties(definition.data_address_properties.clone());
        attribute.set_required(definition.required);
        attribute.set_hidden(definition.hidden);
        attribute.set_editable(definition.editable);
        attribute.set_system(definition.system);
        attribute.set_filterable(definition.filterable);
        attribute.set_sortable(definition.sortable);
        attribute.set_aggregatable(definition.aggregatable);
        attribute.set_default_value(definition.default_value.as_deref());
        attribute.set_fixed_value(definition.fixed_value.as_deref());
        attribute.set_default_aggregate_function(definition.default_aggregate_function.as_deref());
        attribute.set_value_list_delimiter(
            definition
                .value_list_delimiter
                .as_deref()
                .unwrap_or(&self.value_list_delimiter),
        );
        Ok(attribute)
    }

    fn forward_relation(owner: &ObjectDefinition, definition: &RelationDefinition) -> Result<Relation> {
        let mut relation = Relation::forward(
            definition.id,
            &definition.alias,
            owner.id,
            &definition.left_key,
            definition.right_object,
            definition.right_key.as_deref(),
            definition.reverse_alias.as_deref().unwrap_or(&owner.alias),
        )?;
        if let Some(name) = &definition.name {
            relation.set_name(name);
        }
        Ok(relation)
    }

    fn reverse_relation(owner: &ObjectDefinition, definition: &RelationDefinition) -> Result<Relation> {
        let reversed = Self::forward_relation(owner, definition)?.reversed();
        if !definition.one_to_one {
            return Ok(reversed);
        }
        Relation::new(
            reversed.id(),
            reversed.alias(),
            reversed.alias_modifier(),
            Cardinality::OneToOne,
            reversed.left_object_id(),
            reversed.left_key_alias(),
            reversed.right_object_id(),
            reversed.right_key_alias(),
            reversed.reverse_alias(),
        )
    }
}

impl ModelLoader for MemoryLoader {
    fn load_object(&mut self, selector: &ObjectSelector, data_types: &DataTypeRegistry) -> Result<MetaObject> {
        let definition = self.find(selector)?;
        let mut object = MetaObject::new(definition.id, &definition.alias, &definition.namespace);
        if let Some(name) = &definition.name {
            object.set_name(name);
        }
        object.set_data_address(&definition.data_address);
        object.set_data_address_properties(definition.data_address_properties.clone());
        object.set_readable(definition.readable);
        object.set_writable(definition.writable);
        object.set_data_source(
            definition.data_source.as_deref(),
            definition.data_source_readable,
            definition.data_source_writable,
        );
        object.set_uid_attribute_alias(definition.uid_attribute.as_deref());
        object.set_label_attribute_alias(definition.label_attribute.as_deref());
        object.set_short_description(&definition.short_description);
        object.set_default_editor(definition.default_editor.clone());
        object.set_inherits_from(definition.extends);
        for attribute in &definition.attributes {
            object.add_attribute(self.build_attribute(definition.id, attribute, data_types)?);
        }
        for relation in &definition.relations {
            self.check_left_key(definition, relation)?;
            object.add_relation(Self::forward_relation(definition, relation)?);
        }
        for owner in &self.definition.objects {
            for relation in owner.relations.iter().filter(|r| r.right_object == definition.id) {
                self.check_left_key(owner, relation)?;
                object.add_relation(Self::reverse_relation(owner, relation)?);
            }
        }
        self.loads.fetch_add(1, Ordering::SeqCst);
        trace!(object = %object, attributes = object.attributes().len(), relations = object.relations().len(), "built object");
        Ok(object)
    }

    fn load_attribute_components(&mut self, attribute: &Attribute) -> Result<Vec<CompoundAttributeComponent>> {
        self.definition
            .objects
            .iter()
            .flat_map(|o| o.attributes.iter())
            .find(|a| a.id == attribute.id())
            .and_then(|a| a.components.clone())
            .ok_or_else(|| {
                MetacladError::Loader(format!(
                    "no components defined for attribute \"{}\"",
                    attribute.alias()
                ))
            })
    }

    fn load_app(&mut self, app: &str) -> Result<()> {
        let known = self.definition.objects.iter().any(|o| {
            o.namespace.eq_ignore_ascii_case(app)
                || o.namespace
                    .to_uppercase()
                    .starts_with(&format!("{}.", app.to_uppercase()))
        });
        if !known {
            return Err(MetacladError::Loader(format!("app \"{app}\" not found")));
        }
        if !self.apps.iter().any(|a| a.eq_ignore_ascii_case(app)) {
            self.apps.push(app.to_string());
        }
        Ok(())
    }
}
