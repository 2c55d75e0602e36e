use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::compound::CompoundAttributeComponent;
use crate::datatype::DataType;
use crate::error::Result;
use crate::relation::Relation;
use crate::relation_path::RelationPath;
use crate::{AttributeId, ObjectId};

// ------------- Attribute Kind -------------
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeKind {
    Regular,
    /// Backed by several attributes of the same object. Components are
    /// filled in by the loader on first use unless given up front.
    Compound(Vec<CompoundAttributeComponent>),
    /// Added at runtime rather than by the model, e.g. by a behavior.
    Custom { source: String },
}

// ------------- Attribute -------------
/// A named, typed property of a meta object.
///
/// Attributes obtained through relations are copies of the attribute of the
/// related object: same id, same owning object, but a relation path that
/// starts at the object the lookup was made on.
#[derive(Clone, Debug, PartialEq)]
pub struct Attribute {
    id: AttributeId,
    object_id: ObjectId,
    alias: String,
    name: String,
    kind: AttributeKind,
    data_type: DataType,
    data_address: String,
    data_address_properties: Map<String, Value>,
    required: bool,
    hidden: bool,
    editable: bool,
    system: bool,
    filterable: bool,
    sortable: bool,
    aggregatable: bool,
    default_value: Option<String>,
    fixed_value: Option<String>,
    default_aggregate_function: Option<String>,
    value_list_delimiter: String,
    relation_path: RelationPath,
    inherited_from_object_id: Option<ObjectId>,
}

impl Attribute {
    pub fn new(id: AttributeId, object_id: ObjectId, alias: &str, data_type: DataType) -> Self {
        Self {
            id,
            object_id,
            alias: alias.to_string(),
            name: alias.to_string(),
            kind: AttributeKind::Regular,
            data_type,
            data_address: String::new(),
            data_address_properties: Map::new(),
            required: false,
            hidden: false,
            editable: true,
            system: false,
            filterable: true,
            sortable: true,
            aggregatable: true,
            default_value: None,
            fixed_value: None,
            default_aggregate_function: None,
            value_list_delimiter: String::from(","),
            relation_path: RelationPath::new(object_id),
            inherited_from_object_id: None,
        }
    }

    pub fn custom(id: AttributeId, object_id: ObjectId, alias: &str, data_type: DataType, source: &str) -> Self {
        let mut attribute = Self::new(id, object_id, alias, data_type);
        attribute.kind = AttributeKind::Custom {
            source: source.to_string(),
        };
        attribute
    }

    pub fn compound(
        id: AttributeId,
        object_id: ObjectId,
        alias: &str,
        data_type: DataType,
        components: Vec<CompoundAttributeComponent>,
    ) -> Self {
        let mut attribute = Self::new(id, object_id, alias, data_type);
        attribute.kind = AttributeKind::Compound(components);
        attribute
    }

    // ------------- getters -------------
    pub fn id(&self) -> AttributeId {
        self.id
    }
    pub fn object_id(&self) -> ObjectId {
        self.object_id
    }
    pub fn alias(&self) -> &str {
        &self.alias
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn kind(&self) -> &AttributeKind {
        &self.kind
    }
    pub fn is_compound(&self) -> bool {
        matches!(self.kind, AttributeKind::Compound(_))
    }
    pub fn is_custom(&self) -> bool {
        matches!(self.kind, AttributeKind::Custom { .. })
    }
    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }
    pub fn data_address(&self) -> &str {
        &self.data_address
    }
    pub fn data_address_properties(&self) -> &Map<String, Value> {
        &self.data_address_properties
    }
    pub fn is_required(&self) -> bool {
        self.required
    }
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }
    pub fn is_editable(&self) -> bool {
        self.editable
    }
    pub fn is_system(&self) -> bool {
        self.system
    }
    pub fn is_filterable(&self) -> bool {
        self.filterable
    }
    pub fn is_sortable(&self) -> bool {
        self.sortable
    }
    pub fn is_aggregatable(&self) -> bool {
        self.aggregatable
    }
    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }
    pub fn fixed_value(&self) -> Option<&str> {
        self.fixed_value.as_deref()
    }
    pub fn default_aggregate_function(&self) -> Option<&str> {
        self.default_aggregate_function.as_deref()
    }
    pub fn value_list_delimiter(&self) -> &str {
        &self.value_list_delimiter
    }
    pub fn relation_path(&self) -> &RelationPath {
        &self.relation_path
    }
    pub fn inherited_from_object_id(&self) -> Option<ObjectId> {
        self.inherited_from_object_id
    }
    pub fn is_inherited(&self) -> bool {
        self.inherited_from_object_id.is_some()
    }
    /// `CUSTOMER__NAME` for `NAME` reached through relation `CUSTOMER`.
    pub fn alias_with_relation_path(&self) -> String {
        RelationPath::join(&self.relation_path.to_string(), &self.alias)
    }
    /// The object the relation path of this attribute starts at.
    pub fn start_object_id(&self) -> ObjectId {
        self.relation_path.start_object_id()
    }

    // ------------- setters used by loaders -------------
    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }
    pub fn set_data_address(&mut self, data_address: &str) {
        self.data_address = data_address.to_string();
    }
    pub fn set_data_address_properties(&mut self, properties: Map<String, Value>) {
        self.data_address_properties = properties;
    }
    pub fn set_required(&mut self, required: bool) {
        self.required = required;
    }
    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }
    pub fn set_editable(&mut self, editable: bool) {
        self.editable = editable;
    }
    pub fn set_system(&mut self, system: bool) {
        self.system = system;
    }
    pub fn set_filterable(&mut self, filterable: bool) {
        self.filterable = filterable;
    }
    pub fn set_sortable(&mut self, sortable: bool) {
        self.sortable = sortable;
    }
    pub fn set_aggregatable(&mut self, aggregatable: bool) {
        self.aggregatable = aggregatable;
    }
    pub fn set_default_value(&mut self, value: Option<&str>) {
        self.default_value = value.map(str::to_string);
    }
    pub fn set_fixed_value(&mut self, value: Option<&str>) {
        self.fixed_value = value.map(str::to_string);
    }
    pub fn set_default_aggregate_function(&mut self, function: Option<&str>) {
        self.default_aggregate_function = function.map(str::to_string);
    }
    pub fn set_value_list_delimiter(&mut self, delimiter: &str) {
        self.value_list_delimiter = delimiter.to_string();
    }
    pub fn set_components(&mut self, components: Vec<CompoundAttributeComponent>) {
        self.kind = AttributeKind::Compound(components);
    }

    // ------------- copies -------------

    /// The same attribute seen through `relation_path`.
    pub fn with_relation_path(&self, relation_path: RelationPath) -> Self {
        let mut copy = self.clone();
        copy.relation_path = relation_path;
        copy
    }

    /// Copy of an attribute found on a related object, seen from the left
    /// object of `relation`.
    pub fn via_relation(&self, relation: &Relation) -> Result<Self> {
        let path = self.relation_path.with_prepended(relation.clone())?;
        Ok(self.with_relation_path(path))
    }

    /// Copy owned by `owner` for inheritance. Provenance is only stamped if
    /// the attribute does not already come from an ancestor.
    pub fn inherited_copy(&self, owner: ObjectId, ancestor: ObjectId) -> Self {
        let mut copy = self.clone();
        copy.object_id = owner;
        copy.relation_path = RelationPath::new(owner);
        copy.inherited_from_object_id = self.inherited_from_object_id.or(Some(ancestor));
        copy
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.alias_with_relation_path())
    }
}

// ------------- MetaAttribute -------------
/// Read access shared by attributes and attribute views. Everything forwards
/// to [`MetaAttribute::attribute`] unless an implementor overrides it.
pub trait MetaAttribute {
    fn attribute(&self) -> &Attribute;

    fn id(&self) -> AttributeId {
        self.attribute().id()
    }
    fn alias(&self) -> &str {
        self.attribute().alias()
    }
    fn data_type(&self) -> &DataType {
        self.attribute().data_type()
    }
    fn object_id(&self) -> ObjectId {
        self.attribute().object_id()
    }
    fn relation_path(&self) -> &RelationPath {
        self.attribute().relation_path()
    }
    fn alias_with_relation_path(&self) -> String {
        RelationPath::join(&self.relation_path().to_string(), self.alias())
    }
    fn start_object_id(&self) -> ObjectId {
        self.relation_path().start_object_id()
    }
}

impl MetaAttribute for Attribute {
    fn attribute(&self) -> &Attribute {
        self
    }
}

impl MetaAttribute for Arc<Attribute> {
    fn attribute(&self) -> &Attribute {
        self
    }
}

/// An attribute viewed through a relation path without copying it. Only the
/// relation path differs from the wrapped attribute.
#[derive(Clone, Debug, PartialEq)]
pub struct RelatedAttribute {
    inner: Arc<Attribute>,
    relation_path: RelationPath,
}

impl RelatedAttribute {
    pub fn new(inner: Arc<Attribute>, relation_path: RelationPath) -> Self {
        Self {
            inner,
            relation_path,
        }
    }
    pub fn inner(&self) -> &Arc<Attribute> {
        &self.inner
    }
}

impl MetaAttribute for RelatedAttribute {
    fn attribute(&self) -> &Attribute {
        &self.inner
    }
    fn relation_path(&self) -> &RelationPath {
        &self.relation_path
    }
}

impl fmt::Display for RelatedAttribute {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.alias_with_relation_path())
    }
}
