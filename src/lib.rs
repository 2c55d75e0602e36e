//! Metaclad – a meta-model resolution engine.
//!
//! A *meta model* describes business objects rather than storing them:
//! * A [`object::MetaObject`] is a business object with a namespaced alias
//!   such as `shop.ORDER`.
//! * An [`attribute::Attribute`] is a named, typed property of an object.
//! * A [`relation::Relation`] is an edge between two objects, forward (n:1),
//!   reverse (1:n) or one-to-one.
//! * A [`relation_path::RelationPath`] chains relations, written
//!   `CUSTOMER__ADDRESS`.
//!
//! The [`model::Model`] owns all objects (loaded lazily through a
//! [`loader::ModelLoader`]) and resolves qualified aliases against them:
//! `CUSTOMER__NAME` on `ORDER` yields the `NAME` attribute of `CUSTOMER`,
//! seen through the `CUSTOMER` relation. Aggregations (`QTY:SUM`) and
//! relation modifiers (`POSITION[ORDER_ID]`) are understood as well.
//!
//! ## Modules
//! * [`model`] – the object arena, alias resolution and inheritance.
//! * [`object`] – meta objects and their tri-state attribute cache.
//! * [`attribute`], [`compound`] – attributes, compound attributes and
//!   attributes viewed through relations.
//! * [`relation`], [`relation_path`] – relations and paths of them.
//! * [`condition`] – conditions, condition groups and their UXON form.
//! * [`expression`], [`formula`] – telling attributes, formulas, literals and
//!   widget links apart. Formulas are parsed with a grammar in `formula.pest`.
//! * [`aggregator`] – aggregation suffixes on aliases.
//! * [`datatype`] – data types validating condition values.
//! * [`loader`] – the loader interface and an in-memory loader over JSON.
//! * [`behavior`] – behaviors registered on objects.
//! * [`settings`] – configuration for the binary.
//!
//! ## Quick Start
//! ```
//! use metaclad::{loader::MemoryLoader, model::Model};
//! let loader = MemoryLoader::from_json(r#"{"objects": [
//!   {"id": 2, "alias": "CUSTOMER", "uid_attribute": "ID",
//!    "attributes": [{"id": 21, "alias": "ID", "data_type": "Integer"}, {"id": 22, "alias": "NAME"}]},
//!   {"id": 1, "alias": "ORDER", "uid_attribute": "ID",
//!    "attributes": [{"id": 11, "alias": "ID", "data_type": "Integer"}, {"id": 12, "alias": "CUSTOMER", "data_type": "Integer"}],
//!    "relations": [{"id": 101, "alias": "CUSTOMER", "left_key": "CUSTOMER", "right_object": 2}]}
//! ]}"#).unwrap();
//! let mut model = Model::new(Box::new(loader));
//! let order = model.object_id("ORDER").unwrap();
//! let name = model.get_attribute(order, "CUSTOMER__NAME").unwrap();
//! assert_eq!(name.id(), 22);
//! assert_eq!(name.relation_path().to_string(), "CUSTOMER");
//! ```

use core::hash::BuildHasherDefault;

use seahash::SeaHasher;

pub mod aggregator;
pub mod attribute;
pub mod behavior;
pub mod compound;
pub mod condition;
pub mod datatype;
pub mod error;
pub mod expression;
pub mod formula;
pub mod loader;
pub mod model;
pub mod object;
pub mod relation;
pub mod relation_path;
pub mod settings;

pub type ObjectId = u64;
pub type AttributeId = u64;
pub type RelationId = u64;

// hashers for maps keyed by ids and by aliases respectively
pub type ThingHasher = BuildHasherDefault<SeaHasher>;
pub type OtherHasher = BuildHasherDefault<SeaHasher>;

pub use error::{MetacladError, Result};
pub use model::Model;
