#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;

use metaclad::behavior::Behavior;
use metaclad::loader::MemoryLoader;
use metaclad::{Model, ObjectId};

pub const ORDER: ObjectId = 1;
pub const CUSTOMER: ObjectId = 2;
pub const POSITION: ObjectId = 3;
pub const ADDRESS: ObjectId = 4;
pub const NOTE: ObjectId = 5;
pub const INVOICE: ObjectId = 6;
pub const PARTY: ObjectId = 10;
pub const COMPANY: ObjectId = 11;
pub const SUPPLIER: ObjectId = 12;

/// A small shop: orders of customers with positions, plus a party hierarchy
/// PARTY <- COMPANY <- SUPPLIER.
pub fn model_definition() -> serde_json::Value {
    json!({"objects": [
        {"id": ORDER, "alias": "ORDER", "namespace": "shop", "uid_attribute": "ID", "label_attribute": "NUMBER",
         "data_address": "orders",
         "attributes": [
            {"id": 11, "alias": "ID", "data_type": "Integer", "required": true},
            {"id": 12, "alias": "NUMBER"},
            {"id": 13, "alias": "CUSTOMER", "data_type": "Integer"},
            {"id": 14, "alias": "TOTAL", "data_type": "Number"},
            {"id": 15, "alias": "CREATED", "data_type": "core.Date"}
         ],
         "relations": [
            {"id": 101, "alias": "CUSTOMER", "left_key": "CUSTOMER", "right_object": CUSTOMER}
         ]},
        {"id": CUSTOMER, "alias": "CUSTOMER", "namespace": "shop", "uid_attribute": "ID", "label_attribute": "NAME",
         "attributes": [
            {"id": 21, "alias": "ID", "data_type": "Integer", "required": true},
            {"id": 22, "alias": "NAME"},
            {"id": 23, "alias": "ADDRESS", "data_type": "Integer"}
         ],
         "relations": [
            {"id": 102, "alias": "ADDRESS", "left_key": "ADDRESS", "right_object": ADDRESS}
         ]},
        {"id": POSITION, "alias": "POSITION", "namespace": "shop", "uid_attribute": "ID",
         "attributes": [
            {"id": 31, "alias": "ID", "data_type": "Integer", "required": true},
            {"id": 32, "alias": "ORDER", "data_type": "Integer", "required": true},
            {"id": 33, "alias": "REPLACED_ORDER", "data_type": "Integer"},
            {"id": 34, "alias": "QTY", "data_type": "Integer"},
            {"id": 35, "alias": "PRODUCT_CODE", "components": [
                {"attribute": "PREFIX", "sequence_index": 0, "value_suffix": "-"},
                {"attribute": "CODE_NUMBER", "sequence_index": 1}
            ]},
            {"id": 36, "alias": "PREFIX"},
            {"id": 37, "alias": "CODE_NUMBER", "data_type": "Integer"}
         ],
         "relations": [
            {"id": 103, "alias": "ORDER", "left_key": "ORDER", "right_object": ORDER},
            {"id": 104, "alias": "REPLACED_ORDER", "left_key": "REPLACED_ORDER", "right_object": ORDER, "reverse_alias": "POSITION"}
         ]},
        {"id": ADDRESS, "alias": "ADDRESS", "namespace": "shop", "uid_attribute": "ID",
         "attributes": [
            {"id": 41, "alias": "ID", "data_type": "Integer", "required": true},
            {"id": 42, "alias": "CITY"}
         ]},
        {"id": NOTE, "alias": "NOTE", "namespace": "shop", "uid_attribute": "ID",
         "attributes": [
            {"id": 51, "alias": "ID", "data_type": "Integer", "required": true},
            {"id": 52, "alias": "ABOUT_ORDER", "data_type": "Integer"},
            {"id": 53, "alias": "OTHER_ORDER", "data_type": "Integer"}
         ],
         "relations": [
            {"id": 105, "alias": "ABOUT_ORDER", "left_key": "ABOUT_ORDER", "right_object": ORDER},
            {"id": 106, "alias": "OTHER_ORDER", "left_key": "OTHER_ORDER", "right_object": ORDER}
         ]},
        {"id": INVOICE, "alias": "INVOICE", "namespace": "shop", "uid_attribute": "ID",
         "attributes": [
            {"id": 61, "alias": "ID", "data_type": "Integer", "required": true},
            {"id": 62, "alias": "ORDER", "data_type": "Integer", "required": true}
         ],
         "relations": [
            {"id": 107, "alias": "ORDER", "left_key": "ORDER", "right_object": ORDER, "one_to_one": true}
         ]},
        {"id": PARTY, "alias": "PARTY", "namespace": "crm", "uid_attribute": "ID", "label_attribute": "NAME",
         "data_address": "party", "writable": false, "short_description": "Anyone we deal with",
         "default_editor": {"widget_type": "Form"},
         "attributes": [
            {"id": 1001, "alias": "ID", "data_type": "Integer", "required": true},
            {"id": 1002, "alias": "NAME"},
            {"id": 1003, "alias": "PARENT_PARTY", "data_type": "Integer"}
         ],
         "relations": [
            {"id": 1101, "alias": "PARENT_PARTY", "left_key": "PARENT_PARTY", "right_object": PARTY}
         ]},
        {"id": COMPANY, "alias": "COMPANY", "namespace": "crm", "extends": PARTY, "data_address": "company",
         "attributes": [
            {"id": 1102, "alias": "NAME", "name": "Company name"},
            {"id": 1103, "alias": "VAT_NO"}
         ]},
        {"id": SUPPLIER, "alias": "SUPPLIER", "namespace": "crm", "extends": COMPANY,
         "attributes": [
            {"id": 1201, "alias": "RATING", "data_type": "Integer"}
         ]}
    ]})
}

pub fn loader() -> MemoryLoader {
    MemoryLoader::from_value(model_definition()).unwrap()
}

pub fn model() -> Model {
    Model::new(Box::new(loader()))
}

/// A model together with the number of objects its loader handed out.
pub fn model_with_counter() -> (Model, Arc<AtomicUsize>) {
    let loader = loader();
    let counter = loader.load_counter();
    (Model::new(Box::new(loader)), counter)
}

pub fn loads(counter: &Arc<AtomicUsize>) -> usize {
    counter.load(Ordering::SeqCst)
}

/// Counts how often it, or any copy of it, was registered.
#[derive(Debug)]
pub struct CountingBehavior {
    alias: String,
    object_id: ObjectId,
    disabled: bool,
    registrations: Arc<AtomicUsize>,
}

impl CountingBehavior {
    pub fn new(alias: &str, object_id: ObjectId, disabled: bool) -> (Self, Arc<AtomicUsize>) {
        let registrations = Arc::new(AtomicUsize::new(0));
        let behavior = Self {
            alias: alias.to_string(),
            object_id,
            disabled,
            registrations: Arc::clone(&registrations),
        };
        (behavior, registrations)
    }
}

impl Behavior for CountingBehavior {
    fn alias(&self) -> &str {
        &self.alias
    }
    fn object_id(&self) -> ObjectId {
        self.object_id
    }
    fn is_disabled(&self) -> bool {
        self.disabled
    }
    fn register(&mut self) {
        self.registrations.fetch_add(1, Ordering::SeqCst);
    }
    fn copy_for(&self, object_id: ObjectId) -> Box<dyn Behavior> {
        Box::new(Self {
            alias: self.alias.clone(),
            object_id,
            disabled: self.disabled,
            registrations: Arc::clone(&self.registrations),
        })
    }
}
