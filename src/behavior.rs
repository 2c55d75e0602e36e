use std::fmt::Debug;

use crate::ObjectId;

/// Something attached to an object that activates itself when added, e.g.
/// a listener on data changes. What registering means is up to the behavior.
pub trait Behavior: Debug {
    fn alias(&self) -> &str;
    fn object_id(&self) -> ObjectId;
    fn is_disabled(&self) -> bool {
        false
    }
    fn register(&mut self);
    /// A fresh, unregistered copy bound to `object_id`.
    fn copy_for(&self, object_id: ObjectId) -> Box<dyn Behavior>;
}

#[derive(Debug, Default)]
pub struct BehaviorList {
    behaviors: Vec<Box<dyn Behavior>>,
}

impl BehaviorList {
    pub fn new() -> Self {
        Self::default()
    }
    /// Adds a behavior and registers it, unless it is disabled.
    pub fn add(&mut self, mut behavior: Box<dyn Behavior>) {
        if !behavior.is_disabled() {
            behavior.register();
        }
        self.behaviors.push(behavior);
    }
    pub fn iter(&self) -> impl Iterator<Item = &dyn Behavior> {
        self.behaviors.iter().map(|b| b.as_ref())
    }
    pub fn len(&self) -> usize {
        self.behaviors.len()
    }
    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }
}
