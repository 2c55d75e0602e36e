//! The model owns every loaded [`MetaObject`] and resolves aliases across
//! them.
//!
//! Objects are kept in an arena indexed by id and loaded on first touch
//! through the [`ModelLoader`]. Attributes and relations refer to other
//! objects by id only, so every operation that walks from one object to
//! another lives here and takes `&mut self`: resolution fills the attribute
//! caches of the objects it passes.

use std::collections::HashMap;
use std::sync::Arc;

use bimap::BiMap;
use roaring::RoaringTreemap;
use tracing::{debug, trace, warn};

use crate::aggregator::Aggregator;
use crate::attribute::{Attribute, AttributeKind};
use crate::behavior::Behavior;
use crate::compound::{CompoundAttribute, CompoundAttributeComponent};
use crate::datatype::DataTypeRegistry;
use crate::error::{MetacladError, Result};
use crate::expression::FORMULA_SIGIL;
use crate::loader::{ModelLoader, ObjectSelector};
use crate::object::{CachedAttribute, MetaObject};
use crate::relation::{Cardinality, Relation};
use crate::relation_path::RelationPath;
use crate::{AttributeId, ObjectId, ThingHasher};

pub struct Model {
    objects: HashMap<ObjectId, MetaObject, ThingHasher>,
    aliases: BiMap<String, ObjectId>,
    loader: Box<dyn ModelLoader>,
    data_types: DataTypeRegistry,
    components: HashMap<AttributeId, Vec<CompoundAttributeComponent>, ThingHasher>,
    // objects between being loaded and having inherited from their parent
    loading: RoaringTreemap,
}

impl Model {
    pub fn new(loader: Box<dyn ModelLoader>) -> Self {
        Self::with_data_types(loader, DataTypeRegistry::new())
    }
    pub fn with_data_types(loader: Box<dyn ModelLoader>, data_types: DataTypeRegistry) -> Self {
        Self {
            objects: HashMap::default(),
            aliases: BiMap::new(),
            loader,
            data_types,
            components: HashMap::default(),
            loading: RoaringTreemap::new(),
        }
    }
    pub fn data_types(&self) -> &DataTypeRegistry {
        &self.data_types
    }
    pub fn len(&self) -> usize {
        self.objects.len()
    }
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
    pub fn is_loaded(&self, object_id: ObjectId) -> bool {
        self.objects.contains_key(&object_id)
    }

    // ------------- loading -------------

    /// Adds an object built outside of the loader. Its alias (with namespace)
    /// must not be taken yet.
    pub fn insert_object(&mut self, object: MetaObject) -> Result<ObjectId> {
        let id = object.id();
        let alias = object.alias_with_namespace();
        if self.objects.contains_key(&id) {
            return Err(MetacladError::DuplicateObject(format!("{alias} (#{id})")));
        }
        self.aliases
            .insert_no_overwrite(alias.to_uppercase(), id)
            .map_err(|_| MetacladError::DuplicateObject(alias))?;
        self.objects.insert(id, object);
        Ok(id)
    }

    pub fn ensure_loaded(&mut self, object_id: ObjectId) -> Result<()> {
        if !self.objects.contains_key(&object_id) {
            self.load(ObjectSelector::Id(object_id))?;
        }
        Ok(())
    }

    fn load(&mut self, selector: ObjectSelector) -> Result<ObjectId> {
        let mut object = self.loader.load_object(&selector, &self.data_types)?;
        let id = object.id();
        if self.objects.contains_key(&id) {
            return Ok(id);
        }
        if self.loading.contains(id) {
            return Err(MetacladError::Invariant(format!(
                "object \"{}\" inherits from itself",
                object.alias_with_namespace()
            )));
        }
        debug!(object = %object, id, ?selector, "loaded object");
        let parent_id = match object.inherits_from() {
            Some(parent_id) if parent_id != id => parent_id,
            _ => return self.insert_object(object),
        };
        self.loading.insert(id);
        let parent_loaded = self.ensure_loaded(parent_id);
        self.loading.remove(id);
        parent_loaded?;
        let (attributes, relations) = object.take_members();
        self.insert_object(object)?;
        self.extend_object(id, parent_id)?;
        let child = self.object_mut(id)?;
        for attribute in attributes {
            child.add_attribute(Arc::unwrap_or_clone(attribute));
        }
        for relation in relations {
            child.add_relation(relation);
        }
        Ok(id)
    }

    pub fn load_app(&mut self, app: &str) -> Result<()> {
        debug!(app, "loading app");
        self.loader.load_app(app)
    }

    // ------------- object access -------------

    pub fn object(&mut self, object_id: ObjectId) -> Result<&MetaObject> {
        self.ensure_loaded(object_id)?;
        self.objects
            .get(&object_id)
            .ok_or_else(|| MetacladError::ObjectNotFound(format!("#{object_id}")))
    }
    pub fn object_mut(&mut self, object_id: ObjectId) -> Result<&mut MetaObject> {
        self.ensure_loaded(object_id)?;
        self.objects
            .get_mut(&object_id)
            .ok_or_else(|| MetacladError::ObjectNotFound(format!("#{object_id}")))
    }
    /// Id of the object with the given `NAMESPACE.ALIAS` (or bare alias),
    /// loading it if needed.
    pub fn object_id(&mut self, alias: &str) -> Result<ObjectId> {
        let alias = alias.trim();
        if let Some(&id) = self.aliases.get_by_left(&alias.to_uppercase()) {
            return Ok(id);
        }
        if !alias.contains('.') {
            let mut loaded = self
                .objects
                .values()
                .filter(|o| o.alias().eq_ignore_ascii_case(alias));
            if let (Some(object), None) = (loaded.next(), loaded.next()) {
                return Ok(object.id());
            }
        }
        self.load(ObjectSelector::Alias(alias.to_string()))
    }
    pub fn object_by_alias(&mut self, alias: &str) -> Result<&MetaObject> {
        let id = self.object_id(alias)?;
        self.object(id)
    }

    fn object_name(&self, object_id: ObjectId) -> String {
        match self.objects.get(&object_id) {
            Some(object) => object.alias_with_namespace(),
            None => format!("#{object_id}"),
        }
    }

    fn attribute_not_found(&self, object_id: ObjectId, alias: &str, source: Option<MetacladError>) -> MetacladError {
        MetacladError::AttributeNotFound {
            object: self.object_name(object_id),
            alias: alias.to_string(),
            source: source.map(Box::new),
        }
    }

    fn relation_not_found(&self, object_id: ObjectId, alias: &str, modifier: &str) -> MetacladError {
        MetacladError::RelationNotFound {
            object: self.object_name(object_id),
            alias: alias.to_string(),
            modifier: modifier.to_string(),
        }
    }

    // ------------- attributes -------------

    /// Resolves `alias` on an object: an own attribute, an aggregated one
    /// (`QTY:SUM`), one reached through relations (`CUSTOMER__NAME`) or the
    /// key behind a reverse relation. Results and misses are cached on the
    /// object.
    pub fn get_attribute(&mut self, object_id: ObjectId, alias: &str) -> Result<Arc<Attribute>> {
        let cached = self.object(object_id)?.cached_attribute(alias);
        match cached {
            CachedAttribute::Resolved(attribute) => {
                trace!(object_id, alias, "attribute cache hit");
                return Ok(attribute);
            }
            CachedAttribute::KnownMissing => {
                trace!(object_id, alias, "attribute cache miss");
                return Err(self.attribute_not_found(object_id, alias, None));
            }
            CachedAttribute::Unknown => (),
        }
        match self.resolve_attribute(object_id, alias) {
            Ok(attribute) => {
                self.object_mut(object_id)?
                    .cache_resolved(alias, Arc::clone(&attribute));
                Ok(attribute)
            }
            Err(e) if e.is_not_found() => {
                self.object_mut(object_id)?.cache_missing(alias);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Like [`Model::get_attribute`], but any failure means `false`.
    pub fn has_attribute(&mut self, object_id: ObjectId, alias: &str) -> bool {
        self.get_attribute(object_id, alias).is_ok()
    }

    /// Checks whether `alias` resolves on the object. Found attributes are
    /// cached, misses are not: classifying literals must not fill the cache.
    pub fn is_attribute_alias(&mut self, object_id: ObjectId, alias: &str) -> bool {
        let cached = match self.object(object_id) {
            Ok(object) => object.cached_attribute(alias),
            Err(_) => return false,
        };
        match cached {
            CachedAttribute::Resolved(_) => true,
            CachedAttribute::KnownMissing => false,
            CachedAttribute::Unknown => match self.resolve_attribute(object_id, alias) {
                Ok(attribute) => {
                    if let Ok(object) = self.object_mut(object_id) {
                        object.cache_resolved(alias, attribute);
                    }
                    true
                }
                Err(_) => false,
            },
        }
    }

    fn resolve_attribute(&mut self, object_id: ObjectId, alias: &str) -> Result<Arc<Attribute>> {
        if let Some(attribute) = self.object(object_id)?.attribute_exact(alias) {
            return Ok(Arc::clone(attribute));
        }
        if alias.starts_with(FORMULA_SIGIL) {
            return Err(self.attribute_not_found(object_id, alias, None));
        }
        let base = match Aggregator::split_alias(alias) {
            Some((stripped, _)) => {
                if let Some(attribute) = self.object(object_id)?.attribute_exact(stripped) {
                    return Ok(Arc::clone(attribute));
                }
                stripped
            }
            None => alias,
        };
        if let Some((head, rest)) = RelationPath::split_first(base) {
            match self.get_relation(object_id, head, "") {
                Ok(relation) => {
                    let remote = self
                        .get_attribute(relation.right_object_id(), rest)
                        .map_err(|e| {
                            if e.is_not_found() {
                                self.attribute_not_found(object_id, alias, Some(e))
                            } else {
                                e
                            }
                        })?;
                    return Ok(Arc::new(remote.via_relation(&relation)?));
                }
                Err(MetacladError::RelationNotFound { .. }) => (),
                Err(e) => return Err(e),
            }
        }
        match self.get_relation(object_id, base, "") {
            Ok(relation) if relation.is_reverse() => {
                let key = self.relation_right_key(&relation).map_err(|e| {
                    if e.is_not_found() {
                        self.attribute_not_found(object_id, alias, Some(e))
                    } else {
                        e
                    }
                })?;
                Ok(Arc::new(key.via_relation(&relation)?))
            }
            Ok(_) | Err(MetacladError::RelationNotFound { .. }) => {
                Err(self.attribute_not_found(object_id, alias, None))
            }
            Err(e) => Err(e),
        }
    }

    pub fn uid_attribute(&mut self, object_id: ObjectId) -> Result<Arc<Attribute>> {
        let alias = self.object(object_id)?.uid_attribute_alias().map(str::to_string);
        match alias {
            Some(alias) => self.get_attribute(object_id, &alias),
            None => Err(self.attribute_not_found(object_id, "(uid)", None)),
        }
    }

    pub fn label_attribute(&mut self, object_id: ObjectId) -> Result<Arc<Attribute>> {
        let alias = self.object(object_id)?.label_attribute_alias().map(str::to_string);
        match alias {
            Some(alias) => self.get_attribute(object_id, &alias),
            None => Err(self.attribute_not_found(object_id, "(label)", None)),
        }
    }

    /// The compound view of `attribute`, asking the loader for components
    /// the first time they are needed.
    pub fn compound_attribute(&mut self, attribute: &Arc<Attribute>) -> Result<CompoundAttribute> {
        let given = match attribute.kind() {
            AttributeKind::Compound(components) => components,
            _ => {
                return Err(MetacladError::Invariant(format!(
                    "attribute \"{}\" is not a compound",
                    attribute.alias_with_relation_path()
                )))
            }
        };
        if !given.is_empty() {
            return Ok(CompoundAttribute::new(Arc::clone(attribute), given.clone()));
        }
        let components = match self.components.get(&attribute.id()) {
            Some(components) => components.clone(),
            None => {
                let loaded = self.loader.load_attribute_components(attribute)?;
                debug!(attribute = %attribute.alias(), components = loaded.len(), "loaded compound components");
                self.components.insert(attribute.id(), loaded.clone());
                loaded
            }
        };
        Ok(CompoundAttribute::new(Arc::clone(attribute), components))
    }

    /// Forgets every cached resolution, on all objects.
    pub fn clear_attribute_caches(&mut self) {
        for object in self.objects.values_mut() {
            object.clear_attribute_cache();
        }
    }

    // ------------- relations -------------

    /// Resolves a relation alias or a path of them (`CUSTOMER__ORDER`) to the
    /// last relation. `modifier` selects among reverse relations sharing an
    /// alias; `ALIAS[MODIFIER]` works too.
    pub fn get_relation(&mut self, object_id: ObjectId, alias: &str, modifier: &str) -> Result<Relation> {
        if let Some((head, rest)) = RelationPath::split_first(alias) {
            let first = self.get_relation(object_id, head, "")?;
            return self
                .get_relation(first.right_object_id(), rest, modifier)
                .map_err(|e| match e {
                    MetacladError::RelationNotFound { .. } => self.relation_not_found(object_id, alias, modifier),
                    other => other,
                });
        }
        let object = self.object(object_id)?;
        let candidates: Vec<Relation> = object.relations_by_alias(alias).into_iter().cloned().collect();
        if candidates.is_empty() {
            if let Some((bare, bracketed)) = RelationPath::parse_modifier(alias) {
                return self.get_relation(object_id, bare, bracketed);
            }
            return Err(self.relation_not_found(object_id, alias, modifier));
        }
        if let Some(exact) = object.relation_exact(alias, modifier) {
            return Ok(exact.clone());
        }
        if !modifier.is_empty() {
            return Err(self.relation_not_found(object_id, alias, modifier));
        }
        if let Some(forward) = candidates.iter().find(|r| r.is_forward()) {
            return Ok(forward.clone());
        }
        if candidates.len() == 1 {
            return Ok(candidates[0].clone());
        }
        let mut required = Vec::new();
        for candidate in &candidates {
            if self.relation_right_key(candidate)?.is_required() {
                required.push(candidate);
            }
        }
        if let [single] = required.as_slice() {
            return Ok((*single).clone());
        }
        warn!(object = %self.object_name(object_id), alias, candidates = candidates.len(), "ambiguous relation");
        Err(MetacladError::RelationAmbiguous {
            object: self.object_name(object_id),
            alias: alias.to_string(),
            candidates: candidates.len(),
        })
    }

    pub fn has_relation(&mut self, object_id: ObjectId, alias: &str) -> bool {
        self.get_relation(object_id, alias, "").is_ok()
    }

    /// Relations of an object, optionally only those leading to
    /// `right_object_id` and/or of the given cardinality.
    pub fn find_relations(
        &mut self,
        object_id: ObjectId,
        right_object_id: Option<ObjectId>,
        cardinality: Option<Cardinality>,
    ) -> Result<Vec<Relation>> {
        Ok(self
            .object(object_id)?
            .relations()
            .iter()
            .filter(|r| right_object_id.is_none_or(|id| r.right_object_id() == id))
            .filter(|r| cardinality.is_none_or(|c| r.cardinality() == c))
            .cloned()
            .collect())
    }

    /// Parses `REL1__REL2[MOD]` starting at `object_id`.
    pub fn relation_path(&mut self, object_id: ObjectId, path: &str) -> Result<RelationPath> {
        let mut result = RelationPath::new(object_id);
        for segment in RelationPath::segments(path) {
            let relation = self
                .get_relation(result.end_object_id(), segment, "")
                .map_err(|e| match e {
                    MetacladError::RelationNotFound { .. } => self.relation_not_found(object_id, path, ""),
                    other => other,
                })?;
            result.append_relation(relation)?;
        }
        Ok(result)
    }

    /// Key attribute on the left object, the uid attribute if not named.
    pub fn relation_left_key(&mut self, relation: &Relation) -> Result<Arc<Attribute>> {
        match relation.left_key_alias() {
            Some(alias) => self.get_attribute(relation.left_object_id(), alias),
            None => self.uid_attribute(relation.left_object_id()),
        }
    }

    /// Key attribute on the right object, the uid attribute if not named.
    pub fn relation_right_key(&mut self, relation: &Relation) -> Result<Arc<Attribute>> {
        match relation.right_key_alias() {
            Some(alias) => self.get_attribute(relation.right_object_id(), alias),
            None => self.uid_attribute(relation.right_object_id()),
        }
    }

    // ------------- inheritance -------------

    /// Copies attributes, relations and behaviors of `parent_id` into
    /// `child_id`. Extending from the same object twice, from an ancestor or
    /// from itself does nothing.
    pub fn extend_object(&mut self, child_id: ObjectId, parent_id: ObjectId) -> Result<()> {
        if child_id == parent_id || self.get_parent_objects(child_id, None)?.contains(&parent_id) {
            return Ok(());
        }
        let parent = self.object(parent_id)?;
        let data_address = parent.data_address().to_string();
        let data_address_properties = parent.data_address_properties().clone();
        let (readable, writable) = parent.access_flags();
        let default_editor = parent.default_editor().clone();
        let uid_alias = parent.uid_attribute_alias().map(str::to_string);
        let label_alias = parent.label_attribute_alias().map(str::to_string);
        let short_description = parent.short_description().to_string();
        let attributes: Vec<Attribute> = parent
            .attributes()
            .iter()
            .map(|a| a.inherited_copy(child_id, parent_id))
            .collect();
        let relations: Vec<Relation> = parent
            .relations()
            .iter()
            .map(|r| {
                if r.right_object_id() == parent_id {
                    r.inherited_self_relation(child_id, parent_id)
                } else {
                    r.inherited_copy(child_id, parent_id)
                }
            })
            .collect();
        let behaviors: Vec<Box<dyn Behavior>> = parent.behaviors().iter().map(|b| b.copy_for(child_id)).collect();
        let parent_name = parent.alias_with_namespace();

        let child = self.object_mut(child_id)?;
        child.add_parent(parent_id);
        child.set_data_address(&data_address);
        child.set_data_address_properties(data_address_properties);
        let (child_readable, child_writable) = child.access_flags();
        child.set_readable(child_readable && readable);
        child.set_writable(child_writable && writable);
        child.set_default_editor(default_editor);
        child.set_uid_attribute_alias(uid_alias.as_deref());
        child.set_label_attribute_alias(label_alias.as_deref());
        child.set_short_description(&short_description);
        let (attribute_count, relation_count) = (attributes.len(), relations.len());
        for attribute in attributes {
            child.add_attribute(attribute);
        }
        for relation in relations {
            child.add_relation(relation);
        }
        for behavior in behaviors {
            child.add_behavior(behavior);
        }
        child.clear_attribute_cache();
        debug!(
            child = %child,
            parent = %parent_name,
            attributes = attribute_count,
            relations = relation_count,
            "extended object"
        );
        Ok(())
    }

    /// Ancestors breadth-first, nearest first, each listed once. `depth`
    /// limits how many generations are walked.
    pub fn get_parent_objects(&mut self, object_id: ObjectId, depth: Option<usize>) -> Result<Vec<ObjectId>> {
        let mut visited = RoaringTreemap::new();
        visited.insert(object_id);
        let mut ancestors = Vec::new();
        let mut generation = vec![object_id];
        let mut level = 0;
        while !generation.is_empty() && depth.is_none_or(|d| level < d) {
            let mut next = Vec::new();
            for id in generation {
                for &parent in self.object(id)?.parents() {
                    if visited.insert(parent) {
                        ancestors.push(parent);
                        next.push(parent);
                    }
                }
            }
            generation = next;
            level += 1;
        }
        Ok(ancestors)
    }

    /// True if the object or any of its ancestors is `alias_or_id`: a
    /// numeric id, `NAMESPACE.ALIAS` or a bare alias.
    pub fn is(&mut self, object_id: ObjectId, alias_or_id: &str) -> Result<bool> {
        let wanted = alias_or_id.trim();
        let mut candidates = vec![object_id];
        candidates.extend(self.get_parent_objects(object_id, None)?);
        for id in candidates {
            let object = self.object(id)?;
            let matches = match wanted.parse::<ObjectId>() {
                Ok(wanted_id) => wanted_id == id,
                Err(_) => {
                    object.alias_with_namespace().eq_ignore_ascii_case(wanted)
                        || object.alias().eq_ignore_ascii_case(wanted)
                }
            };
            if matches {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn add_behavior(&mut self, object_id: ObjectId, behavior: Box<dyn Behavior>) -> Result<()> {
        self.object_mut(object_id)?.add_behavior(behavior);
        Ok(())
    }
}
