//! Records: the instance side of a model.
//!
//! A record keeps its coerced attribute values and the association cache
//! behind one mutex. Association reads fill the cache lazily. The mutex is
//! released while a finder runs, so finders may read the record they are
//! resolving for; a separate guard per association makes concurrent reads of
//! the same unresolved association issue one lookup. A record never holds its
//! own lock while locking another record.
//!
//! To-one associations keep the foreign key and the linked record as
//! alternative sources of truth:
//!
//! * setting the foreign key drops the linked record, the next read resolves
//!   it again through the related model's find-by-id capability
//! * setting the linked record drops the foreign key, the next read of the
//!   key derives it from the linked record's identity
//!
//! Records added to a to-many association are linked back to their owner
//! through a weak reference, so owner and members do not keep each other
//! alive.

use serde::ser::{Error as _, Serialize, SerializeMap, Serializer};
use tracing::{debug, trace};

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::association::{AssociationDescriptor, AssociationKind};
use crate::datatype::{AttributeType, Map, Value};
use crate::error::{AttributionError, Result};
use crate::model::Model;
use crate::schema::NameHasher;
use crate::validation::Errors;

#[derive(Clone)]
enum Link {
    /// an explicitly set or resolved related record, `None` when resolved to nothing
    One(Option<Record>),
    /// the owner of a to-many association this record was added to
    Back(Weak<RecordInner>),
    Many(Vec<Record>),
}

#[derive(Default)]
struct RecordState {
    // a to-one foreign key that is absent here has not been set explicitly
    values: HashMap<String, Value, NameHasher>,
    links: HashMap<String, Link, NameHasher>,
    errors: Errors,
}

impl RecordState {
    fn linked(&self, name: &str) -> Option<Record> {
        self.cached_one(name).flatten()
    }
    /// The settled value of a to-one association, if there is one.
    fn cached_one(&self, name: &str) -> Option<Option<Record>> {
        match self.links.get(name)? {
            Link::One(record) => Some(record.clone()),
            Link::Back(owner) => owner.upgrade().map(|owner| Some(Record(owner))),
            Link::Many(_) => None,
        }
    }
    fn cached_many(&self, name: &str) -> Option<Vec<Record>> {
        match self.links.get(name)? {
            Link::Many(records) => Some(records.clone()),
            _ => None,
        }
    }
}

/// Either the cached answer or the key a finder has to be asked for.
enum Cached<T, K> {
    Hit(T),
    Miss(K),
}

pub(crate) struct RecordInner {
    model: Model,
    state: Mutex<RecordState>,
    // held while a finder resolves the association of the same name
    resolving: Mutex<HashMap<String, Arc<Mutex<()>>, NameHasher>>,
}

/// A shared handle to one instance of a model. Clones refer to the same
/// instance.
#[derive(Clone)]
pub struct Record(pub(crate) Arc<RecordInner>);

impl Record {
    pub(crate) fn blank(model: &Model) -> Self {
        let mut state = RecordState::default();
        for name in model.attribute_names() {
            if model.foreign_key_of(name).is_none() {
                state.values.insert(name.to_string(), Value::Null);
            }
        }
        Record(Arc::new(RecordInner {
            model: model.clone(),
            state: Mutex::new(state),
            resolving: Mutex::new(HashMap::default()),
        }))
    }
    pub fn model(&self) -> &Model {
        &self.0.model
    }
    pub fn ptr_eq(&self, other: &Record) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
    fn state(&self) -> Result<MutexGuard<'_, RecordState>> {
        self.0
            .state
            .lock()
            .map_err(|e| AttributionError::Lock(format!("{} record: {}", self.model().name(), e)))
    }
    /// Reads a stored value without resolving anything, also from a
    /// poisoned record.
    pub(crate) fn peek(&self, name: &str) -> Value {
        let state = self.0.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.values.get(name).cloned().unwrap_or(Value::Null)
    }
    /// The guard serializing finder lookups for association `name`.
    fn resolution(&self, name: &str) -> Result<Arc<Mutex<()>>> {
        let mut resolving = self
            .0
            .resolving
            .lock()
            .map_err(|e| AttributionError::Lock(format!("{} record: {}", self.model().name(), e)))?;
        Ok(resolving.entry(name.to_string()).or_default().clone())
    }
    fn association(&self, name: &str, kind: AssociationKind) -> Result<&AssociationDescriptor> {
        self.model()
            .association(name)
            .filter(|a| a.kind() == kind)
            .ok_or_else(|| AttributionError::UnknownAttribute {
                model: self.model().name().to_string(),
                name: name.to_string(),
            })
    }

    // ------------- Attributes -------------
    /// Reads an attribute, a foreign key, or an association. To-one
    /// associations read as a record or null, to-many ones as an array of
    /// records.
    pub fn get(&self, name: &str) -> Result<Value> {
        let model = self.model();
        if let Some(association) = model.foreign_key_of(name) {
            return self.foreign_key(association);
        }
        if model.attribute(name).is_some() {
            return Ok(self.state()?.values.get(name).cloned().unwrap_or(Value::Null));
        }
        match model.association(name).map(AssociationDescriptor::kind) {
            Some(AssociationKind::ToOne) => Ok(self.related(name)?.map(Value::Record).unwrap_or(Value::Null)),
            Some(AssociationKind::ToMany) => Ok(Value::Array(
                self.collection(name)?.into_iter().map(Value::Record).collect(),
            )),
            None => Err(AttributionError::UnknownAttribute {
                model: model.name().to_string(),
                name: name.to_string(),
            }),
        }
    }
    /// Writes an attribute through its coercion rule, or assigns a foreign
    /// key or an association.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let model = self.model();
        if let Some(association) = model.foreign_key_of(name) {
            return self.set_foreign_key(association, value.into());
        }
        if let Some(attribute) = model.attribute(name) {
            let coerced = model.coercer().coerce(attribute.ty(), value.into())?;
            self.state()?.values.insert(name.to_string(), coerced);
            return Ok(());
        }
        match model.association(name).map(AssociationDescriptor::kind) {
            Some(AssociationKind::ToOne) => self.set_related(name, value),
            Some(AssociationKind::ToMany) => self.set_collection(name, value),
            None => Err(AttributionError::UnknownAttribute {
                model: model.name().to_string(),
                name: name.to_string(),
            }),
        }
    }
    /// True when `name` currently holds boolean true.
    pub fn is(&self, name: &str) -> Result<bool> {
        Ok(self.get(name)? == Value::Bool(true))
    }
    /// Every declared attribute in declaration order, foreign keys included.
    pub fn export_attributes(&self) -> Result<Map> {
        let mut attributes = Map::new();
        for name in self.model().attribute_names() {
            if !attributes.contains_key(name) {
                attributes.insert(name.to_string(), self.get(name)?);
            }
        }
        Ok(attributes)
    }
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    // ------------- To-one -------------
    fn foreign_key(&self, association: &AssociationDescriptor) -> Result<Value> {
        let key = association.foreign_key();
        let linked = {
            let state = self.state()?;
            if let Some(value) = state.values.get(key) {
                return Ok(value.clone());
            }
            state.linked(association.name())
        };
        let derived = linked.map(|record| record.peek("id")).unwrap_or(Value::Null);
        let mut state = self.state()?;
        Ok(state.values.entry(key.to_string()).or_insert(derived).clone())
    }
    fn set_foreign_key(&self, association: &AssociationDescriptor, value: Value) -> Result<()> {
        let id = self.model().coercer().coerce(AttributeType::Integer, value)?;
        let mut state = self.state()?;
        state.values.insert(association.foreign_key().to_string(), id);
        if state.links.remove(association.name()).is_some() {
            trace!(model = self.model().name(), association = association.name(), "invalidated related record");
        }
        Ok(())
    }
    fn cached_one(&self, association: &AssociationDescriptor) -> Result<Cached<Option<Record>, i64>> {
        let name = association.name();
        let mut state = self.state()?;
        if let Some(record) = state.cached_one(name) {
            return Ok(Cached::Hit(record));
        }
        match state.values.get(association.foreign_key()) {
            Some(Value::Integer(id)) => Ok(Cached::Miss(*id)),
            _ => {
                state.links.insert(name.to_string(), Link::One(None));
                Ok(Cached::Hit(None))
            }
        }
    }
    /// The record a to-one association points at, resolved through the
    /// related model's find-by-id capability on first read.
    pub fn related(&self, name: &str) -> Result<Option<Record>> {
        let association = self.association(name, AssociationKind::ToOne)?;
        if let Cached::Hit(record) = self.cached_one(association)? {
            return Ok(record);
        }
        let related = self.model().resolve(association)?;
        if !self.model().autoload() || !related.can_find_by_id() {
            return Ok(None);
        }
        let slot = self.resolution(name)?;
        let _resolving = slot.lock().unwrap_or_else(PoisonError::into_inner);
        // another reader may have resolved it while this one waited
        let id = match self.cached_one(association)? {
            Cached::Hit(record) => return Ok(record),
            Cached::Miss(id) => id,
        };
        debug!(model = self.model().name(), association = name, id, "resolving related record");
        let found = related.find(id)?;
        let mut state = self.state()?;
        if let Some(record) = state.cached_one(name) {
            return Ok(record);
        }
        if state.values.get(association.foreign_key()) == Some(&Value::Integer(id)) {
            state.links.insert(name.to_string(), Link::One(found.clone()));
        }
        Ok(found)
    }
    /// Links a record, cast through the related model, and drops the
    /// foreign key. Null unlinks.
    pub fn set_related(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let association = self.association(name, AssociationKind::ToOne)?;
        let related = self.model().resolve(association)?;
        let linked = match value.into() {
            Value::Null => None,
            value => Some(related.cast(value)?),
        };
        let mut state = self.state()?;
        state.values.remove(association.foreign_key());
        state.links.insert(name.to_string(), Link::One(linked));
        Ok(())
    }

    // ------------- To-many -------------
    fn cached_many(&self, name: &str) -> Result<Cached<Vec<Record>, Value>> {
        let state = self.state()?;
        Ok(match state.cached_many(name) {
            Some(records) => Cached::Hit(records),
            None => Cached::Miss(state.values.get("id").cloned().unwrap_or(Value::Null)),
        })
    }
    /// The records of a to-many association, fetched once through the related
    /// model's find-all capability and cached.
    pub fn collection(&self, name: &str) -> Result<Vec<Record>> {
        let association = self.association(name, AssociationKind::ToMany)?;
        if let Cached::Hit(records) = self.cached_many(name)? {
            return Ok(records);
        }
        let related = self.model().resolve(association)?;
        if !self.model().autoload() || !related.can_find_all() {
            return Ok(Vec::new());
        }
        let slot = self.resolution(name)?;
        let _resolving = slot.lock().unwrap_or_else(PoisonError::into_inner);
        let id = match self.cached_many(name)? {
            Cached::Hit(records) => return Ok(records),
            Cached::Miss(id) => id,
        };
        let mut filter = Map::new();
        filter.insert(association.foreign_key().to_string(), id);
        debug!(model = self.model().name(), association = name, "loading collection");
        let records = related.find_all(&filter)?;
        let mut state = self.state()?;
        if let Some(assigned) = state.cached_many(name) {
            return Ok(assigned);
        }
        state.links.insert(name.to_string(), Link::Many(records.clone()));
        Ok(records)
    }
    /// Queries a to-many association with extra criteria. Never cached.
    pub fn collection_where(&self, name: &str, filter: &Map) -> Result<Vec<Record>> {
        let association = self.association(name, AssociationKind::ToMany)?;
        let related = self.model().resolve(association)?;
        if !self.model().autoload() || !related.can_find_all() {
            return Ok(Vec::new());
        }
        let mut criteria = filter.clone();
        criteria.insert(association.foreign_key().to_string(), self.peek("id"));
        related.find_all(&criteria)
    }
    /// Replaces a to-many association. Every element is cast through the
    /// related model and pointed back at this record.
    pub fn set_collection(&self, name: &str, values: impl Into<Value>) -> Result<()> {
        let association = self.association(name, AssociationKind::ToMany)?;
        let related = self.model().resolve(association)?;
        let items = match values.into() {
            Value::Null => Vec::new(),
            Value::Array(items) => items,
            item => vec![item],
        };
        let records = items
            .into_iter()
            .map(|item| related.cast(item))
            .collect::<Result<Vec<_>>>()?;
        let id = self.state()?.values.get("id").cloned().unwrap_or(Value::Null);
        for record in &records {
            record.link_owner(self, association, &id)?;
        }
        self.state()?.links.insert(name.to_string(), Link::Many(records));
        Ok(())
    }
    fn link_owner(&self, owner: &Record, association: &AssociationDescriptor, id: &Value) -> Result<()> {
        let model = self.model();
        let mut state = self.state()?;
        let key = association.foreign_key();
        if model.attribute(key).is_some() {
            state.values.insert(key.to_string(), id.clone());
        }
        if let Some(back) = association.back_reference() {
            if model.association(back).is_some_and(|a| a.kind() == AssociationKind::ToOne) {
                state.links.insert(back.to_string(), Link::Back(Arc::downgrade(&owner.0)));
            }
        }
        Ok(())
    }

    // ------------- Validation -------------
    /// Runs every validation rule of the model, replacing the stored errors.
    pub fn is_valid(&self) -> Result<bool> {
        let mut errors = Errors::new();
        for rule in self.model().validations() {
            rule.check(self, &mut errors)?;
        }
        let valid = errors.is_empty();
        self.state()?.errors = errors;
        Ok(valid)
    }
    pub fn errors(&self) -> Result<Errors> {
        Ok(self.state()?.errors.clone())
    }
    /// Adds externally reported errors: each entry maps an attribute to a
    /// message or an array of messages.
    pub fn merge_errors(&self, errors: &Map) -> Result<()> {
        let mut state = self.state()?;
        for (attribute, messages) in errors {
            match messages {
                Value::Array(messages) => {
                    for message in messages {
                        state.errors.add(attribute, message.to_string());
                    }
                }
                Value::Null => (),
                message => state.errors.add(attribute, message.to_string()),
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let state = self.0.state.lock().unwrap_or_else(PoisonError::into_inner);
        let mut debug = f.debug_struct(self.model().name());
        let mut seen = Vec::new();
        for name in self.model().attribute_names() {
            if seen.contains(&name) {
                continue;
            }
            seen.push(name);
            if let Some(value) = state.values.get(name) {
                debug.field(name, value);
            }
        }
        debug.finish()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let attributes = self.export_attributes().map_err(S::Error::custom)?;
        let mut map = serializer.serialize_map(Some(attributes.len()))?;
        for (name, value) in &attributes {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
