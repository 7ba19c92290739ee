//! Models: the class-level side of a record.
//!
//! A [`Model`] is declared once through a [`ModelBuilder`] and never changes
//! afterwards. It owns the ordered attribute and association declarations,
//! the validation rules derived from them, the autoload switch and the
//! optional finder capabilities that association resolution calls into.

use tracing::{debug, trace};

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use crate::association::{AssociationDescriptor, AssociationKind, FindAll, FindById};
use crate::attribute::{AttributeDescriptor, AttributeRegistry, Metadata};
use crate::coerce::Coercer;
use crate::datatype::{AttributeType, Map, Value};
use crate::error::{AttributionError, Result};
use crate::record::Record;
use crate::schema::{NameHasher, Schema, SchemaInner};
use crate::validation::{self, ValidationRule};

pub(crate) struct ModelInner {
    name: String,
    parent: Option<Model>,
    attributes: AttributeRegistry,
    associations: Vec<AssociationDescriptor>,
    rules: Vec<ValidationRule>,
    autoload: bool,
    coercer: Coercer,
    schema: Weak<SchemaInner>,
    resolved: Mutex<HashMap<String, Weak<ModelInner>, NameHasher>>,
    find_by_id: Option<Arc<dyn FindById>>,
    find_all: Option<Arc<dyn FindAll>>,
}

/// A shared handle to a declared model.
#[derive(Clone)]
pub struct Model(Arc<ModelInner>);

impl Model {
    pub fn name(&self) -> &str {
        &self.0.name
    }
    pub fn parent(&self) -> Option<&Model> {
        self.0.parent.as_ref()
    }
    /// True for this model and every model derived from it.
    pub fn is_a(&self, other: &Model) -> bool {
        let mut current = Some(self);
        while let Some(model) = current {
            if model.ptr_eq(other) {
                return true;
            }
            current = model.parent();
        }
        false
    }
    pub fn ptr_eq(&self, other: &Model) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
    pub fn attribute_names(&self) -> Vec<&str> {
        self.0.attributes.names()
    }
    pub fn attributes(&self) -> Vec<&AttributeDescriptor> {
        self.0.attributes.iter().collect()
    }
    pub fn attribute(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.0.attributes.get(name)
    }
    pub fn associations(&self) -> &[AssociationDescriptor] {
        &self.0.associations
    }
    pub fn association(&self, name: &str) -> Option<&AssociationDescriptor> {
        self.0.associations.iter().rev().find(|a| a.name() == name)
    }
    /// The to-one association whose foreign key is `attribute`, if any.
    pub fn foreign_key_of(&self, attribute: &str) -> Option<&AssociationDescriptor> {
        self.0
            .associations
            .iter()
            .rev()
            .find(|a| a.kind() == AssociationKind::ToOne && a.foreign_key() == attribute)
    }
    pub fn validations(&self) -> &[ValidationRule] {
        &self.0.rules
    }
    pub fn autoload(&self) -> bool {
        self.0.autoload
    }
    pub fn coercer(&self) -> &Coercer {
        &self.0.coercer
    }
    pub fn can_find_by_id(&self) -> bool {
        self.0.find_by_id.is_some()
    }
    pub fn can_find_all(&self) -> bool {
        self.0.find_all.is_some()
    }
    /// Calls the find-by-id capability; `None` when the model has none.
    pub fn find(&self, id: i64) -> Result<Option<Record>> {
        match &self.0.find_by_id {
            Some(finder) => {
                trace!(model = self.name(), id, "find by id");
                finder.find(self, id)
            }
            None => Ok(None),
        }
    }
    /// Calls the find-all capability; empty when the model has none.
    pub fn find_all(&self, filter: &Map) -> Result<Vec<Record>> {
        match &self.0.find_all {
            Some(finder) => {
                trace!(model = self.name(), ?filter, "find all");
                finder.all(self, filter)
            }
            None => Ok(Vec::new()),
        }
    }

    /// A record with every attribute null and nothing resolved.
    pub fn new_record(&self) -> Record {
        Record::blank(self)
    }
    /// Builds a record from a map or from JSON text holding an object. Keys
    /// that name neither an attribute nor an association are ignored.
    pub fn construct(&self, input: impl Into<Value>) -> Result<Record> {
        let map = match input.into() {
            Value::Map(map) => map,
            Value::String(text) => match Value::from_json_str(&text)? {
                Value::Map(map) => map,
                other => {
                    return Err(AttributionError::Parse(format!(
                        "expected a JSON object for {}, got {}",
                        self.name(),
                        other.kind()
                    )));
                }
            },
            Value::Null => Map::new(),
            other => return Err(AttributionError::conversion(self.name(), other.kind())),
        };
        let record = self.new_record();
        for (key, value) in map {
            if self.attribute(&key).is_some() || self.association(&key).is_some() {
                record.set(&key, value)?;
            } else {
                trace!(model = self.name(), key = %key, "ignored construction key");
            }
        }
        Ok(record)
    }
    /// Normalizes `value` into a record of this model: maps are constructed,
    /// records of this very model are returned as they are.
    pub fn cast(&self, value: impl Into<Value>) -> Result<Record> {
        match value.into() {
            Value::Map(map) => self.construct(map),
            Value::Record(record) if record.model().ptr_eq(self) => Ok(record),
            Value::Record(record) => Err(AttributionError::conversion(self.name(), record.model().name())),
            other => Err(AttributionError::conversion(self.name(), other.kind())),
        }
    }

    /// The model `association` refers to, looked up in the schema on first use.
    pub(crate) fn resolve(&self, association: &AssociationDescriptor) -> Result<Model> {
        let class_name = association.class_name();
        let unresolved = || AttributionError::AssociationConfiguration {
            model: self.name().to_string(),
            association: association.name().to_string(),
            class_name: class_name.to_string(),
        };
        let mut resolved = self
            .0
            .resolved
            .lock()
            .map_err(|e| AttributionError::Lock(e.to_string()))?;
        if let Some(model) = resolved.get(class_name).and_then(Weak::upgrade) {
            return Ok(Model(model));
        }
        let schema = self.0.schema.upgrade().map(Schema).ok_or_else(unresolved)?;
        let model = schema.get(class_name).ok_or_else(unresolved)?;
        debug!(model = self.name(), association = association.name(), class_name, "resolved association");
        resolved.insert(class_name.to_string(), Arc::downgrade(&model.0));
        Ok(model)
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.0.name)
            .field("attributes", &self.attribute_names())
            .field("associations", &self.0.associations.iter().map(|a| a.name()).collect::<Vec<_>>())
            .field("autoload", &self.0.autoload)
            .finish()
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.name)
    }
}

// ------------- Declaration -------------
/// Collects the declarations of one model. Declaration errors are kept and
/// reported by [`ModelBuilder::build`].
pub struct ModelBuilder {
    schema: Schema,
    name: String,
    parent: Option<Model>,
    attributes: AttributeRegistry,
    associations: Vec<AssociationDescriptor>,
    rules: Vec<ValidationRule>,
    autoload: bool,
    coercer: Coercer,
    find_by_id: Option<Arc<dyn FindById>>,
    find_all: Option<Arc<dyn FindAll>>,
    error: Option<AttributionError>,
}

impl ModelBuilder {
    pub(crate) fn new(schema: &Schema, name: &str, parent: Option<&Model>) -> Self {
        let mut builder = ModelBuilder {
            schema: schema.clone(),
            name: name.to_string(),
            parent: parent.cloned(),
            attributes: AttributeRegistry::new(),
            associations: Vec::new(),
            rules: Vec::new(),
            autoload: schema.settings().autoload,
            coercer: schema.coercer(),
            find_by_id: None,
            find_all: None,
            error: None,
        };
        if let Some(parent) = parent {
            let inner = &parent.0;
            builder.attributes = inner.attributes.clone();
            builder.associations = inner.associations.clone();
            builder.rules = inner.rules.clone();
            builder.autoload = inner.autoload;
            builder.coercer = inner.coercer;
            builder.find_by_id = inner.find_by_id.clone();
            builder.find_all = inner.find_all.clone();
        }
        builder
    }
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declares an attribute and registers the validations its metadata asks for.
    pub fn attribute(mut self, name: &str, ty: AttributeType, metadata: Metadata) -> Self {
        let descriptor = AttributeDescriptor::new(name, ty, metadata);
        match validation::rules_for(&descriptor) {
            Ok(rules) => self.rules.extend(rules),
            Err(e) => {
                self.error.get_or_insert(e);
            }
        }
        self.attributes.declare(descriptor);
        self
    }
    pub fn string(self, name: &str, metadata: Metadata) -> Self {
        self.attribute(name, AttributeType::String, metadata)
    }
    pub fn boolean(self, name: &str, metadata: Metadata) -> Self {
        self.attribute(name, AttributeType::Boolean, metadata)
    }
    pub fn integer(self, name: &str, metadata: Metadata) -> Self {
        self.attribute(name, AttributeType::Integer, metadata)
    }
    pub fn float(self, name: &str, metadata: Metadata) -> Self {
        self.attribute(name, AttributeType::Float, metadata)
    }
    pub fn decimal(self, name: &str, metadata: Metadata) -> Self {
        self.attribute(name, AttributeType::Decimal, metadata)
    }
    pub fn date(self, name: &str, metadata: Metadata) -> Self {
        self.attribute(name, AttributeType::Date, metadata)
    }
    pub fn time(self, name: &str, metadata: Metadata) -> Self {
        self.attribute(name, AttributeType::Time, metadata)
    }
    pub fn time_zone(self, name: &str, metadata: Metadata) -> Self {
        self.attribute(name, AttributeType::TimeZone, metadata)
    }
    pub fn array(self, name: &str, metadata: Metadata) -> Self {
        self.attribute(name, AttributeType::Array, metadata)
    }
    pub fn map(self, name: &str, metadata: Metadata) -> Self {
        self.attribute(name, AttributeType::Map, metadata)
    }

    /// Declares a to-one association and its integer foreign key `<name>_id`,
    /// which carries `metadata`. A `class_name` entry overrides the inferred
    /// related model.
    pub fn belongs_to(self, name: &str, metadata: Metadata) -> Self {
        let association = AssociationDescriptor::belongs_to(name, metadata.clone());
        let foreign_key = association.foreign_key().to_string();
        let mut builder = self.integer(&foreign_key, metadata);
        builder.associations.push(association);
        builder
    }
    /// Declares a to-many association. A `class_name` entry overrides the
    /// inferred related model.
    pub fn has_many(mut self, name: &str, metadata: Metadata) -> Self {
        let association = AssociationDescriptor::has_many(&self.name, name, metadata);
        self.associations.push(association);
        self
    }

    /// Whether association reads may call the related model's finders.
    pub fn autoload(mut self, enabled: bool) -> Self {
        self.autoload = enabled;
        self
    }
    pub fn coercer(mut self, coercer: Coercer) -> Self {
        self.coercer = coercer;
        self
    }
    pub fn find_by_id<F>(mut self, finder: F) -> Self
    where
        F: Fn(&Model, i64) -> Result<Option<Record>> + Send + Sync + 'static,
    {
        self.find_by_id = Some(Arc::new(finder) as Arc<dyn FindById>);
        self
    }
    pub fn find_all<F>(mut self, finder: F) -> Self
    where
        F: Fn(&Model, &Map) -> Result<Vec<Record>> + Send + Sync + 'static,
    {
        self.find_all = Some(Arc::new(finder) as Arc<dyn FindAll>);
        self
    }
    /// Installs both capabilities from one backing store.
    pub fn finder<F>(mut self, finder: Arc<F>) -> Self
    where
        F: FindById + FindAll + 'static,
    {
        self.find_by_id = Some(finder.clone() as Arc<dyn FindById>);
        self.find_all = Some(finder as Arc<dyn FindAll>);
        self
    }

    /// Freezes the declarations and registers the model with its schema.
    pub fn build(self) -> Result<Model> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let model = Model(Arc::new(ModelInner {
            name: self.name,
            parent: self.parent,
            attributes: self.attributes,
            associations: self.associations,
            rules: self.rules,
            autoload: self.autoload,
            coercer: self.coercer,
            schema: Arc::downgrade(&self.schema.0),
            resolved: Mutex::new(HashMap::default()),
            find_by_id: self.find_by_id,
            find_all: self.find_all,
        }));
        debug!(
            model = model.name(),
            attributes = ?model.attribute_names(),
            associations = ?model.associations().iter().map(|a| a.name()).collect::<Vec<_>>(),
            rules = model.validations().len(),
            "defined model"
        );
        self.schema.register(model.clone())?;
        Ok(model)
    }
}
