//! The registry that binds model names to models.
//!
//! Associations name their related model by string so that models may refer
//! to each other before both are defined. Every model is registered in the
//! schema it was built from, and association names are looked up there the
//! first time they are used.

// used for hashing model names
use core::hash::BuildHasherDefault;
use seahash::SeaHasher;
use tracing::{debug, warn};

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::coerce::Coercer;
use crate::config::Settings;
use crate::error::{AttributionError, Result};
use crate::model::{Model, ModelBuilder};
use crate::temporal::LocalZone;

pub type NameHasher = BuildHasherDefault<SeaHasher>;

pub(crate) struct SchemaInner {
    models: RwLock<HashMap<String, Model, NameHasher>>,
    settings: Settings,
    zone: LocalZone,
}

/// A shared handle to a set of models defined together.
#[derive(Clone)]
pub struct Schema(pub(crate) Arc<SchemaInner>);

impl Schema {
    pub fn new(settings: Settings) -> Self {
        let zone = settings.zone().unwrap_or_else(|e| {
            warn!(error = %e, "using the system zone");
            LocalZone::System
        });
        Schema(Arc::new(SchemaInner {
            models: RwLock::new(HashMap::default()),
            settings,
            zone,
        }))
    }
    pub fn settings(&self) -> &Settings {
        &self.0.settings
    }
    /// The coercer every model of this schema starts with.
    pub fn coercer(&self) -> Coercer {
        Coercer::new(self.0.zone)
    }
    /// Starts the definition of a model called `name`.
    pub fn model(&self, name: &str) -> ModelBuilder {
        ModelBuilder::new(self, name, None)
    }
    /// Starts the definition of a model called `name` that inherits everything
    /// `parent` declares.
    pub fn subclass(&self, name: &str, parent: &Model) -> ModelBuilder {
        ModelBuilder::new(self, name, Some(parent))
    }
    pub fn get(&self, name: &str) -> Option<Model> {
        self.0.models.read().ok()?.get(name).cloned()
    }
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = match self.0.models.read() {
            Ok(models) => models.keys().cloned().collect(),
            Err(_) => Vec::new(),
        };
        names.sort();
        names
    }
    pub(crate) fn register(&self, model: Model) -> Result<()> {
        let mut models = self
            .0
            .models
            .write()
            .map_err(|e| AttributionError::Lock(e.to_string()))?;
        if models.insert(model.name().to_string(), model.clone()).is_some() {
            debug!(model = model.name(), "redefined model");
        }
        Ok(())
    }
}
