//! Identity and timestamp mixins.
//!
//! A model with an `id` attribute compares its records by identity: two
//! records are equal when they belong to the same model and carry the same
//! non-null id. Records without an id are only equal to themselves.

use std::hash::{Hash, Hasher};

use crate::attribute::Metadata;
use crate::datatype::Value;
use crate::model::ModelBuilder;
use crate::record::Record;

impl ModelBuilder {
    /// Declares the integer `id` attribute.
    pub fn identity(self) -> Self {
        self.integer("id", Metadata::new())
    }
    /// Declares `created_at` and `updated_at`.
    pub fn timestamps(self) -> Self {
        self.time("created_at", Metadata::new())
            .time("updated_at", Metadata::new())
    }
    /// Identity followed by timestamps.
    pub fn standard(self) -> Self {
        self.identity().timestamps()
    }
}

impl Record {
    pub fn id(&self) -> Option<i64> {
        match self.peek("id") {
            Value::Integer(id) => Some(id),
            _ => None,
        }
    }
    /// The id as a string, the form used in paths and form parameters.
    pub fn to_param(&self) -> Option<String> {
        self.id().map(|id| id.to_string())
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Record) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        if !self.model().ptr_eq(other.model()) {
            return false;
        }
        match (self.id(), other.id()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Record {}

impl Hash for Record {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}
