//! Association descriptors, the finder capabilities a model may expose to
//! resolve them, and the naming conventions that connect the two.

use std::fmt;

use crate::attribute::Metadata;
use crate::datatype::{Map, Value};
use crate::error::Result;
use crate::model::Model;
use crate::record::Record;

// ------------- Finder capabilities -------------
/// Looks up a single record of `model` by identity.
pub trait FindById: Send + Sync {
    fn find(&self, model: &Model, id: i64) -> Result<Option<Record>>;
}

/// Looks up every record of `model` matching all entries of `filter`.
pub trait FindAll: Send + Sync {
    fn all(&self, model: &Model, filter: &Map) -> Result<Vec<Record>>;
}

impl<F> FindById for F
where
    F: Fn(&Model, i64) -> Result<Option<Record>> + Send + Sync,
{
    fn find(&self, model: &Model, id: i64) -> Result<Option<Record>> {
        self(model, id)
    }
}

impl<F> FindAll for F
where
    F: Fn(&Model, &Map) -> Result<Vec<Record>> + Send + Sync,
{
    fn all(&self, model: &Model, filter: &Map) -> Result<Vec<Record>> {
        self(model, filter)
    }
}

// ------------- Descriptors -------------
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssociationKind {
    /// `belongs_to`, backed by an integer foreign key on the declaring model
    ToOne,
    /// `has_many`, backed by a foreign key on the related model
    ToMany,
}

impl fmt::Display for AssociationKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AssociationKind::ToOne => write!(f, "belongs_to"),
            AssociationKind::ToMany => write!(f, "has_many"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AssociationDescriptor {
    name: String,
    kind: AssociationKind,
    class_name: String,
    foreign_key: String,
    back_reference: Option<String>,
    metadata: Metadata,
}

impl AssociationDescriptor {
    /// A to-one association `name`, with foreign key `<name>_id`.
    pub fn belongs_to(name: &str, metadata: Metadata) -> Self {
        Self {
            name: name.to_string(),
            kind: AssociationKind::ToOne,
            class_name: class_name_for(name, &metadata),
            foreign_key: format!("{name}_id"),
            back_reference: None,
            metadata,
        }
    }
    /// A to-many association `name` declared on `owner`. The related records
    /// point back through `<owner>_id` and, when they declare it, `<owner>`.
    pub fn has_many(owner: &str, name: &str, metadata: Metadata) -> Self {
        let owner = underscore(owner);
        Self {
            name: name.to_string(),
            kind: AssociationKind::ToMany,
            class_name: class_name_for(name, &metadata),
            foreign_key: format!("{owner}_id"),
            back_reference: Some(owner),
            metadata,
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn kind(&self) -> AssociationKind {
        self.kind
    }
    pub fn class_name(&self) -> &str {
        &self.class_name
    }
    pub fn foreign_key(&self) -> &str {
        &self.foreign_key
    }
    pub fn back_reference(&self) -> Option<&str> {
        self.back_reference.as_deref()
    }
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
    pub fn to_map(&self) -> Map {
        let mut map = Map::new();
        map.insert("name".to_string(), Value::String(self.name.clone()));
        map.insert("type".to_string(), Value::String(self.kind.to_string()));
        map.insert("class_name".to_string(), Value::String(self.class_name.clone()));
        map.extend(self.metadata.to_map());
        map
    }
}

fn class_name_for(name: &str, metadata: &Metadata) -> String {
    match metadata.get("class_name") {
        Some(Value::String(class_name)) => class_name.clone(),
        _ => classify(name),
    }
}

// ------------- Inflection -------------
const IRREGULAR: [(&str, &str); 5] = [
    ("people", "person"),
    ("children", "child"),
    ("men", "man"),
    ("women", "woman"),
    ("mice", "mouse"),
];

/// `chapters` => `chapter`, `categories` => `category`, `boxes` => `box`
pub fn singularize(word: &str) -> String {
    let lower = word.to_lowercase();
    if let Some((plural, singular)) = IRREGULAR.iter().find(|(plural, _)| lower.ends_with(plural)) {
        return format!("{}{}", &word[..word.len() - plural.len()], singular);
    }
    if let Some(stem) = word.strip_suffix("ies") {
        return format!("{stem}y");
    }
    for suffix in ["sses", "xes", "ches", "shes", "zzes"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    if word.ends_with("ss") || word.ends_with("us") || word.ends_with("is") {
        return word.to_string();
    }
    word.strip_suffix('s').unwrap_or(word).to_string()
}

/// `book_review` => `BookReview`
pub fn camelize(word: &str) -> String {
    word.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// `EBook` => `e_book`, `BookReview` => `book_review`
pub fn underscore(word: &str) -> String {
    let chars: Vec<char> = word.chars().collect();
    let mut result = String::with_capacity(word.len() + 4);
    for (i, c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let previous = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if previous.is_lowercase() || previous.is_ascii_digit() || (previous.is_uppercase() && next_is_lower) {
                result.push('_');
            }
        }
        result.extend(c.to_lowercase());
    }
    result.replace('-', "_")
}

/// The model name an association name refers to: `chapters` => `Chapter`.
pub fn classify(name: &str) -> String {
    camelize(&singularize(name))
}
