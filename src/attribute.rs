//! Attribute declarations: descriptors, their metadata, and the per-model
//! registry that keeps them in declaration order.

use indexmap::IndexMap;

use crate::datatype::{AttributeType, Map, Value};
use crate::error::{AttributionError, Result};
use crate::validation::{
    FormatOptions, InclusionOptions, LengthOptions, NumericalityOptions, PresenceOptions,
    RuleConfig, RuleKind, RuleSetting, UniquenessOptions,
};

// ------------- Metadata -------------
/// Open-ended options attached to an attribute declaration.
///
/// Validation keys are kept under the key they were declared with, so that
/// `required` and `presence` may both be present. A validation set to false is
/// simply absent. Everything that is not a validation key (besides `doc`) is
/// kept as pass-through metadata.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Metadata {
    validations: IndexMap<&'static str, RuleSetting>,
    doc: Option<String>,
    extra: Map,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }
    /// Reads metadata from an untyped map: `true` enables a validation with
    /// default options, `false` or null leaves it out, anything else is read
    /// as its configuration.
    pub fn from_map(map: &Map) -> Result<Self> {
        let mut metadata = Metadata::new();
        for (key, value) in map {
            if key == "doc" {
                metadata.doc = Some(value.to_string());
                continue;
            }
            let Some(kind) = RuleKind::from_key(key) else {
                metadata.extra.insert(key.clone(), value.clone());
                continue;
            };
            let setting = match value {
                Value::Null | Value::Bool(false) => continue,
                Value::Bool(true) => RuleSetting::Enabled,
                other => RuleSetting::Configured(RuleConfig::from_value(kind, other)?),
            };
            metadata.set(key, setting)?;
        }
        Ok(metadata)
    }
    fn set(&mut self, key: &str, setting: RuleSetting) -> Result<()> {
        let key = crate::validation::VALIDATION_KEYS
            .iter()
            .find(|(_, k)| *k == key)
            .map(|(_, k)| *k)
            .ok_or_else(|| AttributionError::Definition(format!("unknown validation {key}")))?;
        self.validations.insert(key, setting);
        Ok(())
    }
    fn toggle(mut self, key: &'static str, enabled: bool) -> Self {
        if enabled {
            self.validations.insert(key, RuleSetting::Enabled);
        } else {
            self.validations.shift_remove(key);
        }
        self
    }
    fn configure(mut self, key: &'static str, config: RuleConfig) -> Self {
        self.validations.insert(key, RuleSetting::Configured(config));
        self
    }

    pub fn required(self, enabled: bool) -> Self {
        self.toggle("required", enabled)
    }
    pub fn presence(self, options: PresenceOptions) -> Self {
        self.configure("presence", RuleConfig::Presence(options))
    }
    pub fn unique(self, enabled: bool) -> Self {
        self.toggle("unique", enabled)
    }
    pub fn uniqueness(self, options: UniquenessOptions) -> Self {
        self.configure("uniqueness", RuleConfig::Uniqueness(options))
    }
    pub fn format(self, options: FormatOptions) -> Self {
        self.configure("format", RuleConfig::Format(options))
    }
    pub fn length(self, options: impl Into<LengthOptions>) -> Self {
        self.configure("length", RuleConfig::Length(options.into()))
    }
    pub fn inclusion(self, options: impl Into<InclusionOptions>) -> Self {
        self.configure("inclusion", RuleConfig::Inclusion(options.into()))
    }
    pub fn number(self, enabled: bool) -> Self {
        self.toggle("number", enabled)
    }
    pub fn numericality(self, options: NumericalityOptions) -> Self {
        self.configure("numericality", RuleConfig::Numericality(options))
    }
    pub fn doc(mut self, doc: &str) -> Self {
        self.doc = Some(doc.to_string());
        self
    }
    /// Adds a pass-through entry.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    pub fn validation(&self, key: &str) -> Option<&RuleSetting> {
        self.validations.get(key)
    }
    pub fn is_required(&self) -> bool {
        self.validations.contains_key("required") || self.validations.contains_key("presence")
    }
    pub fn doc_text(&self) -> Option<&str> {
        self.doc.as_deref()
    }
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
    pub fn is_empty(&self) -> bool {
        self.validations.is_empty() && self.doc.is_none() && self.extra.is_empty()
    }
    /// The metadata as it would be written in an untyped map.
    pub fn to_map(&self) -> Map {
        let mut map = Map::new();
        for (key, setting) in &self.validations {
            map.insert(key.to_string(), setting.to_value());
        }
        if let Some(doc) = &self.doc {
            map.insert("doc".to_string(), Value::String(doc.clone()));
        }
        for (key, value) in &self.extra {
            map.insert(key.clone(), value.clone());
        }
        map
    }
}

// ------------- Descriptors -------------
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeDescriptor {
    name: String,
    ty: AttributeType,
    metadata: Metadata,
}

impl AttributeDescriptor {
    pub fn new(name: &str, ty: AttributeType, metadata: Metadata) -> Self {
        Self { name: name.to_string(), ty, metadata }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn ty(&self) -> AttributeType {
        self.ty
    }
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
    /// `{name, type, ...metadata}`
    pub fn to_map(&self) -> Map {
        let mut map = Map::new();
        map.insert("name".to_string(), Value::String(self.name.clone()));
        map.insert("type".to_string(), Value::String(self.ty.name().to_string()));
        map.extend(self.metadata.to_map());
        map
    }
}

/// The attribute declarations of one model, in declaration order. A subclass
/// registry starts as a copy of its parent's.
#[derive(Clone, Debug, Default)]
pub struct AttributeRegistry {
    attributes: Vec<AttributeDescriptor>,
}

impl AttributeRegistry {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn declare(&mut self, descriptor: AttributeDescriptor) -> &AttributeDescriptor {
        self.attributes.push(descriptor);
        &self.attributes[self.attributes.len() - 1]
    }
    /// The descriptor that governs `name`. When a name was declared more than
    /// once, the latest declaration wins.
    pub fn get(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes.iter().rev().find(|a| a.name == name)
    }
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
    /// Declared names in order, repeats included.
    pub fn names(&self) -> Vec<&str> {
        self.attributes.iter().map(|a| a.name.as_str()).collect()
    }
    pub fn iter(&self) -> impl Iterator<Item = &AttributeDescriptor> {
        self.attributes.iter()
    }
    pub fn len(&self) -> usize {
        self.attributes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_from_map_maps_true_and_false() {
        let metadata = Metadata::from_map(&crate::map! {
            "required" => true,
            "unique" => false,
            "length" => "4..20",
            "doc" => "The title",
            "label" => "Title",
        })
        .expect("valid metadata");
        assert_eq!(metadata.validation("required"), Some(&RuleSetting::Enabled));
        assert_eq!(metadata.validation("unique"), None);
        assert_eq!(
            metadata.validation("length"),
            Some(&RuleSetting::Configured(RuleConfig::Length((4..=20).into())))
        );
        assert_eq!(metadata.doc_text(), Some("The title"));
        assert_eq!(metadata.get("label"), Some(&Value::from("Title")));
        assert!(metadata.is_required());
    }

    #[test]
    fn latest_declaration_wins() {
        let mut registry = AttributeRegistry::new();
        registry.declare(AttributeDescriptor::new("code", AttributeType::String, Metadata::new()));
        registry.declare(AttributeDescriptor::new("code", AttributeType::Integer, Metadata::new()));
        assert_eq!(registry.names(), vec!["code", "code"]);
        assert_eq!(registry.get("code").map(|a| a.ty()), Some(AttributeType::Integer));
    }
}
