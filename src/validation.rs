//! Validation integration.
//!
//! Validation rules are derived from attribute metadata when an attribute is
//! declared. Six rule kinds are recognized, each under its full name and, for
//! three of them, a short alias:
//!
//! | key | alias | rule |
//! |---|---|---|
//! | `presence` | `required` | value must not be blank |
//! | `uniqueness` | `unique` | no other record may hold the same value |
//! | `format` | | text must (or must not) match a pattern |
//! | `length` | | length bounds |
//! | `inclusion` | | value must be one of a list |
//! | `numericality` | `number` | value must be numeric, optionally bounded |
//!
//! A metadata value of `true` enables a rule with its default options, any
//! other non-false value configures it. Failures are not errors: they are
//! accumulated in [`Errors`] by [`Record::is_valid`](crate::record::Record::is_valid).

use indexmap::IndexMap;
use regex::Regex;
use tracing::debug;

use std::fmt;
use std::ops::{RangeFrom, RangeInclusive, RangeToInclusive};
use std::str::FromStr;

use crate::attribute::{AttributeDescriptor, Metadata};
use crate::datatype::{Map, Value};
use crate::error::{AttributionError, Result};
use crate::record::Record;

// ------------- Rule kinds -------------
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RuleKind {
    Presence,
    Uniqueness,
    Format,
    Length,
    Inclusion,
    Numericality,
}

/// Recognized metadata keys in registration order: `(rule, key)`.
pub const VALIDATION_KEYS: [(RuleKind, &str); 9] = [
    (RuleKind::Presence, "required"),
    (RuleKind::Presence, "presence"),
    (RuleKind::Uniqueness, "unique"),
    (RuleKind::Uniqueness, "uniqueness"),
    (RuleKind::Format, "format"),
    (RuleKind::Length, "length"),
    (RuleKind::Inclusion, "inclusion"),
    (RuleKind::Numericality, "number"),
    (RuleKind::Numericality, "numericality"),
];

impl RuleKind {
    pub fn name(&self) -> &'static str {
        match self {
            RuleKind::Presence => "presence",
            RuleKind::Uniqueness => "uniqueness",
            RuleKind::Format => "format",
            RuleKind::Length => "length",
            RuleKind::Inclusion => "inclusion",
            RuleKind::Numericality => "numericality",
        }
    }
    pub fn from_key(key: &str) -> Option<RuleKind> {
        VALIDATION_KEYS
            .iter()
            .find(|(_, k)| *k == key)
            .map(|(kind, _)| *kind)
    }
}

// ------------- Rule options -------------
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PresenceOptions {
    pub message: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct UniquenessOptions {
    pub scope: Vec<String>,
    pub message: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FormatOptions {
    pub with: Option<String>,
    pub without: Option<String>,
    pub message: Option<String>,
}

impl FormatOptions {
    pub fn with(pattern: &str) -> Self {
        Self { with: Some(pattern.to_string()), ..Self::default() }
    }
    pub fn without(pattern: &str) -> Self {
        Self { without: Some(pattern.to_string()), ..Self::default() }
    }
    pub fn message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LengthOptions {
    pub minimum: Option<usize>,
    pub maximum: Option<usize>,
    pub is: Option<usize>,
    pub message: Option<String>,
}

impl LengthOptions {
    pub fn is(length: usize) -> Self {
        Self { is: Some(length), ..Self::default() }
    }
    pub fn message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }
}
impl From<RangeInclusive<usize>> for LengthOptions {
    fn from(range: RangeInclusive<usize>) -> Self {
        Self { minimum: Some(*range.start()), maximum: Some(*range.end()), ..Self::default() }
    }
}
impl From<RangeFrom<usize>> for LengthOptions {
    fn from(range: RangeFrom<usize>) -> Self {
        Self { minimum: Some(range.start), ..Self::default() }
    }
}
impl From<RangeToInclusive<usize>> for LengthOptions {
    fn from(range: RangeToInclusive<usize>) -> Self {
        Self { maximum: Some(range.end), ..Self::default() }
    }
}
impl From<usize> for LengthOptions {
    fn from(length: usize) -> Self {
        Self::is(length)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct InclusionOptions {
    pub within: Vec<Value>,
    pub message: Option<String>,
}
impl<T: Into<Value>> From<Vec<T>> for InclusionOptions {
    fn from(values: Vec<T>) -> Self {
        Self { within: values.into_iter().map(Into::into).collect(), message: None }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NumericalityOptions {
    pub only_integer: bool,
    pub greater_than: Option<f64>,
    pub greater_than_or_equal_to: Option<f64>,
    pub equal_to: Option<f64>,
    pub less_than: Option<f64>,
    pub less_than_or_equal_to: Option<f64>,
    pub odd: bool,
    pub even: bool,
    pub message: Option<String>,
}

impl NumericalityOptions {
    pub fn only_integer(mut self) -> Self {
        self.only_integer = true;
        self
    }
    pub fn greater_than(mut self, bound: f64) -> Self {
        self.greater_than = Some(bound);
        self
    }
    pub fn less_than_or_equal_to(mut self, bound: f64) -> Self {
        self.less_than_or_equal_to = Some(bound);
        self
    }
}

/// The configuration of one rule kind.
#[derive(Clone, Debug, PartialEq)]
pub enum RuleConfig {
    Presence(PresenceOptions),
    Uniqueness(UniquenessOptions),
    Format(FormatOptions),
    Length(LengthOptions),
    Inclusion(InclusionOptions),
    Numericality(NumericalityOptions),
}

impl RuleConfig {
    pub fn kind(&self) -> RuleKind {
        match self {
            RuleConfig::Presence(_) => RuleKind::Presence,
            RuleConfig::Uniqueness(_) => RuleKind::Uniqueness,
            RuleConfig::Format(_) => RuleKind::Format,
            RuleConfig::Length(_) => RuleKind::Length,
            RuleConfig::Inclusion(_) => RuleKind::Inclusion,
            RuleConfig::Numericality(_) => RuleKind::Numericality,
        }
    }
    /// The options a literal `true` stands for.
    pub fn default_for(kind: RuleKind) -> RuleConfig {
        match kind {
            RuleKind::Presence => RuleConfig::Presence(PresenceOptions::default()),
            RuleKind::Uniqueness => RuleConfig::Uniqueness(UniquenessOptions::default()),
            RuleKind::Format => RuleConfig::Format(FormatOptions::default()),
            RuleKind::Length => RuleConfig::Length(LengthOptions::default()),
            RuleKind::Inclusion => RuleConfig::Inclusion(InclusionOptions::default()),
            RuleKind::Numericality => RuleConfig::Numericality(NumericalityOptions::default()),
        }
    }
    /// Reads the options for `kind` out of an untyped metadata value.
    pub fn from_value(kind: RuleKind, value: &Value) -> Result<RuleConfig> {
        let invalid = || AttributionError::Definition(format!("invalid {} options: {}", kind.name(), value));
        let empty = Map::new();
        let options = value.as_map().unwrap_or(&empty);
        let message = options.get("message").and_then(Value::as_str).map(str::to_string);
        let config = match kind {
            RuleKind::Presence => RuleConfig::Presence(PresenceOptions { message }),
            RuleKind::Uniqueness => {
                let scope = match options.get("scope") {
                    Some(Value::String(s)) => vec![s.clone()],
                    Some(Value::Array(a)) => a.iter().map(|v| v.to_string()).collect(),
                    _ => Vec::new(),
                };
                RuleConfig::Uniqueness(UniquenessOptions { scope, message })
            }
            RuleKind::Format => match value {
                Value::String(pattern) => RuleConfig::Format(FormatOptions::with(pattern)),
                Value::Map(_) => RuleConfig::Format(FormatOptions {
                    with: options.get("with").and_then(Value::as_str).map(str::to_string),
                    without: options.get("without").and_then(Value::as_str).map(str::to_string),
                    message,
                }),
                _ => return Err(invalid()),
            },
            RuleKind::Length => match value {
                Value::Integer(i) => RuleConfig::Length(LengthOptions::is(to_length(*i)?)),
                Value::String(s) => RuleConfig::Length(parse_range(s).ok_or_else(invalid)?),
                Value::Array(a) if a.len() == 2 => {
                    let bound = |v: &Value| v.as_i64().ok_or_else(invalid).and_then(to_length);
                    RuleConfig::Length((bound(&a[0])?..=bound(&a[1])?).into())
                }
                Value::Map(_) => {
                    let bound = |key: &str| match options.get(key).and_then(Value::as_i64) {
                        Some(i) => to_length(i).map(Some),
                        None => Ok(None),
                    };
                    let mut length = match options.get("in").or_else(|| options.get("within")) {
                        Some(Value::String(s)) => parse_range(s).ok_or_else(invalid)?,
                        _ => LengthOptions::default(),
                    };
                    length.minimum = bound("minimum")?.or(length.minimum);
                    length.maximum = bound("maximum")?.or(length.maximum);
                    length.is = bound("is")?;
                    length.message = message;
                    RuleConfig::Length(length)
                }
                _ => return Err(invalid()),
            },
            RuleKind::Inclusion => match value {
                Value::Array(a) => RuleConfig::Inclusion(InclusionOptions { within: a.clone(), message: None }),
                Value::Map(_) => {
                    let within = options
                        .get("in")
                        .or_else(|| options.get("within"))
                        .and_then(Value::as_array)
                        .cloned()
                        .ok_or_else(invalid)?;
                    RuleConfig::Inclusion(InclusionOptions { within, message })
                }
                _ => return Err(invalid()),
            },
            RuleKind::Numericality => {
                let bound = |key: &str| options.get(key).and_then(Value::as_f64);
                let flag = |key: &str| options.get(key).and_then(Value::as_bool).unwrap_or(false);
                RuleConfig::Numericality(NumericalityOptions {
                    only_integer: flag("only_integer"),
                    greater_than: bound("greater_than"),
                    greater_than_or_equal_to: bound("greater_than_or_equal_to"),
                    equal_to: bound("equal_to"),
                    less_than: bound("less_than"),
                    less_than_or_equal_to: bound("less_than_or_equal_to"),
                    odd: flag("odd"),
                    even: flag("even"),
                    message,
                })
            }
        };
        Ok(config)
    }
}

fn to_length(i: i64) -> Result<usize> {
    usize::try_from(i).map_err(|_| AttributionError::Definition(format!("invalid length {i}")))
}

/// Parses `"4..20"` or `"4...21"` style ranges.
fn parse_range(s: &str) -> Option<LengthOptions> {
    let (start, end, exclusive) = match s.split_once("...") {
        Some((start, end)) => (start, end, true),
        None => {
            let (start, end) = s.split_once("..")?;
            (start, end, false)
        }
    };
    let start = usize::from_str(start.trim()).ok()?;
    let end = usize::from_str(end.trim()).ok()?;
    let end = if exclusive { end.checked_sub(1)? } else { end };
    Some((start..=end).into())
}

// ------------- Rules -------------
/// One rule registered against one attribute.
#[derive(Clone, Debug)]
pub struct ValidationRule {
    attribute: String,
    config: RuleConfig,
    with: Option<Regex>,
    without: Option<Regex>,
}

impl ValidationRule {
    /// Compiles a rule. Options that leave nothing to check, such as a length
    /// without bounds, are rejected.
    pub fn new(attribute: &str, config: RuleConfig) -> Result<Self> {
        let missing = |what: &str| {
            AttributionError::Definition(format!("{} validation of {attribute} needs {what}", config.kind().name()))
        };
        let (mut with, mut without) = (None, None);
        match &config {
            RuleConfig::Format(format) => {
                if format.with.is_none() && format.without.is_none() {
                    return Err(missing("a with or without pattern"));
                }
                with = format.with.as_deref().map(Regex::new).transpose()?;
                without = format.without.as_deref().map(Regex::new).transpose()?;
            }
            RuleConfig::Length(length) => {
                if length.minimum.is_none() && length.maximum.is_none() && length.is.is_none() {
                    return Err(missing("a minimum, a maximum or an exact length"));
                }
            }
            RuleConfig::Inclusion(inclusion) => {
                if inclusion.within.is_empty() {
                    return Err(missing("a list of values"));
                }
            }
            _ => (),
        }
        Ok(Self { attribute: attribute.to_string(), config, with, without })
    }
    pub fn attribute(&self) -> &str {
        &self.attribute
    }
    pub fn kind(&self) -> RuleKind {
        self.config.kind()
    }
    pub fn config(&self) -> &RuleConfig {
        &self.config
    }
    /// Checks `record`, adding any failure to `errors`.
    pub fn check(&self, record: &Record, errors: &mut Errors) -> Result<()> {
        let value = record.get(&self.attribute)?;
        let failure = match &self.config {
            RuleConfig::Presence(options) => {
                let blank = value.is_blank() || value == Value::Bool(false);
                blank.then(|| message(&options.message, "can't be blank"))
            }
            RuleConfig::Uniqueness(options) => self
                .taken(record, &value, options)?
                .then(|| message(&options.message, "has already been taken")),
            RuleConfig::Format(options) => {
                let text = value.to_string();
                let matches_with = self.with.as_ref().is_none_or(|p| p.is_match(&text));
                let avoids_without = self.without.as_ref().is_none_or(|p| !p.is_match(&text));
                (!(matches_with && avoids_without)).then(|| message(&options.message, "is invalid"))
            }
            RuleConfig::Length(options) => check_length(&value, options),
            RuleConfig::Inclusion(options) => (!options.within.contains(&value))
                .then(|| message(&options.message, "is not included in the list")),
            RuleConfig::Numericality(options) => check_number(&value, options),
        };
        if let Some(failure) = failure {
            debug!(model = record.model().name(), attribute = %self.attribute, %failure, "validation failed");
            errors.add(&self.attribute, failure);
        }
        Ok(())
    }
    fn taken(&self, record: &Record, value: &Value, options: &UniquenessOptions) -> Result<bool> {
        let model = record.model();
        if !model.can_find_all() {
            return Ok(false);
        }
        let mut filter = Map::new();
        filter.insert(self.attribute.clone(), value.clone());
        for scope in &options.scope {
            filter.insert(scope.clone(), record.get(scope)?);
        }
        let others = model.find_all(&filter)?;
        Ok(others.iter().any(|other| other != record))
    }
}

fn message(custom: &Option<String>, default: &str) -> String {
    custom.clone().unwrap_or_else(|| default.to_string())
}

fn check_length(value: &Value, options: &LengthOptions) -> Option<String> {
    let length = match value {
        Value::Null => 0,
        Value::String(s) => s.chars().count(),
        Value::Array(a) => a.len(),
        Value::Map(m) => m.len(),
        other => other.to_string().chars().count(),
    };
    if let Some(is) = options.is {
        if length != is {
            return Some(message(&options.message, &format!("is the wrong length (should be {is} characters)")));
        }
    }
    if let Some(minimum) = options.minimum {
        if length < minimum {
            return Some(message(&options.message, &format!("is too short (minimum is {minimum} characters)")));
        }
    }
    if let Some(maximum) = options.maximum {
        if length > maximum {
            return Some(message(&options.message, &format!("is too long (maximum is {maximum} characters)")));
        }
    }
    None
}

fn check_number(value: &Value, options: &NumericalityOptions) -> Option<String> {
    let number = match value {
        Value::Integer(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        Value::Decimal(d) => d.to_string().parse::<f64>().ok(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    let Some(number) = number else {
        return Some(message(&options.message, "is not a number"));
    };
    if options.only_integer && number.fract() != 0.0 {
        return Some(message(&options.message, "must be an integer"));
    }
    let checks: [(Option<f64>, fn(f64, f64) -> bool, &str); 5] = [
        (options.greater_than, |n, b| n > b, "must be greater than"),
        (options.greater_than_or_equal_to, |n, b| n >= b, "must be greater than or equal to"),
        (options.equal_to, |n, b| n == b, "must be equal to"),
        (options.less_than, |n, b| n < b, "must be less than"),
        (options.less_than_or_equal_to, |n, b| n <= b, "must be less than or equal to"),
    ];
    for (bound, holds, text) in checks {
        if let Some(bound) = bound {
            if !holds(number, bound) {
                return Some(message(&options.message, &format!("{text} {bound}")));
            }
        }
    }
    if options.odd && (number as i64) % 2 == 0 {
        return Some(message(&options.message, "must be odd"));
    }
    if options.even && (number as i64) % 2 != 0 {
        return Some(message(&options.message, "must be even"));
    }
    None
}

/// Derives the rules a declared attribute carries, in registration order.
pub fn rules_for(descriptor: &AttributeDescriptor) -> Result<Vec<ValidationRule>> {
    rules_from_metadata(descriptor.name(), descriptor.metadata())
}

pub fn rules_from_metadata(attribute: &str, metadata: &Metadata) -> Result<Vec<ValidationRule>> {
    let mut rules = Vec::new();
    for (kind, key) in VALIDATION_KEYS {
        if let Some(setting) = metadata.validation(key) {
            let config = match setting {
                RuleSetting::Enabled => RuleConfig::default_for(kind),
                RuleSetting::Configured(config) => config.clone(),
            };
            rules.push(ValidationRule::new(attribute, config)?);
        }
    }
    Ok(rules)
}

/// How a validation key is set in metadata. Keys set to false are absent.
#[derive(Clone, Debug, PartialEq)]
pub enum RuleSetting {
    Enabled,
    Configured(RuleConfig),
}

impl RuleSetting {
    pub fn to_value(&self) -> Value {
        match self {
            RuleSetting::Enabled => Value::Bool(true),
            RuleSetting::Configured(config) => config_value(config),
        }
    }
}

fn config_value(config: &RuleConfig) -> Value {
    let mut map = Map::new();
    let mut put = |key: &str, value: Value| {
        if !value.is_null() {
            map.insert(key.to_string(), value);
        }
    };
    match config {
        RuleConfig::Presence(o) => put("message", o.message.clone().into()),
        RuleConfig::Uniqueness(o) => {
            if !o.scope.is_empty() {
                put("scope", o.scope.clone().into());
            }
            put("message", o.message.clone().into());
        }
        RuleConfig::Format(o) => {
            put("with", o.with.clone().into());
            put("without", o.without.clone().into());
            put("message", o.message.clone().into());
        }
        RuleConfig::Length(o) => {
            put("minimum", o.minimum.map(|n| n as i64).into());
            put("maximum", o.maximum.map(|n| n as i64).into());
            put("is", o.is.map(|n| n as i64).into());
            put("message", o.message.clone().into());
        }
        RuleConfig::Inclusion(o) => {
            put("in", Value::Array(o.within.clone()));
            put("message", o.message.clone().into());
        }
        RuleConfig::Numericality(o) => {
            if o.only_integer {
                put("only_integer", true.into());
            }
            put("greater_than", o.greater_than.into());
            put("greater_than_or_equal_to", o.greater_than_or_equal_to.into());
            put("equal_to", o.equal_to.into());
            put("less_than", o.less_than.into());
            put("less_than_or_equal_to", o.less_than_or_equal_to.into());
            put("message", o.message.clone().into());
        }
    }
    Value::Map(map)
}

// ------------- Errors -------------
/// Validation failures keyed by attribute, in the order they were found.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Errors {
    messages: IndexMap<String, Vec<String>>,
}

impl Errors {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn add(&mut self, attribute: &str, message: impl Into<String>) {
        self.messages
            .entry(attribute.to_string())
            .or_default()
            .push(message.into());
    }
    /// Messages for one attribute; empty when it has none.
    pub fn get(&self, attribute: &str) -> &[String] {
        self.messages.get(attribute).map(Vec::as_slice).unwrap_or(&[])
    }
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
    /// Total number of messages.
    pub fn len(&self) -> usize {
        self.messages.values().map(Vec::len).sum()
    }
    pub fn clear(&mut self) {
        self.messages.clear();
    }
    pub fn merge(&mut self, other: &Errors) {
        for (attribute, messages) in &other.messages {
            for message in messages {
                self.add(attribute, message.clone());
            }
        }
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.messages.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
    /// Messages prefixed with the humanized attribute name.
    pub fn full_messages(&self) -> Vec<String> {
        self.iter()
            .flat_map(|(attribute, messages)| {
                let label = humanize(attribute);
                messages.iter().map(move |m| format!("{label} {m}"))
            })
            .collect()
    }
}

impl fmt::Display for Errors {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.full_messages().join(", "))
    }
}

fn humanize(attribute: &str) -> String {
    let text = attribute.strip_suffix("_id").unwrap_or(attribute).replace('_', " ");
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
