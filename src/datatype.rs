// used for temporal values
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
// used for decimal numbers
use bigdecimal::BigDecimal;
// maps keep their insertion order
use indexmap::IndexMap;
// used when exporting values as JSON
use serde::ser::{Error as _, Serialize, SerializeMap, SerializeSeq, Serializer};

// used when parsing a string to a decimal
use std::str::FromStr;
// used to print out readable forms of a value
use std::fmt;
// used to overload common operations for decimals
use std::ops;

use crate::error::{AttributionError, Result};
use crate::record::Record;
use crate::temporal::TimeZone;

pub type Map = IndexMap<String, Value>;

// ------------- Attribute Types --------------
#[derive(Eq, PartialEq, Hash, Clone, Copy, Debug)]
pub enum AttributeType {
    String,
    Boolean,
    Integer,
    Float,
    Decimal,
    Date,
    Time,
    TimeZone,
    Array,
    Map,
}

impl AttributeType {
    pub const ALL: [AttributeType; 10] = [
        AttributeType::String,
        AttributeType::Boolean,
        AttributeType::Integer,
        AttributeType::Float,
        AttributeType::Decimal,
        AttributeType::Date,
        AttributeType::Time,
        AttributeType::TimeZone,
        AttributeType::Array,
        AttributeType::Map,
    ];
    pub fn name(&self) -> &'static str {
        match self {
            AttributeType::String => "string",
            AttributeType::Boolean => "boolean",
            AttributeType::Integer => "integer",
            AttributeType::Float => "float",
            AttributeType::Decimal => "decimal",
            AttributeType::Date => "date",
            AttributeType::Time => "time",
            AttributeType::TimeZone => "time_zone",
            AttributeType::Array => "array",
            AttributeType::Map => "map",
        }
    }
}
impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
impl FromStr for AttributeType {
    type Err = AttributionError;
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase().replace(['-', ' '], "_");
        AttributeType::ALL
            .iter()
            .find(|t| t.name() == wanted || (wanted == "timezone" && **t == AttributeType::TimeZone))
            .copied()
            .ok_or_else(|| AttributionError::Definition(format!("unknown attribute type {s}")))
    }
}

// ------------- Decimal --------------
#[derive(PartialEq, PartialOrd, Clone, Debug)]
pub struct Decimal(BigDecimal);

impl Decimal {
    pub fn from_str(s: &str) -> Option<Decimal> {
        match BigDecimal::from_str(s) {
            Ok(decimal) => Some(Decimal(decimal)),
            _ => None,
        }
    }
    pub fn into_inner(self) -> BigDecimal {
        self.0
    }
}
impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl ops::Deref for Decimal {
    type Target = BigDecimal;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
impl From<BigDecimal> for Decimal {
    fn from(d: BigDecimal) -> Self {
        Decimal(d)
    }
}

// ------------- Value --------------
/// A dynamically typed value, used both for untyped input and for the
/// coerced contents of a record.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Decimal(Decimal),
    String(String),
    Date(NaiveDate),
    /// A wall-clock date-time without an offset.
    DateTime(NaiveDateTime),
    /// An instant carrying the offset it was expressed in.
    Time(DateTime<FixedOffset>),
    TimeZone(TimeZone),
    Array(Vec<Value>),
    Map(Map),
    Record(Record),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
    /// Null, whitespace-only strings and empty collections are blank.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            Value::Array(a) => a.is_empty(),
            Value::Map(m) => m.is_empty(),
            _ => false,
        }
    }
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::DateTime(_) => "date-time",
            Value::Time(_) => "time",
            Value::TimeZone(_) => "time zone",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
        }
    }
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }
    pub fn as_decimal(&self) -> Option<&Decimal> {
        match self {
            Value::Decimal(d) => Some(d),
            _ => None,
        }
    }
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }
    pub fn as_time(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            Value::Time(t) => Some(*t),
            _ => None,
        }
    }
    pub fn as_time_zone(&self) -> Option<&TimeZone> {
        match self {
            Value::TimeZone(z) => Some(z),
            _ => None,
        }
    }
    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }
    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }
    /// Parses serialized JSON text into a value.
    pub fn from_json_str(text: &str) -> Result<Value> {
        let json: serde_json::Value = serde_json::from_str(text)?;
        Ok(Value::from(json))
    }
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{:.1}", f)
    } else {
        format!("{}", f)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", format_float(*x)),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::String(s) => write!(f, "{}", s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::DateTime(d) => write!(f, "{}", d.format("%Y-%m-%d %H:%M:%S")),
            Value::Time(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S %z")),
            Value::TimeZone(z) => write!(f, "{}", z.name()),
            Value::Array(_) | Value::Map(_) | Value::Record(_) => {
                let text = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                write!(f, "{}", text)
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Decimal(d) => serializer.serialize_str(&d.to_string()),
            Value::String(s) => serializer.serialize_str(s),
            Value::Date(d) => serializer.serialize_str(&d.format("%Y-%m-%d").to_string()),
            Value::DateTime(d) => serializer.serialize_str(&d.format("%Y-%m-%dT%H:%M:%S").to_string()),
            Value::Time(t) => serializer.serialize_str(&t.to_rfc3339()),
            Value::TimeZone(z) => serializer.serialize_str(z.name()),
            Value::Array(a) => {
                let mut seq = serializer.serialize_seq(Some(a.len()))?;
                for item in a {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(m) => {
                let mut map = serializer.serialize_map(Some(m.len()))?;
                for (k, v) in m {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            Value::Record(r) => {
                let attributes = r.export_attributes().map_err(S::Error::custom)?;
                let mut map = serializer.serialize_map(Some(attributes.len()))?;
                for (k, v) in &attributes {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

// ------------- Conversions --------------
impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(a) => Value::Array(a.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(o) => {
                Value::Map(o.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}
impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}
impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}
impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i as i64)
    }
}
impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}
impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}
impl From<BigDecimal> for Value {
    fn from(d: BigDecimal) -> Self {
        Value::Decimal(Decimal(d))
    }
}
impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}
impl From<NaiveDateTime> for Value {
    fn from(d: NaiveDateTime) -> Self {
        Value::DateTime(d)
    }
}
impl From<DateTime<FixedOffset>> for Value {
    fn from(t: DateTime<FixedOffset>) -> Self {
        Value::Time(t)
    }
}
impl From<DateTime<chrono::Utc>> for Value {
    fn from(t: DateTime<chrono::Utc>) -> Self {
        Value::Time(t.fixed_offset())
    }
}
impl From<TimeZone> for Value {
    fn from(z: TimeZone) -> Self {
        Value::TimeZone(z)
    }
}
impl From<Map> for Value {
    fn from(m: Map) -> Self {
        Value::Map(m)
    }
}
impl From<Record> for Value {
    fn from(r: Record) -> Self {
        Value::Record(r)
    }
}
impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(o: Option<T>) -> Self {
        o.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Builds a [`Map`] from `key => value` pairs.
#[macro_export]
macro_rules! map {
    () => { $crate::datatype::Map::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::datatype::Map::new();
        $( map.insert(String::from($key), $crate::datatype::Value::from($value)); )+
        map
    }};
}
