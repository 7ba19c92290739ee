//! Type coercion rules: one policy per [`AttributeType`].
//!
//! Every rule maps null to null (arrays and maps map it to an empty
//! collection) and fails with a type conversion error when an input can not be
//! interpreted at all.

use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::{FixedOffset, NaiveDate, NaiveTime, TimeZone as _};
use lazy_static::lazy_static;
use regex::Regex;

use std::str::FromStr;

use crate::datatype::{AttributeType, Decimal, Map, Value};
use crate::error::{AttributionError, Result};
use crate::temporal::{parse_date, parse_time, LocalZone, TimeZone};

/// Strings matched case-insensitively as true; any other string is false.
pub const BOOLEAN_TRUE_STRINGS: [&str; 4] = ["y", "yes", "t", "true"];

const DATE_KEYS: [&str; 3] = ["year", "month", "day"];
const TIME_KEYS: [&str; 7] = ["year", "month", "day", "hour", "min", "sec", "utc_offset"];

lazy_static! {
    static ref INTEGER_PREFIX: Regex = Regex::new(r"^\s*([+-]?\d+(?:_\d+)*)").unwrap();
    static ref NUMERIC_PREFIX: Regex = Regex::new(
        r"^\s*([+-]?(?:\d+(?:_\d+)*)?(?:\.\d+(?:_\d+)*)?(?:[eE][+-]?\d+)?)"
    ).unwrap();
    static ref OFFSET: Regex = Regex::new(r"^([+-])(\d{2}):?(\d{2})$").unwrap();
}

/// Applies the coercion rules, using `zone` for wall-clock times that do not
/// carry their own offset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Coercer {
    zone: LocalZone,
}

impl Coercer {
    pub fn new(zone: LocalZone) -> Self {
        Self { zone }
    }
    pub fn zone(&self) -> &LocalZone {
        &self.zone
    }
    pub fn coerce(&self, ty: AttributeType, input: Value) -> Result<Value> {
        match ty {
            AttributeType::String => to_string(input),
            AttributeType::Boolean => to_boolean(input),
            AttributeType::Integer => to_integer(input),
            AttributeType::Float => to_float(input),
            AttributeType::Decimal => to_decimal(input),
            AttributeType::Date => to_date(input),
            AttributeType::Time => self.to_time(input),
            AttributeType::TimeZone => to_time_zone(input),
            AttributeType::Array => to_array(input),
            AttributeType::Map => to_map(input),
        }
    }
    pub fn to_time(&self, input: Value) -> Result<Value> {
        let time = match input {
            Value::Null => return Ok(Value::Null),
            Value::Time(t) => Some(t),
            Value::Date(d) => self.zone.midnight(d),
            Value::DateTime(d) => self.zone.localize(d),
            Value::String(ref s) => parse_time(s, &self.zone),
            Value::Map(ref m) => return self.structured_time(m),
            other => return Err(unconvertible(&other, AttributeType::Time)),
        };
        time.map(Value::Time)
            .ok_or_else(|| unconvertible(&input, AttributeType::Time))
    }
    fn structured_time(&self, map: &Map) -> Result<Value> {
        let parts = extract_values(map, &TIME_KEYS);
        if parts.is_empty() {
            return Ok(Value::Null);
        }
        let part = |i: usize, default: i64| parts.get(i).map(|v| component(v)).unwrap_or(default);
        let date = structured_date(part(0, 1), part(1, 1), part(2, 1))?;
        let time = NaiveTime::from_hms_opt(
            to_u32(part(3, 0))?,
            to_u32(part(4, 0))?,
            to_u32(part(5, 0))?,
        )
        .ok_or_else(|| AttributionError::conversion("time", format!("{:?}", parts)))?;
        let naive = date.and_time(time);
        let zoned = match parts.get(6) {
            Some(offset) => utc_offset(offset)?.from_local_datetime(&naive).single(),
            None => self.zone.localize(naive),
        };
        zoned
            .map(Value::Time)
            .ok_or_else(|| AttributionError::conversion("time", naive.to_string()))
    }
}

fn unconvertible(input: &Value, target: AttributeType) -> AttributionError {
    AttributionError::conversion(target.name(), format!("{} {:?}", input.kind(), input.to_string()))
}

/// Returns the values under `keys`, in order, up until the first blank one.
pub fn extract_values<'a>(map: &'a Map, keys: &[&str]) -> Vec<&'a Value> {
    let mut values = Vec::new();
    for key in keys {
        let value = map.get(*key).or_else(|| map.get(&camel_case(key)));
        match value {
            Some(v) if !v.is_blank() => values.push(v),
            _ => break,
        }
    }
    values
}

fn camel_case(key: &str) -> String {
    let mut parts = key.split('_');
    let mut camel = parts.next().unwrap_or_default().to_string();
    for part in parts {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            camel.extend(first.to_uppercase());
            camel.push_str(chars.as_str());
        }
    }
    camel
}

// ------------- Numeric prefixes --------------
/// The leading integer of a string, 0 when there is none.
pub fn leading_integer(s: &str) -> Option<i64> {
    match INTEGER_PREFIX.captures(s).and_then(|c| c.get(1)) {
        Some(digits) => digits.as_str().replace('_', "").parse::<i64>().ok(),
        None => Some(0),
    }
}

/// The leading numeric text of a string, if it has any digits at all.
fn numeric_prefix(s: &str) -> Option<String> {
    let prefix = NUMERIC_PREFIX.captures(s)?.get(1)?.as_str().replace('_', "");
    let mantissa = prefix.split(['e', 'E']).next().unwrap_or_default();
    if mantissa.chars().any(|c| c.is_ascii_digit()) {
        Some(prefix)
    } else {
        None
    }
}

/// The leading float of a string, 0.0 when there is none.
pub fn leading_float(s: &str) -> f64 {
    numeric_prefix(s)
        .and_then(|p| p.parse::<f64>().ok())
        .unwrap_or(0.0)
}

fn component(value: &Value) -> i64 {
    match value {
        Value::Integer(i) => *i,
        Value::Float(f) => f.trunc() as i64,
        other => leading_integer(&other.to_string()).unwrap_or(0),
    }
}

fn to_u32(i: i64) -> Result<u32> {
    u32::try_from(i).map_err(|_| AttributionError::conversion("time", format!("component {i}")))
}

fn structured_date(year: i64, month: i64, day: i64) -> Result<NaiveDate> {
    i32::try_from(year)
        .ok()
        .and_then(|y| NaiveDate::from_ymd_opt(y, month.try_into().ok()?, day.try_into().ok()?))
        .ok_or_else(|| AttributionError::conversion("date", format!("{year}-{month}-{day}")))
}

fn utc_offset(value: &Value) -> Result<FixedOffset> {
    let seconds = match value {
        Value::String(s) => match OFFSET.captures(s.trim()) {
            Some(c) => {
                let hours: i64 = c[2].parse().unwrap_or(0);
                let minutes: i64 = c[3].parse().unwrap_or(0);
                let sign = if &c[1] == "-" { -1 } else { 1 };
                sign * (hours * 3600 + minutes * 60)
            }
            None => component(value),
        },
        other => component(other),
    };
    i32::try_from(seconds)
        .ok()
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| AttributionError::conversion("utc offset", value.to_string()))
}

// ------------- Rules --------------
pub fn to_string(input: Value) -> Result<Value> {
    Ok(match input {
        Value::Null => Value::Null,
        Value::String(s) => Value::String(s),
        other => Value::String(other.to_string()),
    })
}

pub fn to_boolean(input: Value) -> Result<Value> {
    Ok(match input {
        Value::Null => Value::Null,
        Value::Bool(b) => Value::Bool(b),
        Value::String(s) => {
            let s = s.to_lowercase();
            Value::Bool(BOOLEAN_TRUE_STRINGS.contains(&s.as_str()))
        }
        Value::Integer(i) => Value::Bool(i == 1),
        Value::Float(f) => Value::Bool(f == 1.0),
        Value::Decimal(d) => Value::Bool(*d == BigDecimal::from(1)),
        _ => Value::Bool(true),
    })
}

pub fn to_integer(input: Value) -> Result<Value> {
    let integer = match input {
        Value::Null => return Ok(Value::Null),
        Value::Integer(i) => Some(i),
        Value::Float(f) if f.is_finite() => Some(f.trunc() as i64),
        Value::Decimal(ref d) => d.with_scale(0).to_i64(),
        Value::String(ref s) => leading_integer(s),
        Value::Time(t) => Some(t.timestamp()),
        _ => None,
    };
    integer
        .map(Value::Integer)
        .ok_or_else(|| unconvertible(&input, AttributeType::Integer))
}

pub fn to_float(input: Value) -> Result<Value> {
    let float = match input {
        Value::Null => return Ok(Value::Null),
        Value::Float(f) => Some(f),
        Value::Integer(i) => Some(i as f64),
        Value::Decimal(ref d) => d.to_f64(),
        Value::String(ref s) => Some(leading_float(s)),
        Value::Time(t) => Some(t.timestamp() as f64 + t.timestamp_subsec_nanos() as f64 / 1e9),
        _ => None,
    };
    float
        .map(Value::Float)
        .ok_or_else(|| unconvertible(&input, AttributeType::Float))
}

/// Decimals are always parsed from text, so `14.4` stays exactly `14.4`.
pub fn to_decimal(input: Value) -> Result<Value> {
    let text = match input {
        Value::Null => return Ok(Value::Null),
        Value::Decimal(d) => return Ok(Value::Decimal(d)),
        Value::Integer(i) => Some(i.to_string()),
        Value::Float(f) if f.is_finite() => Some(format!("{}", f)),
        Value::String(ref s) => numeric_prefix(s),
        _ => None,
    };
    text.and_then(|t| Decimal::from_str(&t))
        .map(Value::Decimal)
        .ok_or_else(|| unconvertible(&input, AttributeType::Decimal))
}

pub fn to_date(input: Value) -> Result<Value> {
    let date = match input {
        Value::Null => return Ok(Value::Null),
        Value::Date(d) => Some(d),
        Value::DateTime(d) => Some(d.date()),
        Value::Time(t) => Some(t.date_naive()),
        Value::String(ref s) => parse_date(s),
        Value::Map(ref m) => {
            let parts = extract_values(m, &DATE_KEYS);
            if parts.is_empty() {
                return Ok(Value::Null);
            }
            let part = |i: usize| parts.get(i).map(|v| component(v)).unwrap_or(1);
            return structured_date(part(0), part(1), part(2)).map(Value::Date);
        }
        _ => None,
    };
    date.map(Value::Date)
        .ok_or_else(|| unconvertible(&input, AttributeType::Date))
}

pub fn to_time_zone(input: Value) -> Result<Value> {
    let zone = match input {
        Value::Null => return Ok(Value::Null),
        Value::TimeZone(z) => Some(z),
        Value::Integer(hours) => hours.checked_mul(3600).and_then(|seconds| {
            TimeZone::all()
                .iter()
                .find(|z| i64::from(z.utc_offset()) == seconds)
                .copied()
        }),
        ref other => TimeZone::find(&other.to_string()),
    };
    zone.map(Value::TimeZone)
        .ok_or_else(|| unconvertible(&input, AttributeType::TimeZone))
}

pub fn to_array(input: Value) -> Result<Value> {
    Ok(match input {
        Value::Null => Value::Array(Vec::new()),
        Value::Array(a) => Value::Array(a),
        other => Value::Array(vec![other]),
    })
}

pub fn to_map(input: Value) -> Result<Value> {
    match input {
        Value::Null => Ok(Value::Map(Map::new())),
        Value::Map(m) => Ok(Value::Map(m)),
        Value::Record(r) => Ok(Value::Map(r.export_attributes()?)),
        Value::String(ref s) => match Value::from_json_str(s) {
            Ok(Value::Map(m)) => Ok(Value::Map(m)),
            _ => Err(unconvertible(&input, AttributeType::Map)),
        },
        other => Err(unconvertible(&other, AttributeType::Map)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_prefixes() {
        assert_eq!(leading_integer("42abc"), Some(42));
        assert_eq!(leading_integer("  -7"), Some(-7));
        assert_eq!(leading_integer("1_000"), Some(1000));
        assert_eq!(leading_integer("abc"), Some(0));
        assert_eq!(leading_integer("99999999999999999999"), None);
    }

    #[test]
    fn float_prefixes() {
        assert_eq!(leading_float("14.4"), 14.4);
        assert_eq!(leading_float("1.5e3kg"), 1500.0);
        assert_eq!(leading_float(".5"), 0.5);
        assert_eq!(leading_float("e5"), 0.0);
        assert_eq!(leading_float("nope"), 0.0);
    }

    #[test]
    fn extraction_stops_at_first_blank() {
        let map = crate::map! { "year" => "2013", "month" => "", "day" => "17" };
        assert_eq!(extract_values(&map, &DATE_KEYS), vec![&Value::from("2013")]);
        let camel = crate::map! { "year" => 2013, "utcOffset" => 3600 };
        assert_eq!(extract_values(&camel, &["year", "utc_offset"]).len(), 2);
    }
}
