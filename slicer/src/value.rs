//! Split values: the things a dimension can take and a color can be bound to.
//!
//! Primitives serialize as plain JSON. Time-like and range values serialize
//! as objects tagged with a `type` field so they survive a JSON round trip.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(from = "ValueJs", into = "ValueJs")]
pub enum Value {
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    Time(DateTime<Utc>),
    TimeRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    NumberRange {
        start: f64,
        end: f64,
    },
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Boolean(_) => "BOOLEAN",
            Value::Number(_) => "NUMBER",
            Value::String(_) => "STRING",
            Value::Time(_) => "TIME",
            Value::TimeRange { .. } => "TIME_RANGE",
            Value::NumberRange { .. } => "NUMBER_RANGE",
        }
    }

    /// Reads a value typed by a user: JSON literals are decoded as such,
    /// anything else is taken verbatim as a string.
    pub fn parse_loose(text: &str) -> Value {
        serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
    }
}

/// Equality used for slot lookups. Values of different variants never match.
pub fn value_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Boolean(x), Value::Boolean(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        // DateTime equality compares instants.
        (Value::Time(x), Value::Time(y)) => x == y,
        (
            Value::TimeRange { start, end },
            Value::TimeRange {
                start: other_start,
                end: other_end,
            },
        ) => start == other_start && end == other_end,
        (
            Value::NumberRange { start, end },
            Value::NumberRange {
                start: other_start,
                end: other_end,
            },
        ) => start == other_start && end == other_end,
        _ => false,
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        value_equals(self, other)
    }
}

pub fn value_to_js(value: &Value) -> Result<serde_json::Value, serde_json::Error> {
    serde_json::to_value(value)
}

pub fn value_from_js(js: serde_json::Value) -> Result<Value, serde_json::Error> {
    serde_json::from_value(js)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(value) => write!(f, "{value}"),
            Value::Number(value) => write!(f, "{value}"),
            Value::String(value) => f.write_str(value),
            Value::Time(value) => f.write_str(&iso(value)),
            Value::TimeRange { start, end } => write!(f, "[{},{})", iso(start), iso(end)),
            Value::NumberRange { start, end } => write!(f, "[{start},{end})"),
        }
    }
}

fn iso(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Time(value)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum ValueJs {
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    Tagged(TaggedValue),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
enum TaggedValue {
    Time {
        value: DateTime<Utc>,
    },
    TimeRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    NumberRange {
        start: f64,
        end: f64,
    },
}

impl From<ValueJs> for Value {
    fn from(js: ValueJs) -> Self {
        match js {
            ValueJs::Null => Value::Null,
            ValueJs::Boolean(value) => Value::Boolean(value),
            ValueJs::Number(value) => Value::Number(value),
            ValueJs::String(value) => Value::String(value),
            ValueJs::Tagged(TaggedValue::Time { value }) => Value::Time(value),
            ValueJs::Tagged(TaggedValue::TimeRange { start, end }) => {
                Value::TimeRange { start, end }
            }
            ValueJs::Tagged(TaggedValue::NumberRange { start, end }) => {
                Value::NumberRange { start, end }
            }
        }
    }
}

impl From<Value> for ValueJs {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => ValueJs::Null,
            Value::Boolean(value) => ValueJs::Boolean(value),
            Value::Number(value) => ValueJs::Number(value),
            Value::String(value) => ValueJs::String(value),
            Value::Time(value) => ValueJs::Tagged(TaggedValue::Time { value }),
            Value::TimeRange { start, end } => {
                ValueJs::Tagged(TaggedValue::TimeRange { start, end })
            }
            Value::NumberRange { start, end } => {
                ValueJs::Tagged(TaggedValue::NumberRange { start, end })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 9, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn primitives_serialize_as_plain_json() {
        let encode = |value: Value| value_to_js(&value).expect("encode value");
        assert_eq!(encode(Value::from("US")), json!("US"));
        assert_eq!(encode(Value::from(3i64)), json!(3.0));
        assert_eq!(encode(Value::from(true)), json!(true));
        assert_eq!(encode(Value::Null), json!(null));
    }

    #[test]
    fn time_serializes_as_tagged_object() {
        let js = value_to_js(&Value::Time(day(12))).expect("encode time");
        assert_eq!(js, json!({"type": "TIME", "value": "2015-09-12T00:00:00Z"}));
        assert_eq!(value_from_js(js).expect("decode time"), Value::Time(day(12)));
    }

    #[test]
    fn ranges_decode_from_tagged_objects() {
        let time_range = value_from_js(json!({
            "type": "TIME_RANGE",
            "start": "2015-09-12T00:00:00Z",
            "end": "2015-09-13T00:00:00Z"
        }))
        .expect("decode time range");
        assert_eq!(
            time_range,
            Value::TimeRange {
                start: day(12),
                end: day(13)
            }
        );

        let number_range = value_from_js(json!({"type": "NUMBER_RANGE", "start": 0, "end": 5}))
            .expect("decode number range");
        assert_eq!(number_range, Value::NumberRange { start: 0.0, end: 5.0 });
    }

    #[test]
    fn integers_decode_as_numbers() {
        assert_eq!(value_from_js(json!(7)).expect("decode"), Value::Number(7.0));
    }

    #[test]
    fn unknown_objects_fail_to_decode() {
        assert!(value_from_js(json!({"type": "WAT"})).is_err());
    }

    #[test]
    fn equality_never_crosses_variants() {
        assert!(!value_equals(&Value::from("1"), &Value::from(1i64)));
        assert!(!value_equals(&Value::Null, &Value::from(false)));
        assert!(!value_equals(
            &Value::Time(day(1)),
            &Value::TimeRange {
                start: day(1),
                end: day(2)
            }
        ));
    }

    #[test]
    fn time_equality_uses_the_instant() {
        let offset = value_from_js(json!({"type": "TIME", "value": "2015-09-03T01:00:00+01:00"}))
            .expect("decode offset time");
        assert!(value_equals(&offset, &Value::Time(day(3))));
        assert!(!value_equals(&offset, &Value::Time(day(4))));
    }

    #[test]
    fn parse_loose_prefers_json_literals() {
        assert_eq!(Value::parse_loose("42"), Value::Number(42.0));
        assert_eq!(Value::parse_loose("true"), Value::Boolean(true));
        assert_eq!(Value::parse_loose("US"), Value::from("US"));
        assert_eq!(Value::parse_loose("\"42\""), Value::from("42"));
    }

    #[test]
    fn display_matches_label_rendering() {
        assert_eq!(Value::from("UK").to_string(), "UK");
        assert_eq!(Value::from(12i64).to_string(), "12");
        assert_eq!(Value::Number(1.5).to_string(), "1.5");
        assert_eq!(Value::Time(day(12)).to_string(), "2015-09-12T00:00:00.000Z");
    }
}
