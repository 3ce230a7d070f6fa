use bson::{Bson, Document};
use chrono::{DateTime, Utc};

/// Value produced by a field formatter.
///
/// `Native` values are already in the store's representation and pass
/// through untouched; everything else is coerced by [`FieldValue::into_bson`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Time(DateTime<Utc>),
    List(Vec<FieldValue>),
    Map(Vec<(String, FieldValue)>),
    Json(serde_json::Value),
    Native(Bson),
}

impl FieldValue {
    /// Coerce into the nearest BSON representation.
    pub fn into_bson(self) -> Bson {
        match self {
            FieldValue::Null => Bson::Null,
            FieldValue::Bool(b) => Bson::Boolean(b),
            FieldValue::Int(n) => Bson::Int64(n),
            FieldValue::UInt(n) => match i64::try_from(n) {
                Ok(n) => Bson::Int64(n),
                Err(_) => Bson::Double(n as f64),
            },
            FieldValue::Float(f) => Bson::Double(f),
            FieldValue::Text(s) => Bson::String(s),
            FieldValue::Time(t) => Bson::DateTime(bson::DateTime::from_millis(t.timestamp_millis())),
            FieldValue::List(items) => Bson::Array(items.into_iter().map(FieldValue::into_bson).collect()),
            FieldValue::Map(entries) => {
                let mut doc = Document::new();
                for (key, value) in entries {
                    doc.insert(key, value.into_bson());
                }
                Bson::Document(doc)
            }
            FieldValue::Json(value) => json_to_bson(value),
            FieldValue::Native(b) => b,
        }
    }
}

/// Map a JSON value onto BSON, keeping object key order.
pub fn json_to_bson(value: serde_json::Value) -> Bson {
    use serde_json::Value;

    match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Bson::Int64(i)
            } else if let Some(u) = n.as_u64() {
                FieldValue::UInt(u).into_bson()
            } else {
                Bson::Double(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => Bson::String(s),
        Value::Array(items) => Bson::Array(items.into_iter().map(json_to_bson).collect()),
        Value::Object(map) => {
            let mut doc = Document::new();
            for (key, value) in map {
                doc.insert(key, json_to_bson(value));
            }
            Bson::Document(doc)
        }
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        FieldValue::Int(n.into())
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Int(n)
    }
}

impl From<u32> for FieldValue {
    fn from(n: u32) -> Self {
        FieldValue::Int(n.into())
    }
}

impl From<u64> for FieldValue {
    fn from(n: u64) -> Self {
        FieldValue::UInt(n)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(t: DateTime<Utc>) -> Self {
        FieldValue::Time(t)
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        FieldValue::Json(value)
    }
}

impl From<Bson> for FieldValue {
    fn from(value: Bson) -> Self {
        FieldValue::Native(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(items: Vec<T>) -> Self {
        FieldValue::List(items.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use chrono::TimeZone;

    #[test]
    fn native_values_pass_through() {
        let native = Bson::ObjectId(bson::oid::ObjectId::new());
        assert_eq!(FieldValue::Native(native.clone()).into_bson(), native);
    }

    #[test]
    fn unsigned_overflow_becomes_double() {
        assert_eq!(FieldValue::UInt(7).into_bson(), Bson::Int64(7));
        assert_eq!(FieldValue::UInt(u64::MAX).into_bson(), Bson::Double(u64::MAX as f64));
    }

    #[test]
    fn time_becomes_native_datetime() {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let expected = Bson::DateTime(bson::DateTime::from_millis(t.timestamp_millis()));
        assert_eq!(FieldValue::from(t).into_bson(), expected);
    }

    #[test]
    fn json_objects_become_ordered_documents() {
        let json = serde_json::json!({ "user": "alice", "attempts": 3, "ratio": 0.5, "tags": ["a", null] });
        let bson = FieldValue::from(json).into_bson();
        let expected = doc! { "attempts": 3_i64, "ratio": 0.5, "tags": ["a", Bson::Null], "user": "alice" };
        assert_eq!(bson, Bson::Document(expected));
    }

    #[test]
    fn map_preserves_insertion_order() {
        let value = FieldValue::Map(vec![
            ("z".to_string(), FieldValue::from(1)),
            ("a".to_string(), FieldValue::from("x")),
        ]);
        let Bson::Document(doc) = value.into_bson() else {
            panic!("expected a document");
        };
        let keys: Vec<&String> = doc.keys().collect();
        assert_eq!(keys, vec!["z", "a"]);
    }

    #[test]
    fn option_none_is_null() {
        let none: Option<&str> = None;
        assert_eq!(FieldValue::from(none).into_bson(), Bson::Null);
    }
}
