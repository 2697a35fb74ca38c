//! Property values as they arrive from a schema-free store.
//!
//! Values are classified once, at ingestion, into [`PropertyValue`]. Nothing
//! downstream re-inspects raw JSON to decide how a value should be shown.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Field that marks a mapping as a typed-primitive wrapper.
pub const WRAPPED_VALUE_KEY: &str = "value";

/// A leaf value.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
	/// Explicit null.
	Null,
	/// Boolean.
	Bool(bool),
	/// Integer that fits `i64`.
	Int(i64),
	/// Any other number.
	Float(f64),
	/// String.
	Text(String),
}

/// A property value, resolved once from its raw shape.
///
/// A mapping that carries a `value` field is a store-specific wrapper around a
/// primitive (`{"value": 3.2, "type": "IfcLengthMeasure"}`); it keeps its
/// remaining fields in `meta` so the value serializes back unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum PropertyValue {
	/// Shown inline as is.
	Scalar(Scalar),
	/// Shown as its inner `value`.
	Wrapped {
		/// The wrapped primitive.
		value: Box<PropertyValue>,
		/// Sibling fields such as `type`.
		meta: BTreeMap<String, PropertyValue>,
	},
	/// A mapping without `value`, shown as a collapsible group.
	Nested(BTreeMap<String, PropertyValue>),
	/// Shown inline, comma separated.
	List(Vec<PropertyValue>),
}

/// A node's or relationship's property set.
pub type Properties = BTreeMap<String, PropertyValue>;

impl PropertyValue {
	/// Text scalar.
	pub fn text(s: impl Into<String>) -> Self {
		PropertyValue::Scalar(Scalar::Text(s.into()))
	}

	/// String content if this is a text scalar, looking through wrappers.
	pub fn as_str(&self) -> Option<&str> {
		match self {
			PropertyValue::Scalar(Scalar::Text(s)) => Some(s),
			PropertyValue::Wrapped { value, .. } => value.as_str(),
			_ => None,
		}
	}

	/// Inline text for leaf-like values; `None` for nested mappings.
	pub fn display_text(&self) -> Option<String> {
		match self {
			PropertyValue::Scalar(s) => Some(s.to_string()),
			PropertyValue::Wrapped { value, .. } => value.display_text().or_else(|| Some(Value::from(value.as_ref().clone()).to_string())),
			PropertyValue::List(items) => Some(
				items
					.iter()
					.map(|v| v.display_text().unwrap_or_else(|| Value::from(v.clone()).to_string()))
					.collect::<Vec<_>>()
					.join(", "),
			),
			PropertyValue::Nested(_) => None,
		}
	}

	/// Null or whitespace-only text.
	pub fn is_blank(&self) -> bool {
		match self {
			PropertyValue::Scalar(Scalar::Null) => true,
			PropertyValue::Scalar(Scalar::Text(s)) => s.trim().is_empty(),
			PropertyValue::Wrapped { value, .. } => value.is_blank(),
			_ => false,
		}
	}
}

impl fmt::Display for Scalar {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Scalar::Null => f.write_str("null"),
			Scalar::Bool(b) => write!(f, "{}", b),
			Scalar::Int(i) => write!(f, "{}", i),
			Scalar::Float(x) => write!(f, "{}", x),
			Scalar::Text(s) => f.write_str(s),
		}
	}
}

impl From<Value> for PropertyValue {
	fn from(raw: Value) -> Self {
		match raw {
			Value::Null => PropertyValue::Scalar(Scalar::Null),
			Value::Bool(b) => PropertyValue::Scalar(Scalar::Bool(b)),
			Value::Number(n) => PropertyValue::Scalar(match n.as_i64() {
				Some(i) => Scalar::Int(i),
				None => Scalar::Float(n.as_f64().unwrap_or(f64::NAN)),
			}),
			Value::String(s) => PropertyValue::Scalar(Scalar::Text(s)),
			Value::Array(items) => PropertyValue::List(items.into_iter().map(Into::into).collect()),
			Value::Object(mut map) => match map.remove(WRAPPED_VALUE_KEY) {
				Some(inner) => PropertyValue::Wrapped {
					value: Box::new(inner.into()),
					meta: map.into_iter().map(|(k, v)| (k, v.into())).collect(),
				},
				None => PropertyValue::Nested(map.into_iter().map(|(k, v)| (k, v.into())).collect()),
			},
		}
	}
}

impl From<PropertyValue> for Value {
	fn from(value: PropertyValue) -> Self {
		match value {
			PropertyValue::Scalar(Scalar::Null) => Value::Null,
			PropertyValue::Scalar(Scalar::Bool(b)) => Value::Bool(b),
			PropertyValue::Scalar(Scalar::Int(i)) => Value::Number(i.into()),
			PropertyValue::Scalar(Scalar::Float(x)) => Number::from_f64(x).map(Value::Number).unwrap_or(Value::Null),
			PropertyValue::Scalar(Scalar::Text(s)) => Value::String(s),
			PropertyValue::List(items) => Value::Array(items.into_iter().map(Into::into).collect()),
			PropertyValue::Nested(map) => Value::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect()),
			PropertyValue::Wrapped { value, meta } => {
				let mut map: Map<String, Value> = meta.into_iter().map(|(k, v)| (k, v.into())).collect();
				map.insert(WRAPPED_VALUE_KEY.to_string(), (*value).into());
				Value::Object(map)
			}
		}
	}
}
