//! Dynamic values stored in the index.
//!
//! `Value` is a closed sum over six kinds. It owns its payload: cloning an
//! array or object copies it, so a mutation through one copy is never seen
//! through another.
//!
//! Values are totally ordered, first by kind
//! (`Null < Number < Boolean < String < Array < Object`), then by payload,
//! so they can key a `BTreeMap` or live in a `BTreeSet`.

mod encode;
mod parse;

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Index;

pub use parse::{ParseError, ParsedValues};

/// Array payload
pub type Array = Vec<Value>;

/// Object payload, iterated in key order
pub type Object = BTreeMap<String, Value>;

/// A dynamically typed value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Value {
    #[default]
    Null,
    Number(Number),
    Boolean(bool),
    String(String),
    Array(Array),
    Object(Object),
}

/// The kind of a `Value`, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueKind {
    Null,
    Number,
    Boolean,
    String,
    Array,
    Object,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Number => "number",
            ValueKind::Boolean => "boolean",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
        };
        f.write_str(name)
    }
}

/// Numeric payload. Integers and floats are one kind and compare by
/// mathematical value, so `Int(1) == Float(1.0)`.
#[derive(Debug, Clone, Copy)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    /// The integer value, if this number has no fractional part and fits.
    pub fn as_i64(self) -> Option<i64> {
        match self {
            Number::Int(i) => Some(i),
            Number::Float(f) => {
                (f.fract() == 0.0 && f >= -9_223_372_036_854_775_808.0 && f < 9_223_372_036_854_775_808.0)
                    .then_some(f as i64)
            }
        }
    }
}

/// NaN equals NaN and sorts above every other number.
fn cmp_floats(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Exact comparison, no rounding of `i` through f64.
fn cmp_int_float(i: i64, f: f64) -> Ordering {
    // 2^63 is exact in f64
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if f.is_nan() || f >= LIMIT {
        return Ordering::Less;
    }
    if f < -LIMIT {
        return Ordering::Greater;
    }
    let whole = f.trunc();
    match i.cmp(&(whole as i64)) {
        Ordering::Equal => cmp_floats(0.0, f - whole),
        other => other,
    }
}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> Ordering {
        match (*self, *other) {
            (Number::Int(a), Number::Int(b)) => a.cmp(&b),
            (Number::Float(a), Number::Float(b)) => cmp_floats(a, b),
            (Number::Int(a), Number::Float(b)) => cmp_int_float(a, b),
            (Number::Float(a), Number::Int(b)) => cmp_int_float(b, a).reverse(),
        }
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Number {}

static NULL: Value = Value::Null;

impl Value {
    /// Decode the text form produced by `encode` (and compatible JSON-like
    /// text: `:` is accepted as the object separator too).
    pub fn parse(text: &str) -> Result<Value, ParseError> {
        parse::parse(text)
    }

    /// Decode a run of concatenated values, e.g. `1 [2] {"a".3}`.
    ///
    /// Stops at the end of input or at the first malformed value; the values
    /// decoded so far are kept and `stop` marks where the next one would start.
    pub fn parse_multi(text: &str) -> ParsedValues {
        parse::parse_multi(text)
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Number(_) => ValueKind::Number,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
        }
    }

    pub fn is_null(&self) -> bool { matches!(self, Value::Null) }
    pub fn is_number(&self) -> bool { matches!(self, Value::Number(_)) }
    pub fn is_boolean(&self) -> bool { matches!(self, Value::Boolean(_)) }
    pub fn is_string(&self) -> bool { matches!(self, Value::String(_)) }
    pub fn is_array(&self) -> bool { matches!(self, Value::Array(_)) }
    pub fn is_object(&self) -> bool { matches!(self, Value::Object(_)) }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(n.as_f64()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Array> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut Object> {
        match self {
            Value::Object(fields) => Some(fields),
            _ => None,
        }
    }

    /// Check that this is an object carrying every listed field with the
    /// listed kind. The error names the first violation.
    pub fn has_shape(&self, shape: &[(&str, ValueKind)]) -> Result<(), String> {
        let fields = match self {
            Value::Object(fields) => fields,
            other => return Err(format!("expected object, got {}", other.encode())),
        };
        for (name, kind) in shape {
            match fields.get(*name) {
                Some(value) if value.kind() == *kind => {}
                _ => return Err(format!("bad type for {} in {}", name, self.encode())),
            }
        }
        Ok(())
    }
}

impl Index<usize> for Value {
    type Output = Value;

    /// Array element, or `Null` when out of range or not an array.
    fn index(&self, i: usize) -> &Value {
        self.as_array().and_then(|items| items.get(i)).unwrap_or(&NULL)
    }
}

impl Index<&str> for Value {
    type Output = Value;

    /// Object field, or `Null` when missing or not an object.
    fn index(&self, key: &str) -> &Value {
        self.as_object().and_then(|fields| fields.get(key)).unwrap_or(&NULL)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self { Value::Null }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self { Value::Boolean(b) }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self { Value::Number(Number::Int(i.into())) }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self { Value::Number(Number::Int(i)) }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self { Value::Number(Number::Float(f)) }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self { Value::String(s.to_owned()) }
}

impl From<String> for Value {
    fn from(s: String) -> Self { Value::String(s) }
}

impl From<Array> for Value {
    fn from(items: Array) -> Self { Value::Array(items) }
}

impl From<Object> for Value {
    fn from(fields: Object) -> Self { Value::Object(fields) }
}

impl FromIterator<Value> for Value {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Value::Array(iter.into_iter().collect())
    }
}

impl FromIterator<(String, Value)> for Value {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Value::Object(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn object(fields: &[(&str, Value)]) -> Value {
        Value::Object(fields.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
    }

    #[test]
    fn test_kind_order() {
        let ordered = vec![
            Value::Null,
            Value::from(-5),
            Value::from(false),
            Value::from(""),
            Value::Array(vec![]),
            object(&[]),
        ];
        let mut shuffled = ordered.clone();
        shuffled.reverse();
        shuffled.sort();
        assert_eq!(shuffled, ordered);
    }

    #[test]
    fn test_numbers_compare_across_repr() {
        assert_eq!(Value::from(1), Value::from(1.0));
        assert!(Value::from(1) < Value::from(1.5));
        assert!(Value::from(2.5) < Value::from(3));
        assert!(Value::from(-0.5) > Value::from(-1));
        assert_eq!(Value::from(0), Value::from(-0.0));
        assert_ne!(Value::from(i64::MAX), Value::from(i64::MAX as f64));
        assert!(Value::from(i64::MAX) < Value::from(f64::INFINITY));
        assert!(Value::from(i64::MIN) > Value::from(f64::NEG_INFINITY));
    }

    #[test]
    fn test_nan_is_ordered() {
        let nan = Value::from(f64::NAN);
        assert_eq!(nan, Value::from(f64::NAN));
        assert!(nan > Value::from(f64::INFINITY));
        assert!(nan > Value::from(i64::MAX));
        assert!(nan < Value::from(false));
    }

    #[test]
    fn test_values_as_set_members() {
        let set: BTreeSet<Value> = [Value::from("b"), Value::from(2), Value::from("a"), Value::from(2.0)]
            .into_iter()
            .collect();
        let members: Vec<Value> = set.into_iter().collect();
        assert_eq!(members, vec![Value::from(2), Value::from("a"), Value::from("b")]);
    }

    #[test]
    fn test_clone_is_deep() {
        let original = Value::Array(vec![Value::from(1)]);
        let mut copy = original.clone();
        copy.as_array_mut().unwrap().push(Value::from(2));
        assert_eq!(original.as_array().unwrap().len(), 1);
        assert_eq!(copy.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_indexing() {
        let v = object(&[("list", Value::Array(vec![Value::from("x")]))]);
        assert_eq!(v["list"][0], Value::from("x"));
        assert!(v["missing"].is_null());
        assert!(v["list"][7].is_null());
        assert!(Value::from(3)["field"].is_null());
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::from(4.0).as_i64(), Some(4));
        assert_eq!(Value::from(4.5).as_i64(), None);
        assert_eq!(Value::from(7).as_f64(), Some(7.0));
        assert_eq!(Value::from(true).as_bool(), Some(true));
        assert_eq!(Value::from("s").as_str(), Some("s"));
        assert_eq!(Value::Null.as_str(), None);
        assert_eq!(Value::default().kind(), ValueKind::Null);
    }

    #[test]
    fn test_has_shape() {
        let user = object(&[("name", Value::from("ada")), ("age", Value::from(36))]);
        assert!(user.has_shape(&[("name", ValueKind::String), ("age", ValueKind::Number)]).is_ok());
        assert!(user.has_shape(&[]).is_ok());

        let err = user.has_shape(&[("name", ValueKind::String), ("age", ValueKind::String)]).unwrap_err();
        assert_eq!(err, r#"bad type for age in {"age".36, "name"."ada"}"#);

        let err = user.has_shape(&[("email", ValueKind::String)]).unwrap_err();
        assert!(err.starts_with("bad type for email"));

        let err = Value::from(3).has_shape(&[("x", ValueKind::Null)]).unwrap_err();
        assert_eq!(err, "expected object, got 3");
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ValueKind::Boolean.to_string(), "boolean");
        assert_eq!(Value::Array(vec![]).kind().to_string(), "array");
    }

    #[test]
    fn test_collect_into_array_and_object() {
        let array: Value = (1..=3i64).map(Value::from).collect();
        assert_eq!(array, Value::Array(vec![Value::from(1), Value::from(2), Value::from(3)]));

        let mut scores = std::collections::HashMap::new();
        scores.insert("bob".to_string(), 7);
        scores.insert("alice".to_string(), 9);
        let object: Value = scores.into_iter().map(|(k, v)| (k, Value::from(v))).collect();
        assert_eq!(object.encode(), "{\"alice\".9, \"bob\".7}");

        let empty: Value = Vec::<Value>::new().into_iter().collect();
        assert_eq!(empty, Value::Array(vec![]));
    }
}
