//! Typed annotation value trees and owning declarations
//!
//! The parsing front-end hands every annotation attachment to this crate as
//! an ordered `(key, Value)` sequence with already-typed values. Processors
//! never see raw source text; they decode [`Value`] trees against a fixed
//! key enumeration per resource kind, failing with the traversed [`KeyPath`]
//! when a nested key is unrecognized or a value has the wrong shape.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::Error;
use crate::Result;

// =============================================================================
// Value tree
// =============================================================================

/// A typed annotation value: scalar, list, or record.
///
/// Records keep source order and double as key-unique maps when coerced via
/// [`expect_map`]. Attachments are input only and never mutated.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// String scalar
    String(String),
    /// Boolean scalar
    Bool(bool),
    /// Integer scalar
    Int(i64),
    /// Ordered list of values
    List(Vec<Value>),
    /// Ordered key/value record (nested structure or string map)
    Record(Vec<(String, Value)>),
}

impl Value {
    /// Human-readable name of the value's shape, for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::List(_) => "list",
            Value::Record(_) => "record",
        }
    }

    /// Convenience constructor for a string scalar
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }
}

// =============================================================================
// Key paths
// =============================================================================

/// The traversed key path inside an annotation value tree.
///
/// Rendered like `http[0].route[1].destination` in error messages so users
/// can find the offending field without guessing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KeyPath(String);

impl KeyPath {
    /// An empty path at the attachment's top level
    pub fn new() -> Self {
        Self::default()
    }

    /// Descend into a named key
    #[must_use]
    pub fn key(&self, key: &str) -> Self {
        if self.0.is_empty() {
            Self(key.to_string())
        } else {
            Self(format!("{}.{}", self.0, key))
        }
    }

    /// Descend into a list element
    #[must_use]
    pub fn index(&self, idx: usize) -> Self {
        Self(format!("{}[{}]", self.0, idx))
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Attachments and owning declarations
// =============================================================================

/// Which resource kind an annotation attachment declares
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnnotationKind {
    /// Kubernetes ingress rule
    Ingress,
    /// Kubernetes service / managed container
    Service,
    /// Istio virtual service
    VirtualService,
    /// Istio gateway
    Gateway,
}

/// One parsed annotation attachment: a kind tag plus the ordered
/// `(key, value)` pairs of its configuration record.
#[derive(Clone, Debug)]
pub struct Attachment {
    /// The resource kind this attachment declares
    pub kind: AnnotationKind,
    pairs: Vec<(String, Value)>,
}

impl Attachment {
    /// Create an attachment from its kind and ordered key/value pairs
    pub fn new(kind: AnnotationKind, pairs: Vec<(String, Value)>) -> Self {
        Self { kind, pairs }
    }

    /// The ordered `(key, value)` pairs, in source order
    pub fn pairs(&self) -> &[(String, Value)] {
        &self.pairs
    }
}

/// The constructor call of a listener declaration: its protocol type
/// qualifier and ordered arguments (a port expression, then an optional
/// configuration record).
#[derive(Clone, Debug)]
pub struct ListenerInit {
    /// Declared protocol qualifier of the listener type (e.g. "http")
    pub protocol: String,
    /// Ordered constructor argument values
    pub args: Vec<Value>,
}

impl ListenerInit {
    /// Create a listener constructor from its protocol and arguments
    pub fn new(protocol: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            protocol: protocol.into(),
            args,
        }
    }

    /// The first constructor argument, expected to be a port expression
    pub fn port_arg(&self) -> Option<&Value> {
        self.args.first()
    }

    /// The second constructor argument when it is a configuration record
    pub fn config_record(&self) -> Option<&[(String, Value)]> {
        match self.args.get(1) {
            Some(Value::Record(pairs)) => Some(pairs),
            _ => None,
        }
    }
}

/// The declaration an annotation is attached to: a named listener, or a
/// service (bound to an inline anonymous listener, or to a named one).
#[derive(Clone, Debug)]
pub struct Owner {
    /// Identifier of the listener variable or service
    pub name: String,
    /// True when the declaration is a service rather than a listener
    pub is_service: bool,
    /// True when the service is bound to an inline anonymous listener
    pub anonymous: bool,
    /// The listener constructor, when one is visible at the declaration
    pub listener: Option<ListenerInit>,
}

impl Owner {
    /// A named listener declaration
    pub fn listener(name: impl Into<String>, init: ListenerInit) -> Self {
        Self {
            name: name.into(),
            is_service: false,
            anonymous: false,
            listener: Some(init),
        }
    }

    /// A service bound to an inline anonymous listener
    pub fn anonymous_service(name: impl Into<String>, init: ListenerInit) -> Self {
        Self {
            name: name.into(),
            is_service: true,
            anonymous: true,
            listener: Some(init),
        }
    }

    /// A service bound to a separately declared, named listener
    pub fn service(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_service: true,
            anonymous: false,
            listener: None,
        }
    }
}

// =============================================================================
// Coercions
// =============================================================================

/// Coerce a value to a string scalar
pub fn expect_string(value: &Value, path: &KeyPath) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => Err(wrong_type("string", other, path)),
    }
}

/// Coerce a value to a boolean scalar
pub fn expect_bool(value: &Value, path: &KeyPath) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        other => Err(wrong_type("boolean", other, path)),
    }
}

/// Coerce a value to a 32-bit integer
pub fn expect_int(value: &Value, path: &KeyPath) -> Result<i32> {
    match value {
        Value::Int(i) => i32::try_from(*i).map_err(|_| {
            Error::configuration_at(path, format!("integer value {i} out of range"))
        }),
        other => Err(wrong_type("integer", other, path)),
    }
}

/// Coerce a value to a 64-bit integer
pub fn expect_i64(value: &Value, path: &KeyPath) -> Result<i64> {
    match value {
        Value::Int(i) => Ok(*i),
        other => Err(wrong_type("integer", other, path)),
    }
}

/// Coerce a record of string scalars into a key-unique map.
///
/// Source order is irrelevant for maps; a repeated key keeps the last value.
pub fn expect_map(value: &Value, path: &KeyPath) -> Result<BTreeMap<String, String>> {
    let pairs = expect_record(value, path)?;
    let mut map = BTreeMap::new();
    for (key, entry) in pairs {
        let _ = map.insert(key.clone(), expect_string(entry, &path.key(key))?);
    }
    Ok(map)
}

/// Coerce a value to a list, preserving source order
pub fn expect_list<'a>(value: &'a Value, path: &KeyPath) -> Result<&'a [Value]> {
    match value {
        Value::List(items) => Ok(items),
        other => Err(wrong_type("list", other, path)),
    }
}

/// Coerce a list of string scalars, preserving source order
pub fn expect_string_list(value: &Value, path: &KeyPath) -> Result<Vec<String>> {
    let items = expect_list(value, path)?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| expect_string(item, &path.index(i)))
        .collect()
}

/// Coerce a value to a nested record
pub fn expect_record<'a>(value: &'a Value, path: &KeyPath) -> Result<&'a [(String, Value)]> {
    match value {
        Value::Record(pairs) => Ok(pairs),
        other => Err(wrong_type("record", other, path)),
    }
}

fn wrong_type(expected: &str, found: &Value, path: &KeyPath) -> Error {
    Error::configuration_at(
        path,
        format!("expected a {expected} value, found {}", found.type_name()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_path_rendering() {
        let path = KeyPath::new().key("http").index(2).key("route").index(0);
        assert_eq!(path.to_string(), "http[2].route[0]");
    }

    #[test]
    fn test_scalar_coercions() {
        let path = KeyPath::new().key("port");
        assert_eq!(expect_int(&Value::Int(8080), &path).unwrap(), 8080);
        assert_eq!(expect_i64(&Value::Int(30), &path).unwrap(), 30);
        assert!(expect_bool(&Value::Bool(true), &path).unwrap());
        assert_eq!(
            expect_string(&Value::string("svc1"), &path).unwrap(),
            "svc1"
        );
    }

    #[test]
    fn test_wrong_type_reports_shape_and_path() {
        let path = KeyPath::new().key("timeout");
        let err = expect_i64(&Value::string("5s"), &path).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("expected a integer value, found string"));
        assert!(msg.contains("timeout"));
    }

    #[test]
    fn test_int_out_of_range() {
        let path = KeyPath::new().key("weight");
        let err = expect_int(&Value::Int(i64::MAX), &path).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_map_is_key_unique_and_order_irrelevant() {
        let record = Value::Record(vec![
            ("team".to_string(), Value::string("payments")),
            ("tier".to_string(), Value::string("backend")),
            ("team".to_string(), Value::string("checkout")),
        ]);
        let map = expect_map(&record, &KeyPath::new().key("labels")).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("team"), Some(&"checkout".to_string()));
    }

    #[test]
    fn test_string_list_preserves_order() {
        let list = Value::List(vec![
            Value::string("b.example.com"),
            Value::string("a.example.com"),
        ]);
        let hosts = expect_string_list(&list, &KeyPath::new().key("hosts")).unwrap();
        assert_eq!(hosts, vec!["b.example.com", "a.example.com"]);
    }

    #[test]
    fn test_listener_config_record() {
        let init = ListenerInit::new(
            "http",
            vec![
                Value::Int(9090),
                Value::Record(vec![("secureSocket".to_string(), Value::Record(vec![]))]),
            ],
        );
        assert_eq!(init.port_arg(), Some(&Value::Int(9090)));
        assert!(init.config_record().is_some());

        let bare = ListenerInit::new("http", vec![Value::Int(8080)]);
        assert!(bare.config_record().is_none());
    }
}
