//! # Value Model
//!
//! A closed tagged union over every shape the wire format can carry.
//!
//! Composite values decoded from a stream may be referenced more than once in
//! the same message. Lists, maps and objects are therefore held behind an
//! [`Arc`]: a back-reference hands out another handle to the same allocation
//! instead of a deep copy, and `Arc::ptr_eq` tells the two cases apart.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Name of the record field whose value becomes an object's wire type name.
pub const TYPE_FIELD: &str = "Type";

/// One encodable/decodable value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    /// Milliseconds since the Unix epoch.
    DateTimeMillis(i64),
    Str(String),
    Bytes(Vec<u8>),
    List(Arc<Vec<Value>>),
    /// Key/value pairs in wire order. Keys are not guaranteed unique by the format.
    Map(Arc<Vec<(Value, Value)>>),
    Object(Arc<Object>),
}

/// A typed record: wire type name plus fields in declaration order.
///
/// `fields` never contains the reserved [`TYPE_FIELD`]; its value lives in
/// `type_name`.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    pub type_name: String,
    pub fields: Vec<(String, Value)>,
}

impl Object {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field, keeping declaration order.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Look up a field by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }
}

impl Value {
    /// Route a native integer to `Int32` when it fits, else `Int64`.
    pub fn int(n: i64) -> Self {
        match i32::try_from(n) {
            Ok(small) => Value::Int32(small),
            Err(_) => Value::Int64(n),
        }
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Arc::new(items))
    }

    pub fn map(pairs: Vec<(Value, Value)>) -> Self {
        Value::Map(Arc::new(pairs))
    }

    pub fn object(object: Object) -> Self {
        Value::Object(Arc::new(object))
    }

    /// Date value from a wall-clock time, truncated to millisecond precision.
    pub fn date(time: SystemTime) -> Self {
        let millis = match time.duration_since(UNIX_EPOCH) {
            Ok(after) => after.as_millis() as i64,
            Err(before) => -(before.duration().as_millis() as i64),
        };
        Value::DateTimeMillis(millis)
    }

    /// Short name of the active variant, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Float64(_) => "float64",
            Value::DateTimeMillis(_) => "date",
            Value::Str(_) => "string",
            Value::Bytes(_) => "binary",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer view of either integer width.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(n) => Some(i64::from(*n)),
            Value::Int64(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float64(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Map(pairs) => Some(pairs),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Value stored under `key`, if this is a map. The last matching pair wins.
    pub fn map_get(&self, key: &Value) -> Option<&Value> {
        self.as_map()?
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Wall-clock time of a date value.
    pub fn as_system_time(&self) -> Option<SystemTime> {
        match self {
            Value::DateTimeMillis(ms) if *ms >= 0 => {
                UNIX_EPOCH.checked_add(Duration::from_millis(*ms as u64))
            }
            Value::DateTimeMillis(ms) => {
                UNIX_EPOCH.checked_sub(Duration::from_millis(ms.unsigned_abs()))
            }
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int32(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int64(n)
    }
}

/// Platform-width integers take the range-routed encoding.
impl From<isize> for Value {
    fn from(n: isize) -> Self {
        Value::int(n as i64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float64(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Bytes(b.to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::list(items)
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Value::object(object)
    }
}

impl From<SystemTime> for Value {
    fn from(time: SystemTime) -> Self {
        Value::date(time)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
