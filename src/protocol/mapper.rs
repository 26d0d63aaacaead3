//! # Object Mapper
//!
//! Bridges native record types and [`Value::Object`] without runtime reflection.
//!
//! A record type implements [`Mapped`] by listing its fields once, in
//! declaration order, each with a typed getter/setter pair. One of them must be
//! the reserved [`TYPE_FIELD`], a string whose value becomes the wire type name;
//! the others become the object's fields. Encoding writes names and values from
//! that single list, and decoding fills a `Default` instance by name.
//!
//! ```rust
//! use hessian_codec::protocol::mapper::{Accessor, Field, Mapped, to_object};
//!
//! #[derive(Default)]
//! struct Order {
//!     kind: String,
//!     id: i32,
//! }
//!
//! impl Mapped for Order {
//!     const FIELDS: &'static [Field<Self>] = &[
//!         Field::new("Type", Accessor::Str(|o| &o.kind, |o, v| o.kind = v)),
//!         Field::new("ID", Accessor::Int32(|o| o.id, |o, v| o.id = v)),
//!     ];
//! }
//!
//! let order = Order { kind: "Order".into(), id: 7 };
//! let object = to_object(&order).unwrap();
//! assert_eq!(object.type_name, "Order");
//! assert_eq!(object.fields.len(), 1);
//! ```

use crate::core::decoder::decode;
use crate::core::encoder::encode;
use crate::core::value::{Object, Value, TYPE_FIELD};
use crate::error::{DecodeError, EncodeError, HessianError, Result};

/// Kinds a record field may have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Str,
    /// Platform integer, sent as `Int32` when it fits and `Int64` otherwise.
    Int,
    Int32,
    Int64,
    Bool,
    Bytes,
    Float64,
}

impl FieldKind {
    pub fn name(self) -> &'static str {
        match self {
            FieldKind::Str => "string",
            FieldKind::Int => "int",
            FieldKind::Int32 => "int32",
            FieldKind::Int64 => "int64",
            FieldKind::Bool => "bool",
            FieldKind::Bytes => "binary",
            FieldKind::Float64 => "float64",
        }
    }
}

/// Typed getter/setter pair for one field of `T`.
pub enum Accessor<T> {
    Str(fn(&T) -> &str, fn(&mut T, String)),
    Int(fn(&T) -> i64, fn(&mut T, i64)),
    Int32(fn(&T) -> i32, fn(&mut T, i32)),
    Int64(fn(&T) -> i64, fn(&mut T, i64)),
    Bool(fn(&T) -> bool, fn(&mut T, bool)),
    Bytes(fn(&T) -> &[u8], fn(&mut T, Vec<u8>)),
    Float64(fn(&T) -> f64, fn(&mut T, f64)),
    /// A native field with no wire mapping, named by its native type.
    Unsupported(&'static str),
}

impl<T> Accessor<T> {
    /// Declared kind, or the native type name when unsupported.
    pub fn kind(&self) -> std::result::Result<FieldKind, &'static str> {
        match self {
            Accessor::Str(..) => Ok(FieldKind::Str),
            Accessor::Int(..) => Ok(FieldKind::Int),
            Accessor::Int32(..) => Ok(FieldKind::Int32),
            Accessor::Int64(..) => Ok(FieldKind::Int64),
            Accessor::Bool(..) => Ok(FieldKind::Bool),
            Accessor::Bytes(..) => Ok(FieldKind::Bytes),
            Accessor::Float64(..) => Ok(FieldKind::Float64),
            Accessor::Unsupported(native) => Err(*native),
        }
    }

    fn get(&self, record: &T) -> Option<Value> {
        let value = match self {
            Accessor::Str(get, _) => Value::from(get(record)),
            Accessor::Int(get, _) => Value::int(get(record)),
            Accessor::Int32(get, _) => Value::Int32(get(record)),
            Accessor::Int64(get, _) => Value::Int64(get(record)),
            Accessor::Bool(get, _) => Value::Bool(get(record)),
            Accessor::Bytes(get, _) => Value::from(get(record)),
            Accessor::Float64(get, _) => Value::Float64(get(record)),
            Accessor::Unsupported(_) => return None,
        };
        Some(value)
    }

    fn set(
        &self,
        record: &mut T,
        field: &str,
        value: &Value,
    ) -> std::result::Result<(), DecodeError> {
        let mismatch = |expected: &'static str| DecodeError::TypeMismatch {
            field: field.to_string(),
            expected,
            found: value.kind_name(),
        };
        match (self, value) {
            (Accessor::Str(_, set), Value::Str(s)) => set(record, s.clone()),
            (Accessor::Int(_, set) | Accessor::Int64(_, set), Value::Int32(n)) => {
                set(record, i64::from(*n))
            }
            (Accessor::Int(_, set) | Accessor::Int64(_, set), Value::Int64(n)) => set(record, *n),
            (Accessor::Int32(_, set), Value::Int32(n)) => set(record, *n),
            (Accessor::Bool(_, set), Value::Bool(b)) => set(record, *b),
            (Accessor::Bytes(_, set), Value::Bytes(b)) => set(record, b.clone()),
            (Accessor::Float64(_, set), Value::Float64(n)) => set(record, *n),
            (accessor, _) => {
                return Err(mismatch(accessor.kind().map_or("unsupported", FieldKind::name)))
            }
        }
        Ok(())
    }
}

/// One statically declared field.
pub struct Field<T> {
    pub name: &'static str,
    pub access: Accessor<T>,
}

impl<T> Field<T> {
    pub const fn new(name: &'static str, access: Accessor<T>) -> Self {
        Self { name, access }
    }
}

/// A native record with a fixed, declaration-ordered field list.
pub trait Mapped: Default + Sized + 'static {
    /// Every field, the reserved type field included, in declaration order.
    const FIELDS: &'static [Field<Self>];
}

/// Validated field layout of a record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Position of the reserved type field in the declaration.
    pub type_field: usize,
    /// Non-reserved fields in declaration order.
    pub fields: Vec<(&'static str, FieldKind)>,
}

/// Check a record type's field list and return its layout.
pub fn schema<T: Mapped>() -> std::result::Result<Schema, EncodeError> {
    let mut type_field = None;
    let mut fields = Vec::with_capacity(T::FIELDS.len().saturating_sub(1));

    for (index, field) in T::FIELDS.iter().enumerate() {
        let kind = field
            .access
            .kind()
            .map_err(|native| EncodeError::UnsupportedFieldType {
                field: field.name.to_string(),
                kind: native.to_string(),
            });

        if field.name == TYPE_FIELD {
            match kind {
                Ok(FieldKind::Str) => type_field = Some(index),
                _ => return Err(EncodeError::InvalidTypeField(TYPE_FIELD)),
            }
        } else {
            fields.push((field.name, kind?));
        }
    }

    let type_field = type_field.ok_or(EncodeError::MissingTypeField(TYPE_FIELD))?;
    Ok(Schema { type_field, fields })
}

/// Convert a record into an object value description.
pub fn to_object<T: Mapped>(record: &T) -> std::result::Result<Object, EncodeError> {
    let layout = schema::<T>()?;
    let mut object = Object::new(String::new());
    object.fields.reserve(layout.fields.len());

    for (index, field) in T::FIELDS.iter().enumerate() {
        let Some(value) = field.access.get(record) else {
            continue;
        };
        if index == layout.type_field {
            if let Value::Str(name) = value {
                object.type_name = name;
            }
        } else {
            object.fields.push((field.name.to_string(), value));
        }
    }
    Ok(object)
}

/// Convert a record into a [`Value::Object`].
pub fn to_value<T: Mapped>(record: &T) -> std::result::Result<Value, EncodeError> {
    to_object(record).map(Value::object)
}

/// Encode a record directly to bytes.
pub fn encode_record<T: Mapped>(record: &T) -> std::result::Result<Vec<u8>, EncodeError> {
    encode(&to_value(record)?)
}

/// Rebuild a record from a decoded object.
///
/// Fields are matched by name; the object may carry extra fields, but every
/// declared field must be present with a compatible kind.
pub fn from_object<T: Mapped>(object: &Object) -> Result<T> {
    let layout = schema::<T>()?;
    let mut record = T::default();

    for (index, field) in T::FIELDS.iter().enumerate() {
        if index == layout.type_field {
            if let Accessor::Str(_, set) = &field.access {
                set(&mut record, object.type_name.clone());
            }
            continue;
        }
        let value = object
            .get(field.name)
            .ok_or_else(|| DecodeError::MissingField(field.name.to_string()))?;
        field.access.set(&mut record, field.name, value)?;
    }
    Ok(record)
}

/// Rebuild a record from any value, which must be an object.
pub fn from_value<T: Mapped>(value: &Value) -> Result<T> {
    let object = value.as_object().ok_or_else(|| {
        HessianError::Decode(DecodeError::TypeMismatch {
            field: TYPE_FIELD.to_string(),
            expected: "object",
            found: value.kind_name(),
        })
    })?;
    from_object(object)
}

/// Decode bytes straight into a record.
pub fn decode_record<T: Mapped>(bytes: &[u8]) -> Result<T> {
    from_value(&decode(bytes)?)
}
