//! Back-reference table for one decode call.
//!
//! Every composite is recorded when its construction completes, in completion
//! order, starting at index 0. `R` followed by a 4-byte big-endian index reuses
//! an entry. Lists, maps and objects come back as another handle to the same
//! allocation; strings and binaries are plain values and come back as copies,
//! whose length [`RefTable::copy_cost`] reports so the decoder can cap the total.
//!
//! Which kinds are eligible and where indexing starts are decided here and
//! nowhere else.

use crate::core::value::Value;
use crate::error::DecodeError;

/// Tag byte introducing a back-reference.
pub const REF_TAG: u8 = b'R';

#[derive(Debug, Default)]
pub(crate) struct RefTable {
    entries: Vec<Value>,
}

impl RefTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record a completed composite. Scalars are ignored.
    pub(crate) fn register(&mut self, value: &Value) {
        if is_referenceable(value) {
            self.entries.push(value.clone());
        }
    }

    pub(crate) fn resolve(&self, index: u32) -> Result<&Value, DecodeError> {
        self.entries
            .get(index as usize)
            .ok_or(DecodeError::InvalidReference {
                index,
                len: self.entries.len(),
            })
    }

    /// Bytes duplicated when `value` is handed out again.
    pub(crate) fn copy_cost(value: &Value) -> usize {
        match value {
            Value::Str(s) => s.len(),
            Value::Bytes(b) => b.len(),
            _ => 0,
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

fn is_referenceable(value: &Value) -> bool {
    matches!(
        value,
        Value::Str(_) | Value::Bytes(_) | Value::List(_) | Value::Map(_) | Value::Object(_)
    )
}

#[cfg(test)]
mod tests {
    #![allow(clippy::panic)]

    use super::*;
    use std::sync::Arc;

    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_register_and_resolve_shares_lists() {
        let mut refs = RefTable::new();
        let list = Value::list(vec![Value::Int32(1)]);
        refs.register(&Value::Int32(5));
        refs.register(&list);
        assert_eq!(refs.len(), 1);

        match (refs.resolve(0).unwrap(), &list) {
            (Value::List(a), Value::List(b)) => assert!(Arc::ptr_eq(a, b)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_copy_cost() {
        assert_eq!(RefTable::copy_cost(&Value::from("héllo")), 6);
        assert_eq!(RefTable::copy_cost(&Value::Bytes(vec![0; 40])), 40);
        assert_eq!(RefTable::copy_cost(&Value::list(vec![Value::from("x"); 100])), 0);
    }

    #[test]
    fn test_out_of_range() {
        let refs = RefTable::new();
        assert_eq!(
            refs.resolve(3),
            Err(DecodeError::InvalidReference { index: 3, len: 0 })
        );
    }
}
