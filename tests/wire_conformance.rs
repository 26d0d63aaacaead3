#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Byte-exact wire format checks
//! Every tag byte, byte order and chunk boundary is asserted against literal bytes

use hessian_codec::core::packing::CHUNK_SIZE;
use hessian_codec::protocol::mapper::{to_value, Accessor, Field, Mapped};
use hessian_codec::{build_call_envelope, decode, encode, DecodeError, Object, Value};
use std::time::{Duration, UNIX_EPOCH};

// ============================================================================
// SCALARS
// ============================================================================

#[test]
fn test_scalar_tags() {
    assert_eq!(encode(&Value::Null).unwrap(), b"N");
    assert_eq!(encode(&Value::Bool(true)).unwrap(), b"T");
    assert_eq!(encode(&Value::Bool(false)).unwrap(), b"F");
    assert_eq!(encode(&Value::Int32(-2)).unwrap(), b"I\xff\xff\xff\xfe");
    assert_eq!(
        encode(&Value::Int64(1)).unwrap(),
        b"L\x00\x00\x00\x00\x00\x00\x00\x01"
    );
    assert_eq!(
        encode(&Value::Float64(1.5)).unwrap(),
        b"D\x3f\xf8\x00\x00\x00\x00\x00\x00"
    );
    assert_eq!(
        encode(&Value::DateTimeMillis(0x0102)).unwrap(),
        b"d\x00\x00\x00\x00\x00\x00\x01\x02"
    );
}

#[test]
fn test_integer_boundaries() {
    assert_eq!(encode(&Value::int(2147483647)).unwrap()[0], b'I');
    assert_eq!(encode(&Value::int(2147483648)).unwrap()[0], b'L');
    assert_eq!(encode(&Value::int(-2147483648)).unwrap()[0], b'I');
    assert_eq!(encode(&Value::int(-2147483649)).unwrap()[0], b'L');

    assert_eq!(
        encode(&Value::int(2147483648)).unwrap(),
        b"L\x00\x00\x00\x00\x80\x00\x00\x00"
    );
}

#[test]
fn test_date_is_millisecond_precision() {
    let t = UNIX_EPOCH + Duration::new(1, 999_999);
    let bytes = encode(&Value::from(t)).unwrap();
    assert_eq!(bytes, b"d\x00\x00\x00\x00\x00\x00\x03\xe8");
    assert_eq!(decode(&bytes).unwrap(), Value::DateTimeMillis(1000));
}

// ============================================================================
// STRINGS AND BINARIES
// ============================================================================

#[test]
fn test_string_length_counts_codepoints() {
    let bytes = encode(&Value::from("héllo")).unwrap();
    assert_eq!(&bytes[..3], b"S\x00\x05");
    assert_eq!(bytes.len(), 3 + "héllo".len());
}

#[test]
fn test_empty_string_and_binary() {
    assert_eq!(encode(&Value::from("")).unwrap(), b"S\x00\x00");
    assert_eq!(encode(&Value::Bytes(vec![])).unwrap(), b"B\x00\x00");
}

#[test]
fn test_string_exactly_one_chunk() {
    let s = "a".repeat(CHUNK_SIZE);
    let bytes = encode(&Value::from(s.as_str())).unwrap();

    assert_eq!(&bytes[..3], b"S\x80\x00");
    assert_eq!(bytes.len(), 3 + CHUNK_SIZE);
    assert!(!bytes.contains(&b's'));
    assert_eq!(decode(&bytes).unwrap(), Value::Str(s));
}

#[test]
fn test_string_one_past_chunk() {
    let s = "a".repeat(CHUNK_SIZE + 1);
    let bytes = encode(&Value::from(s.as_str())).unwrap();

    assert_eq!(&bytes[..3], b"s\x80\x00");
    let tail = &bytes[3 + CHUNK_SIZE..];
    assert_eq!(tail, b"S\x00\x01a");
    assert_eq!(decode(&bytes).unwrap(), Value::Str(s));
}

#[test]
fn test_multibyte_string_chunks_on_codepoints() {
    // Three bytes per codepoint, so chunk boundaries are not byte boundaries.
    let s = "€".repeat(CHUNK_SIZE + 2);
    let bytes = encode(&Value::from(s.as_str())).unwrap();

    assert_eq!(&bytes[..3], b"s\x80\x00");
    let final_chunk = 3 + CHUNK_SIZE * 3;
    assert_eq!(&bytes[final_chunk..final_chunk + 3], b"S\x00\x02");
    assert_eq!(decode(&bytes).unwrap(), Value::Str(s));
}

#[test]
fn test_binary_chunks_on_bytes() {
    let b = vec![0x5a; CHUNK_SIZE * 2 + 3];
    let bytes = encode(&Value::Bytes(b.clone())).unwrap();

    assert_eq!(&bytes[..3], b"b\x80\x00");
    assert_eq!(&bytes[3 + CHUNK_SIZE..6 + CHUNK_SIZE], b"b\x80\x00");
    assert_eq!(&bytes[6 + CHUNK_SIZE * 2..9 + CHUNK_SIZE * 2], b"B\x00\x03");
    assert_eq!(decode(&bytes).unwrap(), Value::Bytes(b));
}

// ============================================================================
// COMPOSITES
// ============================================================================

#[test]
fn test_empty_list() {
    let bytes = encode(&Value::list(vec![])).unwrap();
    assert_eq!(bytes, b"Vl\x00\x00\x00\x00z");
    assert_eq!(decode(&bytes).unwrap().as_list(), Some(&[][..]));
}

#[test]
fn test_list_layout() {
    let bytes = encode(&Value::list(vec![Value::Bool(true), Value::Null])).unwrap();
    assert_eq!(bytes, b"Vl\x00\x00\x00\x02TNz");
}

#[test]
fn test_single_pair_map() {
    let bytes = encode(&Value::map(vec![(Value::from("a"), Value::from(1))])).unwrap();
    assert_eq!(bytes, b"MS\x00\x01aI\x00\x00\x00\x01z");

    let decoded = decode(&bytes).unwrap();
    let pairs = decoded.as_map().unwrap();
    assert!(pairs.contains(&(Value::from("a"), Value::Int32(1))));
    assert_eq!(pairs.len(), 1);
}

#[test]
fn test_multi_pair_map_as_set() {
    let pairs = vec![
        (Value::from("x"), Value::Int32(1)),
        (Value::Int32(2), Value::from("y")),
        (Value::Null, Value::Bool(false)),
    ];
    let decoded = decode(&encode(&Value::map(pairs.clone())).unwrap()).unwrap();
    let back = decoded.as_map().unwrap();
    assert_eq!(back.len(), pairs.len());
    for pair in &pairs {
        assert!(back.contains(pair));
    }
}

#[derive(Default)]
struct Order {
    kind: String,
    id: i32,
    name: String,
}

impl Mapped for Order {
    const FIELDS: &'static [Field<Self>] = &[
        Field::new("Type", Accessor::Str(|o| &o.kind, |o, v| o.kind = v)),
        Field::new("ID", Accessor::Int32(|o| o.id, |o, v| o.id = v)),
        Field::new("Name", Accessor::Str(|o| &o.name, |o, v| o.name = v)),
    ];
}

const ORDER_BYTES: &[u8] =
    b"C\x05Order\x00\x92S\x00\x02IDS\x00\x04NameOI\x00\x00\x00\x07S\x00\x06widget";

#[test]
fn test_object_layout() {
    let order = Order {
        kind: "Order".into(),
        id: 7,
        name: "widget".into(),
    };
    let bytes = encode(&to_value(&order).unwrap()).unwrap();
    assert_eq!(bytes, ORDER_BYTES);
}

#[test]
fn test_object_decodes_in_field_order() {
    let decoded = decode(ORDER_BYTES).unwrap();
    let object = decoded.as_object().unwrap();
    assert_eq!(object.type_name, "Order");
    assert_eq!(
        object.fields,
        vec![
            ("ID".to_string(), Value::Int32(7)),
            ("Name".to_string(), Value::from("widget")),
        ]
    );
}

#[test]
fn test_object_without_fields() {
    let bytes = encode(&Value::object(Object::new("Empty"))).unwrap();
    assert_eq!(bytes, b"C\x05Empty\x00\x90O");
    let decoded = decode(&bytes).unwrap();
    assert!(decoded.as_object().unwrap().fields.is_empty());
}

// ============================================================================
// TRUNCATION
// ============================================================================

#[test]
fn test_dropping_last_byte_is_eof() {
    let samples = vec![
        Value::Null,
        Value::Int32(1),
        Value::from("héllo"),
        Value::from(""),
        Value::Bytes(vec![1, 2, 3]),
        Value::list(vec![]),
        Value::map(vec![(Value::from("k"), Value::from("v"))]),
        Value::DateTimeMillis(9),
    ];
    for value in samples {
        let bytes = encode(&value).unwrap();
        let result = decode(&bytes[..bytes.len() - 1]);
        assert!(
            matches!(result, Err(DecodeError::UnexpectedEof { .. })),
            "{value:?} truncated gave {result:?}"
        );
    }

    assert!(matches!(
        decode(&ORDER_BYTES[..ORDER_BYTES.len() - 1]),
        Err(DecodeError::UnexpectedEof { .. })
    ));
}

// ============================================================================
// CALL ENVELOPE
// ============================================================================

#[test]
fn test_call_envelope_bytes() {
    let bytes = build_call_envelope("getOrder", &[Value::Int32(7), Value::from("x")]).unwrap();
    assert_eq!(
        bytes,
        b"c\x00\x01m\x00\x08getOrderI\x00\x00\x00\x07S\x00\x01xz"
    );
}
