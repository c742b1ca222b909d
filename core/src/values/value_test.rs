use std::sync::Arc;

use chrono::Duration;
use pretty_assertions::assert_eq;

use crate::types::{StructType, Type};
use crate::values::{StructValue, Value, format_duration};

// ============================================================================
// Display
// ============================================================================

#[test]
fn test_display_primitives() {
    assert_eq!(Value::Nil.to_string(), "nil");
    assert_eq!(Value::Int(-3).to_string(), "-3");
    assert_eq!(Value::Float64(2.0).to_string(), "2.0");
    assert_eq!(Value::Float64(0.25).to_string(), "0.25");
    assert_eq!(Value::string("a\"b\n").to_string(), r#""a\"b\n""#);
}

#[test]
fn test_display_containers() {
    let value = Value::array([Value::Int(1), Value::string("x"), Value::Nil]);
    assert_eq!(value.to_string(), r#"[1, "x", nil]"#);

    let map = Value::map([("b", Value::Int(2)), ("a", Value::Bool(true))]);
    assert_eq!(map.to_string(), r#"{"a": true, "b": 2}"#);
}

#[test]
fn test_plain_string() {
    assert_eq!(Value::string("hi").to_plain_string(), "hi");
    assert_eq!(Value::Int(7).to_plain_string(), "7");
}

#[test]
fn test_format_duration() {
    assert_eq!(format_duration(&Duration::zero()), "0s");
    assert_eq!(format_duration(&Duration::milliseconds(1500)), "1.5s");
    assert_eq!(format_duration(&Duration::milliseconds(250)), "250ms");
    assert_eq!(format_duration(&Duration::seconds(3723)), "1h2m3s");
    assert_eq!(format_duration(&Duration::minutes(-90)), "-1h30m0s");
    assert_eq!(format_duration(&Duration::nanoseconds(1200)), "1.2µs");
}

// ============================================================================
// Accessors
// ============================================================================

#[test]
fn test_integer_widths() {
    assert_eq!(Value::Uint8(200).as_i64(), Some(200));
    assert_eq!(Value::Int16(-5).as_f64(), Some(-5.0));
    assert_eq!(Value::Uint64(u64::MAX).as_i64(), None);
    assert_eq!(Value::Uint64(u64::MAX).as_f64(), Some(u64::MAX as f64));
    assert!(Value::Int32(1).is_integer());
    assert!(!Value::Float32(1.0).is_integer());
}

#[test]
fn test_len_counts_characters() {
    assert_eq!(Value::string("héllo").len(), Some(5));
    assert_eq!(Value::array([Value::Nil]).len(), Some(1));
    assert_eq!(Value::Int(1).len(), None);
}

#[test]
fn test_struct_field_through_embedding() {
    let base = Arc::new(StructType::new("Base").field("ID", Type::INT));
    let ty = Arc::new(
        StructType::new("User")
            .field("Name", Type::String)
            .embed(base.clone()),
    );
    let user = StructValue::new(
        ty,
        vec![
            Value::string("ann"),
            StructValue::new(base, vec![Value::Int(9)]).into(),
        ],
    );
    assert_eq!(user.field("ID"), Some(&Value::Int(9)));
    assert_eq!(user.field("Name"), Some(&Value::string("ann")));
    assert_eq!(user.field("Missing"), None);
}

#[test]
fn test_equality_is_structural() {
    assert_eq!(
        Value::array([Value::Int(1), Value::Int(2)]),
        Value::array([Value::Int(1), Value::Int(2)])
    );
    assert!(Value::Int(1) != Value::Int64(1));
    assert_eq!(Value::from(None::<i64>), Value::Nil);
}
