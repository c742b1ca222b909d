use chrono::{DateTime, Duration};
use pretty_assertions::assert_eq;

use super::*;
use crate::values::{ConstSet, Value};
use crate::vm::{Memory, RuntimeError};

fn time(s: &str) -> Value {
    Value::Time(DateTime::parse_from_rfc3339(s).unwrap())
}

// ============================================================================
// Arithmetic
// ============================================================================

#[test]
fn test_int_arithmetic_widens_and_wraps() {
    assert_eq!(add(&Value::Int8(100), &Value::Int32(100)).unwrap(), Value::Int(200));
    assert_eq!(
        add(&Value::Int(i64::MAX), &Value::Int(1)).unwrap(),
        Value::Int(i64::MIN)
    );
    assert_eq!(
        multiply(&Value::Uint16(3), &Value::Int(-2)).unwrap(),
        Value::Int(-6)
    );
}

#[test]
fn test_large_unsigned_becomes_float() {
    assert_eq!(
        add(&Value::Uint64(u64::MAX), &Value::Int(0)).unwrap(),
        Value::Float64(u64::MAX as f64)
    );
}

#[test]
fn test_mixed_int_float() {
    assert_eq!(add(&Value::Int(1), &Value::Float64(0.5)).unwrap(), Value::Float64(1.5));
    assert_eq!(
        subtract(&Value::Float32(2.0), &Value::Int(1)).unwrap(),
        Value::Float64(1.0)
    );
}

#[test]
fn test_divide_always_float() {
    assert_eq!(divide(&Value::Int(7), &Value::Int(2)).unwrap(), Value::Float64(3.5));
    assert_eq!(divide(&Value::Int(1), &Value::Int(0)), Err(RuntimeError::DivideByZero));
    assert_eq!(
        divide(&Value::Float64(1.0), &Value::Int(0)).unwrap(),
        Value::Float64(f64::INFINITY)
    );
}

#[test]
fn test_modulo() {
    assert_eq!(modulo(&Value::Int(7), &Value::Int(3)).unwrap(), Value::Int(1));
    assert_eq!(modulo(&Value::Int(7), &Value::Int(0)), Err(RuntimeError::DivideByZero));
    assert!(modulo(&Value::Float64(7.0), &Value::Int(2)).is_err());
}

#[test]
fn test_exponent_is_float() {
    assert_eq!(exponent(&Value::Int(2), &Value::Int(10)).unwrap(), Value::Float64(1024.0));
}

#[test]
fn test_string_concat() {
    assert_eq!(
        add(&Value::string("a"), &Value::string("b")).unwrap(),
        Value::string("ab")
    );
    assert_eq!(
        add(&Value::string("n="), &Value::Int(3)).unwrap(),
        Value::string("n=3")
    );
    assert_eq!(
        add(&Value::Int(3), &Value::string("x")).unwrap(),
        Value::string("3x")
    );
}

#[test]
fn test_nil_is_rejected_by_add() {
    let err = add(&Value::Nil, &Value::string("x")).unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid operation: nil + string (mismatched types nil and string)"
    );
}

#[test]
fn test_time_and_duration() {
    let t = time("2024-01-01T00:00:00Z");
    let hour = Value::Duration(Duration::hours(1));
    assert_eq!(add(&t, &hour).unwrap(), time("2024-01-01T01:00:00Z"));
    assert_eq!(add(&hour, &t).unwrap(), time("2024-01-01T01:00:00Z"));
    assert_eq!(
        subtract(&time("2024-01-01T02:00:00Z"), &t).unwrap(),
        Value::Duration(Duration::hours(2))
    );
    assert_eq!(
        multiply(&hour, &Value::Int(3)).unwrap(),
        Value::Duration(Duration::hours(3))
    );
    assert_eq!(
        divide(&Value::Duration(Duration::hours(3)), &hour).unwrap(),
        Value::Float64(3.0)
    );
    assert_eq!(
        divide(&hour, &Value::Int(2)).unwrap(),
        Value::Duration(Duration::minutes(30))
    );
}

#[test]
fn test_negate() {
    assert_eq!(negate(&Value::Int(3)).unwrap(), Value::Int(-3));
    assert_eq!(negate(&Value::Float64(1.5)).unwrap(), Value::Float64(-1.5));
    assert!(negate(&Value::string("a")).is_err());
}

#[test]
fn test_range_charges_memory() {
    let mut memory = Memory::new(10);
    let value = range(&Value::Int(1), &Value::Int(3), &mut memory).unwrap();
    assert_eq!(
        value,
        Value::array([Value::Int(1), Value::Int(2), Value::Int(3)])
    );
    assert_eq!(memory.used(), 3);

    assert_eq!(
        range(&Value::Int(1), &Value::Int(100), &mut memory),
        Err(RuntimeError::MemoryBudgetExceeded)
    );
    assert_eq!(
        range(&Value::Int(3), &Value::Int(1), &mut memory).unwrap(),
        Value::array([])
    );
}

// ============================================================================
// Comparison
// ============================================================================

#[test]
fn test_compare_mixed_numbers() {
    assert!(less(&Value::Int(1), &Value::Float64(1.5)).unwrap());
    assert!(more_or_equal(&Value::Uint8(2), &Value::Int64(2)).unwrap());
    assert!(!less(&Value::Float64(f64::NAN), &Value::Int(1)).unwrap());
}

#[test]
fn test_compare_strings_bytewise() {
    assert!(less(&Value::string("B"), &Value::string("a")).unwrap());
    assert!(less_or_equal(&Value::string("a"), &Value::string("a")).unwrap());
}

#[test]
fn test_compare_mismatch() {
    let err = less(&Value::Int(1), &Value::string("a")).unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid operation: int < string (mismatched types int and string)"
    );
}

#[test]
fn test_equal() {
    assert!(equal(&Value::Nil, &Value::Nil));
    assert!(!equal(&Value::Nil, &Value::Int(0)));
    assert!(equal(&Value::Int(1), &Value::Float64(1.0)));
    assert!(equal(&Value::Int8(1), &Value::Uint64(1)));
    assert!(!equal(&Value::Int(1), &Value::string("1")));
    assert!(equal(
        &Value::array([Value::Int(1), Value::Int32(2)]),
        &Value::array([Value::Float64(1.0), Value::Int(2)])
    ));
}

// ============================================================================
// Access
// ============================================================================

#[test]
fn test_fetch_array_negative_index() {
    let xs = Value::array([Value::Int(1), Value::Int(2), Value::Int(3)]);
    assert_eq!(fetch(&xs, &Value::Int(-1)).unwrap(), Value::Int(3));
    assert_eq!(
        fetch(&xs, &Value::Int(3)),
        Err(RuntimeError::IndexOutOfRange { index: 3, len: 3 })
    );
    assert_eq!(
        fetch(&xs, &Value::string("a")),
        Err(RuntimeError::NonIntegerIndex {
            ty: "string".to_string()
        })
    );
}

#[test]
fn test_fetch_string_by_char() {
    assert_eq!(
        fetch(&Value::string("héllo"), &Value::Int(1)).unwrap(),
        Value::string("é")
    );
}

#[test]
fn test_member_of_map_is_nil_safe() {
    let m = Value::map([("a", Value::Int(1))]);
    assert_eq!(fetch_member(&m, "a").unwrap(), Value::Int(1));
    assert_eq!(fetch_member(&m, "missing").unwrap(), Value::Nil);
    assert_eq!(
        fetch_member(&Value::Nil, "a"),
        Err(RuntimeError::UnknownDynamicField {
            name: "a".to_string(),
            ty: "nil".to_string()
        })
    );
}

#[test]
fn test_slice_clamps() {
    let xs = Value::array([Value::Int(1), Value::Int(2), Value::Int(3)]);
    assert_eq!(
        slice(&xs, Some(&Value::Int(1)), None).unwrap(),
        Value::array([Value::Int(2), Value::Int(3)])
    );
    assert_eq!(
        slice(&xs, Some(&Value::Int(-10)), Some(&Value::Int(100))).unwrap(),
        xs
    );
    assert_eq!(
        slice(&xs, Some(&Value::Int(2)), Some(&Value::Int(1))).unwrap(),
        Value::array([])
    );
    assert_eq!(
        slice(&Value::string("hello"), Some(&Value::Int(1)), Some(&Value::Int(3))).unwrap(),
        Value::string("el")
    );
}

#[test]
fn test_in() {
    let xs = Value::array([Value::Int(1), Value::string("a")]);
    assert!(is_in(&Value::Float64(1.0), &xs).unwrap());
    assert!(!is_in(&Value::Int(2), &xs).unwrap());

    let m = Value::map([("k", Value::Nil)]);
    assert!(is_in(&Value::string("k"), &m).unwrap());
    assert!(is_in(&Value::string("ell"), &Value::string("hello")).unwrap());

    let mut set = ConstSet::default();
    set.ints.insert(5);
    let set = Value::Set(std::sync::Arc::new(set));
    assert!(is_in(&Value::Int32(5), &set).unwrap());
    assert!(!is_in(&Value::string("5"), &set).unwrap());
}

#[test]
fn test_string_operators() {
    let (a, b) = (Value::string("foobar"), Value::string("foo"));
    assert!(contains(&a, &b).unwrap());
    assert!(starts_with(&a, &b).unwrap());
    assert!(!ends_with(&a, &b).unwrap());
    assert!(matches(&a, &Value::string("^f.o")).unwrap());
    assert!(matches!(
        matches(&a, &Value::string("(")),
        Err(RuntimeError::BadRegex(_))
    ));
}

// ============================================================================
// Conversion
// ============================================================================

#[test]
fn test_conversions() {
    assert_eq!(to_int(&Value::Float64(3.9)).unwrap(), Value::Int(3));
    assert_eq!(to_int(&Value::string("42")).unwrap(), Value::Int(42));
    assert!(to_int(&Value::string("x")).is_err());
    assert_eq!(to_float(&Value::string("1.5")).unwrap(), Value::Float64(1.5));
    assert_eq!(cast(&Value::Int(2), CastTarget::Float64).unwrap(), Value::Float64(2.0));
    assert_eq!(cast(&Value::Float64(2.7), CastTarget::Int64).unwrap(), Value::Int64(2));
    assert!(cast(&Value::string("a"), CastTarget::Int).is_err());
}
