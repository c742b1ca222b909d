use pretty_assertions::assert_eq;

use super::*;
use crate::types::Type;

fn call_with(memory: &mut Memory, name: &str, args: &[Value]) -> Result<Value, RuntimeError> {
    let (_, builtin) = lookup(name).unwrap();
    let func = builtin.func().unwrap();
    let timezone = Timezone::Utc;
    let mut ctx = CallContext {
        memory,
        timezone: &timezone,
    };
    func(&mut ctx, args)
}

fn call(name: &str, args: &[Value]) -> Result<Value, RuntimeError> {
    call_with(&mut Memory::default(), name, args)
}

fn strings(items: &[&str]) -> Value {
    Value::array(items.iter().map(|s| Value::string(*s)))
}

fn ints(items: &[i64]) -> Value {
    Value::array(items.iter().map(|v| Value::Int(*v)))
}

// ============================================================================
// Registry
// ============================================================================

#[test]
fn test_names_are_unique() {
    let mut names: Vec<&str> = BUILTINS.iter().map(|b| b.name).collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), BUILTINS.len());
}

#[test]
fn test_predicate_builtins_are_loops() {
    for name in crate::parser::PREDICATE_BUILTINS {
        assert!(is_loop(name), "{} should be a loop builtin", name);
    }
    assert!(!is_loop("upper"));
    assert!(lookup("toJSON").is_none());
}

#[test]
fn test_lookup_matches_get() {
    let (index, builtin) = lookup("upper").unwrap();
    assert_eq!(get(index).unwrap().name, builtin.name);
}

#[test]
fn test_checker_result() {
    let (_, split) = lookup("split").unwrap();
    let nature = (split.check)("split", &[Nature::string(), Nature::string()]).unwrap();
    assert_eq!(nature.ty, Type::array(Type::String));
}

// ============================================================================
// Strings
// ============================================================================

#[test]
fn test_trim_family() {
    assert_eq!(call("trim", &[Value::string("  a ")]).unwrap(), Value::string("a"));
    assert_eq!(
        call("trim", &[Value::string("__a_"), Value::string("_")]).unwrap(),
        Value::string("a")
    );
    assert_eq!(
        call("trimPrefix", &[Value::string("foobar"), Value::string("foo")]).unwrap(),
        Value::string("bar")
    );
    assert_eq!(
        call("trimSuffix", &[Value::string("foobar"), Value::string("bar")]).unwrap(),
        Value::string("foo")
    );
}

#[test]
fn test_split() {
    assert_eq!(
        call("split", &[Value::string("a,b,c"), Value::string(",")]).unwrap(),
        strings(&["a", "b", "c"])
    );
    assert_eq!(
        call(
            "split",
            &[Value::string("a,b,c"), Value::string(","), Value::Int(2)]
        )
        .unwrap(),
        strings(&["a", "b,c"])
    );
    assert_eq!(
        call("split", &[Value::string("héj"), Value::string("")]).unwrap(),
        strings(&["h", "é", "j"])
    );
}

#[test]
fn test_join_requires_strings() {
    assert_eq!(
        call("join", &[strings(&["a", "b"]), Value::string("-")]).unwrap(),
        Value::string("a-b")
    );
    let err = call("join", &[ints(&[1])]).unwrap_err();
    assert_eq!(err.to_string(), "invalid argument for join (type int)");
}

#[test]
fn test_replace() {
    let args = [Value::string("aaa"), Value::string("a"), Value::string("b")];
    assert_eq!(call("replace", &args).unwrap(), Value::string("bbb"));
    let limited = [args[0].clone(), args[1].clone(), args[2].clone(), Value::Int(1)];
    assert_eq!(call("replace", &limited).unwrap(), Value::string("baa"));
}

#[test]
fn test_repeat_is_charged() {
    let mut memory = Memory::new(5);
    assert_eq!(
        call_with(&mut memory, "repeat", &[Value::string("ab"), Value::Int(3)]).unwrap(),
        Value::string("ababab")
    );
    assert_eq!(
        call_with(&mut memory, "repeat", &[Value::string("ab"), Value::Int(3)]),
        Err(RuntimeError::MemoryBudgetExceeded)
    );
}

#[test]
fn test_index_of_counts_chars() {
    let args = [Value::string("héllo"), Value::string("l")];
    assert_eq!(call("indexOf", &args).unwrap(), Value::Int(2));
    assert_eq!(call("lastIndexOf", &args).unwrap(), Value::Int(3));
    assert_eq!(
        call("indexOf", &[Value::string("abc"), Value::string("z")]).unwrap(),
        Value::Int(-1)
    );
}

#[test]
fn test_string_conversion() {
    assert_eq!(call("string", &[Value::Int(42)]).unwrap(), Value::string("42"));
    assert_eq!(call("string", &[Value::string("x")]).unwrap(), Value::string("x"));
    assert_eq!(call("upper", &[Value::string("abc")]).unwrap(), Value::string("ABC"));
}

// ============================================================================
// Numbers
// ============================================================================

#[test]
fn test_abs_keeps_width() {
    assert_eq!(call("abs", &[Value::Int32(-3)]).unwrap(), Value::Int32(3));
    assert_eq!(call("abs", &[Value::Float64(-1.5)]).unwrap(), Value::Float64(1.5));
    assert!(call("abs", &[Value::string("x")]).is_err());
}

#[test]
fn test_rounding() {
    assert_eq!(call("ceil", &[Value::Float64(1.2)]).unwrap(), Value::Float64(2.0));
    assert_eq!(call("floor", &[Value::Float64(-1.2)]).unwrap(), Value::Float64(-2.0));
    assert_eq!(call("round", &[Value::Float64(2.5)]).unwrap(), Value::Float64(3.0));
    assert_eq!(call("round", &[Value::Int(7)]).unwrap(), Value::Int(7));
}

#[test]
fn test_max_min_spread_arrays() {
    assert_eq!(
        call("max", &[Value::Int(1), Value::Float64(2.5), Value::Int(2)]).unwrap(),
        Value::Float64(2.5)
    );
    assert_eq!(call("min", &[ints(&[4, 2, 9])]).unwrap(), Value::Int(2));
    assert_eq!(call("max", &[ints(&[])]).unwrap(), Value::Nil);
    assert!(call("max", &[Value::string("a")]).is_err());
}

#[test]
fn test_mean() {
    assert_eq!(call("mean", &[ints(&[1, 2, 3, 4])]).unwrap(), Value::Float64(2.5));
    assert!(call("mean", &[ints(&[])]).is_err());
}

#[test]
fn test_int_float() {
    assert_eq!(call("int", &[Value::string("12")]).unwrap(), Value::Int(12));
    assert_eq!(call("float", &[Value::Int(3)]).unwrap(), Value::Float64(3.0));
}

// ============================================================================
// Collections
// ============================================================================

#[test]
fn test_len_and_type() {
    assert_eq!(call("len", &[Value::string("héllo")]).unwrap(), Value::Int(5));
    assert_eq!(call("len", &[ints(&[1, 2])]).unwrap(), Value::Int(2));
    assert!(call("len", &[Value::Int(1)]).is_err());
    assert_eq!(call("type", &[Value::Uint8(1)]).unwrap(), Value::string("uint"));
    assert_eq!(call("type", &[Value::Float32(1.0)]).unwrap(), Value::string("float"));
    assert_eq!(call("type", &[Value::Nil]).unwrap(), Value::string("nil"));
}

#[test]
fn test_first_last_get_are_nil_safe() {
    assert_eq!(call("first", &[ints(&[])]).unwrap(), Value::Nil);
    assert_eq!(call("last", &[ints(&[1, 2])]).unwrap(), Value::Int(2));
    assert_eq!(call("get", &[ints(&[1]), Value::Int(5)]).unwrap(), Value::Nil);
    assert_eq!(call("get", &[ints(&[1, 2]), Value::Int(-1)]).unwrap(), Value::Int(2));
}

#[test]
fn test_map_views() {
    let m = Value::map([("b", Value::Int(2)), ("a", Value::Int(1))]);
    assert_eq!(call("keys", &[m.clone()]).unwrap(), strings(&["a", "b"]));
    assert_eq!(call("values", &[m.clone()]).unwrap(), ints(&[1, 2]));
    let pairs = call("toPairs", &[m.clone()]).unwrap();
    assert_eq!(
        pairs,
        Value::array([
            Value::array([Value::string("a"), Value::Int(1)]),
            Value::array([Value::string("b"), Value::Int(2)]),
        ])
    );
    assert_eq!(call("fromPairs", &[pairs]).unwrap(), m);
}

#[test]
fn test_array_transforms() {
    assert_eq!(call("reverse", &[ints(&[1, 2, 3])]).unwrap(), ints(&[3, 2, 1]));
    assert_eq!(call("uniq", &[ints(&[1, 2, 1, 3, 2])]).unwrap(), ints(&[1, 2, 3]));
    assert_eq!(
        call("concat", &[ints(&[1]), ints(&[2, 3])]).unwrap(),
        ints(&[1, 2, 3])
    );
    let nested = Value::array([Value::Int(1), Value::array([Value::Int(2), ints(&[3])])]);
    assert_eq!(call("flatten", &[nested]).unwrap(), ints(&[1, 2, 3]));
}

#[test]
fn test_sort() {
    assert_eq!(call("sort", &[ints(&[3, 1, 2])]).unwrap(), ints(&[1, 2, 3]));
    assert_eq!(
        call("sort", &[ints(&[3, 1, 2]), Value::string("desc")]).unwrap(),
        ints(&[3, 2, 1])
    );
    assert!(call("sort", &[Value::array([Value::Int(1), Value::string("a")])]).is_err());
    assert!(call("sort", &[ints(&[1]), Value::string("up")]).is_err());
}

// ============================================================================
// Time
// ============================================================================

#[test]
fn test_duration_and_date() {
    assert_eq!(
        call("duration", &[Value::string("90m")]).unwrap(),
        Value::Duration(chrono::Duration::minutes(90))
    );
    let err = call("duration", &[Value::string("abc")]).unwrap_err();
    assert!(matches!(err, RuntimeError::TypeMismatch(_)));

    let t = call("date", &[Value::string("2023-01-02")]).unwrap();
    assert_eq!(t.to_string(), "2023-01-02T00:00:00+00:00");
    let zoned = call(
        "date",
        &[
            Value::string("2023-01-02 03:04"),
            Value::string("%Y-%m-%d %H:%M"),
            Value::string("+01:00"),
        ],
    )
    .unwrap();
    assert_eq!(zoned.to_string(), "2023-01-02T03:04:00+01:00");
}

#[test]
fn test_now_is_time() {
    assert!(matches!(call("now", &[]).unwrap(), Value::Time(_)));
}
