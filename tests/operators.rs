//! Arithmetic, comparison, logic and string operators.

#[macro_use]
mod cases;

use cases::ints;
use exprel::{ErrorKind, MapEnv, Value};

// ============================================================================
// Arithmetic
// ============================================================================

test_case!(precedence, input: "1 + 2 * 3 - 4", value: Value::Int(3));
test_case!(parentheses, input: "(1 + 2) * 3", value: Value::Int(9));
test_case!(division_is_float, input: "7 / 2", value: Value::Float64(3.5));
test_case!(exact_division_is_float, input: "6 / 3", value: Value::Float64(2.0));
test_case!(modulo_keeps_sign, input: "-7 % 3", value: Value::Int(-1));
test_case!(power_is_right_associative, input: "2 ** 3 ** 2", value: Value::Float64(512.0));
test_case!(caret_is_power, input: "2 ^ 10", value: Value::Float64(1024.0));
test_case!(mixed_widens_to_float, input: "1 + 0.5", value: Value::Float64(1.5));
test_case!(unary_minus, input: "-(2 + 3)", value: Value::Int(-5));
test_case!(hex_octal_binary, input: "0x10 + 0o10 + 0b10", value: Value::Int(26));
test_case!(digit_separators, input: "1_000_000", value: Value::Int(1_000_000));
test_case!(overflow_wraps, input: "x + 1", env: MapEnv::new().with("x", i64::MAX), value: Value::Int(i64::MIN));

test_case!(
    integer_divide_by_zero_at_runtime,
    input: "10 / d",
    env: MapEnv::new().with("d", 0),
    error: ErrorKind::DivideByZero,
);
test_case!(
    float_divide_by_zero_is_infinite,
    input: "1.0 / d",
    env: MapEnv::new().with("d", 0),
    value: Value::Float64(f64::INFINITY),
);
test_case!(modulo_by_zero, input: "5 % d", env: MapEnv::new().with("d", 0), error: ErrorKind::DivideByZero);

// ============================================================================
// Comparison and logic
// ============================================================================

test_case!(less, input: "1 < 2", value: Value::Bool(true));
test_case!(mixed_number_equality, input: "1 == 1.0", value: Value::Bool(true));
test_case!(string_order, input: "'abc' < 'abd'", value: Value::Bool(true));
test_case!(word_operators, input: "not (true and false) or false", value: Value::Bool(true));
test_case!(bang_not, input: "!false", value: Value::Bool(true));
test_case!(
    short_circuit_skips_failure,
    input: "false && 1 / d > 0",
    env: MapEnv::new().with("d", 0),
    value: Value::Bool(false),
);
test_case!(
    or_short_circuit,
    input: "true || 1 / d > 0",
    env: MapEnv::new().with("d", 0),
    value: Value::Bool(true),
);
test_case!(nil_equals_nil, input: "nil == nil", value: Value::Bool(true));
test_case!(
    nil_not_equal_value,
    input: "x != nil",
    env: MapEnv::new().with("x", 1),
    value: Value::Bool(true),
);

// ============================================================================
// Strings
// ============================================================================

test_case!(concat, input: "'foo' + \"bar\"", value: Value::string("foobar"));
test_case!(concat_number, input: "'n=' + 3", value: Value::string("n=3"));
test_case!(contains, input: "'seafood' contains 'foo'", value: Value::Bool(true));
test_case!(starts_with, input: "'seafood' startsWith 'sea'", value: Value::Bool(true));
test_case!(ends_with, input: "'seafood' endsWith 'sea'", value: Value::Bool(false));
test_case!(matches_literal, input: "'abc123' matches '^[a-z]+[0-9]+$'", value: Value::Bool(true));
test_case!(
    matches_dynamic,
    input: "'abc' matches pattern",
    env: MapEnv::new().with("pattern", "^b"),
    value: Value::Bool(false),
);
test_case!(
    bad_dynamic_regex,
    input: "'abc' matches pattern",
    env: MapEnv::new().with("pattern", "("),
    error: ErrorKind::BadRegex,
);
test_case!(escapes, input: r#""tab\tnewé""#, value: Value::string("tab\tnewé"));
test_case!(raw_string, input: r"`a\nb`", value: Value::string(r"a\nb"));
test_case!(string_index, input: "'héllo'[1]", value: Value::string("é"));
test_case!(string_negative_index, input: "'hello'[-1]", value: Value::string("o"));
test_case!(string_slice, input: "'hello'[1:3]", value: Value::string("el"));

// ============================================================================
// Membership and ranges
// ============================================================================

test_case!(in_array, input: "2 in [1, 2, 3]", value: Value::Bool(true));
test_case!(not_in_array, input: "4 not in [1, 2, 3]", value: Value::Bool(true));
test_case!(in_map_keys, input: "'a' in {'a': 1}", value: Value::Bool(true));
test_case!(
    in_dynamic_array,
    input: "x in xs",
    env: MapEnv::new().with("x", 3).with("xs", ints([1, 2, 3])),
    value: Value::Bool(true),
);
test_case!(in_range, input: "5 in 1..10", value: Value::Bool(true));
test_case!(outside_range, input: "11 in 1..10", value: Value::Bool(false));
test_case!(range_literal, input: "1..4", value: ints(1..=4));
test_case!(empty_range, input: "3..1", value: ints([]));

// ============================================================================
// Comments
// ============================================================================

test_case!(line_comment, input: "1 + // one\n 2", value: Value::Int(3));
test_case!(block_comment, input: "1 /* plus */ + 2", value: Value::Int(3));
test_case!(unclosed_comment, input: "1 /* plus", error: ErrorKind::Syntax);
