//! Loop builtins, pointers, pipes and the library functions.

#[macro_use]
mod cases;

use cases::{ints, strings};
use exprel::{ErrorKind, MapEnv, Value};
use once_cell::sync::Lazy;

static USERS: Lazy<MapEnv> = Lazy::new(|| {
    let user = |name: &str, age: i64, admin: bool| {
        Value::map([
            ("name", Value::string(name)),
            ("age", Value::Int(age)),
            ("admin", Value::Bool(admin)),
        ])
    };
    MapEnv::new().with(
        "users",
        Value::array([
            user("ada", 36, true),
            user("bob", 17, false),
            user("cy", 52, false),
        ]),
    )
});

fn users() -> MapEnv {
    USERS.clone()
}

// ============================================================================
// Quantifiers
// ============================================================================

test_case!(all_true, input: "all([2, 4], # % 2 == 0)", value: Value::Bool(true));
test_case!(all_empty, input: "all([], # > 0)", value: Value::Bool(true));
test_case!(any_false, input: "any([1, 3], # % 2 == 0)", value: Value::Bool(false));
test_case!(none_true, input: "none([1, 3], # > 5)", value: Value::Bool(true));
test_case!(one_exactly, input: "one([1, 2, 3], # > 2)", value: Value::Bool(true));
test_case!(one_too_many, input: "one([1, 2, 3], # > 1)", value: Value::Bool(false));
test_case!(
    combined_all,
    input: "all(xs, # > 0) && all(xs, # < 10)",
    env: MapEnv::new().with("xs", ints([1, 5, 9])),
    value: Value::Bool(true),
);
test_case!(
    combined_any,
    input: "any(xs, # > 8) || any(xs, # < 0)",
    env: MapEnv::new().with("xs", ints([1, 5, 9])),
    value: Value::Bool(true),
);

// ============================================================================
// Collecting loops
// ============================================================================

test_case!(filter_members, input: "filter(users, .admin) | map(.name)", env: users(), value: strings(["ada"]));
test_case!(
    pipe_chain,
    input: "users | filter(.age >= 18) | map(.name)",
    env: users(),
    value: strings(["ada", "cy"]),
);
test_case!(map_with_index, input: "map(['a', 'b'], # + string(#index))", value: strings(["a0", "b1"]));
test_case!(filter_filter, input: "filter(filter(1..10, # > 3), # < 6)", value: ints([4, 5]));
test_case!(count_all, input: "count([true, false, true])", value: Value::Int(2));
test_case!(count_any, input: "count(1..10, # > 8) > 0", value: Value::Bool(true));
test_case!(sum_mapped, input: "sum(users, .age)", env: users(), value: Value::Int(105));
test_case!(sum_literal_array, input: "sum([1.5, 2.5])", value: Value::Float64(4.0));
test_case!(
    group_by_flag,
    input: "groupBy(users, .admin)",
    env: users(),
    value: Value::map([
        ("false", Value::array([
            Value::map([("name", Value::string("bob")), ("age", Value::Int(17)), ("admin", Value::Bool(false))]),
            Value::map([("name", Value::string("cy")), ("age", Value::Int(52)), ("admin", Value::Bool(false))]),
        ])),
        ("true", Value::array([
            Value::map([("name", Value::string("ada")), ("age", Value::Int(36)), ("admin", Value::Bool(true))]),
        ])),
    ]),
);
test_case!(
    sort_by_age_desc,
    input: "sortBy(users, .age, 'desc') | map(.name)",
    env: users(),
    value: strings(["cy", "ada", "bob"]),
);
test_case!(sort_by_bad_order, input: "sortBy([1], #, 'up')", error: ErrorKind::TypeMismatch);

// ============================================================================
// Search and reduce
// ============================================================================

test_case!(find_first, input: "find(users, .age > 30).name", env: users(), value: Value::string("ada"));
test_case!(find_last, input: "findLast(users, .age > 30).name", env: users(), value: Value::string("cy"));
test_case!(find_missing, input: "find(users, .age > 90)", env: users(), value: Value::Nil);
test_case!(find_index, input: "findIndex(users, .name == 'bob')", env: users(), value: Value::Int(1));
test_case!(find_last_index_missing, input: "findLastIndex([1, 2], # > 5)", value: Value::Int(-1));
test_case!(reduce_with_init, input: "reduce(1..4, #acc * #, 1)", value: Value::Int(24));
test_case!(reduce_strings, input: "reduce(['a', 'b', 'c'], #acc + #)", value: Value::string("abc"));
test_case!(reduce_empty, input: "reduce(xs, #acc + #)", env: MapEnv::new().with("xs", ints([])), error: ErrorKind::TypeMismatch);

// ============================================================================
// Nesting
// ============================================================================

test_case!(
    nested_pointers,
    input: "map([[1, 2], [3, 4]], sum(#) + #index)",
    value: ints([3, 8]),
);
test_case!(
    braces_around_predicate,
    input: "filter(1..6, { # % 3 == 0 })",
    value: ints([3, 6]),
);
test_case!(
    let_inside_predicate,
    input: "let limit = 2; filter(1..4, # > limit)",
    value: ints([3, 4]),
);
test_case!(iterate_non_array, input: "map(x, #)", env: MapEnv::new().with("x", Value::Nil), error: ErrorKind::TypeMismatch);

// ============================================================================
// Library
// ============================================================================

test_case!(len_string, input: "len('héllo')", value: Value::Int(5));
test_case!(upper_lower, input: "upper('a') + lower('B')", value: Value::string("Ab"));
test_case!(split_join, input: "join(split('a,b,c', ','), '-')", value: Value::string("a-b-c"));
test_case!(trims, input: "trim('  x ') + trimPrefix('ab', 'a') + trimSuffix('cd', 'd')", value: Value::string("xbc"));
test_case!(index_of, input: "indexOf('héllo', 'l')", value: Value::Int(2));
test_case!(min_max, input: "max(1, 5, 3) - min([4, 2])", value: Value::Int(3));
test_case!(mean, input: "mean([1, 2, 3, 4])", value: Value::Float64(2.5));
test_case!(abs_round, input: "abs(-2) + round(1.4)", value: Value::Float64(3.0));
test_case!(first_last, input: "first([1, 2]) + last([1, 2])", value: Value::Int(3));
test_case!(keys_sorted, input: "keys({'b': 1, 'a': 2})", value: strings(["a", "b"]));
test_case!(uniq_reverse, input: "reverse(uniq([1, 2, 1, 3]))", value: ints([3, 2, 1]));
test_case!(flatten_concat, input: "flatten(concat([[1]], [[2, 3]]))", value: ints([1, 2, 3]));
test_case!(type_names, input: "type(1) + type(1.5) + type('s') + type(nil)", value: Value::string("intfloatstringnil"));
test_case!(int_parse, input: "int('12') + 1", value: Value::Int(13));
test_case!(int_parse_fails, input: "int(s)", env: MapEnv::new().with("s", "x"), error: ErrorKind::TypeMismatch);
test_case!(duration_math, input: "duration('1h') + duration('30m') == duration('90m')", value: Value::Bool(true));
test_case!(date_parts, input: "date('2024-03-01T10:00:00Z') < date('2024-03-02')", value: Value::Bool(true));
