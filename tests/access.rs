//! Member access, indexing, optional chaining and conditionals.

#[macro_use]
mod cases;

use cases::ints;
use exprel::{CompilationOptions, ErrorKind, MapEnv, Value};

fn order() -> MapEnv {
    MapEnv::new()
        .with(
            "order",
            Value::map([
                ("id", Value::Int(7)),
                (
                    "customer",
                    Value::map([("name", Value::string("ada")), ("email", Value::Nil)]),
                ),
                ("items", ints([10, 20, 30])),
            ]),
        )
        .with("missing", Value::Nil)
}

// ============================================================================
// Members and indexes
// ============================================================================

test_case!(dotted, input: "order.customer.name", env: order(), value: Value::string("ada"));
test_case!(bracket_key, input: "order['customer']['name']", env: order(), value: Value::string("ada"));
test_case!(array_index, input: "order.items[1]", env: order(), value: Value::Int(20));
test_case!(negative_index, input: "order.items[-1]", env: order(), value: Value::Int(30));
test_case!(index_out_of_range, input: "order.items[3]", env: order(), error: ErrorKind::IndexOutOfRange);
test_case!(float_index, input: "order.items[i]", env: order().with("i", 1.5), error: ErrorKind::NonIntegerIndex);
test_case!(slice_both, input: "order.items[0:2]", env: order(), value: ints([10, 20]));
test_case!(slice_open_end, input: "order.items[1:]", env: order(), value: ints([20, 30]));
test_case!(slice_open_start, input: "order.items[:1]", env: order(), value: ints([10]));
test_case!(literal_map_member, input: "{'a': {'b': 2}}.a.b", value: Value::Int(2));

// ============================================================================
// Optional chaining and nil handling
// ============================================================================

test_case!(optional_on_value, input: "order?.customer?.name", env: order(), value: Value::string("ada"));
test_case!(optional_on_nil, input: "missing?.customer.name", env: order(), value: Value::Nil);
test_case!(optional_index, input: "missing?.[0]", env: order(), value: Value::Nil);
test_case!(
    chain_stops_at_parenthesis,
    input: "(missing?.a) ?? 'none'",
    env: order(),
    value: Value::string("none"),
);
test_case!(coalesce_value, input: "order.customer.email ?? 'n/a'", env: order(), value: Value::string("n/a"));
test_case!(coalesce_keeps_false, input: "false ?? true", value: Value::Bool(false));
test_case!(
    coalesce_is_lazy,
    input: "1 ?? 1 / d",
    env: MapEnv::new().with("d", 0),
    value: Value::Int(1),
);
test_case!(
    undefined_is_nil_when_allowed,
    input: "nobody?.name ?? 'anon'",
    options: CompilationOptions::default().allow_undefined_variables(),
    value: Value::string("anon"),
);
test_case!(undefined_rejected, input: "nobody", error: ErrorKind::UnknownName);

// ============================================================================
// Conditionals and let
// ============================================================================

test_case!(ternary, input: "order.id > 5 ? 'big' : 'small'", env: order(), value: Value::string("big"));
test_case!(nested_ternary, input: "false ? 1 : true ? 2 : 3", value: Value::Int(2));
test_case!(
    elvis_keeps_true,
    input: "a ?: b",
    env: MapEnv::new().with("a", true).with("b", false),
    value: Value::Bool(true),
);
test_case!(
    elvis_falls_through,
    input: "a ?: b",
    env: MapEnv::new().with("a", false).with("b", true),
    value: Value::Bool(true),
);
test_case!(elvis_needs_bool, input: "order.customer.name ?: 'x'", env: order(), error: ErrorKind::TypeMismatch);
test_case!(let_chain, input: "let a = 2; let b = a * a; b + a", value: Value::Int(6));
test_case!(let_shadows_env, input: "let order = 1; order + 1", env: order(), value: Value::Int(2));
test_case!(
    ternary_condition_must_be_bool,
    input: "x ? 1 : 2",
    env: MapEnv::new().with("x", 1),
    error: ErrorKind::TypeMismatch,
);
