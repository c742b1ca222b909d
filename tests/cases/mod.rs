//! Shared harness for the expression tables in this directory.
//!
//! `test_case!` compiles every input twice, with and without the
//! optimizer, and requires both programs to agree before comparing the
//! result with the expectation.

#![allow(dead_code)]

use exprel::{CompilationOptions, Error, ErrorKind, MapEnv, Value};

pub fn env() -> MapEnv {
    MapEnv::new()
}

/// Compiles and runs `input` with the optimizer on and off.
pub fn eval_both(input: &str, env: &MapEnv, options: CompilationOptions) -> Result<Value, Error> {
    let run = |optimize: bool| {
        let options = options.clone().env(env.clone()).optimize(optimize);
        let program = exprel::compile(input, &options)?;
        exprel::run(&program, env)
    };
    let optimized = run(true);
    let plain = run(false);
    match (&optimized, &plain) {
        (Ok(a), Ok(b)) => assert_eq!(a, b, "optimizer changed the result of {:?}", input),
        (Err(a), Err(b)) => assert_eq!(
            a.kind(),
            b.kind(),
            "optimizer changed the error of {:?}",
            input
        ),
        _ => panic!(
            "optimizer changed the outcome of {:?}: {:?} vs {:?}",
            input, optimized, plain
        ),
    }
    optimized
}

pub fn expect_value(input: &str, env: &MapEnv, options: CompilationOptions, expected: Value) {
    match eval_both(input, env, options) {
        Ok(value) => pretty_assertions::assert_eq!(value, expected, "input: {}", input),
        Err(err) => panic!("{:?} failed: {}", input, err),
    }
}

pub fn expect_error(input: &str, env: &MapEnv, options: CompilationOptions, kind: ErrorKind) {
    match eval_both(input, env, options) {
        Ok(value) => panic!("{:?} should fail with {:?}, got {:?}", input, kind, value),
        Err(err) => pretty_assertions::assert_eq!(err.kind(), kind, "input: {}: {}", input, err),
    }
}

/// Builds a `#[test]` from an expression table row.
///
/// ```ignore
/// test_case!(
///     name,
///     input: "1 + 2",
///     env: cases::env().with("x", 1),        // optional
///     options: CompilationOptions::default(), // optional
///     value: Value::Int(3),                  // or `error: ErrorKind::...`
/// );
/// ```
#[macro_export]
macro_rules! test_case {
    (
        $name:ident,
        input: $input:expr,
        $(env: $env:expr,)?
        $(options: $options:expr,)?
        value: $value:expr $(,)?
    ) => {
        #[test]
        fn $name() {
            #[allow(unused_mut, unused_assignments)]
            let mut env = $crate::cases::env();
            $(env = $env;)?
            #[allow(unused_mut, unused_assignments)]
            let mut options = ::exprel::CompilationOptions::default();
            $(options = $options;)?
            $crate::cases::expect_value($input, &env, options, $value);
        }
    };
    (
        $name:ident,
        input: $input:expr,
        $(env: $env:expr,)?
        $(options: $options:expr,)?
        error: $kind:expr $(,)?
    ) => {
        #[test]
        fn $name() {
            #[allow(unused_mut, unused_assignments)]
            let mut env = $crate::cases::env();
            $(env = $env;)?
            #[allow(unused_mut, unused_assignments)]
            let mut options = ::exprel::CompilationOptions::default();
            $(options = $options;)?
            $crate::cases::expect_error($input, &env, options, $kind);
        }
    };
}

pub fn ints(values: impl IntoIterator<Item = i64>) -> Value {
    Value::array(values.into_iter().map(Value::Int))
}

pub fn strings<'a>(values: impl IntoIterator<Item = &'a str>) -> Value {
    Value::array(values.into_iter().map(Value::string))
}
