//! Programs written with `to_bytes` and restored with `load`.

use exprel_core::api::{self, CompilationOptions, ErrorKind, MapEnv};
use exprel_core::types::{FunctionType, Type};
use exprel_core::values::{Function, Value};
use exprel_core::vm::{MAGIC, PersistError, Program, VERSION};
use pretty_assertions::assert_eq;

fn double() -> Function {
    Function::new("double", |args| Ok(Value::Int(args[0].as_i64().unwrap_or(0) * 2)))
        .with_type(FunctionType::new(vec![Type::INT], Type::INT))
}

fn roundtrip(source: &str, options: &CompilationOptions) -> Program {
    let program = api::compile(source, options).unwrap();
    let bytes = program.to_bytes().unwrap();
    api::load(&bytes, options).unwrap()
}

// ============================================================================
// Restoring
// ============================================================================

#[test]
fn test_loaded_program_runs_like_the_original() {
    let env = MapEnv::new().with("names", Value::array([Value::string("ada"), Value::string("bob")]));
    let options = CompilationOptions::default().env(env.clone());
    for source in [
        "filter(names, # startsWith 'a')",
        "let n = len(names); n * 1.5",
        "'abc' matches '^a'",
        "{a: 1, b: [true, nil]}.b[0]",
        "map(1..3, # ** 2)",
    ] {
        let original = api::compile(source, &options).unwrap();
        let loaded = roundtrip(source, &options);
        assert_eq!(loaded.instructions(), original.instructions(), "{}", source);
        assert_eq!(
            api::run(&loaded, &env).unwrap(),
            api::run(&original, &env).unwrap(),
            "{}",
            source
        );
    }
}

#[test]
fn test_source_map_survives() {
    let options = CompilationOptions::default().env(MapEnv::new().with("d", 0));
    let program = roundtrip("1 +\n  10 / d", &options);
    assert_eq!(program.source().content(), "1 +\n  10 / d");
    let err = api::run(&program, &MapEnv::new().with("d", 0)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DivideByZero);
    let location = err.location().unwrap();
    assert_eq!((location.line, location.column), (2, 5));
}

#[test]
fn test_host_functions_are_relinked_by_name() {
    let options = CompilationOptions::default().function(double());
    let program = roundtrip("double(21)", &options);
    assert_eq!(api::run(&program, &MapEnv::new()).unwrap(), Value::Int(42));
}

#[test]
fn test_missing_host_function_is_an_api_error() {
    let options = CompilationOptions::default().function(double());
    let bytes = api::compile("double(1)", &options).unwrap().to_bytes().unwrap();

    let err = api::load(&bytes, &CompilationOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Api);
    assert_eq!(err.message(), "function double is not available to relink");
}

#[test]
fn test_unlinked_program_lists_its_functions() {
    let options = CompilationOptions::default().function(double());
    let bytes = api::compile("double(1) + len('x')", &options)
        .unwrap()
        .to_bytes()
        .unwrap();
    let program = Program::from_bytes(&bytes).unwrap();
    let names: Vec<String> = program.function_names().iter().map(|n| n.to_string()).collect();
    assert_eq!(names, ["double"]);
}

// ============================================================================
// Rejected input
// ============================================================================

#[test]
fn test_bad_magic() {
    assert_eq!(Program::from_bytes(b"not a program").unwrap_err(), PersistError::BadMagic);
    assert_eq!(Program::from_bytes(b"").unwrap_err(), PersistError::BadMagic);
}

#[test]
fn test_unsupported_version() {
    let mut bytes = api::compile("1", &CompilationOptions::default())
        .unwrap()
        .to_bytes()
        .unwrap();
    bytes[MAGIC.len()] = VERSION + 1;
    assert_eq!(
        Program::from_bytes(&bytes).unwrap_err(),
        PersistError::UnsupportedVersion(VERSION + 1)
    );
}

#[test]
fn test_truncated_payload_is_corrupt() {
    let bytes = api::compile("[1, 2, 3]", &CompilationOptions::default())
        .unwrap()
        .to_bytes()
        .unwrap();
    let err = Program::from_bytes(&bytes[..bytes.len() - 3]).unwrap_err();
    assert!(matches!(err, PersistError::Corrupt(_)), "{:?}", err);
}
