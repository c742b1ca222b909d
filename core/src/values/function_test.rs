use std::sync::Arc;

use pretty_assertions::assert_eq;

use crate::types::{FunctionType, Type};
use crate::values::{Callable, Function, FunctionError, TypedFn, Value};

fn add(args: &[Value]) -> Result<Value, FunctionError> {
    match args {
        [Value::Int(a), Value::Int(b)] => Ok(Value::Int(a + b)),
        _ => Err(FunctionError::new("add expects two ints")),
    }
}

#[test]
fn test_native_function_call() {
    let func = Function::new("add", add)
        .with_type(FunctionType::new(vec![Type::INT, Type::INT], Type::INT));
    let Callable::Native(imp) = &func.callable else {
        panic!("expected a native function");
    };
    assert_eq!(imp(&[Value::Int(2), Value::Int(3)]), Ok(Value::Int(5)));
    assert_eq!(
        imp(&[Value::Nil]),
        Err(FunctionError::new("add expects two ints"))
    );
    assert_eq!(func.types.len(), 1);
}

#[test]
fn test_typed_function_declares_signature() {
    let func = Function::typed("answer", TypedFn::Int(Arc::new(|| 42)));
    assert_eq!(func.types[0].ret, Type::INT);
    assert_eq!(func.typed.as_ref().map(TypedFn::signature), Some(1));
    assert_eq!(func.typed.as_ref().map(TypedFn::invoke), Some(Value::Int(42)));
}

#[test]
fn test_variadic_any_detection() {
    let any = Function::new("f", |_: &[Value]| Ok(Value::Nil))
        .with_type(FunctionType::variadic(vec![Type::Any], Type::Any));
    assert!(any.is_variadic_any());
    let fixed = Function::new("g", |_: &[Value]| Ok(Value::Nil))
        .with_type(FunctionType::new(vec![Type::Any], Type::Any));
    assert!(!fixed.is_variadic_any());
}
