//! Argument checkers of the call builtins.
//!
//! A checker sees the natures of the call's arguments and returns the
//! result nature. Unknown arguments pass every test.

use thiserror::Error;

use crate::analyzer::Nature;
use crate::types::Type;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuiltinCheckError {
    #[error("{} arguments", .too_many.then_some("too many").unwrap_or("not enough"))]
    Arity { too_many: bool },
    #[error("{0}")]
    Argument(String),
}

type Checked = Result<Nature, BuiltinCheckError>;

fn arity(args: &[Nature], min: usize, max: usize) -> Result<(), BuiltinCheckError> {
    if args.len() < min {
        return Err(BuiltinCheckError::Arity { too_many: false });
    }
    if args.len() > max {
        return Err(BuiltinCheckError::Arity { too_many: true });
    }
    Ok(())
}

fn invalid(name: &str, nature: &Nature) -> BuiltinCheckError {
    BuiltinCheckError::Argument(format!("invalid argument for {} (type {})", name, nature))
}

fn expect(name: &str, nature: &Nature, ok: fn(&Nature) -> bool) -> Result<(), BuiltinCheckError> {
    if nature.is_unknown() || ok(nature) {
        Ok(())
    } else {
        Err(invalid(name, nature))
    }
}

fn all_strings(name: &str, args: &[Nature]) -> Result<(), BuiltinCheckError> {
    args.iter()
        .try_for_each(|arg| expect(name, arg, Nature::is_string))
}

fn is_collection(n: &Nature) -> bool {
    n.is_array() || n.is_map() || n.is_string()
}

pub(super) fn any_result(_name: &str, _args: &[Nature]) -> Checked {
    Ok(Nature::unknown())
}

// ============================================================================
// General
// ============================================================================

pub(super) fn len(name: &str, args: &[Nature]) -> Checked {
    arity(args, 1, 1)?;
    expect(name, &args[0], is_collection)?;
    Ok(Nature::int())
}

pub(super) fn type_of(_name: &str, args: &[Nature]) -> Checked {
    arity(args, 1, 1)?;
    Ok(Nature::string())
}

// ============================================================================
// Numbers
// ============================================================================

/// `abs`, `ceil`, `floor`, `round`: the argument's own numeric type.
pub(super) fn number_same(name: &str, args: &[Nature]) -> Checked {
    arity(args, 1, 1)?;
    expect(name, &args[0], Nature::is_number)?;
    if args[0].is_number() {
        Ok(Nature::of(args[0].ty.clone()))
    } else {
        Ok(Nature::unknown())
    }
}

fn convertible(n: &Nature) -> bool {
    n.is_number() || n.is_string()
}

pub(super) fn to_int(name: &str, args: &[Nature]) -> Checked {
    arity(args, 1, 1)?;
    expect(name, &args[0], convertible)?;
    Ok(Nature::int())
}

pub(super) fn to_float(name: &str, args: &[Nature]) -> Checked {
    arity(args, 1, 1)?;
    expect(name, &args[0], convertible)?;
    Ok(Nature::float())
}

/// `max`, `min`: numbers or arrays of numbers.
pub(super) fn min_max(name: &str, args: &[Nature]) -> Checked {
    arity(args, 1, usize::MAX)?;
    for arg in args {
        if arg.is_unknown() {
            return Ok(Nature::unknown());
        }
        if !(arg.is_number() || arg.is_array()) {
            return Err(invalid(name, arg));
        }
    }
    match args {
        [single] if single.is_array() => {
            let elem = single.elem();
            if elem.is_number() {
                Ok(elem)
            } else {
                Ok(Nature::unknown())
            }
        }
        [first, rest @ ..] if rest.iter().all(|a| a.ty == first.ty) && first.is_number() => {
            Ok(Nature::of(first.ty.clone()))
        }
        _ => Ok(Nature::unknown()),
    }
}

pub(super) fn mean(name: &str, args: &[Nature]) -> Checked {
    arity(args, 1, usize::MAX)?;
    for arg in args {
        expect(name, arg, |n| n.is_number() || n.is_array())?;
    }
    Ok(Nature::float())
}

// ============================================================================
// Strings
// ============================================================================

pub(super) fn to_string(_name: &str, args: &[Nature]) -> Checked {
    arity(args, 1, 1)?;
    Ok(Nature::string())
}

pub(super) fn string_unary(name: &str, args: &[Nature]) -> Checked {
    arity(args, 1, 1)?;
    all_strings(name, args)?;
    Ok(Nature::string())
}

/// `trim(s)` or `trim(s, cutset)`.
pub(super) fn trim(name: &str, args: &[Nature]) -> Checked {
    arity(args, 1, 2)?;
    all_strings(name, args)?;
    Ok(Nature::string())
}

/// `trimPrefix(s[, prefix])`, `trimSuffix(s[, suffix])`.
pub(super) fn string_string(name: &str, args: &[Nature]) -> Checked {
    arity(args, 1, 2)?;
    all_strings(name, args)?;
    Ok(Nature::string())
}

pub(super) fn split(name: &str, args: &[Nature]) -> Checked {
    arity(args, 2, 3)?;
    all_strings(name, &args[..2])?;
    if let Some(n) = args.get(2) {
        expect(name, n, Nature::is_integer)?;
    }
    Ok(Nature::array_of(Type::String))
}

pub(super) fn replace(name: &str, args: &[Nature]) -> Checked {
    arity(args, 3, 4)?;
    all_strings(name, &args[..3])?;
    if let Some(n) = args.get(3) {
        expect(name, n, Nature::is_integer)?;
    }
    Ok(Nature::string())
}

pub(super) fn repeat(name: &str, args: &[Nature]) -> Checked {
    arity(args, 2, 2)?;
    expect(name, &args[0], Nature::is_string)?;
    expect(name, &args[1], Nature::is_integer)?;
    Ok(Nature::string())
}

pub(super) fn join(name: &str, args: &[Nature]) -> Checked {
    arity(args, 1, 2)?;
    expect(name, &args[0], Nature::is_array)?;
    if let Some(glue) = args.get(1) {
        expect(name, glue, Nature::is_string)?;
    }
    Ok(Nature::string())
}

pub(super) fn string_index(name: &str, args: &[Nature]) -> Checked {
    arity(args, 2, 2)?;
    all_strings(name, args)?;
    Ok(Nature::int())
}

pub(super) fn string_predicate(name: &str, args: &[Nature]) -> Checked {
    arity(args, 2, 2)?;
    all_strings(name, args)?;
    Ok(Nature::bool())
}

// ============================================================================
// Collections
// ============================================================================

/// `first`, `last`: the element type of the array.
pub(super) fn element(name: &str, args: &[Nature]) -> Checked {
    arity(args, 1, 1)?;
    expect(name, &args[0], Nature::is_array)?;
    Ok(args[0].elem())
}

pub(super) fn get(name: &str, args: &[Nature]) -> Checked {
    arity(args, 2, 2)?;
    expect(name, &args[0], |n| is_collection(n) || n.is_struct())?;
    if args[0].is_array() {
        Ok(args[0].elem())
    } else {
        Ok(Nature::unknown())
    }
}

pub(super) fn keys(name: &str, args: &[Nature]) -> Checked {
    arity(args, 1, 1)?;
    expect(name, &args[0], Nature::is_map)?;
    Ok(Nature::array_of(Type::String))
}

pub(super) fn values(name: &str, args: &[Nature]) -> Checked {
    arity(args, 1, 1)?;
    expect(name, &args[0], Nature::is_map)?;
    Ok(Nature::array_of(args[0].elem().ty))
}

/// `reverse`, `uniq`: an array of the same type.
pub(super) fn same_array(name: &str, args: &[Nature]) -> Checked {
    arity(args, 1, 1)?;
    expect(name, &args[0], Nature::is_array)?;
    if args[0].is_array() {
        Ok(Nature::of(args[0].ty.clone()))
    } else {
        Ok(Nature::array_of(Type::Any))
    }
}

pub(super) fn concat(name: &str, args: &[Nature]) -> Checked {
    arity(args, 1, usize::MAX)?;
    for arg in args {
        expect(name, arg, Nature::is_array)?;
    }
    let elem = args
        .iter()
        .map(Nature::elem)
        .reduce(|a, b| a.lub(&b))
        .map_or(Type::Any, |n| n.ty);
    Ok(Nature::array_of(elem))
}

pub(super) fn flatten(name: &str, args: &[Nature]) -> Checked {
    arity(args, 1, 1)?;
    expect(name, &args[0], Nature::is_array)?;
    Ok(Nature::array_of(Type::Any))
}

/// `sort(xs)` or `sort(xs, "asc" | "desc")`.
pub(super) fn sort(name: &str, args: &[Nature]) -> Checked {
    arity(args, 1, 2)?;
    expect(name, &args[0], Nature::is_array)?;
    if let Some(order) = args.get(1) {
        expect(name, order, Nature::is_string)?;
    }
    if args[0].is_array() {
        Ok(Nature::of(args[0].ty.clone()))
    } else {
        Ok(Nature::array_of(Type::Any))
    }
}

pub(super) fn to_pairs(name: &str, args: &[Nature]) -> Checked {
    arity(args, 1, 1)?;
    expect(name, &args[0], Nature::is_map)?;
    Ok(Nature::array_of(Type::array(Type::Any)))
}

pub(super) fn from_pairs(name: &str, args: &[Nature]) -> Checked {
    arity(args, 1, 1)?;
    expect(name, &args[0], Nature::is_array)?;
    Ok(Nature::of(Type::map(Type::Any)))
}

// ============================================================================
// Time
// ============================================================================

pub(super) fn now(_name: &str, args: &[Nature]) -> Checked {
    arity(args, 0, 0)?;
    Ok(Nature::of(Type::Time))
}

pub(super) fn duration(name: &str, args: &[Nature]) -> Checked {
    arity(args, 1, 1)?;
    all_strings(name, args)?;
    Ok(Nature::of(Type::Duration))
}

/// `date(s)`, `date(s, layout)`, `date(s, layout, zone)`.
pub(super) fn date(name: &str, args: &[Nature]) -> Checked {
    arity(args, 1, 3)?;
    all_strings(name, args)?;
    Ok(Nature::of(Type::Time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Kind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_arity() {
        assert_eq!(
            len("len", &[]),
            Err(BuiltinCheckError::Arity { too_many: false })
        );
        assert_eq!(
            len("len", &[Nature::string(), Nature::string()]),
            Err(BuiltinCheckError::Arity { too_many: true })
        );
    }

    #[test]
    fn test_invalid_argument_message() {
        let err = len("len", &[Nature::int()]).unwrap_err();
        assert_eq!(err.to_string(), "invalid argument for len (type int)");
    }

    #[test]
    fn test_unknown_passes() {
        assert_eq!(upper_like(&[Nature::unknown()]), Ok(Nature::string()));
        assert_eq!(
            number_same("abs", &[Nature::unknown()]).map(|n| n.kind()),
            Ok(Kind::Unknown)
        );
    }

    fn upper_like(args: &[Nature]) -> Checked {
        string_unary("upper", args)
    }

    #[test]
    fn test_min_max_types() {
        assert_eq!(min_max("max", &[Nature::int(), Nature::int()]), Ok(Nature::int()));
        assert!(min_max("max", &[Nature::int(), Nature::float()]).unwrap().is_unknown());
        assert_eq!(
            min_max("max", &[Nature::array_of(Type::FLOAT)]),
            Ok(Nature::float())
        );
        assert!(min_max("max", &[Nature::string()]).is_err());
    }

    #[test]
    fn test_first_is_element_type() {
        assert_eq!(
            element("first", &[Nature::array_of(Type::String)]),
            Ok(Nature::string())
        );
    }
}
