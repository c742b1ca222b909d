//! Compiled programs: bytecode, constant pool and source map.
//!
//! A [`Program`] is immutable once built and can be run any number of
//! times, from any number of threads. It can also be persisted with
//! [`Program::to_bytes`]; host functions are stored by name and have to be
//! relinked after loading.

use core::fmt::{self, Write as _};
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration};
use ecow::EcoString;
use hashbrown::{HashMap, HashSet};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Instruction;
use super::instruction_set::InvalidInstruction;
use crate::api::Timezone;
use crate::builtins;
use crate::diagnostics::{Location, Source, Span};
use crate::types::{FieldDescriptor, IntKind, MethodDescriptor};
use crate::values::{ConstSet, Function, Value};

/// Prefix of persisted programs.
pub const MAGIC: &[u8; 5] = b"EXPRL";

/// Version of the opcode assignment and of the constant encoding.
pub const VERSION: u8 = 1;

/// An entry of the constant pool.
#[derive(Debug, Clone)]
pub enum Constant {
    Value(Value),
    Field(FieldDescriptor),
    Method(MethodDescriptor),
    Regex(Arc<Regex>),
    Function(Function),
    /// Library builtin, by table index.
    Builtin(u16),
    /// Host function of a loaded program that was not relinked yet.
    Unlinked(EcoString),
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Value(value) => write!(f, "{}", value),
            Constant::Field(field) => write!(f, "field {} {:?}", field.name, field.path.as_slice()),
            Constant::Method(method) => write!(f, "method {} #{}", method.name, method.index),
            Constant::Regex(regex) => write!(f, "regex {:?}", regex.as_str()),
            Constant::Function(func) => write!(f, "func {}", func.name),
            Constant::Builtin(index) => match builtins::get(*index) {
                Some(builtin) => write!(f, "builtin {}", builtin.name),
                None => write!(f, "builtin #{}", index),
            },
            Constant::Unlinked(name) => write!(f, "unlinked func {}", name),
        }
    }
}

/// Failures of persisting, loading and relinking programs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistError {
    #[error("not a compiled program")]
    BadMagic,

    #[error("unsupported program version {0} (expected {VERSION})")]
    UnsupportedVersion(u8),

    #[error("corrupt program: {0}")]
    Corrupt(String),

    #[error("constant of type {0} cannot be persisted")]
    Unserializable(String),

    #[error("function {0} is not available to relink")]
    Unlinked(String),
}

impl From<InvalidInstruction> for PersistError {
    fn from(err: InvalidInstruction) -> Self {
        PersistError::Corrupt(err.to_string())
    }
}

impl From<postcard::Error> for PersistError {
    fn from(err: postcard::Error) -> Self {
        PersistError::Corrupt(err.to_string())
    }
}

/// A compiled expression.
#[derive(Debug, Clone)]
pub struct Program {
    pub(crate) source: Arc<Source>,
    pub(crate) bytecode: Vec<Instruction>,
    /// Source span of every instruction.
    pub(crate) spans: Vec<Span>,
    pub(crate) constants: Vec<Constant>,
    /// Slots needed for `let` bindings.
    pub(crate) variables: u16,
    pub(crate) timezone: Timezone,
}

impl Program {
    pub(crate) fn new(
        source: Arc<Source>,
        bytecode: Vec<Instruction>,
        spans: Vec<Span>,
        constants: Vec<Constant>,
        variables: u16,
        timezone: Timezone,
    ) -> Self {
        Self {
            source,
            bytecode,
            spans,
            constants,
            variables,
            timezone,
        }
    }

    pub fn source(&self) -> &Arc<Source> {
        &self.source
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.bytecode
    }

    pub fn constants(&self) -> &[Constant] {
        &self.constants
    }

    pub fn timezone(&self) -> Timezone {
        self.timezone
    }

    /// Span of the instruction at `pc`.
    pub fn span(&self, pc: usize) -> Span {
        self.spans.get(pc).cloned().unwrap_or_default()
    }

    /// Location of the instruction at `pc`.
    pub fn location(&self, pc: usize) -> Location {
        self.source.location(self.span(pc).start())
    }

    /// The wire form: 3 bytes per instruction.
    pub fn bytes(&self) -> Vec<u8> {
        self.bytecode.iter().flat_map(Instruction::encode).collect()
    }

    /// Names of the host functions the program calls.
    pub fn function_names(&self) -> Vec<EcoString> {
        self.constants
            .iter()
            .filter_map(|c| match c {
                Constant::Function(func) => Some(func.name.clone()),
                Constant::Unlinked(name) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    /// One instruction per line: address, jump label, instruction,
    /// decoded operand and source column.
    ///
    /// ```text
    ///    0       FetchEnv(0)     ; "Price"        1:1
    ///    1       Int(10)                          1:9
    ///    2       More                             1:1
    /// ```
    pub fn disassemble(&self) -> String {
        let mut targets: Vec<usize> = self
            .bytecode
            .iter()
            .enumerate()
            .filter_map(|(at, instr)| instr.jump_target(at))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        targets.sort_unstable();
        let labels: HashMap<usize, usize> = targets
            .into_iter()
            .enumerate()
            .map(|(label, at)| (at, label))
            .collect();

        let mut out = String::new();
        for (at, instr) in self.bytecode.iter().enumerate() {
            let label = labels
                .get(&at)
                .map(|l| format!("L{}:", l))
                .unwrap_or_default();
            let detail = if let Some(target) = instr.jump_target(at) {
                match labels.get(&target) {
                    Some(l) => format!("; to L{}", l),
                    None => format!("; to @{}", target),
                }
            } else if instr.uses_constant() {
                match self.constants.get(instr.operand() as usize) {
                    Some(constant) => format!("; {}", constant),
                    None => "; <missing constant>".to_string(),
                }
            } else {
                String::new()
            };
            let line = format!("{:4} {:>4}  {:<18}{:<24}", at, label, format!("{:?}", instr), detail);
            let _ = writeln!(out, "{} {}", line.trim_end(), self.location(at));
        }
        out
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Serializes the program behind the `MAGIC` + `VERSION` prefix.
    pub fn to_bytes(&self) -> Result<Vec<u8>, PersistError> {
        let stored = StoredProgram {
            source: self.source.content().to_string(),
            bytecode: self.bytes(),
            spans: self.spans.clone(),
            constants: self
                .constants
                .iter()
                .map(StoredConstant::from_constant)
                .collect::<Result<_, _>>()?,
            variables: self.variables,
            timezone: self.timezone.to_string(),
        };
        let mut out = MAGIC.to_vec();
        out.push(VERSION);
        out.extend(postcard::to_allocvec(&stored)?);
        Ok(out)
    }

    /// Loads a program written by [`Program::to_bytes`]. Host functions come
    /// back as [`Constant::Unlinked`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Program, PersistError> {
        let payload = bytes.strip_prefix(MAGIC.as_slice()).ok_or(PersistError::BadMagic)?;
        let (&version, payload) = payload.split_first().ok_or(PersistError::BadMagic)?;
        if version != VERSION {
            return Err(PersistError::UnsupportedVersion(version));
        }
        let stored: StoredProgram = postcard::from_bytes(payload)?;
        if stored.bytecode.len() % Instruction::SIZE != 0 {
            return Err(PersistError::Corrupt("truncated bytecode".to_string()));
        }
        let bytecode = stored
            .bytecode
            .chunks_exact(Instruction::SIZE)
            .map(|chunk| Instruction::decode([chunk[0], chunk[1], chunk[2]]))
            .collect::<Result<Vec<_>, _>>()?;
        if stored.spans.len() != bytecode.len() {
            return Err(PersistError::Corrupt("source map out of step".to_string()));
        }
        let constants = stored
            .constants
            .into_iter()
            .map(StoredConstant::into_constant)
            .collect::<Result<Vec<_>, _>>()?;
        let timezone = Timezone::parse(&stored.timezone)
            .ok_or_else(|| PersistError::Corrupt(format!("timezone {:?}", stored.timezone)))?;
        Ok(Program::new(
            Arc::new(Source::new(stored.source)),
            bytecode,
            stored.spans,
            constants,
            stored.variables,
            timezone,
        ))
    }

    /// Replaces every unlinked host function with the one `lookup` returns.
    pub fn link_functions<F>(&mut self, lookup: F) -> Result<(), PersistError>
    where
        F: Fn(&str) -> Option<Function>,
    {
        for constant in &mut self.constants {
            if let Constant::Unlinked(name) = constant {
                let func = lookup(name).ok_or_else(|| PersistError::Unlinked(name.to_string()))?;
                *constant = Constant::Function(func);
            }
        }
        Ok(())
    }
}

// ============================================================================
// Stored forms
// ============================================================================

#[derive(Serialize, Deserialize)]
struct StoredProgram {
    source: String,
    bytecode: Vec<u8>,
    spans: Vec<Span>,
    constants: Vec<StoredConstant>,
    variables: u16,
    timezone: String,
}

#[derive(Serialize, Deserialize)]
enum StoredConstant {
    Value(StoredValue),
    Field(FieldDescriptor),
    Method(MethodDescriptor),
    Regex(String),
    Function(EcoString),
    Builtin(EcoString),
}

#[derive(Serialize, Deserialize)]
enum StoredValue {
    Nil,
    Bool(bool),
    Int(i64),
    /// Sized integers keep their width; the bits are the value as `u64`.
    Sized(IntKind, u64),
    Float32(f32),
    Float64(f64),
    String(EcoString),
    Array(Vec<StoredValue>),
    Map(Vec<(EcoString, StoredValue)>),
    /// RFC 3339.
    Time(String),
    /// Nanoseconds.
    Duration(i64),
    Set(Vec<i64>, Vec<EcoString>),
}

impl StoredConstant {
    fn from_constant(constant: &Constant) -> Result<Self, PersistError> {
        Ok(match constant {
            Constant::Value(value) => StoredConstant::Value(StoredValue::from_value(value)?),
            Constant::Field(field) => StoredConstant::Field(field.clone()),
            Constant::Method(method) => StoredConstant::Method(method.clone()),
            Constant::Regex(regex) => StoredConstant::Regex(regex.as_str().to_string()),
            Constant::Function(func) => StoredConstant::Function(func.name.clone()),
            Constant::Unlinked(name) => StoredConstant::Function(name.clone()),
            Constant::Builtin(index) => {
                let builtin = builtins::get(*index)
                    .ok_or_else(|| PersistError::Corrupt(format!("builtin #{}", index)))?;
                StoredConstant::Builtin(builtin.name.into())
            }
        })
    }

    fn into_constant(self) -> Result<Constant, PersistError> {
        Ok(match self {
            StoredConstant::Value(value) => Constant::Value(value.into_value()?),
            StoredConstant::Field(field) => Constant::Field(field),
            StoredConstant::Method(method) => Constant::Method(method),
            StoredConstant::Regex(pattern) => Constant::Regex(Arc::new(
                Regex::new(&pattern).map_err(|e| PersistError::Corrupt(e.to_string()))?,
            )),
            StoredConstant::Function(name) => Constant::Unlinked(name),
            StoredConstant::Builtin(name) => {
                let (index, _) = builtins::lookup(&name)
                    .ok_or_else(|| PersistError::Corrupt(format!("unknown builtin {}", name)))?;
                Constant::Builtin(index)
            }
        })
    }
}

impl StoredValue {
    fn from_value(value: &Value) -> Result<Self, PersistError> {
        Ok(match value {
            Value::Nil => StoredValue::Nil,
            Value::Bool(b) => StoredValue::Bool(*b),
            Value::Int(v) => StoredValue::Int(*v),
            Value::Int8(v) => StoredValue::Sized(IntKind::Int8, *v as u64),
            Value::Int16(v) => StoredValue::Sized(IntKind::Int16, *v as u64),
            Value::Int32(v) => StoredValue::Sized(IntKind::Int32, *v as u64),
            Value::Int64(v) => StoredValue::Sized(IntKind::Int64, *v as u64),
            Value::Uint(v) => StoredValue::Sized(IntKind::Uint, *v),
            Value::Uint8(v) => StoredValue::Sized(IntKind::Uint8, u64::from(*v)),
            Value::Uint16(v) => StoredValue::Sized(IntKind::Uint16, u64::from(*v)),
            Value::Uint32(v) => StoredValue::Sized(IntKind::Uint32, u64::from(*v)),
            Value::Uint64(v) => StoredValue::Sized(IntKind::Uint64, *v),
            Value::Float32(v) => StoredValue::Float32(*v),
            Value::Float64(v) => StoredValue::Float64(*v),
            Value::String(s) => StoredValue::String(s.clone()),
            Value::Array(items) => StoredValue::Array(
                items
                    .iter()
                    .map(StoredValue::from_value)
                    .collect::<Result<_, _>>()?,
            ),
            Value::Map(map) => StoredValue::Map(
                map.iter()
                    .map(|(k, v)| Ok((k.clone(), StoredValue::from_value(v)?)))
                    .collect::<Result<_, PersistError>>()?,
            ),
            Value::Time(t) => StoredValue::Time(t.to_rfc3339()),
            Value::Duration(d) => StoredValue::Duration(
                d.num_nanoseconds()
                    .ok_or_else(|| PersistError::Unserializable("duration".to_string()))?,
            ),
            Value::Set(set) => {
                let mut ints: Vec<i64> = set.ints.iter().copied().collect();
                let mut strings: Vec<EcoString> = set.strings.iter().cloned().collect();
                ints.sort_unstable();
                strings.sort_unstable();
                StoredValue::Set(ints, strings)
            }
            other => return Err(PersistError::Unserializable(other.type_name().to_string())),
        })
    }

    fn into_value(self) -> Result<Value, PersistError> {
        Ok(match self {
            StoredValue::Nil => Value::Nil,
            StoredValue::Bool(b) => Value::Bool(b),
            StoredValue::Int(v) => Value::Int(v),
            StoredValue::Sized(kind, bits) => match kind {
                IntKind::Int => Value::Int(bits as i64),
                IntKind::Int8 => Value::Int8(bits as i8),
                IntKind::Int16 => Value::Int16(bits as i16),
                IntKind::Int32 => Value::Int32(bits as i32),
                IntKind::Int64 => Value::Int64(bits as i64),
                IntKind::Uint => Value::Uint(bits),
                IntKind::Uint8 => Value::Uint8(bits as u8),
                IntKind::Uint16 => Value::Uint16(bits as u16),
                IntKind::Uint32 => Value::Uint32(bits as u32),
                IntKind::Uint64 => Value::Uint64(bits),
            },
            StoredValue::Float32(v) => Value::Float32(v),
            StoredValue::Float64(v) => Value::Float64(v),
            StoredValue::String(s) => Value::String(s),
            StoredValue::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(StoredValue::into_value)
                    .collect::<Result<_, _>>()?,
            ),
            StoredValue::Map(pairs) => Value::Map(Arc::new(
                pairs
                    .into_iter()
                    .map(|(k, v)| Ok((k, v.into_value()?)))
                    .collect::<Result<BTreeMap<_, _>, PersistError>>()?,
            )),
            StoredValue::Time(text) => Value::Time(
                DateTime::parse_from_rfc3339(&text)
                    .map_err(|e| PersistError::Corrupt(e.to_string()))?,
            ),
            StoredValue::Duration(nanos) => Value::Duration(Duration::nanoseconds(nanos)),
            StoredValue::Set(ints, strings) => Value::Set(Arc::new(ConstSet {
                ints: ints.into_iter().collect(),
                strings: strings.into_iter().collect(),
            })),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn program(bytecode: Vec<Instruction>, constants: Vec<Constant>) -> Program {
        let spans = vec![Span::new(0, 1); bytecode.len()];
        Program::new(
            Arc::new(Source::new("x > 1")),
            bytecode,
            spans,
            constants,
            0,
            Timezone::Utc,
        )
    }

    #[test]
    fn test_disassemble_labels_jump_targets() {
        let p = program(
            vec![
                Instruction::True,
                Instruction::JumpIfFalse(2),
                Instruction::Pop,
                Instruction::Push(0),
                Instruction::Nil,
            ],
            vec![Constant::Value(Value::string("yes"))],
        );
        let text = p.disassemble();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[1].contains("JumpIfFalse(+2)"), "{}", text);
        assert!(lines[1].contains("; to L0"), "{}", text);
        assert!(lines[3].contains("\"yes\""), "{}", text);
        assert!(lines[4].contains("L0:"), "{}", text);
        assert!(lines[0].ends_with("1:1"), "{}", text);
    }

    #[test]
    fn test_persisted_program_loads_back() {
        let set = ConstSet {
            ints: [1, 2].into_iter().collect(),
            strings: Default::default(),
        };
        let p = program(
            vec![Instruction::Push(0), Instruction::Push(1), Instruction::In, Instruction::LoadFunc(2)],
            vec![
                Constant::Value(Value::Int32(-3)),
                Constant::Value(Value::Set(Arc::new(set))),
                Constant::Builtin(builtins::lookup("upper").unwrap().0),
                Constant::Regex(Arc::new(Regex::new("^a+$").unwrap())),
            ],
        );
        let bytes = p.to_bytes().unwrap();
        assert!(bytes.starts_with(b"EXPRL"));
        let loaded = Program::from_bytes(&bytes).unwrap();
        assert_eq!(loaded.instructions(), p.instructions());
        assert_eq!(loaded.source().content(), "x > 1");
        assert!(matches!(loaded.constants()[0], Constant::Value(Value::Int32(-3))));
        assert!(matches!(&loaded.constants()[1], Constant::Value(Value::Set(s)) if s.ints.len() == 2));
        assert!(matches!(&loaded.constants()[3], Constant::Regex(r) if r.as_str() == "^a+$"));
        assert_eq!(loaded.constants()[2].to_string(), "builtin upper");
    }

    #[test]
    fn test_rejects_foreign_bytes() {
        assert_eq!(Program::from_bytes(b"hello").unwrap_err(), PersistError::BadMagic);
        let mut bytes = MAGIC.to_vec();
        bytes.push(VERSION + 1);
        assert_eq!(
            Program::from_bytes(&bytes).unwrap_err(),
            PersistError::UnsupportedVersion(VERSION + 1)
        );
    }

    #[test]
    fn test_host_functions_need_relinking() {
        let double = Function::new("double", |args: &[Value]| {
            Ok(Value::Int(args[0].as_i64().unwrap_or(0) * 2))
        });
        let p = program(vec![Instruction::LoadFunc(0)], vec![Constant::Function(double.clone())]);
        let mut loaded = Program::from_bytes(&p.to_bytes().unwrap()).unwrap();
        assert_eq!(loaded.function_names(), vec![EcoString::from("double")]);
        assert!(matches!(&loaded.constants()[0], Constant::Unlinked(name) if name == "double"));

        assert_eq!(
            loaded.clone().link_functions(|_| None),
            Err(PersistError::Unlinked("double".to_string()))
        );
        loaded
            .link_functions(|name| (name == "double").then(|| double.clone()))
            .unwrap();
        assert!(matches!(&loaded.constants()[0], Constant::Function(f) if f.name == "double"));
    }

    #[test]
    fn test_host_values_cannot_be_persisted() {
        let p = program(
            vec![Instruction::Push(0)],
            vec![Constant::Value(Value::Func(Function::new("f", |_| Ok(Value::Nil))))],
        );
        assert_eq!(p.to_bytes().unwrap_err(), PersistError::Unserializable("func".to_string()));
    }
}
