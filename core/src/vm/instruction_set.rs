//! exprel VM Instructions
//!
//! This module defines the instruction set of the stack machine that runs
//! compiled expressions.
//!
//! # Instruction Format
//!
//! On the wire every instruction is exactly 3 bytes:
//! ```text
//! ┌────────────┬─────────────────────────┐
//! │   Opcode   │   Operand (u16, LE)     │
//! │  (8 bits)  │       (16 bits)         │
//! └────────────┴─────────────────────────┘
//! ```
//!
//! Instructions without an operand encode it as 0. In memory the enum uses
//! `#[repr(C, u8)]`: one tag byte, one byte of padding and the operand,
//! 4 bytes in total.
//!
//! # Operands
//!
//! Depending on the instruction the operand is an index into the constant
//! pool, a small integer, an argument count, a jump distance counted in
//! instructions, or a scope slot. Forward jumps land `offset` instructions
//! after the jump; `JumpBackward` lands `offset` instructions before the
//! instruction following it.
//!
//! # Stack Discipline
//!
//! Stack effect notation: `[..., operand1, operand2] -> [..., result]`

use core::fmt;

/// A single VM instruction.
#[repr(C, u8)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    // ========================================================================
    // Stack & Constants (0x01 - 0x0F)
    // ========================================================================
    /// Push constant from pool
    /// Operand: constant index | Stack: [...] -> [..., value]
    Push(u16) = 0x01,

    /// Push a small non-negative integer without touching the pool
    /// Operand: value | Stack: [...] -> [..., int]
    Int(u16) = 0x02,

    /// Stack: [..., a] -> [...]
    Pop = 0x03,

    /// Stack: [...] -> [..., true]
    True = 0x04,

    /// Stack: [...] -> [..., false]
    False = 0x05,

    /// Stack: [...] -> [..., nil]
    Nil = 0x06,

    // ========================================================================
    // Environment (0x10 - 0x1F)
    // ========================================================================
    /// Look a name up in the environment; missing names are nil
    /// Operand: constant index (name) | Stack: [...] -> [..., value]
    FetchEnv(u16) = 0x10,

    /// Load a struct environment field by position
    /// Operand: constant index (field descriptor) | Stack: [...] -> [..., value]
    LoadField(u16) = 0x11,

    /// Load a struct environment method as a callable
    /// Operand: constant index (method descriptor) | Stack: [...] -> [..., func]
    LoadMethod(u16) = 0x12,

    /// Load a host function or a library builtin
    /// Operand: constant index (function) | Stack: [...] -> [..., func]
    LoadFunc(u16) = 0x13,

    /// Dynamic member or index access
    /// Stack: [..., object, key] -> [..., object[key]]
    Fetch = 0x14,

    /// Struct field access by position
    /// Operand: constant index (field descriptor) | Stack: [..., object] -> [..., field]
    FetchField(u16) = 0x15,

    /// Bind a struct method to its receiver
    /// Operand: constant index (method descriptor) | Stack: [..., object] -> [..., func]
    BindMethod(u16) = 0x16,

    /// Stack: [..., pointer] -> [..., value]
    Deref = 0x17,

    /// Push a `let` variable
    /// Operand: variable slot | Stack: [...] -> [..., value]
    LoadVar(u16) = 0x18,

    /// Bind a `let` variable
    /// Operand: variable slot | Stack: [..., value] -> [...]
    StoreVar(u16) = 0x19,

    // ========================================================================
    // Arithmetic (0x20 - 0x2F)
    // ========================================================================
    /// Stack: [..., a, b] -> [..., a + b]
    Add = 0x20,
    Subtract = 0x21,
    Multiply = 0x22,
    /// Always yields a float; integer division by zero fails
    Divide = 0x23,
    Modulo = 0x24,
    Exponent = 0x25,
    /// Stack: [..., a] -> [..., -a]
    Negate = 0x26,
    /// Inclusive integer range, charged to the memory budget
    /// Stack: [..., from, to] -> [..., array]
    Range = 0x27,

    // ========================================================================
    // Comparison & Logic (0x30 - 0x3F)
    // ========================================================================
    /// Stack: [..., a, b] -> [..., a == b]
    Equal = 0x30,
    /// `Equal` for operands the checker proved to be integers
    EqualInt = 0x31,
    /// `Equal` for operands the checker proved to be strings
    EqualString = 0x32,
    NotEqual = 0x33,
    Less = 0x34,
    More = 0x35,
    LessOrEqual = 0x36,
    MoreOrEqual = 0x37,
    /// Stack: [..., bool] -> [..., !bool]
    Not = 0x38,

    // ========================================================================
    // Strings & Membership (0x40 - 0x4F)
    // ========================================================================
    /// Stack: [..., a, b] -> [..., bool]
    Contains = 0x40,
    StartsWith = 0x41,
    EndsWith = 0x42,
    /// Pattern compiled at run time
    /// Stack: [..., text, pattern] -> [..., bool]
    Matches = 0x43,
    /// Operand: constant index (regex) | Stack: [..., text] -> [..., bool]
    MatchesConst(u16) = 0x44,
    /// Stack: [..., needle, haystack] -> [..., bool]
    In = 0x45,
    /// Coerce the result to an expected number kind
    /// Operand: cast target | Stack: [..., number] -> [..., number]
    Cast(u16) = 0x46,

    // ========================================================================
    // Control Flow (0x50 - 0x5F)
    // ========================================================================
    /// Unconditional forward jump
    /// Operand: distance | Stack: unchanged
    Jump(u16) = 0x50,

    /// Jump if the top is true; the condition stays on the stack
    /// Operand: distance | Stack: [..., bool] -> [..., bool]
    JumpIfTrue(u16) = 0x51,

    /// Jump if the top is false; the condition stays on the stack
    JumpIfFalse(u16) = 0x52,

    /// Jump if the top is nil; the value stays on the stack
    JumpIfNil(u16) = 0x53,

    /// Jump unless the top is nil; the value stays on the stack
    JumpIfNotNil(u16) = 0x54,

    /// Jump back to a loop header
    /// Operand: distance | Stack: unchanged
    JumpBackward(u16) = 0x55,

    /// Jump once the innermost loop has visited every element
    /// Operand: distance | Stack: unchanged
    JumpIfEnd(u16) = 0x56,

    // ========================================================================
    // Iteration (0x60 - 0x6F)
    // ========================================================================
    /// Open a loop scope over an array
    /// Stack: [..., array] -> [...]
    Begin = 0x60,

    /// Open a loop scope visiting the array from its last element
    /// Stack: [..., array] -> [...]
    BeginReverse = 0x61,

    /// Close the innermost loop scope
    /// Stack: unchanged
    End = 0x62,

    IncrementIndex = 0x63,
    IncrementCount = 0x64,

    /// Push the current element
    /// Stack: [...] -> [..., element]
    Pointer = 0x65,

    /// Push a value of the innermost scope
    /// Operand: scope slot | Stack: [...] -> [..., value]
    LoadScope(u16) = 0x66,

    /// Stack: [..., value] -> [...], stored as the accumulator
    SetAcc = 0x67,

    /// Seed the accumulator with the first element and skip it; fails on
    /// an empty array
    InitAcc = 0x68,

    /// File the current element under a key
    /// Stack: [..., key] -> [...]
    GroupBy = 0x69,

    /// Record the sort key of the current element
    /// Stack: [..., key] -> [...]
    SortBy = 0x6A,

    /// Sort the scope's array by the recorded keys
    /// Stack: [..., order] -> [..., array]
    Sort = 0x6B,

    // ========================================================================
    // Containers (0x70 - 0x7F)
    // ========================================================================
    /// Stack: [..., a1, ..., aN, N] -> [..., array]
    Array = 0x70,

    /// Stack: [..., k1, v1, ..., kN, vN, N] -> [..., map]
    Map = 0x71,

    /// Stack: [..., array, from, to] -> [..., slice]
    Slice = 0x72,

    /// Stack: [..., collection] -> [..., int]
    Len = 0x73,

    // ========================================================================
    // Calls (0x80 - 0x8F)
    // ========================================================================
    /// Operand: argument count | Stack: [..., a1, ..., aN, func] -> [..., result]
    Call(u16) = 0x80,

    /// `Call` for `func(...any) any` callees: no signature checks
    CallFast(u16) = 0x81,

    /// Argument-less call through a typed fast path
    /// Operand: signature index | Stack: [..., func] -> [..., result]
    CallTyped(u16) = 0x82,
}
static_assertions::assert_eq_size!(Instruction, [u8; 4]);

/// Slots readable with `LoadScope`.
pub mod slot {
    pub const INDEX: u16 = 0;
    pub const COUNT: u16 = 1;
    pub const ACC: u16 = 2;
    pub const LEN: u16 = 3;
    pub const GROUPS: u16 = 4;
}

impl Instruction {
    /// Size of an encoded instruction in bytes
    pub const SIZE: usize = 3;

    pub const fn opcode(&self) -> u8 {
        match self {
            Self::Push(_) => 0x01,
            Self::Int(_) => 0x02,
            Self::Pop => 0x03,
            Self::True => 0x04,
            Self::False => 0x05,
            Self::Nil => 0x06,
            Self::FetchEnv(_) => 0x10,
            Self::LoadField(_) => 0x11,
            Self::LoadMethod(_) => 0x12,
            Self::LoadFunc(_) => 0x13,
            Self::Fetch => 0x14,
            Self::FetchField(_) => 0x15,
            Self::BindMethod(_) => 0x16,
            Self::Deref => 0x17,
            Self::LoadVar(_) => 0x18,
            Self::StoreVar(_) => 0x19,
            Self::Add => 0x20,
            Self::Subtract => 0x21,
            Self::Multiply => 0x22,
            Self::Divide => 0x23,
            Self::Modulo => 0x24,
            Self::Exponent => 0x25,
            Self::Negate => 0x26,
            Self::Range => 0x27,
            Self::Equal => 0x30,
            Self::EqualInt => 0x31,
            Self::EqualString => 0x32,
            Self::NotEqual => 0x33,
            Self::Less => 0x34,
            Self::More => 0x35,
            Self::LessOrEqual => 0x36,
            Self::MoreOrEqual => 0x37,
            Self::Not => 0x38,
            Self::Contains => 0x40,
            Self::StartsWith => 0x41,
            Self::EndsWith => 0x42,
            Self::Matches => 0x43,
            Self::MatchesConst(_) => 0x44,
            Self::In => 0x45,
            Self::Cast(_) => 0x46,
            Self::Jump(_) => 0x50,
            Self::JumpIfTrue(_) => 0x51,
            Self::JumpIfFalse(_) => 0x52,
            Self::JumpIfNil(_) => 0x53,
            Self::JumpIfNotNil(_) => 0x54,
            Self::JumpBackward(_) => 0x55,
            Self::JumpIfEnd(_) => 0x56,
            Self::Begin => 0x60,
            Self::BeginReverse => 0x61,
            Self::End => 0x62,
            Self::IncrementIndex => 0x63,
            Self::IncrementCount => 0x64,
            Self::Pointer => 0x65,
            Self::LoadScope(_) => 0x66,
            Self::SetAcc => 0x67,
            Self::InitAcc => 0x68,
            Self::GroupBy => 0x69,
            Self::SortBy => 0x6A,
            Self::Sort => 0x6B,
            Self::Array => 0x70,
            Self::Map => 0x71,
            Self::Slice => 0x72,
            Self::Len => 0x73,
            Self::Call(_) => 0x80,
            Self::CallFast(_) => 0x81,
            Self::CallTyped(_) => 0x82,
        }
    }

    /// The 16-bit argument, 0 for instructions without one.
    pub const fn operand(&self) -> u16 {
        match *self {
            Self::Push(arg)
            | Self::Int(arg)
            | Self::FetchEnv(arg)
            | Self::LoadField(arg)
            | Self::LoadMethod(arg)
            | Self::LoadFunc(arg)
            | Self::FetchField(arg)
            | Self::BindMethod(arg)
            | Self::LoadVar(arg)
            | Self::StoreVar(arg)
            | Self::MatchesConst(arg)
            | Self::Cast(arg)
            | Self::Jump(arg)
            | Self::JumpIfTrue(arg)
            | Self::JumpIfFalse(arg)
            | Self::JumpIfNil(arg)
            | Self::JumpIfNotNil(arg)
            | Self::JumpBackward(arg)
            | Self::JumpIfEnd(arg)
            | Self::LoadScope(arg)
            | Self::Call(arg)
            | Self::CallFast(arg)
            | Self::CallTyped(arg) => arg,
            _ => 0,
        }
    }

    /// Same instruction with a new operand. Used to patch jumps.
    pub const fn with_operand(self, arg: u16) -> Self {
        match self {
            Self::Jump(_) => Self::Jump(arg),
            Self::JumpIfTrue(_) => Self::JumpIfTrue(arg),
            Self::JumpIfFalse(_) => Self::JumpIfFalse(arg),
            Self::JumpIfNil(_) => Self::JumpIfNil(arg),
            Self::JumpIfNotNil(_) => Self::JumpIfNotNil(arg),
            Self::JumpBackward(_) => Self::JumpBackward(arg),
            Self::JumpIfEnd(_) => Self::JumpIfEnd(arg),
            other => other,
        }
    }

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let [lo, hi] = self.operand().to_le_bytes();
        [self.opcode(), lo, hi]
    }

    pub fn decode(bytes: [u8; Self::SIZE]) -> Result<Self, InvalidInstruction> {
        let arg = u16::from_le_bytes([bytes[1], bytes[2]]);
        Ok(match bytes[0] {
            0x01 => Self::Push(arg),
            0x02 => Self::Int(arg),
            0x03 => Self::Pop,
            0x04 => Self::True,
            0x05 => Self::False,
            0x06 => Self::Nil,
            0x10 => Self::FetchEnv(arg),
            0x11 => Self::LoadField(arg),
            0x12 => Self::LoadMethod(arg),
            0x13 => Self::LoadFunc(arg),
            0x14 => Self::Fetch,
            0x15 => Self::FetchField(arg),
            0x16 => Self::BindMethod(arg),
            0x17 => Self::Deref,
            0x18 => Self::LoadVar(arg),
            0x19 => Self::StoreVar(arg),
            0x20 => Self::Add,
            0x21 => Self::Subtract,
            0x22 => Self::Multiply,
            0x23 => Self::Divide,
            0x24 => Self::Modulo,
            0x25 => Self::Exponent,
            0x26 => Self::Negate,
            0x27 => Self::Range,
            0x30 => Self::Equal,
            0x31 => Self::EqualInt,
            0x32 => Self::EqualString,
            0x33 => Self::NotEqual,
            0x34 => Self::Less,
            0x35 => Self::More,
            0x36 => Self::LessOrEqual,
            0x37 => Self::MoreOrEqual,
            0x38 => Self::Not,
            0x40 => Self::Contains,
            0x41 => Self::StartsWith,
            0x42 => Self::EndsWith,
            0x43 => Self::Matches,
            0x44 => Self::MatchesConst(arg),
            0x45 => Self::In,
            0x46 => Self::Cast(arg),
            0x50 => Self::Jump(arg),
            0x51 => Self::JumpIfTrue(arg),
            0x52 => Self::JumpIfFalse(arg),
            0x53 => Self::JumpIfNil(arg),
            0x54 => Self::JumpIfNotNil(arg),
            0x55 => Self::JumpBackward(arg),
            0x56 => Self::JumpIfEnd(arg),
            0x60 => Self::Begin,
            0x61 => Self::BeginReverse,
            0x62 => Self::End,
            0x63 => Self::IncrementIndex,
            0x64 => Self::IncrementCount,
            0x65 => Self::Pointer,
            0x66 => Self::LoadScope(arg),
            0x67 => Self::SetAcc,
            0x68 => Self::InitAcc,
            0x69 => Self::GroupBy,
            0x6A => Self::SortBy,
            0x6B => Self::Sort,
            0x70 => Self::Array,
            0x71 => Self::Map,
            0x72 => Self::Slice,
            0x73 => Self::Len,
            0x80 => Self::Call(arg),
            0x81 => Self::CallFast(arg),
            0x82 => Self::CallTyped(arg),
            other => return Err(InvalidInstruction(other)),
        })
    }

    /// Check if this instruction can produce an error effect
    pub const fn can_error(&self) -> bool {
        !matches!(
            self,
            Self::Push(_)
                | Self::Int(_)
                | Self::Pop
                | Self::True
                | Self::False
                | Self::Nil
                | Self::FetchEnv(_)
                | Self::LoadVar(_)
                | Self::StoreVar(_)
                | Self::Jump(_)
                | Self::JumpIfNil(_)
                | Self::JumpIfNotNil(_)
                | Self::JumpIfEnd(_)
                | Self::End
                | Self::IncrementIndex
                | Self::IncrementCount
                | Self::Equal
                | Self::EqualInt
                | Self::EqualString
                | Self::NotEqual
        )
    }

    /// Check if this is a control flow instruction
    pub const fn is_control_flow(&self) -> bool {
        matches!(
            self,
            Self::Jump(_)
                | Self::JumpIfTrue(_)
                | Self::JumpIfFalse(_)
                | Self::JumpIfNil(_)
                | Self::JumpIfNotNil(_)
                | Self::JumpBackward(_)
                | Self::JumpIfEnd(_)
        )
    }

    /// Instruction index a jump at `at` lands on.
    pub fn jump_target(&self, at: usize) -> Option<usize> {
        let next = at + 1;
        match *self {
            Self::JumpBackward(offset) => next.checked_sub(offset as usize),
            _ if self.is_control_flow() => Some(next + self.operand() as usize),
            _ => None,
        }
    }

    /// Whether the operand indexes the constant pool.
    pub const fn uses_constant(&self) -> bool {
        matches!(
            self,
            Self::Push(_)
                | Self::FetchEnv(_)
                | Self::LoadField(_)
                | Self::LoadMethod(_)
                | Self::LoadFunc(_)
                | Self::FetchField(_)
                | Self::BindMethod(_)
                | Self::MatchesConst(_)
        )
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Push(_) => "Push",
            Self::Int(_) => "Int",
            Self::Pop => "Pop",
            Self::True => "True",
            Self::False => "False",
            Self::Nil => "Nil",
            Self::FetchEnv(_) => "FetchEnv",
            Self::LoadField(_) => "LoadField",
            Self::LoadMethod(_) => "LoadMethod",
            Self::LoadFunc(_) => "LoadFunc",
            Self::Fetch => "Fetch",
            Self::FetchField(_) => "FetchField",
            Self::BindMethod(_) => "BindMethod",
            Self::Deref => "Deref",
            Self::LoadVar(_) => "LoadVar",
            Self::StoreVar(_) => "StoreVar",
            Self::Add => "Add",
            Self::Subtract => "Subtract",
            Self::Multiply => "Multiply",
            Self::Divide => "Divide",
            Self::Modulo => "Modulo",
            Self::Exponent => "Exponent",
            Self::Negate => "Negate",
            Self::Range => "Range",
            Self::Equal => "Equal",
            Self::EqualInt => "EqualInt",
            Self::EqualString => "EqualString",
            Self::NotEqual => "NotEqual",
            Self::Less => "Less",
            Self::More => "More",
            Self::LessOrEqual => "LessOrEqual",
            Self::MoreOrEqual => "MoreOrEqual",
            Self::Not => "Not",
            Self::Contains => "Contains",
            Self::StartsWith => "StartsWith",
            Self::EndsWith => "EndsWith",
            Self::Matches => "Matches",
            Self::MatchesConst(_) => "MatchesConst",
            Self::In => "In",
            Self::Cast(_) => "Cast",
            Self::Jump(_) => "Jump",
            Self::JumpIfTrue(_) => "JumpIfTrue",
            Self::JumpIfFalse(_) => "JumpIfFalse",
            Self::JumpIfNil(_) => "JumpIfNil",
            Self::JumpIfNotNil(_) => "JumpIfNotNil",
            Self::JumpBackward(_) => "JumpBackward",
            Self::JumpIfEnd(_) => "JumpIfEnd",
            Self::Begin => "Begin",
            Self::BeginReverse => "BeginReverse",
            Self::End => "End",
            Self::IncrementIndex => "IncrementIndex",
            Self::IncrementCount => "IncrementCount",
            Self::Pointer => "Pointer",
            Self::LoadScope(_) => "LoadScope",
            Self::SetAcc => "SetAcc",
            Self::InitAcc => "InitAcc",
            Self::GroupBy => "GroupBy",
            Self::SortBy => "SortBy",
            Self::Sort => "Sort",
            Self::Array => "Array",
            Self::Map => "Map",
            Self::Slice => "Slice",
            Self::Len => "Len",
            Self::Call(_) => "Call",
            Self::CallFast(_) => "CallFast",
            Self::CallTyped(_) => "CallTyped",
        }
    }

    /// Whether the instruction carries an operand.
    pub const fn has_operand(&self) -> bool {
        matches!(
            self,
            Self::Push(_)
                | Self::Int(_)
                | Self::FetchEnv(_)
                | Self::LoadField(_)
                | Self::LoadMethod(_)
                | Self::LoadFunc(_)
                | Self::FetchField(_)
                | Self::BindMethod(_)
                | Self::LoadVar(_)
                | Self::StoreVar(_)
                | Self::MatchesConst(_)
                | Self::Cast(_)
                | Self::LoadScope(_)
                | Self::Call(_)
                | Self::CallFast(_)
                | Self::CallTyped(_)
        ) || self.is_control_flow()
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::JumpBackward(offset) => write!(f, "JumpBackward(-{})", offset),
            Self::LoadScope(slot::INDEX) => write!(f, "LoadScope(index)"),
            Self::LoadScope(slot::COUNT) => write!(f, "LoadScope(count)"),
            Self::LoadScope(slot::ACC) => write!(f, "LoadScope(acc)"),
            Self::LoadScope(slot::LEN) => write!(f, "LoadScope(len)"),
            Self::LoadScope(slot::GROUPS) => write!(f, "LoadScope(groups)"),
            other if other.is_control_flow() => write!(f, "{}(+{})", other.name(), other.operand()),
            other if other.has_operand() => write!(f, "{}({})", other.name(), other.operand()),
            other => f.write_str(other.name()),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidInstruction(pub u8);

impl fmt::Display for InvalidInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid instruction opcode: 0x{:02X}", self.0)
    }
}

impl std::error::Error for InvalidInstruction {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_instruction_size() {
        assert_eq!(core::mem::size_of::<Instruction>(), 4);
        assert_eq!(Instruction::Push(513).encode().len(), Instruction::SIZE);
    }

    #[test]
    fn test_operand_is_little_endian() {
        assert_eq!(Instruction::Push(0x0102).encode(), [0x01, 0x02, 0x01]);
        assert_eq!(Instruction::Add.encode(), [0x20, 0, 0]);
    }

    #[test]
    fn test_decode_every_opcode() {
        for opcode in 0..=u8::MAX {
            if let Ok(instruction) = Instruction::decode([opcode, 7, 0]) {
                assert_eq!(instruction.opcode(), opcode);
                let expected = if instruction.has_operand() { 7 } else { 0 };
                assert_eq!(instruction.operand(), expected, "{:?}", instruction);
            }
        }
        assert_eq!(Instruction::decode([0x00, 0, 0]), Err(InvalidInstruction(0)));
        assert_eq!(Instruction::decode([0xFF, 0, 0]), Err(InvalidInstruction(0xFF)));
    }

    #[test]
    fn test_jump_target() {
        assert_eq!(Instruction::Jump(3).jump_target(10), Some(14));
        assert_eq!(Instruction::JumpBackward(5).jump_target(10), Some(6));
        assert_eq!(Instruction::JumpBackward(20).jump_target(10), None);
        assert_eq!(Instruction::Add.jump_target(10), None);
    }

    #[test]
    fn test_with_operand_only_patches_jumps() {
        assert_eq!(Instruction::JumpIfFalse(0).with_operand(9), Instruction::JumpIfFalse(9));
        assert_eq!(Instruction::Push(1).with_operand(9), Instruction::Push(1));
    }

    #[test]
    fn test_can_error() {
        assert!(Instruction::Divide.can_error());
        assert!(Instruction::Call(1).can_error());
        assert!(!Instruction::Pop.can_error());
        assert!(!Instruction::Jump(2).can_error());
    }

    #[test]
    fn test_debug_formatting() {
        assert_eq!(format!("{:?}", Instruction::Push(4)), "Push(4)");
        assert_eq!(format!("{:?}", Instruction::JumpIfFalse(2)), "JumpIfFalse(+2)");
        assert_eq!(format!("{:?}", Instruction::JumpBackward(6)), "JumpBackward(-6)");
        assert_eq!(format!("{:?}", Instruction::LoadScope(slot::ACC)), "LoadScope(acc)");
        assert_eq!(format!("{:?}", Instruction::Begin), "Begin");
    }
}
