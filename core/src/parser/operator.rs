//! Operator precedence table.

use hashbrown::HashMap;
use lazy_static::lazy_static;

use crate::ast::{BinaryOp, UnaryOp};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Associativity {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy)]
pub struct BinaryInfo {
    pub op: BinaryOp,
    pub precedence: u16,
    pub associativity: Associativity,
}

pub const UNARY_PRECEDENCE: u16 = 500;
pub const TERNARY_PRECEDENCE: u16 = 30;
pub const PIPE_PRECEDENCE: u16 = 20;

lazy_static! {
    static ref BINARY: HashMap<&'static str, BinaryInfo> = {
        use Associativity::*;
        use BinaryOp::*;
        let table: &[(&str, BinaryOp, u16, Associativity)] = &[
            ("or", Or, 50, Left),
            ("||", Or, 50, Left),
            ("and", And, 60, Left),
            ("&&", And, 60, Left),
            ("==", Equal, 70, Left),
            ("!=", NotEqual, 70, Left),
            ("<", Less, 70, Left),
            (">", More, 70, Left),
            ("<=", LessOrEqual, 70, Left),
            (">=", MoreOrEqual, 70, Left),
            ("in", In, 70, Left),
            ("not in", NotIn, 70, Left),
            ("matches", Matches, 70, Left),
            ("contains", Contains, 70, Left),
            ("startsWith", StartsWith, 70, Left),
            ("endsWith", EndsWith, 70, Left),
            ("..", Range, 80, Left),
            ("+", Add, 90, Left),
            ("-", Subtract, 90, Left),
            ("*", Multiply, 100, Left),
            ("/", Divide, 100, Left),
            ("%", Modulo, 100, Left),
            ("**", Exponent, 200, Right),
            ("^", Exponent, 200, Right),
            ("??", Coalesce, 40, Right),
        ];
        table
            .iter()
            .map(|&(lexeme, op, precedence, associativity)| {
                (
                    lexeme,
                    BinaryInfo {
                        op,
                        precedence,
                        associativity,
                    },
                )
            })
            .collect()
    };
}

pub fn binary_operator(lexeme: &str) -> Option<BinaryInfo> {
    BINARY.get(lexeme).copied()
}

pub fn unary_operator(lexeme: &str) -> Option<UnaryOp> {
    match lexeme {
        "!" | "not" => Some(UnaryOp::Not),
        "-" => Some(UnaryOp::Negate),
        "+" => Some(UnaryOp::Plus),
        _ => None,
    }
}

/// Precedence and associativity of an operator, by its canonical lexeme.
pub fn binding(op: BinaryOp) -> (u16, Associativity) {
    let info = BINARY.get(op.as_str()).copied();
    info.map_or((0, Associativity::Left), |i| (i.precedence, i.associativity))
}
