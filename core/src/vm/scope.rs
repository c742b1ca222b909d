//! Iteration frames of loop builtins.

use std::collections::BTreeMap;
use std::sync::Arc;

use ecow::{EcoString, EcoVec};

use super::RuntimeError;
use super::instruction_set::slot;
use crate::values::Value;

/// State of one running loop: the array being walked, the position, the
/// match counter and the `reduce` accumulator. `groupBy` and `sortBy`
/// collect their per-element keys here too.
#[derive(Debug)]
pub(crate) struct Scope {
    array: EcoVec<Value>,
    reversed: bool,
    /// Elements visited so far.
    step: usize,
    count: i64,
    acc: Value,
    groups: BTreeMap<EcoString, EcoVec<Value>>,
    keys: Vec<Value>,
}

impl Scope {
    pub fn new(array: EcoVec<Value>, reversed: bool) -> Self {
        Self {
            array,
            reversed,
            step: 0,
            count: 0,
            acc: Value::Nil,
            groups: BTreeMap::new(),
            keys: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.array.len()
    }

    pub fn at_end(&self) -> bool {
        self.step >= self.array.len()
    }

    /// Position of the current element in the array.
    pub fn index(&self) -> usize {
        if self.reversed {
            self.array.len().saturating_sub(self.step + 1)
        } else {
            self.step
        }
    }

    pub fn element(&self) -> Result<&Value, RuntimeError> {
        self.array
            .get(self.index())
            .filter(|_| !self.at_end())
            .ok_or_else(|| RuntimeError::internal("loop pointer past the end"))
    }

    pub fn advance(&mut self) {
        self.step += 1;
    }

    pub fn increment_count(&mut self) {
        self.count += 1;
    }

    pub fn set_acc(&mut self, value: Value) {
        self.acc = value;
    }

    /// Starts a `reduce` without an initial value.
    pub fn init_acc(&mut self) -> Result<(), RuntimeError> {
        let first = self
            .array
            .first()
            .cloned()
            .ok_or_else(|| RuntimeError::mismatch("reduce of empty array with no initial value"))?;
        self.acc = first;
        self.step = 1;
        Ok(())
    }

    /// Files the current element under `key`. Returns whether `key` opened
    /// a new group.
    pub fn group(&mut self, key: &Value) -> Result<bool, RuntimeError> {
        let element = self.element()?.clone();
        let key = match key {
            Value::String(s) => s.clone(),
            Value::Nil => "nil".into(),
            other => other.to_plain_string().into(),
        };
        let group = self.groups.entry(key).or_default();
        group.push(element);
        Ok(group.len() == 1)
    }

    pub fn push_key(&mut self, key: Value) {
        self.keys.push(key);
    }

    /// The array ordered by the keys recorded with [`Scope::push_key`].
    /// The sort is stable.
    pub fn sorted(&mut self, descending: bool) -> Result<Value, RuntimeError> {
        if self.keys.len() != self.array.len() {
            return Err(RuntimeError::internal("sortBy keys out of step"));
        }
        let keys = std::mem::take(&mut self.keys);
        let mut pairs: Vec<(Value, Value)> = keys.into_iter().zip(self.array.iter().cloned()).collect();
        let mut failure = None;
        pairs.sort_by(|(a, _), (b, _)| {
            match crate::operators::ordering(a, b, "sortBy") {
                Ok(Some(order)) if descending => order.reverse(),
                Ok(Some(order)) => order,
                Ok(None) => core::cmp::Ordering::Equal,
                Err(err) => {
                    failure.get_or_insert(err);
                    core::cmp::Ordering::Equal
                }
            }
        });
        if let Some(err) = failure {
            return Err(err);
        }
        Ok(Value::Array(pairs.into_iter().map(|(_, v)| v).collect()))
    }

    pub fn load(&self, slot: u16) -> Result<Value, RuntimeError> {
        Ok(match slot {
            slot::INDEX => Value::Int(self.index() as i64),
            slot::COUNT => Value::Int(self.count),
            slot::ACC => self.acc.clone(),
            slot::LEN => Value::Int(self.array.len() as i64),
            slot::GROUPS => {
                let groups = self
                    .groups
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::Array(v.clone())))
                    .collect();
                Value::Map(Arc::new(groups))
            }
            other => {
                return Err(RuntimeError::internal(format!("unknown scope slot {}", other)));
            }
        })
    }
}
