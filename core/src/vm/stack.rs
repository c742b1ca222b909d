use core::fmt;

use super::RuntimeError;

/// Operand stack of the VM.
///
/// Underflow never panics: a well-formed program keeps the stack balanced,
/// so popping an empty stack reports a malformed program instead.
///
/// # Examples
///
/// ```ignore
/// let mut stack = Stack::new(16);
/// stack.push(42);
/// stack.push(17);
/// assert_eq!(stack.pop(), Ok(17));
/// assert_eq!(stack.peek(), Ok(&42));
/// ```
pub(crate) struct Stack<T> {
    items: Vec<T>,
}

fn underflow() -> RuntimeError {
    RuntimeError::internal("stack underflow")
}

impl<T> Stack<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity.min(256)),
        }
    }

    #[inline]
    pub fn push(&mut self, value: T) {
        self.items.push(value);
    }

    #[inline]
    pub fn pop(&mut self) -> Result<T, RuntimeError> {
        self.items.pop().ok_or_else(underflow)
    }

    /// Pops `b` then `a`, returning them in push order.
    #[inline]
    pub fn pop2(&mut self) -> Result<(T, T), RuntimeError> {
        let b = self.pop()?;
        let a = self.pop()?;
        Ok((a, b))
    }

    #[inline]
    pub fn peek(&self) -> Result<&T, RuntimeError> {
        self.items.last().ok_or_else(underflow)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Removes the top `n` values, oldest first.
    pub fn pop_n(&mut self, n: usize) -> Result<Vec<T>, RuntimeError> {
        let at = self.items.len().checked_sub(n).ok_or_else(underflow)?;
        Ok(self.items.split_off(at))
    }
}

impl<T: fmt::Debug> fmt::Debug for Stack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.iter().rev()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_push_pop() {
        let mut stack = Stack::new(4);
        stack.push(1);
        stack.push(2);
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.pop(), Ok(2));
        assert_eq!(stack.peek(), Ok(&1));
        assert_eq!(stack.pop(), Ok(1));
        assert!(stack.is_empty());
    }

    #[test]
    fn test_underflow_is_an_error() {
        let mut stack: Stack<i32> = Stack::new(4);
        assert_eq!(stack.pop(), Err(RuntimeError::internal("stack underflow")));
        assert!(stack.peek().is_err());
        assert!(stack.pop_n(1).is_err());
    }

    #[test]
    fn test_pop2_keeps_push_order() {
        let mut stack = Stack::new(4);
        stack.push("a");
        stack.push("b");
        assert_eq!(stack.pop2(), Ok(("a", "b")));
    }

    #[test]
    fn test_pop_n_oldest_first() {
        let mut stack = Stack::new(8);
        for i in 0..5 {
            stack.push(i);
        }
        assert_eq!(stack.pop_n(3), Ok(vec![2, 3, 4]));
        assert_eq!(format!("{:?}", stack), "[1, 0]");
        assert_eq!(stack.pop_n(0), Ok(vec![]));
    }

    #[test]
    fn test_debug_lists_top_first() {
        let mut stack = Stack::new(4);
        stack.push(1);
        stack.push(2);
        assert_eq!(format!("{:?}", stack), "[2, 1]");
        stack.clear();
        assert!(stack.is_empty());
    }
}
