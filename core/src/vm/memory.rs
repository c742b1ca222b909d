use super::RuntimeError;

/// Default per-run allowance of container elements.
pub const DEFAULT_MEMORY_BUDGET: usize = 1_000_000;

/// Counts container elements allocated during one run.
#[derive(Debug, Clone)]
pub struct Memory {
    used: usize,
    budget: usize,
}

impl Memory {
    pub fn new(budget: usize) -> Self {
        Self { used: 0, budget }
    }

    /// Accounts for `elements` new container slots.
    pub fn charge(&mut self, elements: usize) -> Result<(), RuntimeError> {
        let used = self.used.saturating_add(elements);
        if used > self.budget {
            return Err(RuntimeError::MemoryBudgetExceeded);
        }
        self.used = used;
        Ok(())
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn reset(&mut self) {
        self.used = 0;
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_BUDGET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charge_up_to_budget() {
        let mut memory = Memory::new(10);
        assert!(memory.charge(6).is_ok());
        assert!(memory.charge(4).is_ok());
        assert_eq!(memory.charge(1), Err(RuntimeError::MemoryBudgetExceeded));
        assert_eq!(memory.used(), 10);
    }
}
