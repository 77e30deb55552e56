//! Native stack accounting for the recursive walkers.
//!
//! The parser and the lowerer bound recursion by node depth, but frame sizes
//! differ widely between build profiles and between grammar paths. A budget
//! measured in bytes catches deep inputs before the thread's stack does.

/// Bytes of stack one parse or lowering run may use.
pub const DEFAULT_STACK_LIMIT: usize = 1 << 20;

#[derive(Debug, Clone, Copy)]
pub struct StackBudget {
    base: usize,
    limit: usize,
}

impl StackBudget {
    /// Starts measuring from the caller's frame.
    pub fn new(limit: usize) -> Self {
        Self {
            base: stack_address(),
            limit,
        }
    }

    /// Whether the current frame lies more than `limit` bytes away from the
    /// frame the budget was created in.
    pub fn exhausted(&self) -> bool {
        stack_address().abs_diff(self.base) > self.limit
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl Default for StackBudget {
    fn default() -> Self {
        Self::new(DEFAULT_STACK_LIMIT)
    }
}

#[inline(never)]
fn stack_address() -> usize {
    let marker = 0u8;
    std::hint::black_box(&marker) as *const u8 as usize
}
