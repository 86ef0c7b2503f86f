use core::fmt;

/// Outcome vocabulary for memory operations.
///
/// Both values are ordinary results, not errors: a query that comes back
/// [`MemoryNotFound`] is a normal observation ("this allocation is not
/// tracked as resident"), and callers decide what that means for them.
/// Nothing in this crate converts a status into failing control flow.
///
/// [`MemoryNotFound`]: MemoryOperationsStatus::MemoryNotFound
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MemoryOperationsStatus {
    /// The operation took effect (or was a no-op that counts as success).
    Success,
    /// The allocation is not currently tracked as resident.
    MemoryNotFound,
}

impl MemoryOperationsStatus {
    #[inline]
    pub fn is_success(self) -> bool {
        match self {
            Self::Success => true,
            _ => false,
        }
    }
}

impl fmt::Display for MemoryOperationsStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::MemoryNotFound => f.write_str("memory not found"),
        }
    }
}
