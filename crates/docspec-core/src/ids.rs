//! Declaration identifier allocation.
//!
//! Every declaration, call signature and parameter in the output tree gets a
//! numeric id from an [`IdAllocator`]. Id `0` is reserved for the project root,
//! so allocation starts at `1` and only ever moves forward.
//!
//! The allocator is a plain value owned by one transformation run. Two runs
//! that each create their own allocator produce the same ids for the same
//! input.

/// Numeric identifier of a declaration in the output tree.
pub type ReflectionId = u32;

/// Id of the synthetic project root.
pub const ROOT_ID: ReflectionId = 0;

/// Issues strictly increasing declaration ids, starting at 1.
#[derive(Debug)]
pub struct IdAllocator {
    next: ReflectionId,
}

impl Default for IdAllocator {
    fn default() -> Self {
        IdAllocator { next: ROOT_ID + 1 }
    }
}

impl IdAllocator {
    /// Create a fresh allocator for a new run.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next id. Ids are never reused.
    pub fn next_id(&mut self) -> ReflectionId {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Number of ids handed out so far.
    pub fn allocated(&self) -> u32 {
        self.next - (ROOT_ID + 1)
    }
}

// ============================================================================
// Tests
// ============================================================================
