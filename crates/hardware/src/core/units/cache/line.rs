//! Cache line storage and MESI state.

use serde::Serialize;

/// MESI coherence state of a cache line.
///
/// * `Modified` - the only valid copy in the system; memory is stale.
/// * `Exclusive` - the only cached copy; memory is up to date.
/// * `Shared` - clean, possibly cached elsewhere.
/// * `Invalid` - the line holds nothing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum MesiState {
    /// The line holds no valid block.
    #[default]
    Invalid,
    /// Clean copy that other caches may also hold.
    Shared,
    /// Clean copy held by this cache alone.
    Exclusive,
    /// Dirty copy held by this cache alone.
    Modified,
}

impl MesiState {
    /// Whether this state grants sole ownership of the block (E or M).
    pub const fn is_owned(self) -> bool {
        matches!(self, Self::Exclusive | Self::Modified)
    }

    /// Single-letter mnemonic used in traces and logs.
    pub const fn letter(self) -> char {
        match self {
            Self::Invalid => 'I',
            Self::Shared => 'S',
            Self::Exclusive => 'E',
            Self::Modified => 'M',
        }
    }
}

/// One way of one set.
///
/// Invariants kept by `Cache`: an invalid line is in state `Invalid`, and a dirty line is
/// `Modified`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheLine {
    /// Address bits above the index and offset fields.
    pub tag: u32,
    /// Whether the line holds a block.
    pub valid: bool,
    /// Whether the block differs from memory.
    pub dirty: bool,
    /// Coherence state.
    pub state: MesiState,
    /// Stamp from the owning cache's LRU clock; larger is more recent.
    pub lru_counter: u64,
    /// Block contents.
    pub block: Vec<u8>,
}

impl CacheLine {
    /// Creates an empty line with a zeroed block of `block_bytes`.
    pub fn empty(block_bytes: usize) -> Self {
        Self {
            block: vec![0; block_bytes],
            ..Self::default()
        }
    }

    /// Whether this line holds the block with `tag`.
    #[inline(always)]
    pub const fn matches(&self, tag: u32) -> bool {
        self.valid && self.tag == tag
    }

    /// Drops the block; the data is kept but no longer meaningful.
    pub const fn invalidate(&mut self) {
        self.valid = false;
        self.dirty = false;
        self.state = MesiState::Invalid;
    }
}
