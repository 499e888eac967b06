//! Bus transactions.
//!
//! A transaction is created by a cache on a miss or a Shared-write upgrade, queued on the
//! bus, and carries its remaining service time once dispatched.

use std::fmt;

use crate::common::{Address, CoreId};

/// Snooping bus operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BusOperation {
    /// Read miss: fetch a block for reading.
    BusRead,
    /// Write miss: fetch a block with intent to modify.
    BusReadX,
    /// Shared-write upgrade: every other copy must be dropped.
    Invalidate,
    /// Dirty block written back by a snooping cache.
    Flush,
    /// Write-update broadcast; never issued under MESI.
    Update,
}

impl fmt::Display for BusOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BusRead => "BusRd",
            Self::BusReadX => "BusRdX",
            Self::Invalidate => "Invalidate",
            Self::Flush => "Flush",
            Self::Update => "Update",
        };
        f.write_str(name)
    }
}

/// One request on the shared bus.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BusTransaction {
    /// Requested operation.
    pub operation: BusOperation,
    /// Address that caused the request.
    pub address: Address,
    /// Requesting core; `None` for transactions with no originator.
    pub originating_core: Option<CoreId>,
    /// Cycles of service left once dispatched.
    pub remaining_cycles: u64,
    /// Block data carried by the transaction.
    pub payload: Vec<u8>,
}

impl BusTransaction {
    /// Creates an undispatched request from `core`.
    pub const fn request(operation: BusOperation, address: Address, core: CoreId) -> Self {
        Self {
            operation,
            address,
            originating_core: Some(core),
            remaining_cycles: 0,
            payload: Vec::new(),
        }
    }
}

impl fmt::Display for BusTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.originating_core {
            Some(core) => write!(f, "{} {} from core {}", self.operation, self.address, core),
            None => write!(f, "{} {}", self.operation, self.address),
        }
    }
}
