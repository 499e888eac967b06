//! MESI invariant checks across all caches.
//!
//! Per line: an invalid line is `Invalid`, and a dirty line is `Modified`.
//! Per block: if any cache holds it `Exclusive` or `Modified`, no other cache holds a
//! valid copy.

use std::collections::BTreeMap;

use crate::common::{CoherenceViolation, CoreId};
use crate::core::Core;
use crate::core::units::cache::MesiState;

/// Verifies the MESI invariants over every line of every core.
///
/// # Errors
///
/// Returns the first violation found, scanning cores in order.
pub fn check_coherence(cores: &[Core]) -> Result<(), CoherenceViolation> {
    let mut holders: BTreeMap<(usize, u32), Vec<(CoreId, MesiState)>> = BTreeMap::new();

    for core in cores {
        for (index, way, line) in core.cache().lines() {
            if !line.valid {
                if line.state != MesiState::Invalid {
                    return Err(CoherenceViolation::InvalidLineState {
                        core: core.id(),
                        index,
                        way,
                        state: line.state,
                    });
                }
                continue;
            }
            if line.dirty && line.state != MesiState::Modified {
                return Err(CoherenceViolation::DirtyNotModified {
                    core: core.id(),
                    index,
                    way,
                    state: line.state,
                });
            }
            holders
                .entry((index, line.tag))
                .or_default()
                .push((core.id(), line.state));
        }
    }

    for ((index, tag), copies) in &holders {
        let Some(&(owner, owner_state)) = copies.iter().find(|(_, s)| s.is_owned()) else {
            continue;
        };
        if let Some(&(other, other_state)) = copies.iter().find(|(id, _)| *id != owner) {
            return Err(CoherenceViolation::MultipleOwners {
                tag: *tag,
                index: *index,
                owner,
                owner_state,
                other,
                other_state,
            });
        }
    }
    Ok(())
}
