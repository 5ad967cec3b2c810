//! Piggyback Containers - open-addressing set and map over 64-bit value hashes
//!
//! Values are reduced to a `u64` before they reach a container: integers are
//! used directly, text goes through [`hash_str`]. Two values with the same
//! hash are the same value as far as these containers are concerned, so
//! distinct counts built on them are estimates for text and decimal columns.

pub mod hash;
pub mod map;
pub mod set;

pub use hash::{hash_int, hash_str};
pub use map::ValueMap;
pub use set::HashSet64;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContainerError {
    #[error("failed to allocate {requested} slots")]
    AllocationFailed { requested: usize },

    #[error("container capacity overflow")]
    CapacityOverflow,
}

pub type Result<T> = std::result::Result<T, ContainerError>;

/// Allocate `capacity` slots filled with `fill`, reporting allocation failure
/// instead of aborting.
pub(crate) fn alloc_slots<T: Clone>(capacity: usize, fill: T) -> Result<Vec<T>> {
    let mut slots = Vec::new();
    slots
        .try_reserve_exact(capacity)
        .map_err(|_| ContainerError::AllocationFailed {
            requested: capacity,
        })?;
    slots.resize(capacity, fill);
    Ok(slots)
}
