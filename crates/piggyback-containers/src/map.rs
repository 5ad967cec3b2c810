//! Open-addressing map from a 64-bit key hash to a single value

use crate::{alloc_slots, ContainerError, Result};

const HOME_MIX: u64 = 0x9E37_79B9_7F4A_7C15;
const STEP_MIX: u64 = 0xC2B2_AE3D_27D4_EB4F;

#[derive(Debug, Clone)]
enum Slot<V> {
    Empty,
    Deleted,
    Occupied { key: u64, value: V },
}

/// Double-hashing map. Doubles its capacity when every slot is in use
/// (live or deleted) and never shrinks.
#[derive(Debug, Clone)]
pub struct ValueMap<V> {
    nbits: u32,
    slots: Vec<Slot<V>>,
    len: usize,
    used: usize,
}

impl<V: Clone> ValueMap<V> {
    /// Create a map with room for at least `initial_capacity` entries.
    pub fn with_capacity(initial_capacity: usize) -> Result<Self> {
        let capacity = initial_capacity
            .max(2)
            .checked_next_power_of_two()
            .ok_or(ContainerError::CapacityOverflow)?;
        Ok(Self {
            nbits: capacity.trailing_zeros(),
            slots: alloc_slots(capacity, Slot::Empty)?,
            len: 0,
            used: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Insert or overwrite `key`. Returns the value previously stored under it.
    pub fn insert(&mut self, key: u64, value: V) -> Result<Option<V>> {
        if self.used == self.slots.len() {
            self.rehash()?;
        }

        let mut reuse = None;
        for index in self.probe(key) {
            match &mut self.slots[index] {
                Slot::Empty => {
                    let target = reuse.unwrap_or(index);
                    if reuse.is_none() {
                        self.used += 1;
                    }
                    self.slots[target] = Slot::Occupied { key, value };
                    self.len += 1;
                    return Ok(None);
                }
                Slot::Deleted => {
                    reuse.get_or_insert(index);
                }
                Slot::Occupied {
                    key: existing,
                    value: stored,
                } if *existing == key => {
                    return Ok(Some(std::mem::replace(stored, value)));
                }
                Slot::Occupied { .. } => {}
            }
        }

        // No empty slot on the probe path: every slot is live or deleted.
        match reuse {
            Some(target) => {
                self.slots[target] = Slot::Occupied { key, value };
                self.len += 1;
                Ok(None)
            }
            None => {
                self.rehash()?;
                self.insert(key, value)
            }
        }
    }

    pub fn get(&self, key: u64) -> Option<&V> {
        for index in self.probe(key) {
            match &self.slots[index] {
                Slot::Empty => return None,
                Slot::Occupied {
                    key: existing,
                    value,
                } if *existing == key => return Some(value),
                _ => {}
            }
        }
        None
    }

    pub fn remove(&mut self, key: u64) -> Option<V> {
        for index in self.probe(key) {
            match &self.slots[index] {
                Slot::Empty => return None,
                Slot::Occupied { key: existing, .. } if *existing == key => {
                    let removed = std::mem::replace(&mut self.slots[index], Slot::Deleted);
                    self.len -= 1;
                    return match removed {
                        Slot::Occupied { value, .. } => Some(value),
                        _ => None,
                    };
                }
                _ => {}
            }
        }
        None
    }

    /// Slot indexes visited for `key`, each exactly once.
    fn probe(&self, key: u64) -> impl Iterator<Item = usize> {
        let capacity = self.slots.len();
        let mask = capacity - 1;
        let shift = 64 - self.nbits;
        let home = (key.wrapping_mul(HOME_MIX) >> shift) as usize;
        let step = ((key.wrapping_mul(STEP_MIX) >> shift) as usize | 1) & mask;
        (0..capacity).map(move |i| home.wrapping_add(i.wrapping_mul(step)) & mask)
    }

    fn rehash(&mut self) -> Result<()> {
        let capacity = self
            .slots
            .len()
            .checked_mul(2)
            .ok_or(ContainerError::CapacityOverflow)?;
        let old = std::mem::replace(&mut self.slots, alloc_slots(capacity, Slot::Empty)?);
        tracing::trace!(from = old.len(), to = capacity, "value map rehashed");
        self.nbits = capacity.trailing_zeros();
        self.len = 0;
        self.used = 0;
        for slot in old {
            if let Slot::Occupied { key, value } = slot {
                self.insert(key, value)?;
            }
        }
        Ok(())
    }
}
