//! Growable open-addressing hash set

use crate::{alloc_slots, ContainerError, Result};

/// Multiplier for the home slot of an item.
const HOME_STEP: u64 = 73;
/// Probe increment. Odd, so probing visits every slot of a power-of-two table.
const PROBE_STEP: u64 = 5009;

const DEFAULT_BITS: u32 = 3;
const MAX_BITS: u32 = usize::BITS - 2;

/// Set of 64-bit hashes with membership and count.
///
/// The table doubles once more than 85% of its slots are taken. It never
/// shrinks.
#[derive(Debug, Clone)]
pub struct HashSet64 {
    nbits: u32,
    mask: u64,
    slots: Vec<Option<u64>>,
    len: usize,
}

impl Default for HashSet64 {
    fn default() -> Self {
        Self::new()
    }
}

impl HashSet64 {
    pub fn new() -> Self {
        Self::with_bits(DEFAULT_BITS).unwrap_or_else(|_| Self {
            nbits: 0,
            mask: 0,
            slots: Vec::new(),
            len: 0,
        })
    }

    /// Create a set with `2^bits` slots.
    pub fn with_bits(bits: u32) -> Result<Self> {
        let bits = bits.clamp(1, MAX_BITS);
        let capacity = 1usize << bits;
        Ok(Self {
            nbits: bits,
            mask: (capacity - 1) as u64,
            slots: alloc_slots(capacity, None)?,
            len: 0,
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

    /// Insert `item`. Returns `true` if it was not present before.
    pub fn add(&mut self, item: u64) -> Result<bool> {
        if self.slots.is_empty() {
            *self = Self::with_bits(DEFAULT_BITS)?;
        }
        if !Self::place(&mut self.slots, self.mask, item) {
            return Ok(false);
        }
        self.len += 1;
        if self.len * 100 > self.capacity() * 85 {
            self.grow()?;
        }
        Ok(true)
    }

    pub fn contains(&self, item: u64) -> bool {
        if self.slots.is_empty() {
            return false;
        }
        let mut index = self.mask & HOME_STEP.wrapping_mul(item);
        for _ in 0..self.slots.len() {
            match self.slots[index as usize] {
                None => return false,
                Some(existing) if existing == item => return true,
                Some(_) => index = self.mask & index.wrapping_add(PROBE_STEP),
            }
        }
        false
    }

    // Returns false when the item is already present.
    fn place(slots: &mut [Option<u64>], mask: u64, item: u64) -> bool {
        let mut index = mask & HOME_STEP.wrapping_mul(item);
        loop {
            match slots[index as usize] {
                None => {
                    slots[index as usize] = Some(item);
                    return true;
                }
                Some(existing) if existing == item => return false,
                Some(_) => index = mask & index.wrapping_add(PROBE_STEP),
            }
        }
    }

    fn grow(&mut self) -> Result<()> {
        if self.nbits >= MAX_BITS {
            return Err(ContainerError::CapacityOverflow);
        }
        let nbits = self.nbits + 1;
        let capacity = 1usize << nbits;
        let mask = (capacity - 1) as u64;
        let mut slots = alloc_slots(capacity, None)?;
        for item in self.slots.iter().flatten() {
            Self::place(&mut slots, mask, *item);
        }
        tracing::trace!(from = self.slots.len(), to = capacity, "hash set grown");
        self.nbits = nbits;
        self.mask = mask;
        self.slots = slots;
        Ok(())
    }
}
