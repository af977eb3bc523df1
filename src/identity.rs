//! Composite TUIO cursor ids from sensor hand and finger ids.
//!
//! `id = capacity * hand + finger`. The sensor guarantees that hand and finger
//! ids are unique within a frame, so the composed id is unique as long as every
//! finger id stays below the per-hand capacity. Cross-frame continuity is
//! whatever the sensor provides; nothing is remembered here.

use thiserror::Error;

pub type CursorId = i32;

/// Reference per-hand capacity.
pub const DEFAULT_FINGERS_PER_HAND: i32 = 20;
/// A hand reports at most this many fingers.
pub const MIN_FINGERS_PER_HAND: i32 = 5;
pub const MAX_FINGERS_PER_HAND: i32 = 10_000;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("fingers_per_hand must be within 5..=10000, got {0}")]
pub struct CapacityError(pub i32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityTracker {
    capacity: i32,
}

impl Default for IdentityTracker {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_FINGERS_PER_HAND,
        }
    }
}

impl IdentityTracker {
    pub fn new(capacity: i32) -> Result<Self, CapacityError> {
        if !(MIN_FINGERS_PER_HAND..=MAX_FINGERS_PER_HAND).contains(&capacity) {
            return Err(CapacityError(capacity));
        }
        Ok(Self { capacity })
    }

    pub fn capacity(&self) -> i32 {
        self.capacity
    }

    /// Finger ids at or above the capacity collide with the next hand; that is
    /// not detected here.
    pub fn cursor_id(&self, hand_id: i32, finger_id: i32) -> CursorId {
        self.capacity.wrapping_mul(hand_id).wrapping_add(finger_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_reference_composition() {
        let ids = IdentityTracker::default();
        assert_eq!(ids.cursor_id(0, 3), 3);
        assert_eq!(ids.cursor_id(2, 7), 47);
    }

    #[test]
    fn test_injective_below_capacity() {
        let ids = IdentityTracker::new(MIN_FINGERS_PER_HAND).unwrap();
        let mut seen = HashSet::new();
        for hand in 0..50 {
            for finger in 0..MIN_FINGERS_PER_HAND {
                assert!(seen.insert(ids.cursor_id(hand, finger)));
            }
        }
    }

    #[test]
    fn test_capacity_bounds() {
        assert_eq!(IdentityTracker::new(4), Err(CapacityError(4)));
        assert_eq!(IdentityTracker::new(10_001), Err(CapacityError(10_001)));
        assert!(IdentityTracker::new(20).is_ok());
    }

    #[test]
    fn test_huge_ids_wrap_instead_of_panicking() {
        let ids = IdentityTracker::default();
        let _ = ids.cursor_id(i32::MAX, i32::MAX);
    }
}
