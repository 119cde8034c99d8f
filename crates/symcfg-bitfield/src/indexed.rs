//! Register, bit and mask locations of interrupt-indexed register groups.
//!
//! Enable and status flags pack one bit per vector into 32-bit registers
//! (`IEC0`, `IEC1`, ...). Priority registers pack four 8-bit sub-slots per
//! register; each sub-slot holds a 3-bit priority two bits into the slot
//! and a 2-bit sub-priority in its low bits.

use crate::codec::{encode_register, Field};
use crate::error::{BitfieldError, Result};

/// Vectors per priority register.
pub const PRIORITY_SLOTS: u32 = 4;
/// Bits per priority sub-slot.
pub const PRIORITY_SLOT_BITS: u32 = 8;
pub const PRIORITY_MASK: u64 = 0x7;
pub const SUBPRIORITY_MASK: u64 = 0x3;

/// Location of one vector's flag in a group of flag registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexedLocation {
    pub register_ordinal: u32,
    pub bit_position: u32,
    pub bit_mask: u64,
}

impl IndexedLocation {
    /// Register name, e.g. `IEC1` for prefix `IEC`.
    pub fn register_name(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.register_ordinal)
    }
}

/// Locate `vector` in a group of `group_width`-bit flag registers.
pub fn indexed_register_location(vector: u32, group_width: u32) -> Result<IndexedLocation> {
    if group_width == 0 || group_width > 64 {
        return Err(BitfieldError::InvalidGroupWidth(group_width));
    }
    let bit_position = vector % group_width;
    Ok(IndexedLocation {
        register_ordinal: vector / group_width,
        bit_position,
        bit_mask: 1u64 << bit_position,
    })
}

/// Location of one vector's priority and sub-priority fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityLocation {
    pub register_ordinal: u32,
    pub priority_shift: u32,
    pub subpriority_shift: u32,
}

impl PriorityLocation {
    pub fn register_name(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.register_ordinal)
    }

    pub fn priority_field(&self) -> Field {
        Field::new(PRIORITY_MASK, self.priority_shift)
    }

    pub fn subpriority_field(&self) -> Field {
        Field::new(SUBPRIORITY_MASK, self.subpriority_shift)
    }

    /// Register bits contributed by this vector.
    pub fn compose(&self, priority: u64, subpriority: u64) -> u64 {
        encode_register(&[
            (priority, self.priority_field()),
            (subpriority, self.subpriority_field()),
        ])
    }
}

pub fn priority_location(vector: u32) -> PriorityLocation {
    let subpriority_shift = PRIORITY_SLOT_BITS * (vector % PRIORITY_SLOTS);
    PriorityLocation {
        register_ordinal: vector / PRIORITY_SLOTS,
        priority_shift: subpriority_shift + 2,
        subpriority_shift,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enable_register_location() {
        let loc = indexed_register_location(38, 32).unwrap();
        assert_eq!(loc.register_name("IEC"), "IEC1");
        assert_eq!(loc.bit_position, 6);
        assert_eq!(loc.bit_mask, 0x40);
        assert_eq!(indexed_register_location(4, 32).unwrap().register_name("IFS"), "IFS0");
    }

    #[test]
    fn group_width_is_checked() {
        assert!(matches!(
            indexed_register_location(1, 0),
            Err(BitfieldError::InvalidGroupWidth(0))
        ));
        assert!(indexed_register_location(1, 65).is_err());
        assert_eq!(indexed_register_location(70, 64).unwrap().bit_mask, 1 << 6);
    }

    #[test]
    fn priority_location_of_timer_1() {
        let loc = priority_location(4);
        assert_eq!(loc.register_name("IPC"), "IPC1");
        assert_eq!((loc.priority_shift, loc.subpriority_shift), (2, 0));
        assert_eq!(loc.compose(1, 0), 0x4);

        let loc = priority_location(38);
        assert_eq!(loc.register_name("IPC"), "IPC9");
        assert_eq!((loc.priority_shift, loc.subpriority_shift), (18, 16));
        assert_eq!(loc.compose(7, 3), (7 << 18) | (3 << 16));
    }
}
