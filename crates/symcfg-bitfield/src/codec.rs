//! Composition and decomposition of register values.

/// Placement of one field inside a register: the unshifted value mask and
/// the bit offset of its least significant bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub mask: u64,
    pub shift: u32,
}

impl Field {
    pub fn new(mask: u64, shift: u32) -> Self {
        Self { mask, shift }
    }

    /// A field `width` bits wide starting at bit `offset`.
    pub fn span(offset: u32, width: u32) -> Self {
        let mask = if width >= 64 { u64::MAX } else { (1u64 << width) - 1 };
        Self { mask, shift: offset }
    }

    /// The mask in register position.
    pub fn register_mask(&self) -> u64 {
        self.mask.checked_shl(self.shift).unwrap_or(0)
    }

    pub fn insert(&self, value: u64) -> u64 {
        (value & self.mask).checked_shl(self.shift).unwrap_or(0)
    }

    pub fn extract(&self, composed: u64) -> u64 {
        composed.checked_shr(self.shift).unwrap_or(0) & self.mask
    }
}

fn disjoint<'a>(fields: impl Iterator<Item = &'a Field>) -> bool {
    let mut used = 0u64;
    for field in fields {
        let mask = field.register_mask();
        if used & mask != 0 {
            return false;
        }
        used |= mask;
    }
    true
}

/// OR of `(value & mask) << shift` over all fields.
///
/// Field masks must not overlap; this is only checked in debug builds.
pub fn encode_register(fields: &[(u64, Field)]) -> u64 {
    debug_assert!(
        disjoint(fields.iter().map(|(_, f)| f)),
        "overlapping register fields: {fields:?}"
    );
    fields.iter().fold(0, |acc, (value, field)| acc | field.insert(*value))
}

/// `(composed >> shift) & mask` for every field, in order.
pub fn decode_register(composed: u64, fields: &[Field]) -> Vec<u64> {
    debug_assert!(disjoint(fields.iter()), "overlapping register fields: {fields:?}");
    fields.iter().map(|f| f.extract(composed)).collect()
}

/// Replace one field of an existing register value, leaving the other bits
/// untouched.
pub fn update_field(composed: u64, field: Field, value: u64) -> u64 {
    (composed & !field.register_mask()) | field.insert(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tcon_composition() {
        // T1CON: SIDL, TCKPS, TSYNC, TCS
        let sidl = Field::span(13, 1);
        let tckps = Field::span(4, 2);
        let tsync = Field::span(2, 1);
        let tcs = Field::span(1, 1);
        let value = encode_register(&[(1, sidl), (3, tckps), (0, tsync), (1, tcs)]);
        assert_eq!(value, 0x2032);
        assert_eq!(decode_register(value, &[sidl, tckps, tsync, tcs]), [1, 3, 0, 1]);
    }

    #[test]
    fn values_are_masked_to_the_field() {
        let f = Field::span(4, 2);
        assert_eq!(encode_register(&[(0xff, f)]), 0x30);
    }

    #[test]
    fn update_preserves_other_bits() {
        let cas = Field::span(5, 2);
        assert_eq!(update_field(0xffff_ffff, cas, 0), 0xffff_ff9f);
        assert_eq!(update_field(0, cas, 3), 0x60);
    }

    #[test]
    fn wide_fields() {
        let all = Field::span(0, 64);
        assert_eq!(all.mask, u64::MAX);
        assert_eq!(decode_register(u64::MAX, &[all]), [u64::MAX]);
        assert_eq!(Field::span(60, 8).register_mask(), 0xf000_0000_0000_0000);
    }

    #[test]
    #[should_panic(expected = "overlapping")]
    #[cfg(debug_assertions)]
    fn overlap_asserts_in_debug() {
        encode_register(&[(1, Field::span(0, 4)), (1, Field::span(3, 2))]);
    }
}
