// ============================================================================
// SBF-Safe 128-bit Accumulator Type
// ============================================================================
//
// Rust 1.77 moved u128 alignment from 8 to 16 bytes on x86_64 while SBF stays
// at 8. Slab structs hold fixed-point accumulators, so a raw u128 field would
// give host-side tests a different layout than the on-chain program.
//
// U128 stores the value as [u64; 2] (little-endian limbs) to keep 8-byte
// alignment everywhere and stay `Pod`.

use bytemuck::{Pod, Zeroable};

#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct U128([u64; 2]);

impl U128 {
    #[inline]
    pub const fn new(val: u128) -> Self {
        Self([val as u64, (val >> 64) as u64])
    }

    #[inline]
    pub const fn get(self) -> u128 {
        ((self.0[1] as u128) << 64) | (self.0[0] as u128)
    }
}

impl core::fmt::Debug for U128 {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limbs_hold_high_bits() {
        let v = (7u128 << 64) | 9;
        let w = U128::new(v);
        assert_eq!(w.get(), v);
        assert_eq!(core::mem::align_of::<U128>(), 8);
        assert_eq!(core::mem::size_of::<U128>(), 16);
    }

    #[test]
    fn zeroed_reads_as_zero() {
        let w: U128 = bytemuck::Zeroable::zeroed();
        assert_eq!(w.get(), 0);
        assert_eq!(U128::new(u128::MAX).get(), u128::MAX);
    }
}
