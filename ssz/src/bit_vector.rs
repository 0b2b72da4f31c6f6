use core::fmt::{Debug, Formatter, Result as FmtResult};

use bitvec::{array::BitArray, order::Lsb0};
use derive_more::{Deref, DerefMut};
use ethereum_types::H256;

/// A `Bitvector[N]` for `N <= 8`, which is all the consensus core needs (`justification_bits`).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Deref, DerefMut)]
pub struct BitVector<const N: usize> {
    bits: BitArray<[u8; 1], Lsb0>,
}

impl<const N: usize> Debug for BitVector<N> {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        formatter.write_str("0b")?;

        for bit in self.bits[..N].iter().by_vals() {
            formatter.write_str(if bit { "1" } else { "0" })?;
        }

        Ok(())
    }
}

impl<const N: usize> BitVector<N> {
    const VALID_LENGTH: () = assert!(0 < N && N <= 8);

    /// Shifts every bit towards higher indices, discarding the highest one.
    pub fn shift_up_by_1(&mut self) {
        let () = Self::VALID_LENGTH;
        let mask = u8::MAX >> (8 - N);
        let byte = &mut self.bits.as_raw_mut_slice()[0];
        *byte = (*byte << 1) & mask;
    }

    #[must_use]
    pub fn all_set(&self, range: core::ops::Range<usize>) -> bool {
        self.bits[range].all()
    }

    #[must_use]
    pub fn hash_tree_root(&self) -> H256 {
        let () = Self::VALID_LENGTH;
        let mut chunk = H256::zero();
        chunk.as_bytes_mut()[0] = self.bits.as_raw_slice()[0];
        chunk
    }
}
