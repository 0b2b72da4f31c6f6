use core::fmt::{Debug, Formatter, Result as FmtResult};

use arithmetic::U64Ext as _;
use bitvec::{bitbox, boxed::BitBox, vec::BitVec};
use derive_more::{Deref, DerefMut};
use ethereum_types::H256;

use crate::{
    consts::BITS_PER_CHUNK,
    error::ReadError,
    merkle_tree::{self, mix_in_length},
    porcelain::SszHash,
};

/// A `Bitlist[N]`. The length is fixed when the list is constructed and never exceeds `N`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Default, Deref, DerefMut)]
pub struct BitList<const N: usize> {
    // We rely on `bitvec::order::Lsb0` being the default bit ordering to match SSZ.
    // `BitBox` cannot grow, so `DerefMut` only allows flipping existing bits.
    bits: BitBox<u8>,
}

impl<const N: usize> Debug for BitList<N> {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        formatter.write_str("0b")?;

        for bit in self.bits.iter().by_vals() {
            formatter.write_str(if bit { "1" } else { "0" })?;
        }

        Ok(())
    }
}

impl<const N: usize> SszHash for BitList<N> {
    fn hash_tree_root(&self) -> H256 {
        let chunk_count = (N as u64).div_ceil(BITS_PER_CHUNK as u64);
        // Bits past the length in the last byte are unspecified.
        let mut bytes = self.bits.as_raw_slice().to_vec();

        if let Some(last) = bytes.last_mut() {
            let used_bits = self.bits.len() % 8;

            if used_bits != 0 {
                *last &= (1 << used_bits) - 1;
            }
        }

        let root = merkle_tree::merkleize_chunks(
            merkle_tree::pack_bytes(bytes.as_slice()),
            chunk_count.ilog2_ceil(),
        );

        mix_in_length(root, self.bits.len())
    }
}

impl<const N: usize> BitList<N> {
    /// # Panics
    ///
    /// Panics if `length` exceeds `N`.
    #[must_use]
    pub fn new(value: bool, length: usize) -> Self {
        assert!(length <= N, "bit list of length {length} exceeds maximum of {N}");

        Self {
            bits: bitbox![_, _; u8::from(value); length],
        }
    }

    /// # Panics
    ///
    /// Panics if `length` exceeds `N`.
    #[must_use]
    pub fn with_length(length: usize) -> Self {
        Self::new(false, length)
    }

    pub fn try_from_iter(bits: impl IntoIterator<Item = bool>) -> Result<Self, ReadError> {
        let bits = bits.into_iter().collect::<BitVec<u8>>().into_boxed_bitslice();
        let maximum = N;
        let actual = bits.len();

        if actual > maximum {
            return Err(ReadError::BitListTooLong { maximum, actual });
        }

        Ok(Self { bits })
    }

    pub fn any_set(&self) -> bool {
        self.bits.any()
    }

    /// Returns the positions of set bits in ascending order.
    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits.iter_ones()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ones_are_ascending_positions() {
        let mut bit_list = BitList::<16>::with_length(10);

        bit_list.set(7, true);
        bit_list.set(2, true);

        assert_eq!(bit_list.ones().collect::<Vec<_>>(), [2, 7]);
        assert_eq!(bit_list.count_ones(), 2);
        assert!(bit_list.any_set());
    }

    #[test]
    fn root_mixes_in_length_not_capacity() {
        let mut bit_list = BitList::<2048>::with_length(3);
        bit_list.set(0, true);
        bit_list.set(2, true);

        let mut chunk = H256::zero();
        chunk.as_bytes_mut()[0] = 0b101;

        assert_eq!(
            bit_list.hash_tree_root(),
            mix_in_length(merkle_tree::merkleize_chunks([chunk], 3), 3),
        );
    }

    #[test]
    fn root_ignores_unused_bits_of_full_list() {
        let full = BitList::<2048>::new(true, 3);
        let explicit = BitList::<2048>::try_from_iter([true, true, true])
            .expect("3 bits fit in a list of 2048");

        assert_eq!(full.hash_tree_root(), explicit.hash_tree_root());
    }

    #[test]
    fn rejects_bits_past_the_maximum_length() {
        assert_eq!(
            BitList::<4>::try_from_iter([false; 5]),
            Err(ReadError::BitListTooLong {
                maximum: 4,
                actual: 5,
            }),
        );
    }

    #[test]
    #[should_panic = "exceeds maximum"]
    fn new_panics_past_the_maximum_length() {
        let _ = BitList::<4>::new(true, 5);
    }

    #[test]
    fn debug_lists_bits_in_order() {
        let bit_list = BitList::<8>::try_from_iter([true, false, false, true])
            .expect("4 bits fit in a list of 8");

        assert_eq!(format!("{bit_list:?}"), "0b1001");
    }
}
