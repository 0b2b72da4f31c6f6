use ethereum_types::{H256, H32};

use crate::porcelain::SszHash;

impl SszHash for u64 {
    #[inline]
    fn hash_tree_root(&self) -> H256 {
        let mut chunk = H256::zero();
        chunk[..size_of::<Self>()].copy_from_slice(&self.to_le_bytes());
        chunk
    }
}

impl SszHash for bool {
    #[inline]
    fn hash_tree_root(&self) -> H256 {
        let mut chunk = H256::zero();
        chunk.as_bytes_mut()[0] = (*self).into();
        chunk
    }
}

impl SszHash for H32 {
    #[inline]
    fn hash_tree_root(&self) -> H256 {
        let mut chunk = H256::zero();
        chunk[..Self::len_bytes()].copy_from_slice(self.as_bytes());
        chunk
    }
}

impl SszHash for H256 {
    #[inline]
    fn hash_tree_root(&self) -> H256 {
        *self
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn u64_is_little_endian_and_padded() {
        assert_eq!(
            0x0102_u64.hash_tree_root(),
            H256(hex!("0201000000000000000000000000000000000000000000000000000000000000")),
        );
    }

    #[test]
    fn bytes4_are_left_aligned() {
        assert_eq!(
            H32(hex!("01020304")).hash_tree_root(),
            H256(hex!("0102030400000000000000000000000000000000000000000000000000000000")),
        );
    }

    #[test]
    fn bool_occupies_first_byte() {
        assert_eq!(false.hash_tree_root(), H256::zero());
        assert_eq!(true.hash_tree_root().as_bytes()[0], 1);
    }
}
