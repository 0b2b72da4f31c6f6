use derive_more::derive::AsRef;
use fixed_hash::construct_fixed_hash;
use impl_serde::impl_fixed_hash_serde;
use ssz::{SszHash, H256};

use crate::{consts::PUBLIC_KEY_SIZE, public_key::PublicKey};

construct_fixed_hash! {
    #[derive(AsRef)]
    pub struct PublicKeyBytes(PUBLIC_KEY_SIZE);
}

impl_fixed_hash_serde!(PublicKeyBytes, PUBLIC_KEY_SIZE);

impl SszHash for PublicKeyBytes {
    #[inline]
    fn hash_tree_root(&self) -> H256 {
        ssz::merkleize_bytes(self.as_bytes())
    }
}

impl From<PublicKey> for PublicKeyBytes {
    #[inline]
    fn from(public_key: PublicKey) -> Self {
        Self(public_key.as_raw().compress())
    }
}
