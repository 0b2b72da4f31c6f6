use ethereum_types::H256;
use once_cell::sync::Lazy;
use sha2::{Digest as _, Sha256};

/// Maximum depth of a Merkle tree hashed anywhere in the workspace.
///
/// `BeaconState.validators` has the deepest tree (`VALIDATOR_REGISTRY_LIMIT` = 2^40).
/// One extra level is needed for the length mix-in.
pub const MAX_DEPTH: usize = 64;

/// `ZERO_HASHES[depth]` is the root of a perfect binary tree of the given depth filled with
/// zero chunks.
pub static ZERO_HASHES: Lazy<[H256; MAX_DEPTH + 1]> = Lazy::new(|| {
    let mut hashes = [H256::zero(); MAX_DEPTH + 1];

    for depth in 1..=MAX_DEPTH {
        hashes[depth] = hash_256_256(hashes[depth - 1], hashes[depth - 1]);
    }

    hashes
});

#[inline]
#[must_use]
pub fn hash(bytes: impl AsRef<[u8]>) -> H256 {
    H256(Sha256::digest(bytes).into())
}

#[inline]
#[must_use]
pub fn hash_256(value: H256) -> H256 {
    hash(value)
}

#[inline]
#[must_use]
pub fn hash_256_256(left: H256, right: H256) -> H256 {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    H256(hasher.finalize().into())
}

#[inline]
#[must_use]
pub fn hash_256_64(value: H256, number: u64) -> H256 {
    let mut hasher = Sha256::new();
    hasher.update(value);
    hasher.update(number.to_le_bytes());
    H256(hasher.finalize().into())
}

/// Used by `get_seed`: `hash(domain_type + uint_to_bytes(epoch) + mix)`.
#[inline]
#[must_use]
pub fn hash_32_64_256(prefix: [u8; 4], number: u64, value: H256) -> H256 {
    let mut hasher = Sha256::new();
    hasher.update(prefix);
    hasher.update(number.to_le_bytes());
    hasher.update(value);
    H256(hasher.finalize().into())
}

/// Used by `compute_shuffled_index`: `hash(seed + uint_to_bytes(round) [+ uint_to_bytes(position)])`.
#[inline]
#[must_use]
pub fn hash_256_8_32(seed: H256, round: u8, position: Option<u32>) -> H256 {
    let mut hasher = Sha256::new();
    hasher.update(seed);
    hasher.update([round]);

    if let Some(position) = position {
        hasher.update(position.to_le_bytes());
    }

    H256(hasher.finalize().into())
}
