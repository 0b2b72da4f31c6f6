use arithmetic::{U64Ext as _, UsizeExt as _};
use ethereum_types::H256;
use hashing::ZERO_HASHES;
use itertools::Itertools as _;

use crate::{
    consts::{BYTES_PER_CHUNK, U64S_PER_CHUNK},
    porcelain::SszHash,
};

/// A Merkle tree of fixed depth that keeps every nonzero node in memory.
///
/// Subtrees to the right of the last leaf are never materialized.
/// Their roots are taken from [`ZERO_HASHES`].
#[derive(Clone, Default, Debug)]
pub struct MerkleTree {
    // `layers[0]` contains the leaves. `layers[depth]` contains the root if there are any leaves.
    layers: Vec<Vec<H256>>,
    depth: u8,
}

impl MerkleTree {
    #[must_use]
    pub fn new(depth: u8) -> Self {
        Self {
            layers: vec![vec![]; usize::from(depth) + 1],
            depth,
        }
    }

    #[must_use]
    pub const fn depth(&self) -> u8 {
        self.depth
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.layers[0].len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers[0].is_empty()
    }

    pub fn push(&mut self, leaf: H256) {
        let mut index = self.len();
        let mut node = leaf;

        self.layers[0].push(leaf);

        for height in 0..usize::from(self.depth) {
            let sibling = if index.is_odd() {
                self.layers[height][index - 1]
            } else {
                ZERO_HASHES[height]
            };

            node = if index.is_odd() {
                hashing::hash_256_256(sibling, node)
            } else {
                hashing::hash_256_256(node, sibling)
            };

            index /= 2;

            let parents = &mut self.layers[height + 1];

            if index < parents.len() {
                parents[index] = node;
            } else {
                parents.push(node);
            }
        }
    }

    #[must_use]
    pub fn root(&self) -> H256 {
        self.layers[usize::from(self.depth)]
            .first()
            .copied()
            .unwrap_or(ZERO_HASHES[usize::from(self.depth)])
    }

    /// Returns the sibling hashes on the path from the leaf at `index` to the root.
    ///
    /// The proof is ordered bottom-up and has exactly `depth` elements.
    #[must_use]
    pub fn proof(&self, index: usize) -> Vec<H256> {
        (0..usize::from(self.depth))
            .map(|height| {
                let sibling_index = (index >> height) ^ 1;

                self.layers[height]
                    .get(sibling_index)
                    .copied()
                    .unwrap_or(ZERO_HASHES[height])
            })
            .collect()
    }
}

/// Merkleizes `chunks` into a tree of the given depth, padding with zero chunks on the right.
///
/// # Panics
///
/// Panics if there are more chunks than fit in a tree of `depth`.
#[must_use]
pub fn merkleize_chunks(chunks: impl IntoIterator<Item = H256>, depth: u8) -> H256 {
    let mut layer = chunks.into_iter().collect_vec();

    if layer.is_empty() {
        return ZERO_HASHES[usize::from(depth)];
    }

    assert!(
        u32::from(depth) >= usize::BITS || layer.len() <= 1 << depth,
        "{} chunks do not fit in a Merkle tree of depth {depth}",
        layer.len(),
    );

    for height in 0..usize::from(depth) {
        if layer.len().is_odd() {
            layer.push(ZERO_HASHES[height]);
        }

        layer = layer
            .chunks_exact(2)
            .map(|pair| hashing::hash_256_256(pair[0], pair[1]))
            .collect();
    }

    layer[0]
}

/// Computes the root of a container from the roots of its fields.
#[must_use]
pub fn hash_fields(field_roots: &[H256]) -> H256 {
    merkleize_chunks(field_roots.iter().copied(), field_roots.len().ilog2_ceil())
}

/// Computes the root of a fixed-length byte vector such as a public key or a signature.
#[must_use]
pub fn merkleize_bytes(bytes: &[u8]) -> H256 {
    let chunk_count = bytes.len().div_ceil(BYTES_PER_CHUNK);
    merkleize_chunks(pack_bytes(bytes), chunk_count.ilog2_ceil())
}

#[must_use]
pub fn mix_in_length(root: H256, length: usize) -> H256 {
    let length = u64::try_from(length).expect("lengths of SSZ lists fit in u64");
    hashing::hash_256_256(root, length.hash_tree_root())
}

/// Root of `Vector[T, length]` where `T` is a composite type.
#[must_use]
pub fn root_vector_root<T: SszHash>(elements: impl IntoIterator<Item = T>, length: u64) -> H256 {
    merkleize_chunks(
        elements.into_iter().map(|element| element.hash_tree_root()),
        length.ilog2_ceil(),
    )
}

/// Root of `List[T, limit]` where `T` is a composite type.
#[must_use]
pub fn root_list_root<T: SszHash>(elements: impl IntoIterator<Item = T>, limit: u64) -> H256 {
    let roots = elements
        .into_iter()
        .map(|element| element.hash_tree_root())
        .collect_vec();

    let length = roots.len();

    mix_in_length(merkleize_chunks(roots, limit.ilog2_ceil()), length)
}

/// Root of `Vector[uint64, length]`. Elements are packed 4 to a chunk.
#[must_use]
pub fn packed_u64_vector_root(values: impl IntoIterator<Item = u64>, length: u64) -> H256 {
    merkleize_chunks(pack_u64s(values), chunk_count_for_u64s(length).ilog2_ceil())
}

/// Root of `List[uint64, limit]`. Elements are packed 4 to a chunk.
#[must_use]
pub fn packed_u64_list_root(values: impl IntoIterator<Item = u64>, limit: u64) -> H256 {
    let values = values.into_iter().collect_vec();
    let length = values.len();
    let root = merkleize_chunks(pack_u64s(values), chunk_count_for_u64s(limit).ilog2_ceil());
    mix_in_length(root, length)
}

pub(crate) fn pack_bytes(bytes: &[u8]) -> impl Iterator<Item = H256> + '_ {
    bytes.chunks(BYTES_PER_CHUNK).map(|bytes| {
        let mut chunk = H256::zero();
        chunk[..bytes.len()].copy_from_slice(bytes);
        chunk
    })
}

fn pack_u64s(values: impl IntoIterator<Item = u64>) -> impl Iterator<Item = H256> {
    values
        .into_iter()
        .chunks(U64S_PER_CHUNK)
        .into_iter()
        .map(|values| {
            let mut chunk = H256::zero();

            for (value, bytes) in values.zip(chunk.as_bytes_mut().chunks_exact_mut(8)) {
                bytes.copy_from_slice(&value.to_le_bytes());
            }

            chunk
        })
        .collect_vec()
        .into_iter()
}

const fn chunk_count_for_u64s(count: u64) -> u64 {
    count.div_ceil(U64S_PER_CHUNK as u64)
}
