//! Hash tree roots as defined in the [SSZ specification].
//!
//! Only Merkleization is implemented. Nothing in the consensus core needs the byte encoding.
//!
//! [SSZ specification]: https://github.com/ethereum/consensus-specs/blob/v0.9.4/specs/simple-serialize.md#merkleization

pub use ethereum_types::{H256, H32};
pub use hashing;

pub use crate::{
    bit_list::BitList,
    bit_vector::BitVector,
    consts::{BITS_PER_BYTE, BYTES_PER_CHUNK},
    contiguous_list::ContiguousList,
    error::ReadError,
    merkle_tree::{
        hash_fields, merkleize_bytes, merkleize_chunks, mix_in_length, packed_u64_list_root,
        packed_u64_vector_root, root_list_root, root_vector_root, MerkleTree,
    },
    porcelain::SszHash,
};

mod basic;
mod bit_list;
mod bit_vector;
mod consts;
mod contiguous_list;
mod error;
mod merkle_tree;
mod porcelain;
