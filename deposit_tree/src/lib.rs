//! The deposit contract's incremental Merkle tree.
//!
//! Roots produced here are the ones that end up in `Eth1Data.deposit_root`.
//! Proofs produced here are valid under `is_valid_merkle_branch` with a depth of
//! `DEPOSIT_CONTRACT_TREE_DEPTH + 1`, the extra level being the length mix-in.

use core::ops::Range;

use anyhow::{ensure, Result};
use itertools::Itertools as _;
use log::trace;
use ssz::{mix_in_length, MerkleTree, SszHash as _, H256};
use thiserror::Error;
use types::phase0::{
    consts::{DEPOSIT_CONTRACT_TREE_DEPTH, DEPOSIT_PROOF_LENGTH},
    containers::{Deposit, DepositData, Eth1Data},
    primitives::{DepositIndex, Eth1BlockHash},
};

const MAX_DEPOSITS: DepositIndex = 1 << DEPOSIT_CONTRACT_TREE_DEPTH;

#[derive(Clone, Debug)]
pub struct DepositTree {
    merkle_tree: MerkleTree,
    deposit_count: DepositIndex,
}

impl Default for DepositTree {
    fn default() -> Self {
        let depth = DEPOSIT_CONTRACT_TREE_DEPTH
            .try_into()
            .expect("deposit contract tree depth fits in u8");

        Self {
            merkle_tree: MerkleTree::new(depth),
            deposit_count: 0,
        }
    }
}

impl DepositTree {
    #[must_use]
    pub const fn deposit_count(&self) -> DepositIndex {
        self.deposit_count
    }

    /// Root of the tree with the deposit count mixed in.
    #[must_use]
    pub fn root(&self) -> H256 {
        mix_in_length(self.merkle_tree.root(), self.merkle_tree.len())
    }

    #[must_use]
    pub fn eth1_data(&self, block_hash: Eth1BlockHash) -> Eth1Data {
        Eth1Data {
            deposit_root: self.root(),
            deposit_count: self.deposit_count,
            block_hash,
        }
    }

    pub fn push(&mut self, index: DepositIndex, data: DepositData) -> Result<()> {
        trace!(
            "DepositTree::push (deposit_count: {}, index: {index}, data: {data:?})",
            self.deposit_count,
        );

        self.validate_index(index)?;

        self.merkle_tree.push(data.hash_tree_root());
        self.deposit_count += 1;

        Ok(())
    }

    pub fn push_and_compute_root(
        &mut self,
        index: DepositIndex,
        data: DepositData,
    ) -> Result<H256> {
        self.push(index, data)?;
        Ok(self.root())
    }

    /// Constructs a proof for the deposit at `index` against the current root.
    pub fn proof(&self, index: DepositIndex) -> Result<[H256; DEPOSIT_PROOF_LENGTH]> {
        ensure!(
            index < self.deposit_count,
            Error::IndexOutOfRange {
                index,
                deposit_count: self.deposit_count,
            },
        );

        let mut proof = [H256::zero(); DEPOSIT_PROOF_LENGTH];
        let (length_node, branch) = proof
            .split_last_mut()
            .expect("DEPOSIT_PROOF_LENGTH is nonzero");

        branch.copy_from_slice(&self.merkle_tree.proof(index.try_into()?));
        *length_node = self.deposit_count.hash_tree_root();

        Ok(proof)
    }

    /// Adds deposits with `indices` to the tree and constructs proofs for the ones in
    /// `proof_indices` against the resulting root.
    ///
    /// Deposits in a block must be proven against the root of the tree containing all deposits up
    /// to `Eth1Data.deposit_count`, which is why the proofs are constructed after adding all of
    /// them.
    pub fn extend_and_construct_proofs(
        &mut self,
        data: &[DepositData],
        indices: Range<DepositIndex>,
        proof_indices: Range<DepositIndex>,
    ) -> Result<Vec<Deposit>> {
        let index_count = indices.clone().count();

        ensure!(
            data.len() == index_count,
            Error::CountMismatch {
                data_count: data.len(),
                index_count,
            },
        );

        ensure!(
            indices.start <= proof_indices.start && proof_indices.end <= indices.end,
            Error::InvalidIndexRanges {
                deposit_indices: indices,
                proof_indices,
            },
        );

        for (index, data) in indices.clone().zip(data.iter().copied()) {
            self.push(index, data)?;
        }

        proof_indices
            .map(|index| {
                let position = usize::try_from(index - indices.start)?;

                Ok(Deposit {
                    proof: self.proof(index)?,
                    data: data[position],
                })
            })
            .try_collect()
    }

    fn validate_index(&self, index: DepositIndex) -> Result<()> {
        ensure!(index < MAX_DEPOSITS, Error::Full { index });

        let expected = self.deposit_count;
        let actual = index;

        ensure!(
            actual == expected,
            Error::UnexpectedIndex { expected, actual },
        );

        Ok(())
    }
}

#[derive(Debug, Error)]
enum Error {
    #[error("attempted to add deposit with index {index} to full deposit tree")]
    Full { index: DepositIndex },
    #[error("expected deposit with index {expected}, received deposit with index {actual}")]
    UnexpectedIndex {
        expected: DepositIndex,
        actual: DepositIndex,
    },
    #[error("deposit {index} is not in tree with {deposit_count} deposits")]
    IndexOutOfRange {
        index: DepositIndex,
        deposit_count: DepositIndex,
    },
    #[error(
        "index ranges are invalid \
         (deposit_indices: {deposit_indices:?}, proof_indices: {proof_indices:?})"
    )]
    InvalidIndexRanges {
        deposit_indices: Range<DepositIndex>,
        proof_indices: Range<DepositIndex>,
    },
    #[error(
        "deposit data count ({data_count}) does not match deposit index count ({index_count})"
    )]
    CountMismatch {
        data_count: usize,
        index_count: usize,
    },
}
