use bls::SignatureBytes;
use ssz::{
    hash_fields, packed_u64_list_root, packed_u64_vector_root, root_list_root, root_vector_root,
    SszHash, H256,
};

use crate::{
    collections::VectorExt as _,
    phase0::{
        beacon_state::BeaconState,
        consts::{
            DEPOSIT_PROOF_LENGTH, HISTORICAL_ROOTS_LIMIT, MAX_ATTESTATIONS, MAX_ATTESTER_SLASHINGS,
            MAX_DEPOSITS, MAX_PROPOSER_SLASHINGS, MAX_VALIDATORS_PER_COMMITTEE,
            MAX_VOLUNTARY_EXITS, VALIDATOR_REGISTRY_LIMIT,
        },
        containers::{
            Attestation, AttestationData, AttesterSlashing, BeaconBlock, BeaconBlockBody,
            BeaconBlockHeader, Checkpoint, Deposit, DepositData, DepositMessage, Eth1Data, Fork,
            ForkData, HistoricalBatch, IndexedAttestation, PendingAttestation, ProposerSlashing,
            SignedBeaconBlock, SignedBeaconBlockHeader, SignedVoluntaryExit, SigningData,
            Validator, VoluntaryExit,
        },
    },
    preset::Preset,
};

impl BeaconBlock {
    #[must_use]
    pub fn to_header(&self) -> BeaconBlockHeader {
        BeaconBlockHeader {
            slot: self.slot,
            parent_root: self.parent_root,
            state_root: self.state_root,
            body_root: self.body.hash_tree_root(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn with_signature(self, signature: SignatureBytes) -> SignedBeaconBlock {
        SignedBeaconBlock {
            message: self,
            signature,
        }
    }
}

impl BeaconBlockHeader {
    #[inline]
    #[must_use]
    pub const fn with_signature(self, signature: SignatureBytes) -> SignedBeaconBlockHeader {
        SignedBeaconBlockHeader {
            message: self,
            signature,
        }
    }
}

impl From<DepositData> for DepositMessage {
    #[inline]
    fn from(deposit_data: DepositData) -> Self {
        let DepositData {
            pubkey,
            withdrawal_credentials,
            amount,
            ..
        } = deposit_data;

        Self {
            pubkey,
            withdrawal_credentials,
            amount,
        }
    }
}

// Containers are hashed by Merkleizing the roots of their fields in declaration order.

impl SszHash for Attestation {
    fn hash_tree_root(&self) -> H256 {
        hash_fields(&[
            self.aggregation_bits.hash_tree_root(),
            self.data.hash_tree_root(),
            self.signature.hash_tree_root(),
        ])
    }
}

impl SszHash for AttestationData {
    fn hash_tree_root(&self) -> H256 {
        hash_fields(&[
            self.slot.hash_tree_root(),
            self.index.hash_tree_root(),
            self.beacon_block_root,
            self.source.hash_tree_root(),
            self.target.hash_tree_root(),
        ])
    }
}

impl SszHash for AttesterSlashing {
    fn hash_tree_root(&self) -> H256 {
        hash_fields(&[
            self.attestation_1.hash_tree_root(),
            self.attestation_2.hash_tree_root(),
        ])
    }
}

impl SszHash for BeaconBlock {
    fn hash_tree_root(&self) -> H256 {
        self.to_header().hash_tree_root()
    }
}

impl SszHash for BeaconBlockBody {
    fn hash_tree_root(&self) -> H256 {
        hash_fields(&[
            self.randao_reveal.hash_tree_root(),
            self.eth1_data.hash_tree_root(),
            self.graffiti,
            root_list_root(&self.proposer_slashings, list_limit(MAX_PROPOSER_SLASHINGS)),
            root_list_root(&self.attester_slashings, list_limit(MAX_ATTESTER_SLASHINGS)),
            root_list_root(&self.attestations, list_limit(MAX_ATTESTATIONS)),
            root_list_root(&self.deposits, list_limit(MAX_DEPOSITS)),
            root_list_root(&self.voluntary_exits, list_limit(MAX_VOLUNTARY_EXITS)),
        ])
    }
}

impl SszHash for BeaconBlockHeader {
    fn hash_tree_root(&self) -> H256 {
        hash_fields(&[
            self.slot.hash_tree_root(),
            self.parent_root,
            self.state_root,
            self.body_root,
        ])
    }
}

impl SszHash for Checkpoint {
    fn hash_tree_root(&self) -> H256 {
        hash_fields(&[self.epoch.hash_tree_root(), self.root])
    }
}

impl SszHash for Deposit {
    fn hash_tree_root(&self) -> H256 {
        hash_fields(&[
            root_vector_root(&self.proof, list_limit(DEPOSIT_PROOF_LENGTH)),
            self.data.hash_tree_root(),
        ])
    }
}

impl SszHash for DepositData {
    fn hash_tree_root(&self) -> H256 {
        hash_fields(&[
            self.pubkey.hash_tree_root(),
            self.withdrawal_credentials,
            self.amount.hash_tree_root(),
            self.signature.hash_tree_root(),
        ])
    }
}

impl SszHash for DepositMessage {
    fn hash_tree_root(&self) -> H256 {
        hash_fields(&[
            self.pubkey.hash_tree_root(),
            self.withdrawal_credentials,
            self.amount.hash_tree_root(),
        ])
    }
}

impl SszHash for Eth1Data {
    fn hash_tree_root(&self) -> H256 {
        hash_fields(&[
            self.deposit_root,
            self.deposit_count.hash_tree_root(),
            self.block_hash,
        ])
    }
}

impl SszHash for Fork {
    fn hash_tree_root(&self) -> H256 {
        hash_fields(&[
            self.previous_version.hash_tree_root(),
            self.current_version.hash_tree_root(),
            self.epoch.hash_tree_root(),
        ])
    }
}

impl SszHash for ForkData {
    fn hash_tree_root(&self) -> H256 {
        hash_fields(&[
            self.current_version.hash_tree_root(),
            self.genesis_validators_root,
        ])
    }
}

impl SszHash for HistoricalBatch {
    fn hash_tree_root(&self) -> H256 {
        hash_fields(&[
            root_vector_root(&self.block_roots, self.block_roots.len_u64()),
            root_vector_root(&self.state_roots, self.state_roots.len_u64()),
        ])
    }
}

impl SszHash for IndexedAttestation {
    fn hash_tree_root(&self) -> H256 {
        hash_fields(&[
            packed_u64_list_root(
                self.attesting_indices.iter().copied(),
                list_limit(MAX_VALIDATORS_PER_COMMITTEE),
            ),
            self.data.hash_tree_root(),
            self.signature.hash_tree_root(),
        ])
    }
}

impl SszHash for PendingAttestation {
    fn hash_tree_root(&self) -> H256 {
        hash_fields(&[
            self.aggregation_bits.hash_tree_root(),
            self.data.hash_tree_root(),
            self.inclusion_delay.hash_tree_root(),
            self.proposer_index.hash_tree_root(),
        ])
    }
}

impl SszHash for ProposerSlashing {
    fn hash_tree_root(&self) -> H256 {
        hash_fields(&[
            self.proposer_index.hash_tree_root(),
            self.signed_header_1.hash_tree_root(),
            self.signed_header_2.hash_tree_root(),
        ])
    }
}

impl SszHash for SignedBeaconBlock {
    fn hash_tree_root(&self) -> H256 {
        hash_fields(&[
            self.message.hash_tree_root(),
            self.signature.hash_tree_root(),
        ])
    }
}

impl SszHash for SignedBeaconBlockHeader {
    fn hash_tree_root(&self) -> H256 {
        hash_fields(&[
            self.message.hash_tree_root(),
            self.signature.hash_tree_root(),
        ])
    }
}

impl SszHash for SignedVoluntaryExit {
    fn hash_tree_root(&self) -> H256 {
        hash_fields(&[
            self.message.hash_tree_root(),
            self.signature.hash_tree_root(),
        ])
    }
}

impl SszHash for SigningData {
    fn hash_tree_root(&self) -> H256 {
        hash_fields(&[self.object_root, self.domain])
    }
}

impl SszHash for Validator {
    fn hash_tree_root(&self) -> H256 {
        hash_fields(&[
            self.pubkey.hash_tree_root(),
            self.withdrawal_credentials,
            self.effective_balance.hash_tree_root(),
            self.slashed.hash_tree_root(),
            self.activation_eligibility_epoch.hash_tree_root(),
            self.activation_epoch.hash_tree_root(),
            self.exit_epoch.hash_tree_root(),
            self.withdrawable_epoch.hash_tree_root(),
        ])
    }
}

impl SszHash for VoluntaryExit {
    fn hash_tree_root(&self) -> H256 {
        hash_fields(&[
            self.epoch.hash_tree_root(),
            self.validator_index.hash_tree_root(),
        ])
    }
}

impl<P: Preset> SszHash for BeaconState<P> {
    fn hash_tree_root(&self) -> H256 {
        hash_fields(&[
            // > Versioning
            self.genesis_time.hash_tree_root(),
            self.genesis_validators_root,
            self.slot.hash_tree_root(),
            self.fork.hash_tree_root(),
            // > History
            self.latest_block_header.hash_tree_root(),
            root_vector_root(&self.block_roots, P::SLOTS_PER_HISTORICAL_ROOT.get()),
            root_vector_root(&self.state_roots, P::SLOTS_PER_HISTORICAL_ROOT.get()),
            root_list_root(&self.historical_roots, HISTORICAL_ROOTS_LIMIT),
            // > Eth1
            self.eth1_data.hash_tree_root(),
            root_list_root(&self.eth1_data_votes, P::SLOTS_PER_ETH1_VOTING_PERIOD.get()),
            self.eth1_deposit_index.hash_tree_root(),
            // > Registry
            root_list_root(&self.validators, VALIDATOR_REGISTRY_LIMIT),
            packed_u64_list_root(self.balances.iter().copied(), VALIDATOR_REGISTRY_LIMIT),
            // > Randomness
            root_vector_root(&self.randao_mixes, P::EPOCHS_PER_HISTORICAL_VECTOR.get()),
            // > Slashings
            packed_u64_vector_root(
                self.slashings.iter().copied(),
                P::EPOCHS_PER_SLASHINGS_VECTOR.get(),
            ),
            // > Attestations
            root_list_root(
                &self.previous_epoch_attestations,
                P::MAX_ATTESTATIONS_PER_EPOCH,
            ),
            root_list_root(&self.current_epoch_attestations, P::MAX_ATTESTATIONS_PER_EPOCH),
            // > Finality
            self.justification_bits.hash_tree_root(),
            self.previous_justified_checkpoint.hash_tree_root(),
            self.current_justified_checkpoint.hash_tree_root(),
            self.finalized_checkpoint.hash_tree_root(),
        ])
    }
}

const fn list_limit(limit: usize) -> u64 {
    limit as u64
}
