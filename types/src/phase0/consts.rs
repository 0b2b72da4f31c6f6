use core::num::NonZeroU64;

use hex_literal::hex;
use nonzero_ext::nonzero;

use crate::phase0::primitives::{DomainType, Epoch, Slot, H32};

pub const BASE_REWARDS_PER_EPOCH: NonZeroU64 = nonzero!(4_u64);
pub const BLS_WITHDRAWAL_PREFIX: &[u8] = &hex!("00");
pub const DEPOSIT_CONTRACT_TREE_DEPTH: usize = 32;
pub const DOMAIN_BEACON_ATTESTER: DomainType = H32(hex!("01000000"));
pub const DOMAIN_BEACON_PROPOSER: DomainType = H32(hex!("00000000"));
pub const DOMAIN_DEPOSIT: DomainType = H32(hex!("03000000"));
pub const DOMAIN_RANDAO: DomainType = H32(hex!("02000000"));
pub const DOMAIN_VOLUNTARY_EXIT: DomainType = H32(hex!("04000000"));
pub const FAR_FUTURE_EPOCH: Epoch = Epoch::MAX;
pub const GENESIS_EPOCH: Epoch = 0;
pub const GENESIS_SLOT: Slot = 0;
pub const JUSTIFICATION_BITS_LENGTH: usize = 4;

// > The branch includes the length mix-in of the deposit list.
pub const DEPOSIT_PROOF_LENGTH: usize = DEPOSIT_CONTRACT_TREE_DEPTH + 1;

// List limits that are the same in every preset.
pub const HISTORICAL_ROOTS_LIMIT: u64 = 1 << 24;
pub const MAX_ATTESTATIONS: usize = 128;
pub const MAX_ATTESTER_SLASHINGS: usize = 1;
pub const MAX_DEPOSITS: usize = 16;
pub const MAX_PROPOSER_SLASHINGS: usize = 16;
pub const MAX_VALIDATORS_PER_COMMITTEE: usize = 2048;
pub const MAX_VOLUNTARY_EXITS: usize = 16;
pub const VALIDATOR_REGISTRY_LIMIT: u64 = 1 << 40;
