use anyhow::{ensure, Result};
use arithmetic::U64Ext as _;
use bls::SignatureBytes;
use deposit_tree::DepositTree;
use helper_functions::accessors;
use log::debug;
use ssz::{root_list_root, SszHash as _};
use thiserror::Error;
use types::{
    collections::{RandaoMixes, VectorExt as _},
    config::Config,
    nonstandard::ErrorCategory,
    phase0::{
        beacon_state::BeaconState,
        consts::{GENESIS_EPOCH, VALIDATOR_REGISTRY_LIMIT},
        containers::{
            BeaconBlock, BeaconBlockBody, BeaconBlockHeader, DepositData, Fork, SignedBeaconBlock,
        },
        primitives::{DepositIndex, Eth1BlockHash, UnixSeconds},
    },
    preset::Preset,
};

/// Builds a genesis state one deposit at a time.
///
/// Equivalent to `initialize_beacon_state_from_eth1` called with all deposits at once,
/// but usable while deposits are still being observed.
pub struct Incremental<'config, P: Preset> {
    config: &'config Config,
    beacon_state: BeaconState<P>,
    deposit_tree: DepositTree,
}

impl<'config, P: Preset> Incremental<'config, P> {
    #[must_use]
    pub fn new(config: &'config Config) -> Self {
        let version = config.genesis_fork_version;

        let fork = Fork {
            previous_version: version,
            current_version: version,
            epoch: GENESIS_EPOCH,
        };

        let latest_block_header = BeaconBlockHeader {
            body_root: BeaconBlockBody::default().hash_tree_root(),
            ..BeaconBlockHeader::default()
        };

        let beacon_state = BeaconState {
            fork,
            latest_block_header,
            ..BeaconState::default()
        };

        Self {
            config,
            beacon_state,
            deposit_tree: DepositTree::default(),
        }
    }

    pub fn set_eth1_timestamp(&mut self, eth1_timestamp: UnixSeconds) {
        self.beacon_state.genesis_time = eth1_timestamp + self.config.genesis_delay;
    }

    pub fn add_deposit_data(
        &mut self,
        deposit_data: DepositData,
        deposit_index: DepositIndex,
    ) -> Result<()> {
        let state = &mut self.beacon_state;

        state.eth1_data.deposit_root = self
            .deposit_tree
            .push_and_compute_root(deposit_index, deposit_data)?;

        state.eth1_data.deposit_count = self.deposit_tree.deposit_count();

        // Proofs are not checked here. The deposit tree is built from the same data.
        transition_functions::process_deposit_data(self.config, state, deposit_data)?;

        state.eth1_deposit_index += 1;

        // > Process activations
        let Some(validator_index) = accessors::index_of_public_key(state, &deposit_data.pubkey)
        else {
            return Ok(());
        };

        let balance = *state.balances.get_at(validator_index)?;
        let validator = state.validators.get_mut_at(validator_index)?;

        validator.effective_balance = balance
            .prev_multiple_of(P::EFFECTIVE_BALANCE_INCREMENT)
            .min(P::MAX_EFFECTIVE_BALANCE);

        if validator.effective_balance == P::MAX_EFFECTIVE_BALANCE {
            validator.activation_eligibility_epoch = GENESIS_EPOCH;
            validator.activation_epoch = GENESIS_EPOCH;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        validate_genesis_state(self.config, &self.beacon_state)
    }

    #[must_use]
    pub fn finish(self, eth1_block_hash: Eth1BlockHash) -> (BeaconState<P>, DepositTree) {
        let Self {
            mut beacon_state,
            deposit_tree,
            ..
        } = self;

        beacon_state.eth1_data.block_hash = eth1_block_hash;
        beacon_state.randao_mixes =
            RandaoMixes::repeat(eth1_block_hash, P::EPOCHS_PER_HISTORICAL_VECTOR.get());

        // > Set genesis validators root for domain separation and chain versioning
        beacon_state.genesis_validators_root =
            root_list_root(&beacon_state.validators, VALIDATOR_REGISTRY_LIMIT);

        debug!(
            "genesis state constructed (genesis_time: {}, validator count: {})",
            beacon_state.genesis_time,
            beacon_state.validators.len(),
        );

        (beacon_state, deposit_tree)
    }
}

/// The genesis block commits to the genesis state and is never signed.
#[must_use]
pub fn beacon_block<P: Preset>(genesis_state: &BeaconState<P>) -> SignedBeaconBlock {
    // `BeaconBlock.body.eth1_data` is deliberately left empty.
    BeaconBlock {
        state_root: genesis_state.hash_tree_root(),
        ..BeaconBlock::default()
    }
    .with_signature(SignatureBytes::empty())
}

pub fn validate_genesis_state<P: Preset>(config: &Config, state: &BeaconState<P>) -> Result<()> {
    let minimum_genesis_time = config.min_genesis_time;
    let actual_genesis_time = state.genesis_time;

    ensure!(
        minimum_genesis_time <= actual_genesis_time,
        Error::TooEarly {
            minimum_genesis_time,
            actual_genesis_time,
        },
    );

    let minimum_validator_count = config.min_genesis_active_validator_count;
    let actual_validator_count = accessors::active_validator_count(state, GENESIS_EPOCH);

    ensure!(
        minimum_validator_count <= actual_validator_count,
        Error::NotEnoughActiveValidators {
            minimum_validator_count,
            actual_validator_count,
        },
    );

    Ok(())
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("too early ({actual_genesis_time} < {minimum_genesis_time})")]
    TooEarly {
        minimum_genesis_time: UnixSeconds,
        actual_genesis_time: UnixSeconds,
    },
    #[error("not enough active validators ({actual_validator_count} < {minimum_validator_count})")]
    NotEnoughActiveValidators {
        minimum_validator_count: u64,
        actual_validator_count: u64,
    },
}

impl Error {
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        ErrorCategory::PolicyViolation
    }
}

#[cfg(test)]
mod tests {
    use bls::{SecretKey, SecretKeyBytes};
    use helper_functions::{misc, signing::SignForAllForks as _};
    use types::{
        phase0::{containers::DepositMessage, primitives::H256},
        preset::Minimal,
    };

    use super::*;

    fn secret_key(byte: u8) -> SecretKey {
        SecretKeyBytes::from([byte; 32])
            .try_into()
            .expect("bytes encode a valid secret key")
    }

    fn deposit_data(config: &Config, secret_key: &SecretKey, amount: u64) -> DepositData {
        let pubkey = secret_key.to_public_key().into();
        let withdrawal_credentials = misc::bls_withdrawal_credentials(pubkey);

        let signature = DepositMessage {
            pubkey,
            withdrawal_credentials,
            amount,
        }
        .sign(config, secret_key)
        .into();

        DepositData {
            pubkey,
            withdrawal_credentials,
            amount,
            signature,
        }
    }

    #[test]
    fn full_deposit_activates_validator_at_genesis() -> Result<()> {
        let config = Config::minimal();
        let mut incremental = Incremental::<Minimal>::new(&config);

        incremental.add_deposit_data(
            deposit_data(&config, &secret_key(1), Minimal::MAX_EFFECTIVE_BALANCE),
            0,
        )?;

        let (state, deposit_tree) = incremental.finish(H256::repeat_byte(0x42));

        assert_eq!(state.validators.len(), 1);
        assert_eq!(state.eth1_deposit_index, 1);
        assert_eq!(state.eth1_data.deposit_count, 1);
        assert_eq!(state.eth1_data.deposit_root, deposit_tree.root());
        assert_eq!(state.validators[0].activation_epoch, GENESIS_EPOCH);
        assert_eq!(
            accessors::get_randao_mix(&state, 5),
            H256::repeat_byte(0x42),
        );

        Ok(())
    }

    #[test]
    fn top_up_that_maxes_balance_activates_validator() -> Result<()> {
        let config = Config::minimal();
        let half = deposit_data(&config, &secret_key(1), Minimal::MAX_EFFECTIVE_BALANCE / 2);
        let mut incremental = Incremental::<Minimal>::new(&config);

        incremental.add_deposit_data(half, 0)?;

        assert_eq!(
            incremental.beacon_state.validators[0].activation_epoch,
            types::phase0::consts::FAR_FUTURE_EPOCH,
        );

        incremental.add_deposit_data(half, 1)?;

        let (state, _) = incremental.finish(H256::zero());

        assert_eq!(state.validators.len(), 1);
        assert_eq!(accessors::active_validator_count(&state, GENESIS_EPOCH), 1);

        Ok(())
    }

    #[test]
    fn deposit_with_invalid_proof_of_possession_adds_no_validator() -> Result<()> {
        let config = Config::minimal();
        let mut incremental = Incremental::<Minimal>::new(&config);
        let mut data = deposit_data(&config, &secret_key(1), Minimal::MAX_EFFECTIVE_BALANCE);

        data.amount -= 1;

        incremental.add_deposit_data(data, 0)?;

        let (state, _) = incremental.finish(H256::zero());

        assert!(state.validators.is_empty());
        assert_eq!(state.eth1_deposit_index, 1);

        Ok(())
    }

    #[test]
    fn genesis_time_includes_delay() {
        let config = Config::minimal();
        let mut incremental = Incremental::<Minimal>::new(&config);

        incremental.set_eth1_timestamp(1000);

        assert_eq!(
            incremental.beacon_state.genesis_time,
            1000 + config.genesis_delay,
        );
    }

    #[test]
    fn state_without_enough_validators_is_not_valid_genesis() {
        let config = Config::minimal();
        let mut incremental = Incremental::<Minimal>::new(&config);

        incremental.set_eth1_timestamp(config.min_genesis_time);

        let error = incremental
            .validate()
            .expect_err("there are no validators");

        assert!(matches!(
            error.downcast_ref(),
            Some(Error::NotEnoughActiveValidators { .. }),
        ));
    }

    #[test]
    fn genesis_block_commits_to_state() {
        let config = Config::minimal();
        let (state, _) = Incremental::<Minimal>::new(&config).finish(H256::zero());
        let block = beacon_block(&state);

        assert_eq!(block.message.slot, 0);
        assert_eq!(block.message.state_root, state.hash_tree_root());
    }
}
