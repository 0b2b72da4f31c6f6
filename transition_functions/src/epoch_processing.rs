use anyhow::Result;
use arithmetic::U64Ext as _;
use helper_functions::{
    accessors::{
        absolute_epoch, get_block_root, get_current_epoch, get_next_epoch, get_randao_mix,
        get_validator_churn_limit,
    },
    misc::compute_activation_exit_epoch,
    mutators::{decrease_balance, increase_balance, initiate_validator_exit},
    predicates::{is_active_validator, is_eligible_for_activation, is_eligible_for_activation_queue},
};
use itertools::Itertools as _;
use log::{debug, info};
use ssz::SszHash as _;
use types::{
    collections::{Attestations, Eth1DataVotes, VectorExt as _},
    config::Config,
    nonstandard::AttestationEpoch,
    phase0::{
        beacon_state::BeaconState,
        consts::GENESIS_EPOCH,
        containers::{Checkpoint, HistoricalBatch},
        primitives::Gwei,
    },
    preset::Preset,
};

use crate::epoch_intermediates::{self, EpochDeltas, Statistics, ValidatorSummary};

pub fn process_epoch<P: Preset>(config: &Config, state: &mut BeaconState<P>) -> Result<()> {
    let (statistics, mut summaries, performance) = epoch_intermediates::statistics(state)?;

    process_justification_and_finalization(state, statistics)?;

    // Epoch deltas must be computed after `process_justification_and_finalization`
    // because the inactivity leak depends on the updated finalized checkpoint.
    if should_process_rewards_and_penalties(state) {
        let deltas =
            epoch_intermediates::epoch_deltas(state, statistics, &summaries, &performance)?;

        process_rewards_and_penalties(state, deltas);
    }

    process_registry_updates(config, state, &mut summaries)?;
    process_slashings(state, statistics.current_epoch_active_balance, &summaries);
    process_final_updates(state);

    debug!(
        "processed epoch {} (finalized: {:?}, validators: {})",
        get_current_epoch(state),
        state.finalized_checkpoint,
        state.validators.len(),
    );

    Ok(())
}

fn process_justification_and_finalization<P: Preset>(
    state: &mut BeaconState<P>,
    statistics: Statistics,
) -> Result<()> {
    if !should_process_justification_and_finalization(state) {
        return Ok(());
    }

    weigh_justification_and_finalization(
        state,
        statistics.current_epoch_active_balance,
        statistics.previous_epoch_target_attesting_balance,
        statistics.current_epoch_target_attesting_balance,
    )
}

fn weigh_justification_and_finalization<P: Preset>(
    state: &mut BeaconState<P>,
    total_active_balance: Gwei,
    previous_epoch_target_balance: Gwei,
    current_epoch_target_balance: Gwei,
) -> Result<()> {
    let old_previous_justified_checkpoint = state.previous_justified_checkpoint;
    let old_current_justified_checkpoint = state.current_justified_checkpoint;
    let old_finalized_checkpoint = state.finalized_checkpoint;

    // > Process justifications
    state.previous_justified_checkpoint = state.current_justified_checkpoint;
    state.justification_bits.shift_up_by_1();

    for (attestation_epoch, bit, target_balance) in [
        (AttestationEpoch::Previous, 1, previous_epoch_target_balance),
        (AttestationEpoch::Current, 0, current_epoch_target_balance),
    ] {
        if target_balance * 3 >= total_active_balance * 2 {
            let epoch = absolute_epoch(state, attestation_epoch.into());

            state.current_justified_checkpoint = Checkpoint {
                epoch,
                root: get_block_root(state, epoch)?,
            };

            state.justification_bits.set(bit, true);
        }
    }

    // > Process finalizations
    let bits = state.justification_bits;
    let current_epoch = get_current_epoch(state);

    // > The 2nd/3rd/4th most recent epochs are justified, the 2nd using the 4th as source
    if bits.all_set(1..4) && old_previous_justified_checkpoint.epoch + 3 == current_epoch {
        state.finalized_checkpoint = old_previous_justified_checkpoint;
    }

    // > The 2nd/3rd most recent epochs are justified, the 2nd using the 3rd as source
    if bits.all_set(1..3) && old_previous_justified_checkpoint.epoch + 2 == current_epoch {
        state.finalized_checkpoint = old_previous_justified_checkpoint;
    }

    // > The 1st/2nd/3rd most recent epochs are justified, the 1st using the 3rd as source
    if bits.all_set(0..3) && old_current_justified_checkpoint.epoch + 2 == current_epoch {
        state.finalized_checkpoint = old_current_justified_checkpoint;
    }

    // > The 1st/2nd most recent epochs are justified, the 1st using the 2nd as source
    if bits.all_set(0..2) && old_current_justified_checkpoint.epoch + 1 == current_epoch {
        state.finalized_checkpoint = old_current_justified_checkpoint;
    }

    if state.current_justified_checkpoint != old_current_justified_checkpoint {
        info!("justified checkpoint in state: {:?}", state.current_justified_checkpoint);
    }

    if state.finalized_checkpoint != old_finalized_checkpoint {
        info!("finalized checkpoint in state: {:?}", state.finalized_checkpoint);
    }

    Ok(())
}

const fn should_process_justification_and_finalization<P: Preset>(
    state: &BeaconState<P>,
) -> bool {
    // > Initial FFG checkpoint values have a `0x00` stub for `root`.
    // > Skip FFG updates in the first two epochs to avoid
    // > corner cases that might result in modifying this stub.
    GENESIS_EPOCH + 1 < get_current_epoch(state)
}

const fn should_process_rewards_and_penalties<P: Preset>(state: &BeaconState<P>) -> bool {
    // > No rewards are applied at the end of `GENESIS_EPOCH`
    // > because rewards are for work done in the previous epoch
    GENESIS_EPOCH < get_current_epoch(state)
}

fn process_rewards_and_penalties<P: Preset>(state: &mut BeaconState<P>, deltas: Vec<EpochDeltas>) {
    for (balance, deltas) in state.balances.iter_mut().zip(deltas) {
        increase_balance(balance, deltas.reward);
        decrease_balance(balance, deltas.penalty);
    }
}

fn process_registry_updates<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    summaries: &mut [ValidatorSummary],
) -> Result<()> {
    let current_epoch = get_current_epoch(state);
    let next_epoch = get_next_epoch(state);

    // The indices collected in these do not overlap.
    let mut eligible_for_activation_queue = vec![];
    let mut ejections = vec![];
    let mut activation_queue = vec![];

    for (validator_index, validator) in (0..).zip(state.validators.iter()) {
        if is_eligible_for_activation_queue::<P>(validator) {
            eligible_for_activation_queue.push(validator_index);
        }

        if is_active_validator(validator, current_epoch)
            && validator.effective_balance <= config.ejection_balance
        {
            ejections.push(validator_index);
        }

        if is_eligible_for_activation(state, validator) {
            activation_queue.push((validator_index, validator.activation_eligibility_epoch));
        }
    }

    // > Process activation eligibility and ejections
    for validator_index in eligible_for_activation_queue {
        state
            .validators
            .get_mut_at(validator_index)?
            .activation_eligibility_epoch = next_epoch;
    }

    for validator_index in ejections {
        initiate_validator_exit(config, state, validator_index)?;

        debug!("validator {validator_index} ejected in epoch {current_epoch}");

        // `process_slashings` depends on `Validator.withdrawable_epoch`,
        // which may have been modified by `initiate_validator_exit`.
        summaries[usize::try_from(validator_index)?]
            .update_from(state.validators.get_at(validator_index)?);
    }

    // > Queue validators eligible for activation and not yet dequeued for activation
    let activation_queue = activation_queue
        .into_iter()
        // > Order by the sequence of activation_eligibility_epoch setting and then index
        .sorted_unstable_by_key(|&(validator_index, activation_eligibility_epoch)| {
            (activation_eligibility_epoch, validator_index)
        })
        .map(|(validator_index, _)| validator_index);

    // > Dequeued validators for activation up to churn limit
    let churn_limit = get_validator_churn_limit(config, state).try_into()?;
    let activation_exit_epoch = compute_activation_exit_epoch::<P>(current_epoch);

    for validator_index in activation_queue.take(churn_limit) {
        state.validators.get_mut_at(validator_index)?.activation_epoch = activation_exit_epoch;
    }

    Ok(())
}

fn process_slashings<P: Preset>(
    state: &mut BeaconState<P>,
    total_active_balance: Gwei,
    summaries: &[ValidatorSummary],
) {
    let current_epoch = get_current_epoch(state);

    let adjusted_total_slashing_balance = (state.slashings.iter().sum::<Gwei>()
        * P::PROPORTIONAL_SLASHING_MULTIPLIER)
        .min(total_active_balance);

    for (balance, summary) in state.balances.iter_mut().zip(summaries) {
        let ValidatorSummary {
            effective_balance,
            slashed,
            withdrawable_epoch,
            ..
        } = *summary;

        if !slashed {
            continue;
        }

        if current_epoch + P::EPOCHS_PER_SLASHINGS_VECTOR.get() / 2 != withdrawable_epoch {
            continue;
        }

        // > Factored out from penalty numerator to avoid uint64 overflow
        let increment = P::EFFECTIVE_BALANCE_INCREMENT;
        let penalty_numerator = effective_balance / increment * adjusted_total_slashing_balance;
        let penalty = penalty_numerator / total_active_balance * increment.get();

        decrease_balance(balance, penalty);
    }
}

fn process_final_updates<P: Preset>(state: &mut BeaconState<P>) {
    process_eth1_data_reset(state);
    process_effective_balance_updates(state);
    process_slashings_reset(state);
    process_randao_mixes_reset(state);
    process_historical_roots_update(state);
    process_participation_record_updates(state);
}

fn process_eth1_data_reset<P: Preset>(state: &mut BeaconState<P>) {
    // > Reset eth1 data votes
    if (state.slot + 1) % P::SLOTS_PER_ETH1_VOTING_PERIOD == 0 {
        state.eth1_data_votes = Eth1DataVotes::new();
    }
}

fn process_effective_balance_updates<P: Preset>(state: &mut BeaconState<P>) {
    let hysteresis_increment = P::EFFECTIVE_BALANCE_INCREMENT.get() / P::HYSTERESIS_QUOTIENT;
    let downward_threshold = hysteresis_increment * P::HYSTERESIS_DOWNWARD_MULTIPLIER;
    let upward_threshold = hysteresis_increment * P::HYSTERESIS_UPWARD_MULTIPLIER;

    let BeaconState {
        validators,
        balances,
        ..
    } = state;

    // > Update effective balances with hysteresis
    for (validator, balance) in validators.iter_mut().zip(balances.iter().copied()) {
        let below = balance + downward_threshold < validator.effective_balance;
        let above = validator.effective_balance + upward_threshold < balance;

        if below || above {
            validator.effective_balance = balance
                .prev_multiple_of(P::EFFECTIVE_BALANCE_INCREMENT)
                .min(P::MAX_EFFECTIVE_BALANCE);
        }
    }
}

fn process_slashings_reset<P: Preset>(state: &mut BeaconState<P>) {
    let next_epoch = get_next_epoch(state);

    // > Reset slashings
    *state.slashings.mod_index_mut(next_epoch) = 0;
}

fn process_randao_mixes_reset<P: Preset>(state: &mut BeaconState<P>) {
    let current_epoch = get_current_epoch(state);
    let next_epoch = get_next_epoch(state);

    // > Set randao mix
    *state.randao_mixes.mod_index_mut(next_epoch) = get_randao_mix(state, current_epoch);
}

fn process_historical_roots_update<P: Preset>(state: &mut BeaconState<P>) {
    let next_epoch = get_next_epoch(state);

    // > Set historical root accumulator
    if next_epoch % P::EPOCHS_PER_HISTORICAL_ROOT == 0 {
        let historical_batch = HistoricalBatch {
            block_roots: state.block_roots.clone(),
            state_roots: state.state_roots.clone(),
        };

        state
            .historical_roots
            .push_back(historical_batch.hash_tree_root());
    }
}

fn process_participation_record_updates<P: Preset>(state: &mut BeaconState<P>) {
    // > Rotate current/previous epoch attestations
    state.previous_epoch_attestations = core::mem::take(&mut state.current_epoch_attestations);
    debug_assert_eq!(state.current_epoch_attestations, Attestations::new());
}

#[cfg(test)]
mod tests {
    use test_case::test_case;
    use types::{
        phase0::{
            consts::FAR_FUTURE_EPOCH,
            containers::{Eth1Data, PendingAttestation, Validator},
            primitives::{Slot, H256},
        },
        preset::Minimal,
    };

    use super::*;

    const BALANCE: Gwei = 32_000_000_000;

    fn active_validator() -> Validator {
        Validator {
            effective_balance: BALANCE,
            activation_eligibility_epoch: 0,
            activation_epoch: 0,
            exit_epoch: FAR_FUTURE_EPOCH,
            withdrawable_epoch: FAR_FUTURE_EPOCH,
            ..Validator::default()
        }
    }

    // The last slot of the epoch before `epoch`, which is where epoch processing happens.
    fn state_at_end_of_epoch(epoch: u64, validator_count: usize) -> BeaconState<Minimal> {
        let slot: Slot = (epoch + 1) * Minimal::SLOTS_PER_EPOCH.get() - 1;

        BeaconState {
            slot,
            validators: core::iter::repeat_with(active_validator)
                .take(validator_count)
                .collect(),
            balances: core::iter::repeat(BALANCE).take(validator_count).collect(),
            block_roots: (0..Minimal::SLOTS_PER_HISTORICAL_ROOT.get())
                .map(|byte| H256::repeat_byte(u8::try_from(byte).expect("fits in u8") + 1))
                .collect(),
            ..BeaconState::default()
        }
    }

    #[test_case(31_800_000_000, BALANCE => BALANCE; "small decrease is ignored")]
    #[test_case(30_700_000_000, BALANCE => 30_000_000_000; "large decrease is quantized")]
    #[test_case(33_000_000_000, 31_000_000_000 => BALANCE; "increase is capped")]
    #[test_case(31_200_000_000, 30_000_000_000 => 30_000_000_000; "small increase is ignored")]
    fn effective_balance_hysteresis(balance: Gwei, effective_balance: Gwei) -> Gwei {
        let mut state = state_at_end_of_epoch(1, 1);

        state.balances[0] = balance;
        state.validators[0].effective_balance = effective_balance;

        process_effective_balance_updates(&mut state);

        state.validators[0].effective_balance
    }

    #[test]
    fn eth1_votes_are_reset_at_end_of_voting_period() {
        let mut state = state_at_end_of_epoch(0, 0);

        state.eth1_data_votes.push_back(Eth1Data::default());

        process_eth1_data_reset(&mut state);

        assert_eq!(state.eth1_data_votes.len(), 1);

        // The voting period in the minimal preset is 2 epochs long.
        state.slot += Minimal::SLOTS_PER_EPOCH.get();

        process_eth1_data_reset(&mut state);

        assert!(state.eth1_data_votes.is_empty());
    }

    #[test]
    fn randao_mix_is_carried_into_next_epoch() {
        let mut state = state_at_end_of_epoch(2, 0);
        let mix = H256::repeat_byte(0xaa);

        *state.randao_mixes.mod_index_mut(2) = mix;

        process_randao_mixes_reset(&mut state);

        assert_eq!(*state.randao_mixes.mod_index(3), mix);
    }

    #[test]
    fn historical_batch_is_appended_at_end_of_period() {
        let mut state = state_at_end_of_epoch(6, 0);

        process_historical_roots_update(&mut state);

        assert!(state.historical_roots.is_empty());

        state.slot += Minimal::SLOTS_PER_EPOCH.get();

        process_historical_roots_update(&mut state);

        let expected = HistoricalBatch {
            block_roots: state.block_roots.clone(),
            state_roots: state.state_roots.clone(),
        }
        .hash_tree_root();

        assert_eq!(state.historical_roots.len(), 1);
        assert_eq!(state.historical_roots[0], expected);
    }

    #[test]
    fn current_epoch_attestations_become_previous() {
        let mut state = state_at_end_of_epoch(1, 0);
        let attestation = PendingAttestation {
            inclusion_delay: 1,
            ..PendingAttestation::default()
        };

        state.previous_epoch_attestations.push_back(PendingAttestation::default());
        state.current_epoch_attestations.push_back(attestation.clone());

        process_participation_record_updates(&mut state);

        assert_eq!(state.previous_epoch_attestations, Attestations::unit(attestation));
        assert!(state.current_epoch_attestations.is_empty());
    }

    #[test]
    fn low_balance_validators_are_ejected() -> Result<()> {
        let config = Config::minimal();
        let mut state = state_at_end_of_epoch(3, 4);

        state.validators[2].effective_balance = config.ejection_balance;

        let (_, mut summaries, _) = epoch_intermediates::statistics(&state)?;

        process_registry_updates(&config, &mut state, &mut summaries)?;

        let ejected = &state.validators[2];

        assert_eq!(ejected.exit_epoch, compute_activation_exit_epoch::<Minimal>(3));
        assert_eq!(
            ejected.withdrawable_epoch,
            ejected.exit_epoch + config.min_validator_withdrawability_delay,
        );
        assert_eq!(summaries[2].withdrawable_epoch, ejected.withdrawable_epoch);
        assert_eq!(state.validators[1].exit_epoch, FAR_FUTURE_EPOCH);

        Ok(())
    }

    #[test]
    fn activations_follow_eligibility_order_up_to_churn_limit() -> Result<()> {
        let config = Config::minimal();
        let mut state = state_at_end_of_epoch(5, 10);

        state.finalized_checkpoint.epoch = 4;

        // Validators 4..10 are pending, with validator 9 queued first.
        for (validator_index, eligibility_epoch) in (4..10).zip([2, 2, 3, 3, 4, 1]) {
            let validator = &mut state.validators[validator_index];
            validator.activation_eligibility_epoch = eligibility_epoch;
            validator.activation_epoch = FAR_FUTURE_EPOCH;
        }

        let (_, mut summaries, _) = epoch_intermediates::statistics(&state)?;

        process_registry_updates(&config, &mut state, &mut summaries)?;

        let activated = (0..10)
            .filter(|index| state.validators[*index].activation_epoch == 10)
            .collect_vec();

        // The churn limit for 4 active validators is `MIN_PER_EPOCH_CHURN_LIMIT`.
        assert_eq!(activated, [4, 5, 6, 9]);

        Ok(())
    }

    #[test]
    fn slashed_validators_pay_proportional_penalty_halfway_to_withdrawal() {
        let mut state = state_at_end_of_epoch(3, 4);
        let total_active_balance = 4 * BALANCE;
        let withdrawable_epoch = 3 + Minimal::EPOCHS_PER_SLASHINGS_VECTOR.get() / 2;

        state.validators[0].slashed = true;
        state.validators[0].withdrawable_epoch = withdrawable_epoch;
        state.validators[1].slashed = true;
        state.validators[1].withdrawable_epoch = withdrawable_epoch + 1;
        *state.slashings.mod_index_mut(3) = BALANCE;

        let summaries = state
            .validators
            .iter()
            .map(|validator| ValidatorSummary {
                effective_balance: validator.effective_balance,
                slashed: validator.slashed,
                withdrawable_epoch: validator.withdrawable_epoch,
                eligible_for_penalties: true,
            })
            .collect_vec();

        process_slashings(&mut state, total_active_balance, &summaries);

        // 32 increments * min(3 * 32 ETH, 128 ETH) / 128 ETH = 24 increments.
        assert_eq!(state.balances[0], BALANCE - 24_000_000_000);
        assert_eq!(state.balances[1], BALANCE);
    }

    #[test]
    fn supermajority_justifies_and_finalizes() -> Result<()> {
        let mut state = state_at_end_of_epoch(4, 0);
        let total = 90 * BALANCE;

        state.previous_justified_checkpoint = Checkpoint {
            epoch: 2,
            root: H256::repeat_byte(0x22),
        };
        state.current_justified_checkpoint = Checkpoint {
            epoch: 3,
            root: H256::repeat_byte(0x33),
        };
        state.justification_bits.set(0, true);
        state.justification_bits.set(1, true);

        weigh_justification_and_finalization(&mut state, total, 60 * BALANCE, 60 * BALANCE)?;

        assert_eq!(state.current_justified_checkpoint.epoch, 4);
        assert_eq!(
            state.current_justified_checkpoint.root,
            get_block_root(&state, 4)?,
        );
        assert_eq!(state.previous_justified_checkpoint.epoch, 3);
        assert!(state.justification_bits.all_set(0..3));
        assert_eq!(state.finalized_checkpoint.epoch, 3);

        Ok(())
    }

    #[test]
    fn minority_does_not_justify() -> Result<()> {
        let mut state = state_at_end_of_epoch(4, 0);
        let total = 90 * BALANCE;

        weigh_justification_and_finalization(&mut state, total, 59 * BALANCE, 59 * BALANCE)?;

        assert_eq!(state.current_justified_checkpoint, Checkpoint::default());
        assert_eq!(state.finalized_checkpoint, Checkpoint::default());
        assert!(!state.justification_bits.all_set(0..1));

        Ok(())
    }

    #[test]
    fn empty_epoch_penalizes_every_active_validator() -> Result<()> {
        let config = Config::minimal();
        let mut state = state_at_end_of_epoch(2, 16);

        process_epoch(&config, &mut state)?;

        assert!(state.balances.iter().all(|balance| *balance < BALANCE));
        assert_eq!(state.finalized_checkpoint, Checkpoint::default());

        Ok(())
    }
}
