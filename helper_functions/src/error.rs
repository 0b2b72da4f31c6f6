use parse_display::Display;
use thiserror::Error;
use types::{
    nonstandard::ErrorCategory,
    phase0::primitives::{CommitteeIndex, Epoch, Slot},
};

#[derive(Debug, Error)]
pub enum Error {
    #[error("attestation has no attesting indices")]
    AttestationHasNoAttestingIndices,
    #[error("attesting indices are not sorted and unique")]
    AttestingIndicesNotSortedAndUnique,
    #[error("committee index {index} is out of bounds ({committee_count} committees per slot)")]
    CommitteeIndexOutOfBounds {
        index: CommitteeIndex,
        committee_count: u64,
    },
    #[error(
        "aggregation bitlist length {aggregation_bitlist_length} \
         does not match committee length {committee_length}"
    )]
    CommitteeLengthMismatch {
        aggregation_bitlist_length: usize,
        committee_length: usize,
    },
    #[error("epoch {epoch} is after the next one relative to state")]
    EpochAfterNext { epoch: Epoch },
    #[error("epoch {epoch} is before the previous one relative to state")]
    EpochBeforePrevious { epoch: Epoch },
    #[error("epoch {epoch} is in the future relative to state")]
    EpochInTheFuture { epoch: Epoch },
    #[error("epoch number overflowed")]
    EpochOverflow,
    #[error("failed to select proposer")]
    FailedToSelectProposer,
    #[error("no validators are active")]
    NoActiveValidators,
    #[error("{0} is invalid")]
    SignatureInvalid(SignatureKind),
    #[error("slot {slot} is out of range of block roots stored in state")]
    SlotOutOfRange { slot: Slot },
}

impl Error {
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::AttestationHasNoAttestingIndices
            | Self::AttestingIndicesNotSortedAndUnique
            | Self::CommitteeIndexOutOfBounds { .. }
            | Self::CommitteeLengthMismatch { .. }
            | Self::EpochOverflow
            | Self::FailedToSelectProposer
            | Self::NoActiveValidators => ErrorCategory::Structural,
            Self::EpochAfterNext { .. }
            | Self::EpochBeforePrevious { .. }
            | Self::EpochInTheFuture { .. }
            | Self::SlotOutOfRange { .. } => ErrorCategory::Sequencing,
            Self::SignatureInvalid(_) => ErrorCategory::Signature,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Display)]
pub enum SignatureKind {
    #[display("attestation signature")]
    Attestation,
    #[display("block signature")]
    Block,
    #[display("deposit signature")]
    Deposit,
    #[display("RANDAO reveal")]
    Randao,
    #[display("voluntary exit signature")]
    VoluntaryExit,
}
