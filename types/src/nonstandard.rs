use parse_display::Display;
use static_assertions::assert_eq_size;

/// Coarse classification of rejected inputs.
///
/// Every error type in the workspace maps its variants to one of these.
/// Callers can use the category to decide whether to retry later (for example, after the parent of
/// a block arrives) or to drop the input for good.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display)]
pub enum ErrorCategory {
    /// The input is malformed or violates a structural rule of the protocol.
    #[display("structural")]
    Structural,
    /// A BLS signature does not verify.
    #[display("signature")]
    Signature,
    /// The input refers to a time or slot that is not allowed relative to the current one.
    #[display("sequencing")]
    Sequencing,
    /// The input refers to a block that is not known.
    #[display("unknown ancestor")]
    UnknownAncestor,
    /// The state root committed to in a block does not match the computed one.
    #[display("state root mismatch")]
    StateRootMismatch,
    /// The input is well formed but rejected by fork choice rules.
    #[display("policy violation")]
    PolicyViolation,
}

assert_eq_size!(ErrorCategory, u8);

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum AttestationEpoch {
    Previous,
    Current,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum RelativeEpoch {
    Previous,
    Current,
    Next,
}

impl From<AttestationEpoch> for RelativeEpoch {
    fn from(attestation_epoch: AttestationEpoch) -> Self {
        match attestation_epoch {
            AttestationEpoch::Previous => Self::Previous,
            AttestationEpoch::Current => Self::Current,
        }
    }
}
