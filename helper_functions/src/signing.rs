use anyhow::Result;
use bls::{PublicKeyBytes, SecretKey, Signature, SignatureBytes};
use derive_more::From;
use ssz::SszHash;
use types::{
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        consts::{
            DOMAIN_BEACON_ATTESTER, DOMAIN_BEACON_PROPOSER, DOMAIN_DEPOSIT, DOMAIN_RANDAO,
            DOMAIN_VOLUNTARY_EXIT,
        },
        containers::{
            AttestationData, BeaconBlock, BeaconBlockHeader, DepositMessage, VoluntaryExit,
        },
        primitives::{DomainType, Epoch, H256},
    },
    preset::Preset,
};

use crate::{
    accessors,
    error::SignatureKind,
    misc,
    verifier::{SingleVerifier, Verifier as _},
};

// This wrapper is needed to differentiate between `Epoch` and `Slot`.
// They are aliased to the same type and thus cannot have different trait implementations.
#[derive(Clone, Copy, From)]
pub struct RandaoEpoch(Epoch);

impl SszHash for RandaoEpoch {
    fn hash_tree_root(&self) -> H256 {
        self.0.hash_tree_root()
    }
}

/// Objects signed with a domain that does not depend on the fork or the chain.
pub trait SignForAllForks: SszHash {
    const DOMAIN_TYPE: DomainType;
    const SIGNATURE_KIND: SignatureKind;

    fn signing_root(&self, config: &Config) -> H256 {
        let domain = misc::compute_domain(config, Self::DOMAIN_TYPE, None, None);
        misc::compute_signing_root(self, domain)
    }

    fn sign(&self, config: &Config, secret_key: &SecretKey) -> Signature {
        secret_key.sign(self.signing_root(config))
    }

    fn verify(
        &self,
        config: &Config,
        signature_bytes: SignatureBytes,
        public_key_bytes: &PublicKeyBytes,
    ) -> Result<()> {
        SingleVerifier.verify_singular(
            self.signing_root(config),
            signature_bytes,
            public_key_bytes,
            Self::SIGNATURE_KIND,
        )
    }
}

/// Objects signed with the domain of the fork active at [`SignForSingleFork::epoch`].
pub trait SignForSingleFork<P: Preset>: SszHash {
    const DOMAIN_TYPE: DomainType;
    const SIGNATURE_KIND: SignatureKind;

    fn epoch(&self) -> Epoch;

    fn signing_root(&self, config: &Config, beacon_state: &BeaconState<P>) -> H256 {
        let epoch = Some(self.epoch());
        let domain = accessors::get_domain(config, beacon_state, Self::DOMAIN_TYPE, epoch);
        misc::compute_signing_root(self, domain)
    }

    fn sign(
        &self,
        config: &Config,
        beacon_state: &BeaconState<P>,
        secret_key: &SecretKey,
    ) -> Signature {
        secret_key.sign(self.signing_root(config, beacon_state))
    }

    fn verify(
        &self,
        config: &Config,
        beacon_state: &BeaconState<P>,
        signature_bytes: SignatureBytes,
        public_key_bytes: &PublicKeyBytes,
    ) -> Result<()> {
        SingleVerifier.verify_singular(
            self.signing_root(config, beacon_state),
            signature_bytes,
            public_key_bytes,
            Self::SIGNATURE_KIND,
        )
    }
}

// > Fork-agnostic domain since deposits are valid across forks
impl SignForAllForks for DepositMessage {
    const DOMAIN_TYPE: DomainType = DOMAIN_DEPOSIT;
    const SIGNATURE_KIND: SignatureKind = SignatureKind::Deposit;
}

impl<P: Preset> SignForSingleFork<P> for AttestationData {
    const DOMAIN_TYPE: DomainType = DOMAIN_BEACON_ATTESTER;
    const SIGNATURE_KIND: SignatureKind = SignatureKind::Attestation;

    fn epoch(&self) -> Epoch {
        self.target.epoch
    }
}

impl<P: Preset> SignForSingleFork<P> for BeaconBlock {
    const DOMAIN_TYPE: DomainType = DOMAIN_BEACON_PROPOSER;
    const SIGNATURE_KIND: SignatureKind = SignatureKind::Block;

    fn epoch(&self) -> Epoch {
        misc::compute_epoch_at_slot::<P>(self.slot)
    }
}

// Signatures in proposer slashings are over headers.
// A header has the same root as the block it was made from, so the signatures are interchangeable.
impl<P: Preset> SignForSingleFork<P> for BeaconBlockHeader {
    const DOMAIN_TYPE: DomainType = DOMAIN_BEACON_PROPOSER;
    const SIGNATURE_KIND: SignatureKind = SignatureKind::Block;

    fn epoch(&self) -> Epoch {
        misc::compute_epoch_at_slot::<P>(self.slot)
    }
}

impl<P: Preset> SignForSingleFork<P> for RandaoEpoch {
    const DOMAIN_TYPE: DomainType = DOMAIN_RANDAO;
    const SIGNATURE_KIND: SignatureKind = SignatureKind::Randao;

    fn epoch(&self) -> Epoch {
        self.0
    }
}

impl<P: Preset> SignForSingleFork<P> for VoluntaryExit {
    const DOMAIN_TYPE: DomainType = DOMAIN_VOLUNTARY_EXIT;
    const SIGNATURE_KIND: SignatureKind = SignatureKind::VoluntaryExit;

    fn epoch(&self) -> Epoch {
        self.epoch
    }
}

#[cfg(test)]
mod tests {
    use bls::SecretKeyBytes;
    use types::preset::Minimal;

    use super::*;

    fn secret_key() -> SecretKey {
        SecretKey::try_from(SecretKeyBytes::from([7; 32])).expect("bytes encode a valid secret key")
    }

    #[test]
    fn block_and_header_signatures_are_interchangeable() -> Result<()> {
        let config = Config::minimal();
        let state = BeaconState::<Minimal>::default();
        let block = BeaconBlock {
            slot: 3,
            ..BeaconBlock::default()
        };
        let header = block.to_header();

        assert_eq!(block.hash_tree_root(), header.hash_tree_root());

        let secret_key = secret_key();
        let public_key_bytes = secret_key.to_public_key().to_bytes();
        let signature = SignForSingleFork::<Minimal>::sign(&block, &config, &state, &secret_key);

        SignForSingleFork::<Minimal>::verify(
            &header,
            &config,
            &state,
            signature.to_bytes(),
            &public_key_bytes,
        )
    }

    #[test]
    fn randao_reveal_depends_on_epoch() {
        let config = Config::minimal();
        let state = BeaconState::<Minimal>::default();
        let secret_key = secret_key();
        let public_key_bytes = secret_key.to_public_key().to_bytes();
        let reveal =
            SignForSingleFork::<Minimal>::sign(&RandaoEpoch::from(1), &config, &state, &secret_key);

        SignForSingleFork::<Minimal>::verify(
            &RandaoEpoch::from(2),
            &config,
            &state,
            reveal.to_bytes(),
            &public_key_bytes,
        )
        .expect_err("reveal was made for a different epoch");
    }

    #[test]
    fn deposit_signatures_ignore_fork() -> Result<()> {
        let config = Config::minimal();
        let secret_key = secret_key();
        let pubkey = secret_key.to_public_key().to_bytes();

        let message = DepositMessage {
            pubkey,
            withdrawal_credentials: H256::zero(),
            amount: 32_000_000_000,
        };

        let signature = message.sign(&config, &secret_key);

        message.verify(&config, signature.to_bytes(), &pubkey)
    }
}
