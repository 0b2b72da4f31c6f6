//! BLS12-381 signatures as used by the beacon chain, backed by [`blst`].
//!
//! Public keys are in G1 and signatures are in G2 (the `min_pk` variant).

pub use crate::{
    consts::DOMAIN_SEPARATION_TAG,
    error::Error,
    public_key::PublicKey,
    public_key_bytes::PublicKeyBytes,
    secret_key::SecretKey,
    secret_key_bytes::SecretKeyBytes,
    signature::Signature,
    signature_bytes::SignatureBytes,
};

mod consts;
mod error;
mod public_key;
mod public_key_bytes;
mod secret_key;
mod secret_key_bytes;
mod signature;
mod signature_bytes;
