use core::hash::{Hash, Hasher};

use blst::min_pk::SecretKey as RawSecretKey;
use serde::Serialize;
use ssz::SszHash;
use static_assertions::assert_not_impl_any;

use crate::{
    consts::DOMAIN_SEPARATION_TAG, error::Error, public_key::PublicKey,
    secret_key_bytes::SecretKeyBytes, signature::Signature,
};

// `RawSecretKey` zeroizes itself on drop.
#[derive(derive_more::Debug)]
#[debug("[REDACTED]")]
pub struct SecretKey(RawSecretKey);

assert_not_impl_any! {
    SecretKey:
    Clone, Copy, core::ops::Deref, ToOwned, core::fmt::Display, core::fmt::LowerHex,
    Serialize, SszHash,
}

impl PartialEq for SecretKey {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.as_raw().to_bytes() == other.as_raw().to_bytes()
    }
}

impl Eq for SecretKey {}

impl Hash for SecretKey {
    fn hash<H: Hasher>(&self, hasher: &mut H) {
        self.as_raw().to_bytes().hash(hasher);
    }
}

impl TryFrom<SecretKeyBytes> for SecretKey {
    type Error = Error;

    #[inline]
    fn try_from(secret_key_bytes: SecretKeyBytes) -> Result<Self, Self::Error> {
        RawSecretKey::from_bytes(secret_key_bytes.as_ref())
            .map(Self)
            .map_err(|_| Error::InvalidSecretKey)
    }
}

impl SecretKey {
    #[inline]
    #[must_use]
    pub fn to_bytes(&self) -> SecretKeyBytes {
        SecretKeyBytes {
            bytes: self.as_raw().to_bytes(),
        }
    }

    #[inline]
    #[must_use]
    pub fn to_public_key(&self) -> PublicKey {
        self.as_raw().sk_to_pk().into()
    }

    #[inline]
    #[must_use]
    pub fn sign(&self, message: impl AsRef<[u8]>) -> Signature {
        self.as_raw()
            .sign(message.as_ref(), DOMAIN_SEPARATION_TAG, &[])
            .into()
    }

    const fn as_raw(&self) -> &RawSecretKey {
        &self.0
    }
}
