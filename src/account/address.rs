//! Deterministic account address derivation

use sha2::{Digest, Sha256};

use super::types::{Address, Identity, Salt};
use crate::encoding::CanonicalSerialize;

const ADDRESS_TAG: &str = "creso-wallet/address/v1";

/// Maps (owner, salt) to the address an account will occupy, whether or not it exists yet.
///
/// The `domain` plays the role of the deploying factory's own address: two factories
/// with different domains never hand out the same address for the same inputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressDeriver {
    domain: [u8; 32],
}

impl AddressDeriver {
    pub fn new(domain: [u8; 32]) -> Self {
        Self { domain }
    }

    pub fn domain(&self) -> &[u8; 32] {
        &self.domain
    }

    pub fn derive(&self, owner: &Identity, salt: &Salt) -> Address {
        let mut preimage = Vec::with_capacity(4 + ADDRESS_TAG.len() + 96);
        // Vec writes are infallible
        let _ = ADDRESS_TAG.canonical_serialize(&mut preimage);
        let _ = self.domain.canonical_serialize(&mut preimage);
        let _ = owner.canonical_serialize(&mut preimage);
        let _ = salt.canonical_serialize(&mut preimage);

        let digest = Sha256::digest(&preimage);
        let mut out = [0u8; 20];
        out.copy_from_slice(&digest[12..]);
        tracing::debug!(%owner, %salt, address = %Address(out), "derived account address");
        Address(out)
    }
}
