use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::account::types::Identity;
use crate::error::WalletError;

/// Signature capability consumed by accounts: `verify(signer, payload, proof) -> bool`.
pub trait SignatureVerifier {
    fn verify(&self, signer: &Identity, payload: &[u8], proof: &[u8]) -> bool;
}

/// Ed25519 verification against the identity's own key bytes.
#[derive(Clone, Copy, Debug, Default)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, signer: &Identity, payload: &[u8], proof: &[u8]) -> bool {
        let Ok(pubkey) = VerifyingKey::from_bytes(signer.as_bytes()) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(proof) else {
            return false;
        };
        pubkey.verify(payload, &signature).is_ok()
    }
}

pub struct KeyPair {
    pub signing_key: SigningKey,
}

impl KeyPair {
    /// Generate a new Ed25519 keypair
    pub fn generate() -> Self {
        let mut csprng = OsRng;
        KeyPair {
            signing_key: SigningKey::generate(&mut csprng),
        }
    }

    pub fn from_secret_bytes(secret: &[u8; 32]) -> Self {
        KeyPair {
            signing_key: SigningKey::from_bytes(secret),
        }
    }

    /// The identity this key signs for.
    pub fn identity(&self) -> Identity {
        Identity(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message with the private key
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }

    pub fn secret_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    pub fn from_secret_hex(secret_hex: &str) -> Result<Self, String> {
        let bytes = hex::decode(secret_hex.trim()).map_err(|e| format!("invalid secret hex: {}", e))?;
        let secret: [u8; 32] = bytes
            .try_into()
            .map_err(|_| "secret key must be 32 bytes".to_string())?;
        Ok(Self::from_secret_bytes(&secret))
    }
}

/// On-disk key file used by the CLI.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct KeyFile {
    pub name: String,
    pub identity: Identity,
    secret_hex: String,
}

impl KeyFile {
    pub fn new(name: &str, keypair: &KeyPair) -> Self {
        Self {
            name: name.to_string(),
            identity: keypair.identity(),
            secret_hex: keypair.secret_hex(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), WalletError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| WalletError::Storage(e.to_string()))?;
        fs::write(path, json).map_err(|e| WalletError::Storage(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, WalletError> {
        let content = fs::read_to_string(path)
            .map_err(|e| WalletError::Storage(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&content).map_err(|e| WalletError::Storage(e.to_string()))
    }

    /// Restore the signing key, refusing files whose identity does not match.
    pub fn keypair(&self) -> Result<KeyPair, WalletError> {
        let keypair = KeyPair::from_secret_hex(&self.secret_hex).map_err(WalletError::Storage)?;
        if keypair.identity() != self.identity {
            return Err(WalletError::Storage(format!(
                "key file '{}' is corrupted: secret does not match identity",
                self.name
            )));
        }
        Ok(keypair)
    }
}
