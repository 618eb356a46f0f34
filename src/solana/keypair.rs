//! Ed25519 signing keys for Solana accounts.

use ed25519_dalek::{Signer, SigningKey};
use sha2::{Digest, Sha256};

use crate::error::{EngineError, EngineResult};
use crate::keys::KeyMaterial;
use crate::solana::Pubkey;

/// Signing key plus its account address.
pub struct SolanaKeypair {
    signing_key: SigningKey,
}

impl SolanaKeypair {
    /// Accepts a 32-byte seed or a 64-byte `seed || pubkey` keypair.
    ///
    /// A 64-byte value whose tail is `sha256(seed)` is a legacy placeholder
    /// expansion; it is accepted with a warning and the seed is used.
    pub fn from_key(key: &KeyMaterial) -> EngineResult<Self> {
        let bytes = key.as_bytes();
        let seed: [u8; 32] = match bytes.len() {
            32 | 64 => {
                let mut seed = [0u8; 32];
                seed.copy_from_slice(&bytes[..32]);
                seed
            }
            n => {
                return Err(EngineError::Key(format!(
                    "Solana key must be 32 or 64 bytes, got {}",
                    n
                )))
            }
        };
        let signing_key = SigningKey::from_bytes(&seed);

        if bytes.len() == 64 {
            let tail = &bytes[32..];
            let standard = tail == signing_key.verifying_key().as_bytes();
            if !standard {
                if tail != Sha256::digest(seed).as_slice() {
                    return Err(EngineError::Key(
                        "Solana keypair public half does not match its seed".to_string(),
                    ));
                }
                tracing::warn!("Solana key uses the legacy seed||sha256(seed) expansion");
            }
        }

        Ok(Self { signing_key })
    }

    pub fn pubkey(&self) -> Pubkey {
        Pubkey(self.signing_key.verifying_key().to_bytes())
    }

    /// Fail unless this key controls `expected`.
    pub fn ensure_address(&self, expected: &Pubkey) -> EngineResult<()> {
        if &self.pubkey() != expected {
            return Err(EngineError::InvalidAddress(format!(
                "key for {} does not control {}",
                self.pubkey(),
                expected
            )));
        }
        Ok(())
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl std::fmt::Debug for SolanaKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolanaKeypair")
            .field("pubkey", &self.pubkey())
            .finish()
    }
}
