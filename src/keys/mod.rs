//! Signing key access.
//!
//! # Security Constraints
//! - The engine never persists or derives custodial keys; it asks a `KeyProvider`
//! - Key bytes are never logged (`KeyMaterial` has a redacting `Debug`)
//! - Key buffers are zeroed on drop

use std::collections::HashMap;

use async_trait::async_trait;
use zeroize::Zeroize;

use crate::error::{EngineError, EngineResult};

/// Prefix of the environment variables read by `EnvKeyProvider`.
pub const KEY_ENV_PREFIX: &str = "CUSTODY_KEY_";

/// Raw private key bytes for one address.
pub struct KeyMaterial(Vec<u8>);

impl KeyMaterial {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Decode hex (with or without `0x`) or, failing that, base58.
    pub fn parse(encoded: &str) -> EngineResult<Self> {
        let encoded = encoded.trim();
        let stripped = encoded.strip_prefix("0x").unwrap_or(encoded);
        if stripped.len() % 2 == 0 && stripped.bytes().all(|b| b.is_ascii_hexdigit()) {
            return hex::decode(stripped)
                .map(Self)
                .map_err(|e| EngineError::Key(format!("invalid hex key: {}", e)));
        }
        bs58::decode(encoded)
            .into_vec()
            .map(Self)
            .map_err(|_| EngineError::Key("key is neither hex nor base58".to_string()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl KeyMaterial {
    /// Zero the buffer (including spare capacity) and empty it.
    fn wipe(&mut self) {
        self.0.zeroize();
    }
}

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        self.wipe();
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyMaterial(<{} bytes redacted>)", self.0.len())
    }
}

/// Source of signing keys, keyed by address.
#[async_trait]
pub trait KeyProvider: Send + Sync {
    async fn signing_key(&self, address: &str) -> EngineResult<KeyMaterial>;
}

/// EVM addresses are case-insensitive; base58 addresses are not.
fn lookup_key(address: &str) -> String {
    let address = address.trim();
    if address.starts_with("0x") || address.starts_with("0X") {
        address.to_ascii_lowercase()
    } else {
        address.to_string()
    }
}

/// In-memory key provider.
#[derive(Default)]
pub struct StaticKeyProvider {
    keys: HashMap<String, Vec<u8>>,
}

impl StaticKeyProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, address: &str, key: Vec<u8>) -> Self {
        self.insert(address, key);
        self
    }

    pub fn insert(&mut self, address: &str, key: Vec<u8>) {
        self.keys.insert(lookup_key(address), key);
    }
}

#[async_trait]
impl KeyProvider for StaticKeyProvider {
    async fn signing_key(&self, address: &str) -> EngineResult<KeyMaterial> {
        self.keys
            .get(&lookup_key(address))
            .map(|k| KeyMaterial::from_bytes(k.clone()))
            .ok_or_else(|| EngineError::Key(format!("no key for {}", address)))
    }
}

/// Reads `CUSTODY_KEY_<address>` from the process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvKeyProvider;

impl EnvKeyProvider {
    pub fn var_name(address: &str) -> String {
        format!("{}{}", KEY_ENV_PREFIX, lookup_key(address))
    }
}

#[async_trait]
impl KeyProvider for EnvKeyProvider {
    async fn signing_key(&self, address: &str) -> EngineResult<KeyMaterial> {
        let var = Self::var_name(address);
        let value = std::env::var(&var)
            .map_err(|_| EngineError::Key(format!("environment variable {} not set", var)))?;
        KeyMaterial::parse(&value)
    }
}
