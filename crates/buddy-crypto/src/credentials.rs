use anyhow::{Result, anyhow};
use argon2::{Algorithm, Argon2, Params, Version, password_hash::Output};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use rand::RngCore;

const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

/// KDF cost parameters. `iterations` is stored next to every hash so it can
/// be raised later without invalidating existing credentials; `memory_kib`
/// is process-wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialConfig {
    pub iterations: u32,
    pub memory_kib: u32,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            iterations: 3,
            memory_kib: 19_456,
        }
    }
}

/// A salted, iterated one-way hash of a secret. `hash` and `salt` are base64.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashedSecret {
    pub hash: String,
    pub salt: String,
    pub iterations: u32,
}

/// Hashes and verifies passwords and email-verification codes with Argon2id.
#[derive(Debug, Clone)]
pub struct Credentials {
    config: CredentialConfig,
}

impl Credentials {
    pub fn new(config: CredentialConfig) -> Self {
        Self { config }
    }

    /// Hash `plaintext` with a fresh random salt.
    pub fn hash(&self, plaintext: &str) -> Result<HashedSecret> {
        let mut salt = [0u8; SALT_LEN];
        rand::rng().fill_bytes(&mut salt);

        let digest = self.derive(plaintext, &salt, self.config.iterations)?;

        Ok(HashedSecret {
            hash: BASE64.encode(digest),
            salt: BASE64.encode(salt),
            iterations: self.config.iterations,
        })
    }

    /// Recompute the hash with the stored salt and iterations and compare.
    /// The comparison of the digests runs in constant time.
    pub fn compare(&self, plaintext: &str, stored: &HashedSecret) -> Result<bool> {
        let salt = BASE64.decode(&stored.salt)?;
        let expected = BASE64.decode(&stored.hash)?;

        let digest = self.derive(plaintext, &salt, stored.iterations)?;

        let expected = Output::new(&expected).map_err(|e| anyhow!("Invalid stored hash: {}", e))?;
        let actual = Output::new(&digest).map_err(|e| anyhow!("Invalid derived hash: {}", e))?;
        Ok(expected == actual)
    }

    fn derive(&self, plaintext: &str, salt: &[u8], iterations: u32) -> Result<[u8; HASH_LEN]> {
        let params = Params::new(self.config.memory_kib, iterations, 1, Some(HASH_LEN))
            .map_err(|e| anyhow!("Invalid KDF parameters: {}", e))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut out = [0u8; HASH_LEN];
        argon2
            .hash_password_into(plaintext.as_bytes(), salt, &mut out)
            .map_err(|e| anyhow!("Hashing failed: {}", e))?;
        Ok(out)
    }
}
