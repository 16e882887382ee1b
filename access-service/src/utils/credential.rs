use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Newtype for an inbound plaintext credential. Wraps `SecretString` so
/// the value never lands in logs or debug output.
#[derive(Clone)]
pub struct Credential(SecretString);

impl Credential {
    pub fn new(credential: impl Into<String>) -> Self {
        Self(SecretString::new(credential.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(****)")
    }
}

/// Newtype for a stored credential hash.
///
/// Two formats are accepted: Argon2id PHC strings (current) and bare hex
/// SHA-256 digests (legacy populations not yet rehashed).
#[derive(Debug, Clone)]
pub struct CredentialHash(String);

impl CredentialHash {
    pub fn new(hash: String) -> Self {
        Self(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Check for the legacy hex SHA-256 format.
    pub fn is_legacy(&self) -> bool {
        self.0.len() == 64 && self.0.bytes().all(|b| b.is_ascii_hexdigit())
    }
}

/// Hash a credential using Argon2.
///
/// Uses the Argon2id variant with secure default parameters. Salt is
/// automatically generated and included in the hash. New hashes are
/// always Argon2id, never the legacy format.
pub fn hash_credential(credential: &Credential) -> Result<CredentialHash, anyhow::Error> {
    let argon2 = Argon2::default();
    let salt = SaltString::generate(&mut OsRng);

    let credential_hash = argon2
        .hash_password(credential.expose().as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash credential: {}", e))?
        .to_string();

    Ok(CredentialHash::new(credential_hash))
}

/// Verify a credential against a stored hash.
///
/// Returns Ok(()) if the credential matches, Err otherwise. Argon2id
/// hashes verify through the argon2 crate; legacy hex SHA-256 digests
/// compare in constant time.
pub fn verify_credential(
    credential: &Credential,
    credential_hash: &CredentialHash,
) -> Result<(), anyhow::Error> {
    if credential_hash.is_legacy() {
        return verify_legacy_sha256(credential, credential_hash);
    }

    let parsed_hash = PasswordHash::new(credential_hash.as_str())
        .map_err(|e| anyhow::anyhow!("Invalid credential hash format: {}", e))?;

    Argon2::default()
        .verify_password(credential.expose().as_bytes(), &parsed_hash)
        .map_err(|_| anyhow::anyhow!("Credential verification failed"))
}

fn verify_legacy_sha256(
    credential: &Credential,
    credential_hash: &CredentialHash,
) -> Result<(), anyhow::Error> {
    let digest = Sha256::digest(credential.expose().as_bytes());
    let stored = hex::decode(credential_hash.as_str())
        .map_err(|e| anyhow::anyhow!("Invalid legacy credential hash: {}", e))?;

    if digest.ct_eq(stored.as_slice()).into() {
        Ok(())
    } else {
        Err(anyhow::anyhow!("Credential verification failed"))
    }
}
