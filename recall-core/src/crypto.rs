//! Password-based authenticated encryption for at-rest payloads.
//!
//! Keys are derived with PBKDF2-HMAC-SHA512 (100 000 rounds, 256-bit
//! output) from the password and a random 256-bit salt. Payloads are sealed
//! with AES-256-GCM under a random 96-bit IV; the 128-bit GCM tag is kept
//! as a separate field. Every call draws a fresh salt and IV, so sealing
//! the same plaintext twice never repeats ciphertext, IV or salt.
//!
//! All binary fields travel base64-encoded.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use rand::distributions::Alphanumeric;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use tracing::{debug, info};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{RecallError, Result};

/// PBKDF2 rounds.
pub const KDF_ITERATIONS: u32 = 100_000;
/// Derived key size (AES-256).
pub const KEY_SIZE: usize = 32;
/// Salt size.
pub const SALT_SIZE: usize = 32;
/// AES-GCM nonce size.
pub const IV_SIZE: usize = 12;
/// AES-GCM tag size.
pub const TAG_SIZE: usize = 16;
/// Default length of [`Encryptor::generate_password`] output.
pub const DEFAULT_PASSWORD_LENGTH: usize = 32;

/// A sealed payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload {
    /// Ciphertext without the tag.
    pub ciphertext: String,
    /// AES-GCM nonce.
    pub iv: String,
    /// AES-GCM authentication tag.
    pub tag: String,
    /// KDF salt.
    pub salt: String,
}

/// Long-lived key derived by [`Encryptor::initialize`]. Wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
struct MasterKey {
    key: [u8; KEY_SIZE],
    salt: [u8; SALT_SIZE],
}

/// The encryption unit.
#[derive(Default)]
pub struct Encryptor {
    master: Option<MasterKey>,
}

impl std::fmt::Debug for Encryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encryptor")
            .field("initialized", &self.master.is_some())
            .finish_non_exhaustive()
    }
}

impl Encryptor {
    /// Create an encryptor with no master key.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive and keep a long-lived key from `password` and a random salt.
    pub fn initialize(&mut self, password: &str) {
        let salt = random_bytes::<SALT_SIZE>();
        let key = derive_key(password, &salt);
        self.master = Some(MasterKey { key: *key, salt });
        info!("Encryption master key initialized");
    }

    /// Whether [`Self::initialize`] has been called.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.master.is_some()
    }

    /// Seal `plaintext` under a key derived from `password` and a fresh salt.
    ///
    /// # Errors
    /// Returns [`RecallError::Encryption`] if the cipher fails.
    pub fn encrypt(&self, plaintext: &str, password: &str) -> Result<EncryptedPayload> {
        let salt = random_bytes::<SALT_SIZE>();
        let key = derive_key(password, &salt);
        seal(&key, &salt, plaintext)
    }

    /// Open a payload sealed by [`Self::encrypt`].
    ///
    /// # Errors
    /// Returns [`RecallError::Decryption`] on a wrong password, tampered
    /// fields, or malformed encoding. Never returns unverified plaintext.
    pub fn decrypt(&self, payload: &EncryptedPayload, password: &str) -> Result<String> {
        let salt = decode_field(&payload.salt, "salt")?;
        let key = derive_key(password, &salt);
        open(&key, payload)
    }

    /// Seal `plaintext` under the master key with a fresh IV.
    ///
    /// # Errors
    /// Returns [`RecallError::Configuration`] if not initialized, or
    /// [`RecallError::Encryption`] if the cipher fails.
    pub fn encrypt_with_master(&self, plaintext: &str) -> Result<EncryptedPayload> {
        let master = self.master()?;
        seal(&master.key, &master.salt, plaintext)
    }

    /// Open a payload sealed by [`Self::encrypt_with_master`].
    ///
    /// # Errors
    /// Returns [`RecallError::Configuration`] if not initialized, or
    /// [`RecallError::Decryption`] if the payload was not sealed under
    /// this master key or fails verification.
    pub fn decrypt_with_master(&self, payload: &EncryptedPayload) -> Result<String> {
        let master = self.master()?;
        let salt = decode_field(&payload.salt, "salt")?;
        if salt.as_slice() != master.salt.as_slice() {
            return Err(RecallError::Decryption(
                "payload was not sealed with the master key".to_string(),
            ));
        }
        open(&master.key, payload)
    }

    /// Generate a random alphanumeric password.
    #[must_use]
    pub fn generate_password(length: usize) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(length)
            .map(char::from)
            .collect()
    }

    /// Deterministic SHA-256 hex digest.
    #[must_use]
    pub fn hash(data: &str) -> String {
        hex::encode(Sha256::digest(data.as_bytes()))
    }

    /// Whether `hash` is the digest of `data`.
    #[must_use]
    pub fn verify_hash(data: &str, hash: &str) -> bool {
        Self::hash(data).eq_ignore_ascii_case(hash)
    }

    fn master(&self) -> Result<&MasterKey> {
        self.master.as_ref().ok_or_else(|| {
            RecallError::Configuration("encryption master key not initialized".to_string())
        })
    }
}

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut buf = [0u8; N];
    rand::thread_rng().fill_bytes(&mut buf);
    buf
}

fn derive_key(password: &str, salt: &[u8]) -> Zeroizing<[u8; KEY_SIZE]> {
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    pbkdf2::pbkdf2_hmac::<Sha512>(password.as_bytes(), salt, KDF_ITERATIONS, &mut *key);
    key
}

fn seal(key: &[u8; KEY_SIZE], salt: &[u8], plaintext: &str) -> Result<EncryptedPayload> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| RecallError::Encryption(format!("Failed to create cipher: {e}")))?;

    let iv = random_bytes::<IV_SIZE>();
    let mut sealed = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext.as_bytes())
        .map_err(|e| RecallError::Encryption(e.to_string()))?;

    // aes-gcm appends the tag to the ciphertext.
    let tag = sealed.split_off(sealed.len() - TAG_SIZE);

    debug!(bytes = plaintext.len(), "Sealed payload");
    Ok(EncryptedPayload {
        ciphertext: B64.encode(&sealed),
        iv: B64.encode(iv),
        tag: B64.encode(tag),
        salt: B64.encode(salt),
    })
}

fn open(key: &[u8; KEY_SIZE], payload: &EncryptedPayload) -> Result<String> {
    let iv = decode_field(&payload.iv, "iv")?;
    let tag = decode_field(&payload.tag, "tag")?;
    let mut sealed = decode_field(&payload.ciphertext, "ciphertext")?;

    if iv.len() != IV_SIZE {
        return Err(RecallError::Decryption(format!("iv must be {IV_SIZE} bytes")));
    }
    if tag.len() != TAG_SIZE {
        return Err(RecallError::Decryption(format!("tag must be {TAG_SIZE} bytes")));
    }
    sealed.extend_from_slice(&tag);

    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| RecallError::Decryption(format!("Failed to create cipher: {e}")))?;
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&iv), sealed.as_slice())
        .map_err(|_| RecallError::Decryption("authentication failed".to_string()))?;

    String::from_utf8(plaintext).map_err(|e| RecallError::Decryption(e.to_string()))
}

fn decode_field(value: &str, field: &str) -> Result<Vec<u8>> {
    B64.decode(value)
        .map_err(|e| RecallError::Decryption(format!("invalid {field} encoding: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_edge_case_payloads() {
        let unit = Encryptor::new();
        let long = "memory ".repeat(2_000);
        for text in ["", "Hello, recall!", "こんにちは 🌸 café", long.as_str()] {
            let sealed = unit.encrypt(text, "pw").expect("encrypt");
            assert_eq!(unit.decrypt(&sealed, "pw").expect("decrypt"), text);
        }
    }

    #[test]
    fn encryption_is_randomized() {
        let unit = Encryptor::new();
        let a = unit.encrypt("same", "pw").expect("encrypt");
        let b = unit.encrypt("same", "pw").expect("encrypt");
        assert_ne!(a.ciphertext, b.ciphertext);
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.salt, b.salt);
    }

    #[test]
    fn wrong_password_fails() {
        let unit = Encryptor::new();
        let sealed = unit.encrypt("secret", "right").expect("encrypt");
        assert!(matches!(unit.decrypt(&sealed, "wrong"), Err(RecallError::Decryption(_))));
    }

    #[test]
    fn tampering_is_detected() {
        let unit = Encryptor::new();
        let sealed = unit.encrypt("secret message", "pw").expect("encrypt");

        let mut bad_tag = sealed.clone();
        let mut tag = B64.decode(&bad_tag.tag).expect("b64");
        tag[0] ^= 0x01;
        bad_tag.tag = B64.encode(tag);
        assert!(matches!(unit.decrypt(&bad_tag, "pw"), Err(RecallError::Decryption(_))));

        let mut bad_ct = sealed.clone();
        let mut ct = B64.decode(&bad_ct.ciphertext).expect("b64");
        ct[0] ^= 0x80;
        bad_ct.ciphertext = B64.encode(ct);
        assert!(matches!(unit.decrypt(&bad_ct, "pw"), Err(RecallError::Decryption(_))));

        let mut garbage = sealed;
        garbage.iv = "not base64!".to_string();
        assert!(matches!(unit.decrypt(&garbage, "pw"), Err(RecallError::Decryption(_))));
    }

    #[test]
    fn master_key_round_trip() {
        let mut unit = Encryptor::new();
        assert!(matches!(
            unit.encrypt_with_master("x"),
            Err(RecallError::Configuration(_))
        ));
        unit.initialize("master");
        assert!(unit.is_initialized());
        let sealed = unit.encrypt_with_master("kept").expect("encrypt");
        assert_eq!(unit.decrypt_with_master(&sealed).expect("decrypt"), "kept");

        let foreign = unit.encrypt("kept", "master").expect("encrypt");
        assert!(matches!(unit.decrypt_with_master(&foreign), Err(RecallError::Decryption(_))));
    }

    #[test]
    fn derived_keys_are_deterministic_and_wipeable() {
        let salt = [7u8; SALT_SIZE];
        let key = derive_key("pw", &salt);
        assert_eq!(*key, *derive_key("pw", &salt));
        assert_ne!(*key, *derive_key("other", &salt));

        let mut master = MasterKey { key: *key, salt };
        master.zeroize();
        assert_eq!(master.key, [0u8; KEY_SIZE]);
        assert_eq!(master.salt, [0u8; SALT_SIZE]);
    }

    #[test]
    fn passwords_are_random() {
        let a = Encryptor::generate_password(DEFAULT_PASSWORD_LENGTH);
        let b = Encryptor::generate_password(DEFAULT_PASSWORD_LENGTH);
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn hash_is_deterministic() {
        let h = Encryptor::hash("abc");
        assert_eq!(h.len(), 64);
        assert_eq!(h, Encryptor::hash("abc"));
        assert!(Encryptor::verify_hash("abc", &h));
        assert!(!Encryptor::verify_hash("abd", &h));
        // Known SHA-256 test vector.
        assert_eq!(h, "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
    }
}
