//! Encryption gateway for keyrack.
//!
//! A key's body is persisted in whatever form the configured [`Cipher`]
//! produces. Decryption is a pure read: it returns a transient plaintext and
//! never rewrites the stored form, so decrypting the same stored bytes twice
//! yields the same plaintext both times.
//!
//! Three interchangeable strategies are provided:
//! - [`NullCipher`]: pass-through, stored form == plaintext;
//! - [`XChaChaCipher`]: the host-native AEAD (XChaCha20-Poly1305);
//! - [`LegacyCipher`]: compatibility strategy for importing older exported
//!   payloads (AES-256-GCM under a SHA-256 derived key, base64 text framing).

use aes_gcm::aead::Aead as _;
use aes_gcm::{Aes256Gcm, KeyInit as _};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chacha20poly1305::XChaCha20Poly1305;
use rand_core::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use zeroize::Zeroizing;

const XCHACHA_NONCE_LEN: usize = 24;
const GCM_NONCE_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum EncryptError {
    #[error("AEAD encryption failed")]
    AeadFailed,
}

#[derive(Debug, Error)]
pub enum DecryptError {
    #[error("AEAD decryption failed")]
    AeadFailed,
    #[error("stored form is malformed: {0}")]
    Malformed(&'static str),
}

/// Uniform encrypt/decrypt boundary over a key's body.
///
/// `decrypt` must be idempotent and side-effect-free on the stored value.
pub trait Cipher: Send + Sync {
    /// Produce the stored form of a plaintext body.
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, EncryptError>;

    /// Recover the plaintext from a stored body. The result is transient and
    /// zeroized on drop; the stored bytes are untouched.
    fn decrypt(&self, stored: &[u8]) -> Result<Zeroizing<Vec<u8>>, DecryptError>;
}

/// Pass-through strategy: the stored form is the plaintext.
pub struct NullCipher;

impl Cipher for NullCipher {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, EncryptError> {
        Ok(plaintext.to_vec())
    }

    fn decrypt(&self, stored: &[u8]) -> Result<Zeroizing<Vec<u8>>, DecryptError> {
        Ok(Zeroizing::new(stored.to_vec()))
    }
}

/// Host-native strategy: XChaCha20-Poly1305 with a random 24-byte nonce
/// prefixed to the ciphertext.
pub struct XChaChaCipher {
    key: Zeroizing<[u8; 32]>,
}

impl XChaChaCipher {
    pub fn new(key: [u8; 32]) -> Self {
        Self {
            key: Zeroizing::new(key),
        }
    }
}

impl Cipher for XChaChaCipher {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, EncryptError> {
        let key = chacha20poly1305::Key::from(*self.key);
        let cipher = XChaCha20Poly1305::new(&key);

        let mut nonce_bytes = [0u8; XCHACHA_NONCE_LEN];
        rand_core::OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = chacha20poly1305::XNonce::from(nonce_bytes);

        let ct = cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| EncryptError::AeadFailed)?;

        let mut stored = Vec::with_capacity(XCHACHA_NONCE_LEN + ct.len());
        stored.extend_from_slice(&nonce_bytes);
        stored.extend_from_slice(&ct);
        Ok(stored)
    }

    fn decrypt(&self, stored: &[u8]) -> Result<Zeroizing<Vec<u8>>, DecryptError> {
        if stored.len() < XCHACHA_NONCE_LEN {
            return Err(DecryptError::Malformed("missing nonce prefix"));
        }
        let key = chacha20poly1305::Key::from(*self.key);
        let cipher = XChaCha20Poly1305::new(&key);

        let mut nonce_bytes = [0u8; XCHACHA_NONCE_LEN];
        nonce_bytes.copy_from_slice(&stored[..XCHACHA_NONCE_LEN]);
        let nonce = chacha20poly1305::XNonce::from(nonce_bytes);

        let pt = cipher
            .decrypt(&nonce, &stored[XCHACHA_NONCE_LEN..])
            .map_err(|_| DecryptError::AeadFailed)?;
        Ok(Zeroizing::new(pt))
    }
}

/// Compatibility strategy for older exported payloads: AES-256-GCM under a
/// SHA-256 derived key, 12-byte nonce prefix, whole stored form base64 text.
pub struct LegacyCipher {
    key: Zeroizing<[u8; 32]>,
}

impl LegacyCipher {
    /// Derive the cipher key from the legacy passphrase.
    pub fn from_passphrase(passphrase: &str) -> Self {
        let digest: [u8; 32] = Sha256::digest(passphrase.as_bytes()).into();
        Self {
            key: Zeroizing::new(digest),
        }
    }
}

impl Cipher for LegacyCipher {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, EncryptError> {
        let cipher =
            Aes256Gcm::new_from_slice(self.key.as_ref()).map_err(|_| EncryptError::AeadFailed)?;

        let mut nonce_bytes = [0u8; GCM_NONCE_LEN];
        rand_core::OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = aes_gcm::Nonce::from_slice(&nonce_bytes);

        let ct = cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| EncryptError::AeadFailed)?;

        let mut framed = Vec::with_capacity(GCM_NONCE_LEN + ct.len());
        framed.extend_from_slice(&nonce_bytes);
        framed.extend_from_slice(&ct);
        Ok(BASE64.encode(framed).into_bytes())
    }

    fn decrypt(&self, stored: &[u8]) -> Result<Zeroizing<Vec<u8>>, DecryptError> {
        let framed = BASE64
            .decode(stored)
            .map_err(|_| DecryptError::Malformed("invalid base64"))?;
        if framed.len() < GCM_NONCE_LEN {
            return Err(DecryptError::Malformed("missing nonce prefix"));
        }

        let cipher = Aes256Gcm::new_from_slice(self.key.as_ref())
            .map_err(|_| DecryptError::Malformed("bad key length"))?;
        let nonce = aes_gcm::Nonce::from_slice(&framed[..GCM_NONCE_LEN]);

        let pt = cipher
            .decrypt(nonce, &framed[GCM_NONCE_LEN..])
            .map_err(|_| DecryptError::AeadFailed)?;
        Ok(Zeroizing::new(pt))
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Strategy selection
// ──────────────────────────────────────────────────────────────────────────────

/// Which strategy the gateway runs with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CipherMode {
    Null,
    Native,
    Legacy,
}

#[derive(Debug, Error)]
pub enum CipherConfigError {
    #[error("cipher mode '{0:?}' requires a key")]
    MissingKey(CipherMode),
    #[error("invalid key material: {0}")]
    InvalidKey(String),
}

/// Gateway configuration. `key_hex` is the hex-encoded 32-byte key for the
/// native mode, or the legacy passphrase for legacy mode; unused for null.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CipherSettings {
    pub mode: CipherMode,
    #[serde(default)]
    pub key_hex: Option<String>,
}

impl CipherSettings {
    /// Build the configured strategy.
    pub fn build(&self) -> Result<Box<dyn Cipher>, CipherConfigError> {
        match self.mode {
            CipherMode::Null => Ok(Box::new(NullCipher)),
            CipherMode::Native => {
                let hex_key = self
                    .key_hex
                    .as_deref()
                    .ok_or(CipherConfigError::MissingKey(CipherMode::Native))?;
                let bytes = hex::decode(hex_key)
                    .map_err(|e| CipherConfigError::InvalidKey(e.to_string()))?;
                let key: [u8; 32] = bytes
                    .try_into()
                    .map_err(|_| CipherConfigError::InvalidKey("key must be 32 bytes".into()))?;
                Ok(Box::new(XChaChaCipher::new(key)))
            }
            CipherMode::Legacy => {
                let passphrase = self
                    .key_hex
                    .as_deref()
                    .ok_or(CipherConfigError::MissingKey(CipherMode::Legacy))?;
                Ok(Box::new(LegacyCipher::from_passphrase(passphrase)))
            }
        }
    }
}
