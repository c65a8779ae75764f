//! Key Derivation (HKDF-SHA256)
//!
//! Leitet aus dem rohen DH-Shared-Secret den 256-Bit Session Key ab.
//! Ohne Salt, mit festem protokollweitem Label. Gleiches Secret ergibt auf
//! beiden Endpunkten denselben Schluessel.

use hkdf::Hkdf;
use sha2::Sha256;

use crate::error::{CryptoError, CryptoResult};
use crate::types::{SessionKey, SharedSecret, SESSION_KEY_LEN};

/// Domain-Separation-Label fuer den Chat-Schluessel
pub const SESSION_KEY_LABEL: &[u8] = b"chat-encryption-key";

/// Schmale Schnittstelle fuer Key-Derivation-Funktionen
pub trait KeyDerivationFunction: Send + Sync + std::fmt::Debug {
    /// Fuellt `okm` deterministisch aus `ikm` und `info`
    fn derive(&self, ikm: &[u8], info: &[u8], okm: &mut [u8]) -> CryptoResult<()>;
}

/// HKDF mit SHA-256, ohne Salt
#[derive(Debug, Default, Clone, Copy)]
pub struct HkdfSha256;

impl KeyDerivationFunction for HkdfSha256 {
    fn derive(&self, ikm: &[u8], info: &[u8], okm: &mut [u8]) -> CryptoResult<()> {
        let hk = Hkdf::<Sha256>::new(None, ikm);
        hk.expand(info, okm)
            .map_err(|e| CryptoError::KeyDerivation(e.to_string()))
    }
}

/// Leitet den Session Key aus dem Shared Secret ab
pub fn derive_session_key(
    kdf: &dyn KeyDerivationFunction,
    secret: &SharedSecret,
) -> CryptoResult<SessionKey> {
    if secret.as_bytes().is_empty() {
        return Err(CryptoError::KeyDerivation("Leeres Shared Secret".to_string()));
    }
    let mut okm = [0u8; SESSION_KEY_LEN];
    kdf.derive(secret.as_bytes(), SESSION_KEY_LABEL, &mut okm)?;
    let key = SessionKey::from_bytes(okm);
    okm.iter_mut().for_each(|b| *b = 0);
    Ok(key)
}
