//! Chat-Payload Entschluesselung
//!
//! Verifiziert den Auth-Tag bevor Klartext herausgegeben wird. Ein einzelner
//! fehlerhafter Umschlag macht den Session Key nicht ungueltig.

use crate::e2e::cipher::AeadCipher;
use crate::error::{CryptoError, CryptoResult};
use crate::types::{EncryptedEnvelope, SessionKey};

/// Entschluesselt einen Umschlag
pub fn decrypt_message(
    cipher: &dyn AeadCipher,
    key: &SessionKey,
    envelope: &EncryptedEnvelope,
) -> CryptoResult<Vec<u8>> {
    cipher.open(key, envelope)
}

/// Entschluesselt einen Base64-Umschlag vom Wire zu Chat-Text
pub fn decrypt_text(cipher: &dyn AeadCipher, key: &SessionKey, encoded: &str) -> CryptoResult<String> {
    let envelope = EncryptedEnvelope::from_base64(encoded)?;
    let plaintext = decrypt_message(cipher, key, &envelope)?;
    String::from_utf8(plaintext)
        .map_err(|_| CryptoError::UngueltigeDaten("Klartext ist kein UTF-8".to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
