//! Chat-Payload Verschluesselung
//!
//! Jeder Aufruf zieht eine frische 96-Bit Nonce aus dem OS-Zufallsgenerator.
//! Bei 2^96 moeglichen Werten ist eine Kollision unter einem Session Key
//! fuer die Lebensdauer einer Verbindung vernachlaessigbar.

use crate::e2e::cipher::AeadCipher;
use crate::error::CryptoResult;
use crate::types::{EncryptedEnvelope, Nonce, SessionKey};

/// Verschluesselt einen Payload mit frischer Nonce
pub fn encrypt_message(
    cipher: &dyn AeadCipher,
    key: &SessionKey,
    plaintext: &[u8],
) -> CryptoResult<EncryptedEnvelope> {
    cipher.seal(key, Nonce::zufaellig(), plaintext)
}

/// Verschluesselt Chat-Text und liefert den Base64-Umschlag fuer das Wire
pub fn encrypt_text(cipher: &dyn AeadCipher, key: &SessionKey, text: &str) -> CryptoResult<String> {
    Ok(encrypt_message(cipher, key, text.as_bytes())?.to_base64())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::e2e::cipher::Aes256GcmCipher;
    use crate::types::{NONCE_LEN, TAG_LEN};

    #[test]
    fn nonces_sind_eindeutig() {
        let key = SessionKey::from_bytes([5u8; 32]);
        let mut gesehen = HashSet::new();
        for _ in 0..10_000 {
            let envelope = encrypt_message(&Aes256GcmCipher, &key, b"x").unwrap();
            assert!(gesehen.insert(envelope.nonce), "Nonce doppelt vergeben");
        }
        assert_eq!(gesehen.len(), 10_000);
    }

    #[test]
    fn gleicher_text_ergibt_verschiedene_umschlaege() {
        let key = SessionKey::from_bytes([6u8; 32]);
        let a = encrypt_text(&Aes256GcmCipher, &key, "hallo").unwrap();
        let b = encrypt_text(&Aes256GcmCipher, &key, "hallo").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn umschlag_groesse() {
        let key = SessionKey::from_bytes([7u8; 32]);
        let envelope = encrypt_message(&Aes256GcmCipher, &key, b"hello bob").unwrap();
        assert_eq!(envelope.to_bytes().len(), NONCE_LEN + TAG_LEN + 9);
    }
}
