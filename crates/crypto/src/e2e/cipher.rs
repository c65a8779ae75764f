//! AEAD-Cipher (AES-256-GCM)
//!
//! 256-Bit Schluessel, 96-Bit Nonce, 128-Bit Auth-Tag. Der Tag wird
//! detached erzeugt, damit der Umschlag das Layout
//! `[nonce(12)] [tag(16)] [ciphertext]` hat.

use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::Aes256Gcm;

use crate::error::{CryptoError, CryptoResult};
use crate::types::{EncryptedEnvelope, Nonce, SessionKey, TAG_LEN};

/// Schmale Schnittstelle fuer authentifizierte Verschluesselung
pub trait AeadCipher: Send + Sync + std::fmt::Debug {
    /// Verschluesselt `plaintext` mit der uebergebenen Nonce
    fn seal(&self, key: &SessionKey, nonce: Nonce, plaintext: &[u8])
        -> CryptoResult<EncryptedEnvelope>;

    /// Prueft den Tag und entschluesselt; bei Fehler wird kein Klartext
    /// herausgegeben
    fn open(&self, key: &SessionKey, envelope: &EncryptedEnvelope) -> CryptoResult<Vec<u8>>;
}

/// AES-256-GCM (RustCrypto `aes-gcm`)
#[derive(Debug, Default, Clone, Copy)]
pub struct Aes256GcmCipher;

impl Aes256GcmCipher {
    fn cipher(key: &SessionKey) -> Aes256Gcm {
        Aes256Gcm::new(GenericArray::from_slice(key.as_bytes()))
    }
}

impl AeadCipher for Aes256GcmCipher {
    fn seal(
        &self,
        key: &SessionKey,
        nonce: Nonce,
        plaintext: &[u8],
    ) -> CryptoResult<EncryptedEnvelope> {
        let mut buffer = plaintext.to_vec();
        let tag = Self::cipher(key)
            .encrypt_in_place_detached(GenericArray::from_slice(nonce.as_bytes()), b"", &mut buffer)
            .map_err(|e| CryptoError::Verschluesselung(e.to_string()))?;

        let mut tag_bytes = [0u8; TAG_LEN];
        tag_bytes.copy_from_slice(tag.as_slice());

        Ok(EncryptedEnvelope {
            nonce,
            tag: tag_bytes,
            ciphertext: buffer,
        })
    }

    fn open(&self, key: &SessionKey, envelope: &EncryptedEnvelope) -> CryptoResult<Vec<u8>> {
        let mut buffer = envelope.ciphertext.clone();
        let result = Self::cipher(key).decrypt_in_place_detached(
            GenericArray::from_slice(envelope.nonce.as_bytes()),
            b"",
            &mut buffer,
            GenericArray::from_slice(&envelope.tag),
        );

        match result {
            Ok(()) => Ok(buffer),
            Err(_) => {
                // Puffer kann bereits entschluesselte Bytes enthalten
                buffer.iter_mut().for_each(|b| *b = 0);
                Err(CryptoError::Entschluesselung(
                    "Auth-Tag ungueltig".to_string(),
                ))
            }
        }
    }
}
