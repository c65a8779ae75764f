//! Gemeinsame Typen fuer das Kryptografie-Subsystem

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{CryptoError, CryptoResult};

/// Laenge einer AEAD-Nonce in Bytes (96 Bit)
pub const NONCE_LEN: usize = 12;

/// Laenge eines AEAD-Auth-Tags in Bytes (128 Bit)
pub const TAG_LEN: usize = 16;

/// Laenge eines Session Keys in Bytes (256 Bit)
pub const SESSION_KEY_LEN: usize = 32;

/// Sicherer Schluessel-Container (wird beim Drop genullt)
#[derive(Clone, PartialEq, Eq)]
pub struct SecretBytes(Vec<u8>);

impl Drop for SecretBytes {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretBytes([REDACTED] {} bytes)", self.0.len())
    }
}

impl SecretBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
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

/// Oeffentlicher DH-Schluessel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    pub bytes: Vec<u8>,
}

impl PublicKey {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Kodiert den Schluessel fuer das Wire (Base64)
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.bytes)
    }

    /// Dekodiert einen Schluessel vom Wire
    pub fn from_base64(encoded: &str) -> CryptoResult<Self> {
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| CryptoError::KeyExchange(format!("Public Key nicht dekodierbar: {e}")))?;
        Ok(Self { bytes })
    }
}

/// Ein DH-Schluessel-Paar (oeffentlich + privat)
///
/// Der private Teil verlaesst den Endpunkt nie.
#[derive(Debug, Clone)]
pub struct KeyPair {
    /// Privater Skalar
    pub private_key: SecretBytes,
    /// Zugehoeriger oeffentlicher Wert
    pub public_key: PublicKey,
}

/// Rohes Ergebnis des DH-Austauschs (wird nie uebertragen)
#[derive(Debug)]
pub struct SharedSecret(pub SecretBytes);

impl SharedSecret {
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

/// Symmetrischer 256-Bit Session Key (wird beim Drop genullt)
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey([u8; SESSION_KEY_LEN]);

impl SessionKey {
    pub fn from_bytes(bytes: [u8; SESSION_KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SESSION_KEY_LEN] {
        &self.0
    }
}

impl Drop for SessionKey {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionKey([REDACTED])")
    }
}

/// Eine AEAD-Nonce (Number used once, 96 Bit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Nonce {
    pub bytes: [u8; NONCE_LEN],
}

impl Nonce {
    /// Erstellt eine frische Nonce aus dem OS-Zufallsgenerator
    pub fn zufaellig() -> Self {
        let mut bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; NONCE_LEN] {
        &self.bytes
    }
}

/// Verschluesselter Umschlag (Nonce + Auth-Tag + Ciphertext)
///
/// Auf dem Wire ein einzelner Base64-Blob:
/// ```text
/// [nonce(12)] [tag(16)] [ciphertext]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedEnvelope {
    pub nonce: Nonce,
    pub tag: [u8; TAG_LEN],
    pub ciphertext: Vec<u8>,
}

impl EncryptedEnvelope {
    /// Minimale Laenge eines serialisierten Umschlags
    pub const MIN_LEN: usize = NONCE_LEN + TAG_LEN;

    /// Serialisiert zu Bytes: [nonce(12)] + [tag(16)] + [ciphertext]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::MIN_LEN + self.ciphertext.len());
        out.extend_from_slice(&self.nonce.bytes);
        out.extend_from_slice(&self.tag);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Deserialisiert aus Bytes
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() < Self::MIN_LEN {
            return Err(CryptoError::UngueltigeDaten(format!(
                "Umschlag zu kurz: {} Bytes (Minimum: {})",
                bytes.len(),
                Self::MIN_LEN
            )));
        }
        let mut nonce_bytes = [0u8; NONCE_LEN];
        nonce_bytes.copy_from_slice(&bytes[..NONCE_LEN]);
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&bytes[NONCE_LEN..Self::MIN_LEN]);

        Ok(Self {
            nonce: Nonce { bytes: nonce_bytes },
            tag,
            ciphertext: bytes[Self::MIN_LEN..].to_vec(),
        })
    }

    /// Kodiert den Umschlag fuer das Wire
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.to_bytes())
    }

    /// Dekodiert einen Umschlag vom Wire
    pub fn from_base64(encoded: &str) -> CryptoResult<Self> {
        let bytes = BASE64.decode(encoded.trim())?;
        Self::from_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_bytes_debug_ist_redigiert() {
        let secret = SecretBytes::new(vec![1, 2, 3]);
        let debug = format!("{:?}", secret);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("[1, 2, 3]"));
    }

    #[test]
    fn session_key_debug_ist_redigiert() {
        let key = SessionKey::from_bytes([7u8; SESSION_KEY_LEN]);
        assert_eq!(format!("{:?}", key), "SessionKey([REDACTED])");
    }

    #[test]
    fn umschlag_layout() {
        let envelope = EncryptedEnvelope {
            nonce: Nonce { bytes: [1u8; NONCE_LEN] },
            tag: [2u8; TAG_LEN],
            ciphertext: vec![3, 3, 3],
        };
        let bytes = envelope.to_bytes();
        assert_eq!(bytes.len(), NONCE_LEN + TAG_LEN + 3);
        assert_eq!(&bytes[..NONCE_LEN], &[1u8; NONCE_LEN]);
        assert_eq!(&bytes[NONCE_LEN..NONCE_LEN + TAG_LEN], &[2u8; TAG_LEN]);
        assert_eq!(&bytes[NONCE_LEN + TAG_LEN..], &[3, 3, 3]);

        let restored = EncryptedEnvelope::from_base64(&envelope.to_base64()).unwrap();
        assert_eq!(restored, envelope);
    }

    #[test]
    fn zu_kurzer_umschlag() {
        let result = EncryptedEnvelope::from_bytes(&[0u8; EncryptedEnvelope::MIN_LEN - 1]);
        assert!(matches!(result, Err(CryptoError::UngueltigeDaten(_))));
    }

    #[test]
    fn ungueltiges_base64() {
        let result = EncryptedEnvelope::from_base64("%%%nicht-base64%%%");
        assert!(matches!(result, Err(CryptoError::Base64(_))));
    }

    #[test]
    fn public_key_base64() {
        let key = PublicKey::new(vec![9u8; 32]);
        let decoded = PublicKey::from_base64(&key.to_base64()).unwrap();
        assert_eq!(decoded, key);
        assert!(PublicKey::from_base64("***").is_err());
    }
}
