//! Fingerprint eines Session Keys
//!
//! SHA-256 ueber den Schluessel. Einweg, stabil fuer denselben Key und nur
//! fuer den manuellen Vergleich ueber einen zweiten Kanal gedacht.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::types::SessionKey;

/// Anzeigbarer Hash eines Session Keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Laenge der Kurzform in Hex-Zeichen
    pub const KURZ_LAENGE: usize = 16;

    pub fn of(key: &SessionKey) -> Self {
        Self(Sha256::digest(key.as_bytes()).into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Volle Form: `AB:CD:...` (32 Byte-Paare)
    pub fn vollstaendig(&self) -> String {
        self.0
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(":")
    }

    /// Kurzform fuer Logs (erste 16 Hex-Zeichen)
    pub fn kurz(&self) -> String {
        let mut hex = hex::encode(self.0);
        hex.truncate(Self::KURZ_LAENGE);
        hex
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.vollstaendig())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_ist_stabil() {
        let key = SessionKey::from_bytes([1u8; 32]);
        assert_eq!(Fingerprint::of(&key), Fingerprint::of(&key.clone()));
    }

    #[test]
    fn verschiedene_keys_verschiedene_fingerprints() {
        let a = Fingerprint::of(&SessionKey::from_bytes([1u8; 32]));
        let b = Fingerprint::of(&SessionKey::from_bytes([2u8; 32]));
        assert_ne!(a, b);
    }

    #[test]
    fn fingerprint_ist_nicht_der_key() {
        let key = SessionKey::from_bytes([9u8; 32]);
        assert_ne!(Fingerprint::of(&key).as_bytes(), key.as_bytes());
    }

    #[test]
    fn darstellung() {
        let fp = Fingerprint::of(&SessionKey::from_bytes([0u8; 32]));
        // SHA-256 von 32 Null-Bytes
        assert_eq!(fp.kurz(), "66687aadf862bd77");
        let voll = fp.vollstaendig();
        assert_eq!(voll.len(), 32 * 2 + 31);
        assert!(voll.starts_with("66:68:7A:AD:F8:62:BD:77"));
        assert_eq!(fp.to_string(), voll);
    }
}
