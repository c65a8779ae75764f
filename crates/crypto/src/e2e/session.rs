//! SessionCrypto – Fassade ueber die drei Krypto-Primitive
//!
//! Die Endpunkt-Logik spricht nur mit dieser Fassade. Welche Engine, KDF
//! und welcher Cipher dahinter stecken, entscheidet der Konstruktor.

use crate::e2e::cipher::{AeadCipher, Aes256GcmCipher};
use crate::e2e::decrypt::decrypt_text;
use crate::e2e::encrypt::encrypt_text;
use crate::e2e::kdf::{derive_session_key, HkdfSha256, KeyDerivationFunction};
use crate::e2e::key_exchange::{DhParameters, DiffieHellmanEngine, X25519Engine};
use crate::error::CryptoResult;
use crate::fingerprint::Fingerprint;
use crate::types::{KeyPair, PublicKey, SessionKey};

/// Austauschbare Krypto-Primitive fuer eine Sitzung
#[derive(Debug)]
pub struct SessionCrypto {
    dh: Box<dyn DiffieHellmanEngine>,
    kdf: Box<dyn KeyDerivationFunction>,
    cipher: Box<dyn AeadCipher>,
}

impl Default for SessionCrypto {
    /// X25519 + HKDF-SHA256 + AES-256-GCM
    fn default() -> Self {
        Self::new(
            Box::new(X25519Engine::new()),
            Box::new(HkdfSha256),
            Box::new(Aes256GcmCipher),
        )
    }
}

impl SessionCrypto {
    pub fn new(
        dh: Box<dyn DiffieHellmanEngine>,
        kdf: Box<dyn KeyDerivationFunction>,
        cipher: Box<dyn AeadCipher>,
    ) -> Self {
        Self { dh, kdf, cipher }
    }

    /// Erzeugt die DH-Parameter (Relay-Seite, einmal pro Laufzeit)
    pub fn generate_parameters(&self) -> CryptoResult<DhParameters> {
        self.dh.generate_parameters()
    }

    pub fn validate_parameters(&self, params: &DhParameters) -> CryptoResult<()> {
        self.dh.validate_parameters(params)
    }

    /// Erzeugt ein frisches Schluessel-Paar fuer diese Verbindung
    pub fn generate_keypair(&self, params: &DhParameters) -> CryptoResult<KeyPair> {
        self.dh.generate_keypair(params)
    }

    /// DH-Austausch + HKDF in einem Schritt
    ///
    /// Das Shared Secret lebt nur innerhalb dieser Funktion.
    pub fn derive_session_key(
        &self,
        params: &DhParameters,
        own: &KeyPair,
        peer_public: &PublicKey,
    ) -> CryptoResult<SessionKey> {
        let secret = self.dh.exchange(params, own, peer_public)?;
        derive_session_key(self.kdf.as_ref(), &secret)
    }

    /// Verschluesselt Chat-Text zum Base64-Umschlag
    pub fn encrypt(&self, key: &SessionKey, text: &str) -> CryptoResult<String> {
        encrypt_text(self.cipher.as_ref(), key, text)
    }

    /// Entschluesselt einen Base64-Umschlag zu Chat-Text
    pub fn decrypt(&self, key: &SessionKey, encoded: &str) -> CryptoResult<String> {
        decrypt_text(self.cipher.as_ref(), key, encoded)
    }

    pub fn fingerprint(&self, key: &SessionKey) -> Fingerprint {
        Fingerprint::of(key)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beide_endpunkte_leiten_gleichen_key_ab() {
        let crypto = SessionCrypto::default();
        let params = crypto.generate_parameters().unwrap();

        for _ in 0..16 {
            let alice = crypto.generate_keypair(&params).unwrap();
            let bob = crypto.generate_keypair(&params).unwrap();

            let k_alice = crypto
                .derive_session_key(&params, &alice, &bob.public_key)
                .unwrap();
            let k_bob = crypto
                .derive_session_key(&params, &bob, &alice.public_key)
                .unwrap();

            assert_eq!(k_alice, k_bob);
            assert_eq!(crypto.fingerprint(&k_alice), crypto.fingerprint(&k_bob));
        }
    }

    #[test]
    fn hello_bob_ende_zu_ende() {
        let crypto = SessionCrypto::default();
        let params = crypto.generate_parameters().unwrap();
        let alice = crypto.generate_keypair(&params).unwrap();
        let bob = crypto.generate_keypair(&params).unwrap();
        let k_alice = crypto
            .derive_session_key(&params, &alice, &bob.public_key)
            .unwrap();
        let k_bob = crypto
            .derive_session_key(&params, &bob, &alice.public_key)
            .unwrap();

        let wire = crypto.encrypt(&k_alice, "hello bob").unwrap();
        assert!(!wire.contains("hello"));
        assert_eq!(crypto.decrypt(&k_bob, &wire).unwrap(), "hello bob");
    }

    #[test]
    fn fremder_key_kann_nicht_entschluesseln() {
        let crypto = SessionCrypto::default();
        let params = crypto.generate_parameters().unwrap();
        let alice = crypto.generate_keypair(&params).unwrap();
        let bob = crypto.generate_keypair(&params).unwrap();
        let mallory = crypto.generate_keypair(&params).unwrap();

        let k_ab = crypto
            .derive_session_key(&params, &alice, &bob.public_key)
            .unwrap();
        let k_am = crypto
            .derive_session_key(&params, &mallory, &alice.public_key)
            .unwrap();

        let wire = crypto.encrypt(&k_ab, "nur fuer bob").unwrap();
        assert!(crypto.decrypt(&k_am, &wire).is_err());
    }
}
