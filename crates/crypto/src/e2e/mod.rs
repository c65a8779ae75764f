//! E2E Verschluesselung (End-to-End)
//!
//! Endpunkt <-> Endpunkt Verschluesselung. Das Relay forwardet die
//! Umschlaege blind und kann den Inhalt nicht entschluesseln.
//!
//! ## Ablauf
//! 1. Relay erzeugt einmalig DH-Parameter und verteilt sie
//! 2. Jeder Endpunkt erzeugt ein frisches Schluessel-Paar
//! 3. Das Relay tauscht die oeffentlichen Schluessel genau einmal aus
//! 4. Beide Endpunkte berechnen lokal das Shared Secret
//! 5. HKDF-SHA256 (Label `chat-encryption-key`) ergibt den Session Key
//! 6. Chat-Text wird mit AES-256-GCM verschluesselt
//!
//! Die Primitive stecken hinter schmalen Traits (`DiffieHellmanEngine`,
//! `KeyDerivationFunction`, `AeadCipher`), damit die Protokoll-Logik
//! unabhaengig von der konkreten Implementierung bleibt.

pub mod cipher;
pub mod decrypt;
pub mod encrypt;
pub mod kdf;
pub mod key_exchange;
pub mod session;

pub use cipher::{AeadCipher, Aes256GcmCipher};
pub use decrypt::{decrypt_message, decrypt_text};
pub use encrypt::{encrypt_message, encrypt_text};
pub use kdf::{derive_session_key, HkdfSha256, KeyDerivationFunction, SESSION_KEY_LABEL};
pub use key_exchange::{DhParameters, DiffieHellmanEngine, X25519Engine};
pub use session::SessionCrypto;
