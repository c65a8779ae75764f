//! # relaychat-crypto
//!
//! Ende-zu-Ende Sitzungskrypto fuer Relaychat. Das Relay nutzt dieses
//! Crate nur zur Erzeugung der DH-Parameter; Schluessel, Shared Secret und
//! Session Key existieren ausschliesslich in den beiden Endpunkten.
//!
//! ## Module
//! - `e2e` - DH-Austausch, Key Derivation, AEAD, `SessionCrypto`-Fassade
//! - `fingerprint` - Anzeigbarer Hash eines Session Keys
//! - `types` - Gemeinsame Typen (KeyPair, Nonce, SessionKey, Umschlag)
//! - `error` - Fehlertypen

pub mod e2e;
pub mod error;
pub mod fingerprint;
pub mod types;

// Bequeme Re-Exports
pub use error::{CryptoError, CryptoResult};
pub use fingerprint::Fingerprint;
pub use types::{
    EncryptedEnvelope, KeyPair, Nonce, PublicKey, SecretBytes, SessionKey, SharedSecret,
    NONCE_LEN, SESSION_KEY_LEN, TAG_LEN,
};

pub use e2e::{
    decrypt_message, encrypt_message, AeadCipher, Aes256GcmCipher, DhParameters,
    DiffieHellmanEngine, HkdfSha256, KeyDerivationFunction, SessionCrypto, X25519Engine,
    SESSION_KEY_LABEL,
};
