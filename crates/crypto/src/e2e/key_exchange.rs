//! Diffie-Hellman Key Exchange
//!
//! Das Relay erzeugt die Parameter einmal pro Laufzeit
//! (`generate_parameters`), die Endpunkte erzeugen damit je ein frisches
//! Schluessel-Paar und berechnen nach dem Austausch lokal das Shared Secret.
//!
//! Standard-Engine ist X25519. Die Gruppe ist fest (Primzahl 2^255 - 19,
//! Basispunkt u = 9); "Erzeugen" bedeutet hier: Gruppe waehlen und die
//! Zufallsquelle pruefen, ohne die kein Schluessel sicher waere.

use rand::rngs::OsRng;
use rand::RngCore;
use relaychat_protocol::{DhGroup, DhParameterSet};
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};

use crate::error::{CryptoError, CryptoResult};
use crate::types::{KeyPair, PublicKey, SecretBytes, SharedSecret};

/// Primzahl 2^255 - 19 (big-endian Hex)
pub const X25519_PRIME_HEX: &str =
    "7fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffed";

/// u-Koordinate des X25519-Basispunkts
pub const X25519_GENERATOR: &str = "9";

/// Laenge von X25519-Skalaren und -Punkten
const X25519_LEN: usize = 32;

// ---------------------------------------------------------------------------
// DhParameters
// ---------------------------------------------------------------------------

/// Gemeinsame DH-Parameter (unveraenderlich nach der Erzeugung)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DhParameters {
    group: DhGroup,
    prime: String,
    generator: String,
}

impl DhParameters {
    /// Standard-Parameter der X25519-Gruppe
    pub fn x25519() -> Self {
        Self {
            group: DhGroup::X25519,
            prime: X25519_PRIME_HEX.to_string(),
            generator: X25519_GENERATOR.to_string(),
        }
    }

    pub fn group(&self) -> DhGroup {
        self.group
    }

    pub fn prime(&self) -> &str {
        &self.prime
    }

    pub fn generator(&self) -> &str {
        &self.generator
    }

    /// Wire-Darstellung fuer die `dh_parameters`-Nachricht
    pub fn to_wire(&self) -> DhParameterSet {
        DhParameterSet {
            group: self.group,
            prime: self.prime.clone(),
            generator: self.generator.clone(),
        }
    }

    /// Uebernimmt Parameter vom Wire (ohne Validierung, siehe
    /// `DiffieHellmanEngine::validate_parameters`)
    pub fn from_wire(set: DhParameterSet) -> Self {
        Self {
            group: set.group,
            prime: set.prime.trim().to_ascii_lowercase(),
            generator: set.generator.trim().to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// DiffieHellmanEngine
// ---------------------------------------------------------------------------

/// Schmale Schnittstelle fuer DH-Primitive
pub trait DiffieHellmanEngine: Send + Sync + std::fmt::Debug {
    /// Gruppe die diese Engine unterstuetzt
    fn group(&self) -> DhGroup;

    /// Erzeugt die Parameter (einmal pro Relay-Laufzeit)
    ///
    /// Bei X25519 ist die Gruppe fest, "Erzeugen" heisst hier Gruppe waehlen
    /// und Zufallsquelle pruefen. Eine Finite-Field-Engine (z.B. frische
    /// 2048-Bit-MODP-Gruppe) wuerde an dieser Stelle Primzahl und Generator
    /// neu erzeugen.
    fn generate_parameters(&self) -> CryptoResult<DhParameters>;

    /// Prueft ob empfangene Parameter zu dieser Engine passen
    fn validate_parameters(&self, params: &DhParameters) -> CryptoResult<()>;

    /// Erzeugt ein frisches Schluessel-Paar
    fn generate_keypair(&self, params: &DhParameters) -> CryptoResult<KeyPair>;

    /// Berechnet das Shared Secret aus eigenem privatem und fremdem
    /// oeffentlichem Schluessel
    fn exchange(
        &self,
        params: &DhParameters,
        own: &KeyPair,
        peer_public: &PublicKey,
    ) -> CryptoResult<SharedSecret>;
}

/// X25519-Engine (x25519-dalek)
#[derive(Debug, Default, Clone, Copy)]
pub struct X25519Engine;

impl X25519Engine {
    pub fn new() -> Self {
        Self
    }
}

fn als_array(bytes: &[u8]) -> CryptoResult<[u8; X25519_LEN]> {
    bytes
        .try_into()
        .map_err(|_| CryptoError::UngueltigeSchluesselLaenge {
            erwartet: X25519_LEN,
            erhalten: bytes.len(),
        })
}

impl DiffieHellmanEngine for X25519Engine {
    fn group(&self) -> DhGroup {
        DhGroup::X25519
    }

    fn generate_parameters(&self) -> CryptoResult<DhParameters> {
        // Zufallsquelle pruefen – ohne sie ist keine sichere Sitzung moeglich
        let mut probe = [0u8; X25519_LEN];
        OsRng
            .try_fill_bytes(&mut probe)
            .map_err(|e| CryptoError::Zufallsquelle(e.to_string()))?;
        if probe.iter().all(|b| *b == 0) {
            return Err(CryptoError::ParameterErzeugung(
                "Zufallsquelle liefert nur Nullen".to_string(),
            ));
        }

        let params = DhParameters::x25519();
        tracing::debug!(gruppe = %params.group(), "DH-Parameter erzeugt");
        Ok(params)
    }

    fn validate_parameters(&self, params: &DhParameters) -> CryptoResult<()> {
        if params.group != DhGroup::X25519 {
            return Err(CryptoError::UngueltigeParameter(format!(
                "Gruppe '{}' wird nicht unterstuetzt",
                params.group
            )));
        }
        if params.prime != X25519_PRIME_HEX {
            return Err(CryptoError::UngueltigeParameter(
                "Modulus passt nicht zur X25519-Gruppe".to_string(),
            ));
        }
        if params.generator != X25519_GENERATOR {
            return Err(CryptoError::UngueltigeParameter(format!(
                "Generator '{}' passt nicht zur X25519-Gruppe",
                params.generator
            )));
        }
        Ok(())
    }

    fn generate_keypair(&self, params: &DhParameters) -> CryptoResult<KeyPair> {
        self.validate_parameters(params)?;

        let secret = StaticSecret::random_from_rng(OsRng);
        let public = X25519PublicKey::from(&secret);

        Ok(KeyPair {
            private_key: SecretBytes::new(secret.to_bytes().to_vec()),
            public_key: PublicKey::new(public.as_bytes().to_vec()),
        })
    }

    fn exchange(
        &self,
        params: &DhParameters,
        own: &KeyPair,
        peer_public: &PublicKey,
    ) -> CryptoResult<SharedSecret> {
        self.validate_parameters(params)?;

        let secret = StaticSecret::from(als_array(own.private_key.as_bytes())?);
        let peer = X25519PublicKey::from(als_array(peer_public.as_bytes())?);
        let dh_output = secret.diffie_hellman(&peer);

        // Low-Order-Punkte liefern ein vom Gegenueber erzwungenes Secret
        if !dh_output.was_contributory() {
            return Err(CryptoError::KeyExchange(
                "Oeffentlicher Schluessel des Gegenuebers ist ein Low-Order-Punkt".to_string(),
            ));
        }

        Ok(SharedSecret(SecretBytes::new(dh_output.as_bytes().to_vec())))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beide_seiten_berechnen_gleiches_secret() {
        let engine = X25519Engine::new();
        let params = engine.generate_parameters().unwrap();

        let alice = engine.generate_keypair(&params).unwrap();
        let bob = engine.generate_keypair(&params).unwrap();

        let a = engine.exchange(&params, &alice, &bob.public_key).unwrap();
        let b = engine.exchange(&params, &bob, &alice.public_key).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn schluessel_paare_sind_frisch() {
        let engine = X25519Engine::new();
        let params = DhParameters::x25519();
        let k1 = engine.generate_keypair(&params).unwrap();
        let k2 = engine.generate_keypair(&params).unwrap();
        assert_ne!(k1.public_key, k2.public_key);
        assert_eq!(k1.public_key.as_bytes().len(), 32);
    }

    #[test]
    fn verschiedene_paare_ergeben_verschiedene_secrets() {
        let engine = X25519Engine::new();
        let params = DhParameters::x25519();
        let a = engine.generate_keypair(&params).unwrap();
        let b = engine.generate_keypair(&params).unwrap();
        let c = engine.generate_keypair(&params).unwrap();

        let ab = engine.exchange(&params, &a, &b.public_key).unwrap();
        let ac = engine.exchange(&params, &a, &c.public_key).unwrap();
        assert_ne!(ab.as_bytes(), ac.as_bytes());
    }

    #[test]
    fn parameter_ueberleben_wire_roundtrip() {
        let engine = X25519Engine::new();
        let params = engine.generate_parameters().unwrap();
        let empfangen = DhParameters::from_wire(params.to_wire());
        assert_eq!(empfangen, params);
        assert!(engine.validate_parameters(&empfangen).is_ok());
    }

    #[test]
    fn falsche_parameter_werden_abgelehnt() {
        let engine = X25519Engine::new();
        let mut set = DhParameters::x25519().to_wire();
        set.generator = "2".to_string();
        let params = DhParameters::from_wire(set);

        let result = engine.generate_keypair(&params);
        assert!(matches!(result, Err(CryptoError::UngueltigeParameter(_))));
    }

    #[test]
    fn low_order_punkt_wird_abgelehnt() {
        let engine = X25519Engine::new();
        let params = DhParameters::x25519();
        let own = engine.generate_keypair(&params).unwrap();

        let null_punkt = PublicKey::new(vec![0u8; 32]);
        let result = engine.exchange(&params, &own, &null_punkt);
        assert!(matches!(result, Err(CryptoError::KeyExchange(_))));
    }

    #[test]
    fn falsche_schluessel_laenge() {
        let engine = X25519Engine::new();
        let params = DhParameters::x25519();
        let own = engine.generate_keypair(&params).unwrap();

        let result = engine.exchange(&params, &own, &PublicKey::new(vec![1u8; 31]));
        assert!(matches!(
            result,
            Err(CryptoError::UngueltigeSchluesselLaenge {
                erwartet: 32,
                erhalten: 31
            })
        ));
    }
}
