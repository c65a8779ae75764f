//! Wire-Typen fuer den Diffie-Hellman-Handshake
//!
//! Das Relay verteilt die DH-Parameter einmal pro Laufzeit an beide
//! Endpunkte. Auf dem Wire sind sie ein JSON-Objekt im Feld `parameters`
//! der `dh_parameters`-Nachricht. Die Validierung uebernimmt die DH-Engine
//! im Endpunkt.

use serde::{Deserialize, Serialize};

/// DH-Gruppe
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DhGroup {
    /// Curve25519 (Montgomery-Form, RFC 7748)
    #[default]
    X25519,
}

impl std::fmt::Display for DhGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DhGroup::X25519 => write!(f, "x25519"),
        }
    }
}

impl std::str::FromStr for DhGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "x25519" => Ok(Self::X25519),
            other => Err(format!("Unbekannte DH-Gruppe: '{}'", other)),
        }
    }
}

/// Serialisierte DH-Parameter (Gruppe, Primzahl-Modulus, Generator)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DhParameterSet {
    pub group: DhGroup,
    /// Modulus als Hex-String (big-endian, ohne Praefix)
    pub prime: String,
    /// Generator (bei X25519 die u-Koordinate des Basispunkts)
    pub generator: String,
}
