//! Fehlertypen fuer das Kryptografie-Subsystem

use relaychat_core::ErrorClass;
use thiserror::Error;

/// Fehler im Kryptografie-Subsystem
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Zufallsquelle nicht verfuegbar: {0}")]
    Zufallsquelle(String),

    #[error("DH-Parameter-Erzeugung fehlgeschlagen: {0}")]
    ParameterErzeugung(String),

    #[error("Ungueltige DH-Parameter: {0}")]
    UngueltigeParameter(String),

    #[error("Key-Exchange fehlgeschlagen: {0}")]
    KeyExchange(String),

    #[error("Key Derivation fehlgeschlagen: {0}")]
    KeyDerivation(String),

    #[error("Verschluesselung fehlgeschlagen: {0}")]
    Verschluesselung(String),

    #[error("Entschluesselung fehlgeschlagen: {0}")]
    Entschluesselung(String),

    #[error("Ungueltige Schluessel-Laenge: erwartet {erwartet}, erhalten {erhalten}")]
    UngueltigeSchluesselLaenge { erwartet: usize, erhalten: usize },

    #[error("Ungueltige Daten: {0}")]
    UngueltigeDaten(String),

    #[error("Base64-Dekodierung fehlgeschlagen: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl CryptoError {
    /// Fehlerklasse fuer die Behandlung an der Verbindungsgrenze
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Zufallsquelle(_) | Self::ParameterErzeugung(_) => ErrorClass::FatalSetup,
            Self::UngueltigeParameter(_)
            | Self::KeyExchange(_)
            | Self::UngueltigeSchluesselLaenge { .. } => ErrorClass::Protocol,
            Self::KeyDerivation(_)
            | Self::Verschluesselung(_)
            | Self::Entschluesselung(_)
            | Self::UngueltigeDaten(_)
            | Self::Base64(_) => ErrorClass::Crypto,
        }
    }
}

pub type CryptoResult<T> = Result<T, CryptoError>;
