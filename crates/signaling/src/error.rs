//! Fehlertypen fuer das Relay

use relaychat_core::{ErrorClass, UsernameError};
use relaychat_crypto::CryptoError;
use relaychat_protocol::ErrorCode;
use thiserror::Error;

/// Fehlertyp fuer das Relay
#[derive(Debug, Error)]
pub enum SignalingError {
    /// Protokollfehler (ungueltiges Frame, falscher Zustand)
    #[error("Protokollfehler: {0}")]
    Protokoll(String),

    /// Benutzername ungueltig
    #[error("Ungueltiger Benutzername: {0}")]
    UngueltigerName(#[from] UsernameError),

    /// Benutzername bereits vergeben
    #[error("Benutzername '{0}' ist bereits registriert")]
    DoppelterName(String),

    /// Verbindung hat sich bereits registriert
    #[error("Verbindung ist bereits registriert")]
    BereitsRegistriert,

    /// Aktion vor der Registrierung
    #[error("Verbindung ist nicht registriert")]
    NichtRegistriert,

    /// Bereits zwei Peers registriert
    #[error("Relay ist voll")]
    RelayVoll,

    /// Zweiter, abweichender oeffentlicher Schluessel
    #[error("Abweichender oeffentlicher Schluessel von '{0}'")]
    SchluesselKonflikt(String),

    /// Kein zweiter Peer vorhanden
    #[error("Kein Gegenueber registriert")]
    KeinGegenueber,

    /// Krypto-Fehler (DH-Parameter)
    #[error("Krypto-Fehler: {0}")]
    Krypto(#[from] CryptoError),
}

impl SignalingError {
    /// Erstellt einen Protokollfehler
    pub fn protokoll(msg: impl Into<String>) -> Self {
        Self::Protokoll(msg.into())
    }

    /// Fehlerklasse fuer die Behandlung im Verbindungs-Worker
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Protokoll(_)
            | Self::UngueltigerName(_)
            | Self::DoppelterName(_)
            | Self::BereitsRegistriert
            | Self::NichtRegistriert
            | Self::RelayVoll
            | Self::SchluesselKonflikt(_) => ErrorClass::Protocol,
            Self::KeinGegenueber => ErrorClass::State,
            Self::Krypto(e) => e.class(),
        }
    }

    /// Fehler-Code fuer die `error`-Antwort an den Endpunkt
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Protokoll(_) | Self::UngueltigerName(_) | Self::BereitsRegistriert => {
                Some(ErrorCode::InvalidRequest)
            }
            Self::DoppelterName(_) => Some(ErrorCode::DuplicateUsername),
            Self::NichtRegistriert => Some(ErrorCode::NotRegistered),
            Self::RelayVoll => Some(ErrorCode::RelayFull),
            Self::SchluesselKonflikt(_) => Some(ErrorCode::KeyConflict),
            Self::KeinGegenueber => Some(ErrorCode::NoPeer),
            Self::Krypto(_) => None,
        }
    }

    /// Ob die Verbindung nach diesem Fehler geschlossen wird
    pub fn schliesst_verbindung(&self) -> bool {
        matches!(self, Self::RelayVoll | Self::BereitsRegistriert)
            || self.class().beendet_verbindung()
    }
}

/// Result-Typ fuer das Relay
pub type SignalingResult<T> = Result<T, SignalingError>;
