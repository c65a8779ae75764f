//! Fehlertypen fuer den Endpunkt

use relaychat_core::{ErrorClass, UsernameError};
use relaychat_crypto::CryptoError;
use relaychat_protocol::ErrorCode;
use thiserror::Error;

/// Fehlertyp fuer Handshake und Sitzung
#[derive(Debug, Error)]
pub enum EndpointError {
    /// IO-Fehler (Verbindungsaufbau, Socket)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// Verbindung zum Relay getrennt
    #[error("Verbindung zum Relay getrennt")]
    VerbindungGetrennt,

    /// Protokollfehler (unerwartete Nachricht, Handshake doppelt)
    #[error("Protokollfehler: {0}")]
    Protokoll(String),

    /// Eigener Benutzername ungueltig
    #[error("Ungueltiger Benutzername: {0}")]
    UngueltigerName(#[from] UsernameError),

    /// Krypto-Fehler (Tag ungueltig, Umschlag kaputt, Parameter)
    #[error("Krypto-Fehler: {0}")]
    Krypto(#[from] CryptoError),

    /// Aktion im falschen Handshake-Zustand
    #[error("Zustandsfehler: {0}")]
    Zustand(String),

    /// Vom Relay abgelehnte Anfrage
    #[error("Relay-Fehler ({code:?}): {message}")]
    Relay { code: ErrorCode, message: String },

    /// Handshake abgebrochen
    #[error("Handshake abgebrochen: {0}")]
    Abgebrochen(String),

    /// Handshake nicht rechtzeitig abgeschlossen
    #[error("Handshake-Timeout")]
    Timeout,
}

impl EndpointError {
    pub fn protokoll(msg: impl Into<String>) -> Self {
        Self::Protokoll(msg.into())
    }

    pub fn zustand(msg: impl Into<String>) -> Self {
        Self::Zustand(msg.into())
    }

    /// Fehlerklasse fuer die Behandlung im Empfangs-Task
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Io(_) | Self::VerbindungGetrennt | Self::Timeout => ErrorClass::Transport,
            Self::Protokoll(_)
            | Self::UngueltigerName(_)
            | Self::Relay { .. }
            | Self::Abgebrochen(_) => ErrorClass::Protocol,
            Self::Krypto(e) => e.class(),
            Self::Zustand(_) => ErrorClass::State,
        }
    }
}

/// Result-Typ fuer den Endpunkt
pub type EndpointResult<T> = Result<T, EndpointError>;
