//! Ereignisse einer Endpunkt-Sitzung
//!
//! Der Empfangs-Task meldet jeden Handshake-Schritt, jede entschluesselte
//! Nachricht und jede nicht-fatale Stoerung ueber einen Event-Kanal an die
//! Oberflaeche.

use chrono::{DateTime, Utc};
use relaychat_core::ErrorClass;
use relaychat_crypto::Fingerprint;

/// Ereignis aus dem Empfangs-Task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Relay hat die Registrierung bestaetigt
    Registered { message: String },
    /// DH-Parameter empfangen und akzeptiert
    ParametersReceived,
    /// Eigener oeffentlicher Schluessel abgeschickt
    PublicKeySent,
    /// Session Key abgeleitet, Chat freigeschaltet
    Established { peer: String, fingerprint: Fingerprint },
    /// Entschluesselte Chat-Nachricht
    Message {
        from: String,
        text: String,
        timestamp: DateTime<Utc>,
    },
    /// Nicht-fatale Stoerung (Nachricht verworfen)
    Warning { class: ErrorClass, message: String },
    /// Handshake abgebrochen, Sitzung beendet
    Aborted { reason: String },
    /// Verbindung zum Relay beendet
    Disconnected,
}
