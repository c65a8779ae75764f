//! Control-Protokoll (Endpunkt <-> Relay)
//!
//! Definiert alle Nachrichten, die ueber die TCP-Verbindung zwischen einem
//! Endpunkt und dem Relay ausgetauscht werden.
//!
//! ## Design
//! - Ein JSON-Objekt pro Frame, intern getaggt ueber das Feld `type`
//! - Nachrichtenarten in snake_case (`register`, `dh_public_key`, ...)
//! - Oeffentliche Schluessel und verschluesselte Inhalte sind Base64-Text;
//!   das Relay reicht sie unveraendert weiter

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::DhParameterSet;

// ---------------------------------------------------------------------------
// Fehler-Codes
// ---------------------------------------------------------------------------

/// Fehler-Codes fuer `error`-Antworten des Relays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Nachricht unerwartet oder fehlerhaft
    InvalidRequest,
    /// Benutzername bereits registriert
    DuplicateUsername,
    /// Bereits zwei Peers registriert
    RelayFull,
    /// Aktion erfordert eine vorherige Registrierung
    NotRegistered,
    /// Abweichender zweiter oeffentlicher Schluessel
    KeyConflict,
    /// Kein Gegenueber zum Weiterleiten vorhanden
    NoPeer,
}

// ---------------------------------------------------------------------------
// Endpunkt -> Relay
// ---------------------------------------------------------------------------

/// Nachrichten vom Endpunkt an das Relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Benutzer registrieren (muss das erste Frame sein)
    Register { username: String },
    /// Eigener oeffentlicher DH-Schluessel (Base64)
    DhPublicKey { public_key: String },
    /// Verschluesselte Chat-Nachricht (Base64 von nonce‖tag‖ciphertext)
    ChatMessage { encrypted_content: String },
}

impl ClientMessage {
    /// Name der Nachrichtenart wie auf dem Wire
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Register { .. } => "register",
            Self::DhPublicKey { .. } => "dh_public_key",
            Self::ChatMessage { .. } => "chat_message",
        }
    }
}

// ---------------------------------------------------------------------------
// Relay -> Endpunkt
// ---------------------------------------------------------------------------

/// Nachrichten vom Relay an einen Endpunkt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Registrierung erfolgreich
    RegistrationSuccess { message: String },
    /// Gemeinsame DH-Parameter des Relays
    DhParameters { parameters: DhParameterSet },
    /// Oeffentlicher Schluessel des Gegenuebers
    DhPeerPublicKey { from: String, public_key: String },
    /// Weitergeleitete verschluesselte Nachricht
    EncryptedMessage {
        from: String,
        encrypted_content: String,
        timestamp: DateTime<Utc>,
    },
    /// Abgelehnte Anfrage
    Error { code: ErrorCode, message: String },
}

impl ServerMessage {
    /// Erstellt eine Fehler-Antwort
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }

    /// Name der Nachrichtenart wie auf dem Wire
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RegistrationSuccess { .. } => "registration_success",
            Self::DhParameters { .. } => "dh_parameters",
            Self::DhPeerPublicKey { .. } => "dh_peer_public_key",
            Self::EncryptedMessage { .. } => "encrypted_message",
            Self::Error { .. } => "error",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::DhGroup;

    #[test]
    fn register_wire_format() {
        let msg = ClientMessage::Register {
            username: "alice".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"register","username":"alice"}"#);
    }

    #[test]
    fn client_nachrichten_dekodieren() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"dh_public_key","public_key":"AAAA"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::DhPublicKey {
                public_key: "AAAA".to_string()
            }
        );
        assert_eq!(msg.kind(), "dh_public_key");

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"chat_message","encrypted_content":"xyz"}"#).unwrap();
        assert_eq!(msg.kind(), "chat_message");
    }

    #[test]
    fn unbekannte_art_und_fehlende_felder() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"hello"}"#).is_err());
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"register"}"#).is_err());
        assert!(serde_json::from_str::<ClientMessage>(r#"{"username":"x"}"#).is_err());
    }

    #[test]
    fn encrypted_message_mit_zeitstempel() {
        let ts = DateTime::parse_from_rfc3339("2024-05-01T12:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let msg = ServerMessage::EncryptedMessage {
            from: "alice".to_string(),
            encrypted_content: "Zm9v".to_string(),
            timestamp: ts,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"encrypted_message""#));
        assert!(json.contains("2024-05-01T12:30:00Z"));
        let decoded: ServerMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn dh_parameters_verschachtelt() {
        let msg = ServerMessage::DhParameters {
            parameters: DhParameterSet {
                group: DhGroup::X25519,
                prime: "7fff".to_string(),
                generator: "9".to_string(),
            },
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.starts_with(r#"{"type":"dh_parameters","parameters":{"#));
        assert_eq!(msg.kind(), "dh_parameters");
    }

    #[test]
    fn fehler_antwort() {
        let msg = ServerMessage::error(ErrorCode::RelayFull, "Relay ist voll");
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(
            json,
            r#"{"type":"error","code":"relay_full","message":"Relay ist voll"}"#
        );
    }
}
