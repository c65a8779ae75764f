//! Fehlerklassen fuer Relaychat
//!
//! Jeder Crate definiert eigene Fehler-Enums. Damit Relay und Endpunkt
//! einheitlich reagieren koennen, bildet jeder Fehler ueber `class()` auf
//! genau eine `ErrorClass` ab. Die Klasse bestimmt die Reaktion an der
//! Stelle, an der der Fehler auftritt (pro Verbindung).

use thiserror::Error;

/// Fehlerklasse – bestimmt, wie ein Fehler behandelt wird
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Verbindung zurueckgesetzt/geschlossen, Schreibfehler.
    /// Relay: PeerRecord sofort entfernen. Endpunkt: Session endet.
    Transport,
    /// Ungueltiges Frame, unerwartete Nachricht, doppelte Registrierung.
    /// Nachricht wird verworfen, Verbindung bleibt bestehen.
    Protocol,
    /// AEAD-Tag ungueltig, Umschlag fehlerhaft.
    /// Nur die betroffene Nachricht wird verworfen.
    Crypto,
    /// Nachricht im falschen Handshake-Zustand. Verwerfen mit Warnung.
    State,
    /// Parameter-Erzeugung oder Zufallsquelle fehlgeschlagen. Start abbrechen.
    FatalSetup,
}

impl ErrorClass {
    /// Gibt true zurueck wenn die Verbindung nach diesem Fehler endet
    pub fn beendet_verbindung(&self) -> bool {
        matches!(self, Self::Transport | Self::FatalSetup)
    }
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Transport => "transport",
            Self::Protocol => "protocol",
            Self::Crypto => "crypto",
            Self::State => "state",
            Self::FatalSetup => "fatal_setup",
        };
        f.write_str(name)
    }
}

/// Fehler bei der Validierung eines Benutzernamens
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsernameError {
    #[error("Benutzername ist leer")]
    Leer,

    #[error("Benutzername zu lang: {laenge} Zeichen (Maximum: {max})")]
    ZuLang { laenge: usize, max: usize },

    #[error("Benutzername enthaelt Steuerzeichen")]
    Steuerzeichen,
}

impl UsernameError {
    pub fn class(&self) -> ErrorClass {
        ErrorClass::Protocol
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nur_transport_und_setup_beenden_verbindung() {
        assert!(ErrorClass::Transport.beendet_verbindung());
        assert!(ErrorClass::FatalSetup.beendet_verbindung());
        assert!(!ErrorClass::Protocol.beendet_verbindung());
        assert!(!ErrorClass::Crypto.beendet_verbindung());
        assert!(!ErrorClass::State.beendet_verbindung());
    }

    #[test]
    fn fehlerklasse_anzeige() {
        assert_eq!(ErrorClass::FatalSetup.to_string(), "fatal_setup");
        assert_eq!(ErrorClass::Crypto.to_string(), "crypto");
    }

    #[test]
    fn username_fehler_anzeige() {
        let e = UsernameError::ZuLang { laenge: 70, max: 64 };
        assert!(e.to_string().contains("70"));
        assert_eq!(e.class(), ErrorClass::Protocol);
    }
}
