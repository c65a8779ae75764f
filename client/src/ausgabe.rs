//! Terminal-Ausgabe der Sitzungs-Ereignisse

use chrono::{DateTime, Local, Utc};
use relaychat_endpoint::ClientEvent;

/// Formatiert eine empfangene Nachricht als `[HH:MM:SS] absender: text`
pub fn nachricht_formatieren(from: &str, text: &str, timestamp: DateTime<Utc>) -> String {
    let lokal: DateTime<Local> = timestamp.with_timezone(&Local);
    format!("[{}] {from}: {text}", lokal.format("%H:%M:%S"))
}

/// Text fuer ein Ereignis, `None` fuer Ereignisse ohne Ausgabe
pub fn ereignis_text(event: &ClientEvent) -> Option<String> {
    match event {
        ClientEvent::Registered { message } => Some(format!("* {message}")),
        ClientEvent::ParametersReceived | ClientEvent::PublicKeySent => None,
        ClientEvent::Established { .. } => None,
        ClientEvent::Message {
            from,
            text,
            timestamp,
        } => Some(nachricht_formatieren(from, text, *timestamp)),
        ClientEvent::Warning { class, message } => {
            Some(format!("! Nachricht verworfen ({class}): {message}"))
        }
        ClientEvent::Aborted { reason } => Some(format!("! Sitzung abgebrochen: {reason}")),
        ClientEvent::Disconnected => Some("* Verbindung zum Relay beendet".into()),
    }
}

/// Gibt true zurueck wenn nach dem Ereignis keine weiteren folgen
pub fn ist_endgueltig(event: &ClientEvent) -> bool {
    matches!(
        event,
        ClientEvent::Aborted { .. } | ClientEvent::Disconnected
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nachricht_format() {
        let ts = Utc::now();
        let zeile = nachricht_formatieren("alice", "hallo bob", ts);
        assert!(zeile.starts_with('['));
        assert_eq!(&zeile[9..], "] alice: hallo bob");
    }

    #[test]
    fn handshake_schritte_ohne_ausgabe() {
        assert!(ereignis_text(&ClientEvent::ParametersReceived).is_none());
        assert!(ereignis_text(&ClientEvent::PublicKeySent).is_none());
    }

    #[test]
    fn abbruch_ist_endgueltig() {
        let abbruch = ClientEvent::Aborted {
            reason: "Schluessel-Konflikt".into(),
        };
        assert!(ist_endgueltig(&abbruch));
        assert!(ist_endgueltig(&ClientEvent::Disconnected));
        assert!(ereignis_text(&abbruch).unwrap().contains("Schluessel-Konflikt"));
        assert!(!ist_endgueltig(&ClientEvent::ParametersReceived));
    }
}
