//! relaychat-endpoint – Endpunkt-Seite des Relaychat-Protokolls
//!
//! Treibt den Handshake eines Endpunkts (Parameter empfangen, Schluessel-Paar
//! erzeugen, oeffentliche Schluessel tauschen, Session Key ableiten) und
//! stellt danach eine verschluesselte Chat-Sitzung bereit.
//!
//! ## Module
//! - `handshake` - State Machine, synchron und ohne IO testbar
//! - `session` - Verbindung, Empfangs-Task, Writer-Task, Established-Gate
//! - `events` - Ereignisse fuer die Oberflaeche
//! - `error` - Fehlertypen

pub mod error;
pub mod events;
pub mod handshake;
pub mod session;

pub use error::{EndpointError, EndpointResult};
pub use events::ClientEvent;
pub use handshake::{Handshake, HandshakePhase, PeerKeyOutcome};
pub use session::{EndpointSession, GateState};
