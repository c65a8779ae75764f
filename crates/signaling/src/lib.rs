//! relaychat-signaling – Relay-Koordinator
//!
//! Das Relay vermittelt zwischen genau zwei Endpunkten: es verteilt die
//! DH-Parameter, tauscht die oeffentlichen Schluessel einmal aus und leitet
//! danach verschluesselte Umschlaege unveraendert weiter. Klartext und
//! Schluesselmaterial sieht es nie.
//!
//! ## Architektur
//!
//! ```text
//! TCP Listener (RelayServer)
//!     |
//!     v
//! PeerConnection (pro Verbindung ein Task)
//!     |  Framed<_, ServerCodec>  <->  Send-Queue (PeerSender)
//!     v
//! RelayCoordinator (eine Mutex um die Peer-Registry)
//! ```

pub mod broadcast;
pub mod connection;
pub mod coordinator;
pub mod error;
pub mod server_state;
pub mod tcp;

// Bequeme Re-Exporte
pub use broadcast::PeerSender;
pub use connection::PeerConnection;
pub use coordinator::{PeerRecord, RelayCoordinator, RelayPhase, MAX_PEERS};
pub use error::{SignalingError, SignalingResult};
pub use server_state::{RelayConfig, RelayState};
pub use tcp::RelayServer;
