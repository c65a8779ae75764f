//! relaychat-core – Gemeinsame Typen und Fehlerklassen
//!
//! Dieses Crate stellt die Bausteine bereit, die Relay und Endpunkt
//! gemeinsam nutzen: Identifikationstypen und die Fehlerklassen, auf die
//! jeder crate-spezifische Fehler abgebildet wird.

pub mod error;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{ErrorClass, UsernameError};
pub use types::{ConnectionId, Username, MAX_USERNAME_LAENGE};
