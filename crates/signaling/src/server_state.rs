//! Gemeinsamer Relay-Zustand
//!
//! Konfiguration und Koordinator als Arc-Referenzen, die sicher zwischen
//! den Verbindungs-Tasks geteilt werden.

use std::sync::Arc;

use relaychat_protocol::wire::DEFAULT_MAX_FRAME_SIZE;

use crate::broadcast::SEND_QUEUE_GROESSE;
use crate::coordinator::{RelayCoordinator, MAX_PEERS};

/// Laufzeit-Konfiguration des Relays
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Maximale Anzahl registrierter Peers (hoechstens 2)
    pub max_peers: usize,
    /// Maximale Laenge einer Frame-Zeile in Bytes
    pub max_frame_bytes: usize,
    /// Aufeinanderfolgende Protokollfehler bis zum Trennen
    pub max_protokoll_fehler: u32,
    /// Groesse der Send-Queue pro Verbindung
    pub send_queue_groesse: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_peers: MAX_PEERS,
            max_frame_bytes: DEFAULT_MAX_FRAME_SIZE,
            max_protokoll_fehler: 3,
            send_queue_groesse: SEND_QUEUE_GROESSE,
        }
    }
}

/// Gemeinsamer Relay-Zustand (Arc-geteilt)
#[derive(Debug)]
pub struct RelayState {
    pub config: Arc<RelayConfig>,
    pub coordinator: Arc<RelayCoordinator>,
}

impl RelayState {
    pub fn neu(config: RelayConfig, coordinator: RelayCoordinator) -> Arc<Self> {
        Arc::new(Self {
            config: Arc::new(config),
            coordinator: Arc::new(coordinator),
        })
    }
}
