//! Relay-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass das Relay ohne Konfigurationsdatei
//! lauffaehig ist.

use std::net::{SocketAddr, ToSocketAddrs};

use anyhow::Context;
use relaychat_observability::{log_format_gueltig, log_level_gueltig};
use relaychat_signaling::{RelayConfig, MAX_PEERS};
use serde::{Deserialize, Serialize};

/// Standard-Port des Relays
pub const STANDARD_PORT: u16 = 8888;

/// Vollstaendige Relay-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Relay-Verhalten
    pub relay: RelayEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer den TCP-Listener
    pub bind_adresse: String,
    /// TCP-Port
    pub port: u16,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            port: STANDARD_PORT,
        }
    }
}

/// Relay-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayEinstellungen {
    /// Maximale Peers (Obergrenze 2)
    pub max_peers: usize,
    /// Maximale Laenge einer Frame-Zeile in Bytes
    pub max_frame_bytes: usize,
    /// Aufeinanderfolgende Protokollfehler bis zum Trennen
    pub max_protokoll_fehler: u32,
    /// Groesse der Send-Queue pro Verbindung
    pub send_queue_groesse: usize,
}

impl Default for RelayEinstellungen {
    fn default() -> Self {
        let standard = RelayConfig::default();
        Self {
            max_peers: standard.max_peers,
            max_frame_bytes: standard.max_frame_bytes,
            max_protokoll_fehler: standard.max_protokoll_fehler,
            send_queue_groesse: standard.send_queue_groesse,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                config
                    .validieren()
                    .with_context(|| format!("Konfigurationsfehler in '{pfad}'"))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Logging ist hier noch nicht initialisiert
                eprintln!("Konfigurationsdatei '{pfad}' nicht gefunden, verwende Standardwerte");
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Prueft Werte, die serde allein nicht abfangen kann
    pub fn validieren(&self) -> anyhow::Result<()> {
        if !log_level_gueltig(&self.logging.level) {
            anyhow::bail!(
                "Ungueltiges Log-Level '{}' (erlaubt: trace, debug, info, warn, error)",
                self.logging.level
            );
        }
        if !log_format_gueltig(&self.logging.format) {
            anyhow::bail!(
                "Ungueltiges Log-Format '{}' (erlaubt: text, json)",
                self.logging.format
            );
        }
        if self.relay.max_frame_bytes == 0 || self.relay.send_queue_groesse == 0 {
            anyhow::bail!("max_frame_bytes und send_queue_groesse muessen groesser als 0 sein");
        }
        Ok(())
    }

    /// Gibt die Bind-Adresse als Text zurueck
    pub fn tcp_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.port)
    }

    /// Loest die Bind-Adresse auf
    pub fn bind_socket_adresse(&self) -> anyhow::Result<SocketAddr> {
        let adresse = self.tcp_bind_adresse();
        adresse
            .to_socket_addrs()
            .with_context(|| format!("Bind-Adresse '{adresse}' ungueltig"))?
            .next()
            .with_context(|| format!("Bind-Adresse '{adresse}' ergibt keine Adresse"))
    }

    /// Laufzeit-Konfiguration fuer das Relay
    ///
    /// `max_peers` ueber 2 wird mit Warnung auf 2 begrenzt.
    pub fn relay_config(&self) -> RelayConfig {
        let mut max_peers = self.relay.max_peers;
        if max_peers > MAX_PEERS {
            tracing::warn!(
                konfiguriert = max_peers,
                max = MAX_PEERS,
                "max_peers ueber der Obergrenze – wird begrenzt"
            );
            max_peers = MAX_PEERS;
        }
        RelayConfig {
            max_peers: max_peers.max(1),
            max_frame_bytes: self.relay.max_frame_bytes,
            max_protokoll_fehler: self.relay.max_protokoll_fehler.max(1),
            send_queue_groesse: self.relay.send_queue_groesse,
        }
    }
}
