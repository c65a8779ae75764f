//! relaychat-server – Bibliotheks-Root
//!
//! Setzt das Relay aus Konfiguration, DH-Parametern und TCP-Listener
//! zusammen und stellt den Einstiegspunkt fuer Integrationstests bereit.

pub mod config;

use std::future::Future;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use config::ServerConfig;
use relaychat_crypto::X25519Engine;
use relaychat_signaling::{RelayCoordinator, RelayServer, RelayState};

/// Haelt den Relay-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet das Relay und laeuft bis Ctrl-C
    pub async fn starten(self) -> Result<()> {
        self.laufen_bis(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(fehler = %e, "Ctrl-C-Handler konnte nicht registriert werden");
            }
        }, |_| {})
        .await
    }

    /// Startet das Relay und laeuft bis `signal` fertig ist
    ///
    /// Reihenfolge:
    /// 1. DH-Parameter erzeugen (Fehler ist fatal)
    /// 2. TCP-Listener binden, `gebunden` mit der Adresse aufrufen
    /// 3. Verbindungen annehmen bis zum Signal
    /// 4. Shutdown an Accept-Loop und alle Verbindungs-Worker melden
    pub async fn laufen_bis<F, G>(self, signal: F, gebunden: G) -> Result<()>
    where
        F: Future<Output = ()>,
        G: FnOnce(SocketAddr),
    {
        let relay_config = self.config.relay_config();
        let coordinator =
            RelayCoordinator::generate_parameters(&X25519Engine::new(), relay_config.max_peers)
                .context("DH-Parameter konnten nicht erzeugt werden – keine sichere Sitzung moeglich")?;
        let state = RelayState::neu(relay_config, coordinator);

        let bind_addr = self.config.bind_socket_adresse()?;
        let server = RelayServer::binden(state, bind_addr)
            .await
            .with_context(|| format!("TCP-Listener auf {bind_addr} konnte nicht gebunden werden"))?;
        let adresse = server.lokale_adresse()?;
        gebunden(adresse);

        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        let relay_task = tokio::spawn(server.starten(shutdown_rx));

        tracing::info!(adresse = %adresse, "Relay laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");
        signal.await;
        tracing::info!("Shutdown-Signal empfangen, Relay wird beendet");

        let _ = shutdown_tx.send(true);
        relay_task.await.context("Relay-Task abgebrochen")??;
        Ok(())
    }
}
