//! Verbindungs-Worker – Verarbeitet eine einzelne Peer-Verbindung
//!
//! Jede TCP-Verbindung bekommt eine `PeerConnection` in einem eigenen
//! tokio-Task. Der Worker liest Frames, ruft den Koordinator auf und leert
//! die eigene Send-Queue in den Stream.
//!
//! ## Fehlerbehandlung
//! - Transportfehler beenden die Verbindung sofort
//! - Protokollfehler werden mit `error` beantwortet; nach
//!   `max_protokoll_fehler` aufeinanderfolgenden Fehlern wird getrennt
//! - `relay_full` und eine zweite Registrierung beenden die Verbindung
//! - Beim Ende wird der Peer aus der Registry entfernt

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use relaychat_core::{ConnectionId, ErrorClass, Username};
use relaychat_protocol::{ClientMessage, ErrorCode, ServerCodec, ServerMessage};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;

use crate::broadcast::PeerSender;
use crate::error::{SignalingError, SignalingResult};
use crate::server_state::RelayState;

// ---------------------------------------------------------------------------
// PeerConnection
// ---------------------------------------------------------------------------

/// Verarbeitet eine einzelne Verbindung zum Relay
pub struct PeerConnection {
    state: Arc<RelayState>,
    peer_addr: SocketAddr,
    id: ConnectionId,
    username: Option<Username>,
}

impl PeerConnection {
    /// Erstellt einen neuen Worker
    pub fn neu(state: Arc<RelayState>, peer_addr: SocketAddr) -> Self {
        Self {
            state,
            peer_addr,
            id: ConnectionId::new(),
            username: None,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Startet die Verarbeitungsschleife
    ///
    /// Laeuft bis die Verbindung getrennt wird oder ein Shutdown-Signal
    /// eingeht.
    pub async fn verarbeiten<S>(
        mut self,
        stream: S,
        mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let peer_addr = self.peer_addr;
        let config = Arc::clone(&self.state.config);

        tracing::info!(peer = %peer_addr, connection = %self.id, "Neue Verbindung");

        let mut framed = Framed::new(stream, ServerCodec::with_max_size(config.max_frame_bytes));
        let (sender, mut sende_rx) = PeerSender::kanal(self.id, config.send_queue_groesse);
        let mut fehler_in_folge: u32 = 0;

        loop {
            tokio::select! {
                // Eingehendes Frame vom Endpunkt
                frame = framed.next() => {
                    let ergebnis = match frame {
                        Some(Ok(Ok(nachricht))) => {
                            tracing::trace!(peer = %peer_addr, art = nachricht.kind(), "Nachricht empfangen");
                            self.nachricht_verarbeiten(nachricht, &sender)
                        }
                        Some(Ok(Err(e))) => Err(SignalingError::protokoll(e.to_string())),
                        Some(Err(e)) => {
                            tracing::warn!(peer = %peer_addr, fehler = %e, "Frame-Lesefehler");
                            break;
                        }
                        None => {
                            tracing::info!(peer = %peer_addr, "Verbindung vom Endpunkt getrennt");
                            break;
                        }
                    };

                    let Err(fehler) = ergebnis else {
                        fehler_in_folge = 0;
                        continue;
                    };

                    tracing::warn!(
                        peer = %peer_addr,
                        klasse = %fehler.class(),
                        fehler = %fehler,
                        "Anfrage abgelehnt"
                    );
                    if fehler.class() == ErrorClass::Protocol {
                        fehler_in_folge += 1;
                    }

                    if let Some(code) = fehler.error_code() {
                        if let Err(e) = framed.send(ServerMessage::error(code, fehler.to_string())).await {
                            tracing::warn!(peer = %peer_addr, fehler = %e, "Senden fehlgeschlagen");
                            break;
                        }
                    }

                    if fehler.schliesst_verbindung() {
                        break;
                    }
                    if fehler_in_folge >= config.max_protokoll_fehler {
                        tracing::warn!(
                            peer = %peer_addr,
                            fehler_in_folge,
                            "Zu viele Protokollfehler – Verbindung wird getrennt"
                        );
                        break;
                    }
                }

                // Ausgehende Nachricht aus der Send-Queue
                Some(ausgehend) = sende_rx.recv() => {
                    if let Err(e) = framed.send(ausgehend).await {
                        tracing::warn!(peer = %peer_addr, fehler = %e, "Senden fehlgeschlagen");
                        break;
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(peer = %peer_addr, "Shutdown-Signal – Verbindung wird getrennt");
                        break;
                    }
                }
            }
        }

        // Cleanup beim Verbindungsende
        if self.username.take().is_some() {
            self.state.coordinator.disconnect(self.id);
        }

        tracing::info!(peer = %peer_addr, connection = %self.id, "Verbindungs-Task beendet");
    }

    /// Ruft die passende Koordinator-Operation fuer eine Nachricht auf
    fn nachricht_verarbeiten(
        &mut self,
        nachricht: ClientMessage,
        sender: &PeerSender,
    ) -> SignalingResult<()> {
        let coordinator = &self.state.coordinator;

        match nachricht {
            ClientMessage::Register { username } => {
                if self.username.is_some() {
                    return Err(SignalingError::BereitsRegistriert);
                }
                let record = coordinator.register_peer(self.id, &username, sender.clone())?;
                tracing::info!(peer = %self.peer_addr, username = %record.username, "Registrierung erfolgreich");
                self.username = Some(record.username);
                Ok(())
            }
            ClientMessage::DhPublicKey { public_key } => {
                self.registriert()?;
                coordinator.receive_public_key(self.id, &public_key)?;
                Ok(())
            }
            ClientMessage::ChatMessage { encrypted_content } => {
                self.registriert()?;
                coordinator.relay_ciphertext(self.id, encrypted_content)?;
                Ok(())
            }
        }
    }

    fn registriert(&self) -> SignalingResult<&Username> {
        self.username.as_ref().ok_or(SignalingError::NichtRegistriert)
    }
}

/// Lehnt eine Verbindung ab, weil das Relay voll ist
pub async fn voll_ablehnen<S>(stream: S, max_frame_bytes: usize)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut framed = Framed::new(stream, ServerCodec::with_max_size(max_frame_bytes));
    let antwort = ServerMessage::error(ErrorCode::RelayFull, SignalingError::RelayVoll.to_string());
    if let Err(e) = framed.send(antwort).await {
        tracing::debug!(fehler = %e, "Ablehnung konnte nicht gesendet werden");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
