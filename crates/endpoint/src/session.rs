//! Endpunkt-Sitzung – Verbindung zum Relay, Empfangs- und Sende-Task
//!
//! ## Aufbau
//! ```text
//!  send_chat() --> mpsc --> Writer-Task --> SplitSink  --> TCP
//!                              ^
//!                              | dh_public_key
//!  ClientEvent <-- Empfangs-Task <-- SplitStream <-- TCP
//!                      |
//!                      v
//!            Arc<Mutex<Handshake>> + watch<GateState>
//! ```
//!
//! Der Sendepfad prueft das `GateState`-Gate, bevor er verschluesselt. Das
//! Gate wird erst gesetzt, nachdem der Empfangs-Task den Session Key unter
//! der Handshake-Sperre abgelegt hat. Ein Abbruch (Transportfehler,
//! Verbindungsende, Handshake-Konflikt) setzt das Gate auf `Aborted`, auch
//! nach `Established`, und der Writer-Task schliesst daraufhin die Verbindung.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use relaychat_core::{ErrorClass, Username};
use relaychat_crypto::Fingerprint;
use relaychat_protocol::{ClientCodec, ClientMessage, ErrorCode, ServerMessage};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;

use crate::error::{EndpointError, EndpointResult};
use crate::events::ClientEvent;
use crate::handshake::{Handshake, HandshakePhase, PeerKeyOutcome};

/// Groesse der ausgehenden Queue
const AUSGANG_QUEUE_GROESSE: usize = 64;

// ---------------------------------------------------------------------------
// Gate
// ---------------------------------------------------------------------------

/// Zustand des Established-Gates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    Pending,
    Established { fingerprint: Fingerprint, peer: String },
    Aborted(String),
}

// ---------------------------------------------------------------------------
// EndpointSession
// ---------------------------------------------------------------------------

/// Laufende Sitzung eines Endpunkts
pub struct EndpointSession {
    username: Username,
    handshake: Arc<Mutex<Handshake>>,
    gate_rx: watch::Receiver<GateState>,
    ausgang_tx: mpsc::Sender<ClientMessage>,
    empfangs_task: JoinHandle<()>,
    writer_task: JoinHandle<()>,
}

impl EndpointSession {
    /// Verbindet sich mit dem Relay und registriert den Benutzer
    pub async fn connect(
        host: &str,
        port: u16,
        username: &str,
    ) -> EndpointResult<(Self, mpsc::UnboundedReceiver<ClientEvent>)> {
        let stream = TcpStream::connect((host, port)).await?;
        tracing::info!(host, port, "Mit Relay verbunden");
        Self::from_stream(stream, username).await
    }

    /// Startet eine Sitzung ueber einen beliebigen Byte-Stream
    pub async fn from_stream<S>(
        stream: S,
        username: &str,
    ) -> EndpointResult<(Self, mpsc::UnboundedReceiver<ClientEvent>)>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let username = Username::parse(username)?;
        let (sink, stream) = Framed::new(stream, ClientCodec::new()).split();

        let (ausgang_tx, ausgang_rx) = mpsc::channel(AUSGANG_QUEUE_GROESSE);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (gate_tx, gate_rx) = watch::channel(GateState::Pending);
        let handshake = Arc::new(Mutex::new(Handshake::default()));

        // Registrierung als erstes Frame
        ausgang_tx
            .send(ClientMessage::Register {
                username: username.to_string(),
            })
            .await
            .map_err(|_| EndpointError::VerbindungGetrennt)?;

        let writer_task = tokio::spawn(writer_schleife(sink, ausgang_rx, gate_rx.clone()));
        let empfaenger = Empfaenger {
            handshake: Arc::clone(&handshake),
            gate_tx,
            event_tx,
            ausgang_tx: ausgang_tx.clone(),
        };
        let empfangs_task = tokio::spawn(empfaenger.schleife(stream));

        Ok((
            Self {
                username,
                handshake,
                gate_rx,
                ausgang_tx,
                empfangs_task,
                writer_task,
            },
            event_rx,
        ))
    }

    pub fn username(&self) -> &Username {
        &self.username
    }

    pub fn phase(&self) -> HandshakePhase {
        self.handshake.lock().phase()
    }

    pub fn fingerprint(&self) -> Option<Fingerprint> {
        self.handshake.lock().fingerprint()
    }

    pub fn peer(&self) -> Option<String> {
        self.handshake.lock().peer().map(str::to_string)
    }

    /// Wartet bis der Handshake abgeschlossen oder abgebrochen ist
    ///
    /// Ohne `timeout` wird unbegrenzt gewartet.
    pub async fn wait_established(
        &self,
        timeout: Option<Duration>,
    ) -> EndpointResult<(Fingerprint, String)> {
        let mut rx = self.gate_rx.clone();
        let warten = async move {
            rx.wait_for(|zustand| *zustand != GateState::Pending)
                .await
                .map(|zustand| zustand.clone())
                .map_err(|_| EndpointError::VerbindungGetrennt)
        };

        let zustand = match timeout {
            Some(dauer) => tokio::time::timeout(dauer, warten)
                .await
                .map_err(|_| EndpointError::Timeout)??,
            None => warten.await?,
        };

        match zustand {
            GateState::Established { fingerprint, peer } => Ok((fingerprint, peer)),
            GateState::Aborted(grund) => Err(EndpointError::Abgebrochen(grund)),
            GateState::Pending => Err(EndpointError::zustand("Handshake noch nicht abgeschlossen")),
        }
    }

    /// Verschluesselt und sendet eine Chat-Nachricht
    ///
    /// Leere Eingaben werden nicht gesendet (`Ok(false)`). Vor Abschluss des
    /// Handshakes schlaegt der Aufruf sofort mit einem Zustandsfehler fehl.
    pub async fn send_chat(&self, text: &str) -> EndpointResult<bool> {
        if text.trim().is_empty() {
            return Ok(false);
        }
        match &*self.gate_rx.borrow() {
            GateState::Established { .. } => {}
            GateState::Aborted(_) => return Err(EndpointError::VerbindungGetrennt),
            GateState::Pending => {
                return Err(EndpointError::zustand(
                    "Senden nicht moeglich, Session Key nicht etabliert",
                ))
            }
        }

        let encrypted_content = self.handshake.lock().encrypt_outgoing(text)?;
        self.ausgang_tx
            .send(ClientMessage::ChatMessage { encrypted_content })
            .await
            .map_err(|_| EndpointError::VerbindungGetrennt)?;
        Ok(true)
    }

    /// Beendet die Sitzung und schliesst die Verbindung
    pub async fn disconnect(self) {
        self.empfangs_task.abort();
        let _ = self.empfangs_task.await;
        drop(self.ausgang_tx);
        let _ = self.writer_task.await;
        self.handshake.lock().abort();
        tracing::info!(username = %self.username, "Sitzung beendet");
    }
}

// ---------------------------------------------------------------------------
// Writer-Task
// ---------------------------------------------------------------------------

async fn writer_schleife<S>(
    mut sink: SplitSink<Framed<S, ClientCodec>, ClientMessage>,
    mut ausgang_rx: mpsc::Receiver<ClientMessage>,
    mut gate_rx: watch::Receiver<GateState>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            nachricht = ausgang_rx.recv() => {
                let Some(nachricht) = nachricht else {
                    break;
                };
                let art = nachricht.kind();
                if let Err(e) = sink.send(nachricht).await {
                    tracing::warn!(art, fehler = %e, "Senden an Relay fehlgeschlagen");
                    break;
                }
                tracing::trace!(art, "Nachricht gesendet");
            }

            // Abgebrochene Sitzung: Verbindung sofort schliessen
            Ok(()) = gate_rx.changed() => {
                if matches!(*gate_rx.borrow(), GateState::Aborted(_)) {
                    tracing::debug!("Sitzung abgebrochen, Writer-Task beendet");
                    break;
                }
            }
        }
    }
    if let Err(e) = sink.close().await {
        tracing::debug!(fehler = %e, "Schliessen der Verbindung fehlgeschlagen");
    }
}

// ---------------------------------------------------------------------------
// Empfangs-Task
// ---------------------------------------------------------------------------

struct Empfaenger {
    handshake: Arc<Mutex<Handshake>>,
    gate_tx: watch::Sender<GateState>,
    event_tx: mpsc::UnboundedSender<ClientEvent>,
    ausgang_tx: mpsc::Sender<ClientMessage>,
}

/// Ob der Empfangs-Task weiterlaufen soll
enum Weiter {
    Ja,
    Nein,
}

impl Empfaenger {
    async fn schleife<S>(self, mut stream: SplitStream<Framed<S, ClientCodec>>)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        loop {
            match stream.next().await {
                Some(Ok(Ok(nachricht))) => {
                    if let Weiter::Nein = self.verarbeiten(nachricht).await {
                        break;
                    }
                }
                Some(Ok(Err(e))) => {
                    tracing::warn!(fehler = %e, "Fehlerhaftes Frame vom Relay verworfen");
                    self.warnung(ErrorClass::Protocol, e.to_string());
                }
                Some(Err(e)) => {
                    tracing::warn!(fehler = %e, "Verbindung zum Relay fehlerhaft");
                    self.abbrechen(format!("Transportfehler: {e}"));
                    break;
                }
                None => {
                    tracing::info!("Relay hat die Verbindung geschlossen");
                    self.abbrechen("Verbindung vom Relay getrennt".to_string());
                    break;
                }
            }
        }
        self.event(ClientEvent::Disconnected);
    }

    async fn verarbeiten(&self, nachricht: ServerMessage) -> Weiter {
        match nachricht {
            ServerMessage::RegistrationSuccess { message } => {
                match self.handshake.lock().on_registered() {
                    Ok(()) => self.event(ClientEvent::Registered { message }),
                    Err(e) => self.fehler(&e),
                }
                Weiter::Ja
            }

            ServerMessage::DhParameters { parameters } => {
                let ergebnis = self.handshake.lock().on_parameters(parameters);
                match ergebnis {
                    Ok(antwort) => {
                        self.event(ClientEvent::ParametersReceived);
                        if self.ausgang_tx.send(antwort).await.is_err() {
                            self.abbrechen("Writer-Task beendet".to_string());
                            return Weiter::Nein;
                        }
                        self.handshake.lock().public_key_sent();
                        self.event(ClientEvent::PublicKeySent);
                        Weiter::Ja
                    }
                    Err(e) => self.fehler_oder_abbruch(e),
                }
            }

            ServerMessage::DhPeerPublicKey { from, public_key } => {
                let ergebnis = self.handshake.lock().on_peer_public_key(&from, &public_key);
                match ergebnis {
                    Ok(PeerKeyOutcome::Established { peer, fingerprint }) => {
                        self.gate_tx.send_replace(GateState::Established {
                            fingerprint,
                            peer: peer.clone(),
                        });
                        self.event(ClientEvent::Established { peer, fingerprint });
                        Weiter::Ja
                    }
                    Ok(PeerKeyOutcome::Unveraendert) => {
                        tracing::debug!(peer = %from, "Peer-Schluessel wiederholt – unveraendert");
                        Weiter::Ja
                    }
                    Err(e) => self.fehler_oder_abbruch(e),
                }
            }

            ServerMessage::EncryptedMessage {
                from,
                encrypted_content,
                timestamp,
            } => {
                let ergebnis = self.handshake.lock().decrypt_incoming(&encrypted_content);
                match ergebnis {
                    Ok(text) => self.event(ClientEvent::Message {
                        from,
                        text,
                        timestamp,
                    }),
                    Err(e) => {
                        tracing::warn!(von = %from, fehler = %e, "Nachricht verworfen");
                        self.fehler(&e);
                    }
                }
                Weiter::Ja
            }

            ServerMessage::Error { code, message } => {
                let fehler = EndpointError::Relay { code, message };
                tracing::warn!(fehler = %fehler, "Relay hat eine Anfrage abgelehnt");
                match code {
                    ErrorCode::RelayFull | ErrorCode::DuplicateUsername => {
                        self.abbrechen(fehler.to_string());
                        Weiter::Nein
                    }
                    _ => {
                        self.fehler(&fehler);
                        Weiter::Ja
                    }
                }
            }
        }
    }

    fn fehler_oder_abbruch(&self, fehler: EndpointError) -> Weiter {
        if self.handshake.lock().phase() == HandshakePhase::Aborted {
            tracing::warn!(fehler = %fehler, "Handshake abgebrochen");
            self.abbrechen(fehler.to_string());
            Weiter::Nein
        } else {
            self.fehler(&fehler);
            Weiter::Ja
        }
    }

    fn fehler(&self, fehler: &EndpointError) {
        self.warnung(fehler.class(), fehler.to_string());
    }

    fn warnung(&self, class: ErrorClass, message: String) {
        self.event(ClientEvent::Warning { class, message });
    }

    /// Beendet die Sitzung unabhaengig vom bisherigen Zustand
    fn abbrechen(&self, reason: String) {
        self.handshake.lock().abort();
        self.gate_tx.send_replace(GateState::Aborted(reason.clone()));
        self.event(ClientEvent::Aborted { reason });
    }

    fn event(&self, event: ClientEvent) {
        // Oberflaeche hat den Kanal evtl. schon verworfen
        let _ = self.event_tx.send(event);
    }
}
