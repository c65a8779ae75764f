//! Handshake-State-Machine (Endpunkt-Rolle)
//!
//! ## Zustaende
//! ```text
//! Disconnected -> Registered -> ParametersReceived -> KeypairGenerated
//!                                                          |
//!                                                          v
//!                                   Established <- PublicKeySent
//!
//! Aborted: erreichbar aus jedem Zustand
//! ```
//!
//! Der Peer-Schluessel wird akzeptiert, sobald ein lokales Schluessel-Paar
//! existiert, unabhaengig davon ob der eigene Schluessel schon abgeschickt
//! wurde. Ein zweiter Peer-Schluessel ist nur zulaessig, wenn er denselben
//! Session Key ergibt; sonst wird abgebrochen statt still zu rotieren.

use relaychat_crypto::{DhParameters, Fingerprint, KeyPair, PublicKey, SessionCrypto, SessionKey};
use relaychat_protocol::{ClientMessage, DhParameterSet};

use crate::error::{EndpointError, EndpointResult};

// ---------------------------------------------------------------------------
// Typen
// ---------------------------------------------------------------------------

/// Phase des Endpunkt-Handshakes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakePhase {
    Disconnected,
    Registered,
    ParametersReceived,
    KeypairGenerated,
    PublicKeySent,
    Established,
    Aborted,
}

impl std::fmt::Display for HandshakePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Registered => "registered",
            Self::ParametersReceived => "parameters_received",
            Self::KeypairGenerated => "keypair_generated",
            Self::PublicKeySent => "public_key_sent",
            Self::Established => "established",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Ergebnis eines empfangenen Peer-Schluessels
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerKeyOutcome {
    /// Session Key neu abgeleitet
    Established { peer: String, fingerprint: Fingerprint },
    /// Wiederholter Schluessel, identischer Session Key
    Unveraendert,
}

// ---------------------------------------------------------------------------
// Handshake
// ---------------------------------------------------------------------------

/// Handshake-Zustand eines Endpunkts
///
/// Haelt Schluessel-Paar und Session Key fuer die Lebensdauer einer
/// Verbindung; nichts davon wird persistiert.
#[derive(Debug)]
pub struct Handshake {
    crypto: SessionCrypto,
    phase: HandshakePhase,
    parameter: Option<DhParameters>,
    keypair: Option<KeyPair>,
    session_key: Option<SessionKey>,
    fingerprint: Option<Fingerprint>,
    peer: Option<String>,
}

impl Default for Handshake {
    fn default() -> Self {
        Self::neu(SessionCrypto::default())
    }
}

impl Handshake {
    pub fn neu(crypto: SessionCrypto) -> Self {
        Self {
            crypto,
            phase: HandshakePhase::Disconnected,
            parameter: None,
            keypair: None,
            session_key: None,
            fingerprint: None,
            peer: None,
        }
    }

    pub fn phase(&self) -> HandshakePhase {
        self.phase
    }

    pub fn ist_etabliert(&self) -> bool {
        self.phase == HandshakePhase::Established
    }

    pub fn fingerprint(&self) -> Option<Fingerprint> {
        self.fingerprint
    }

    pub fn peer(&self) -> Option<&str> {
        self.peer.as_deref()
    }

    /// Relay hat die Registrierung bestaetigt
    pub fn on_registered(&mut self) -> EndpointResult<()> {
        if self.phase != HandshakePhase::Disconnected {
            return Err(EndpointError::zustand(format!(
                "Registrierungsbestaetigung in Phase '{}'",
                self.phase
            )));
        }
        self.phase = HandshakePhase::Registered;
        Ok(())
    }

    /// DH-Parameter empfangen: validieren, Schluessel-Paar erzeugen
    ///
    /// Gibt die `dh_public_key`-Nachricht zurueck, die sofort gesendet
    /// werden muss. Ungueltige Parameter brechen den Handshake ab.
    pub fn on_parameters(&mut self, set: DhParameterSet) -> EndpointResult<ClientMessage> {
        if self.phase != HandshakePhase::Registered {
            return Err(EndpointError::zustand(format!(
                "DH-Parameter in Phase '{}'",
                self.phase
            )));
        }

        let parameter = DhParameters::from_wire(set);
        if let Err(e) = self.crypto.validate_parameters(&parameter) {
            self.abort();
            return Err(e.into());
        }
        self.phase = HandshakePhase::ParametersReceived;

        let keypair = match self.crypto.generate_keypair(&parameter) {
            Ok(kp) => kp,
            Err(e) => {
                self.abort();
                return Err(e.into());
            }
        };
        let antwort = ClientMessage::DhPublicKey {
            public_key: keypair.public_key.to_base64(),
        };

        self.parameter = Some(parameter);
        self.keypair = Some(keypair);
        self.phase = HandshakePhase::KeypairGenerated;
        tracing::debug!("Schluessel-Paar erzeugt");
        Ok(antwort)
    }

    /// Eigener oeffentlicher Schluessel wurde abgeschickt
    pub fn public_key_sent(&mut self) {
        if self.phase == HandshakePhase::KeypairGenerated {
            self.phase = HandshakePhase::PublicKeySent;
        }
    }

    /// Oeffentlichen Schluessel des Gegenuebers verarbeiten
    pub fn on_peer_public_key(
        &mut self,
        from: &str,
        public_key: &str,
    ) -> EndpointResult<PeerKeyOutcome> {
        if self.phase == HandshakePhase::Aborted {
            return Err(EndpointError::zustand("Handshake bereits abgebrochen"));
        }
        let (Some(parameter), Some(keypair)) = (&self.parameter, &self.keypair) else {
            return Err(EndpointError::zustand(
                "Peer-Schluessel ohne lokales Schluessel-Paar",
            ));
        };

        let abgeleitet = PublicKey::from_base64(public_key)
            .and_then(|peer_key| self.crypto.derive_session_key(parameter, keypair, &peer_key));
        let key = match abgeleitet {
            Ok(key) => key,
            Err(e) => {
                self.abort();
                return Err(e.into());
            }
        };

        if let Some(vorhanden) = &self.session_key {
            if *vorhanden == key {
                return Ok(PeerKeyOutcome::Unveraendert);
            }
            self.abort();
            return Err(EndpointError::protokoll(format!(
                "Zweiter abweichender Peer-Schluessel von '{from}' – Handshake doppelt"
            )));
        }

        let fingerprint = self.crypto.fingerprint(&key);
        self.session_key = Some(key);
        self.fingerprint = Some(fingerprint);
        self.peer = Some(from.to_string());
        self.phase = HandshakePhase::Established;

        tracing::info!(peer = from, fingerprint = %fingerprint.kurz(), "Session Key etabliert");
        Ok(PeerKeyOutcome::Established {
            peer: from.to_string(),
            fingerprint,
        })
    }

    /// Entschluesselt eine eingehende Chat-Nachricht
    ///
    /// Vor `Established` wird nicht entschluesselt (Zustandsfehler).
    pub fn decrypt_incoming(&self, encrypted_content: &str) -> EndpointResult<String> {
        let key = self.etablierter_key()?;
        Ok(self.crypto.decrypt(key, encrypted_content)?)
    }

    /// Verschluesselt eine ausgehende Chat-Nachricht
    pub fn encrypt_outgoing(&self, text: &str) -> EndpointResult<String> {
        let key = self.etablierter_key()?;
        Ok(self.crypto.encrypt(key, text)?)
    }

    /// Bricht den Handshake ab und verwirft das Schluesselmaterial
    pub fn abort(&mut self) {
        self.phase = HandshakePhase::Aborted;
        self.keypair = None;
        self.session_key = None;
    }

    fn etablierter_key(&self) -> EndpointResult<&SessionKey> {
        match (&self.phase, &self.session_key) {
            (HandshakePhase::Established, Some(key)) => Ok(key),
            _ => Err(EndpointError::zustand(format!(
                "Kein Session Key etabliert (Phase '{}')",
                self.phase
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
