//! Relay-Koordinator – Peer-Registry und Handshake-Koordination
//!
//! Der Koordinator besitzt die einzige veraenderliche geteilte Struktur des
//! Relays: die Registry mit hoechstens zwei `PeerRecord`s. Jede Mutation
//! (Registrieren, Schluessel speichern, Austausch, Aufraeumen) laeuft unter
//! derselben `parking_lot::Mutex`, damit zwei gleichzeitige
//! `receive_public_key`-Aufrufe den Austausch weder doppelt noch gar nicht
//! ausloesen.
//!
//! ## Phasen
//! ```text
//! Idle -> ParametersGenerated -> AcceptingConnections -> TwoPeersRegistered -> Active
//!                                        ^                                       |
//!                                        +------------- Disconnect --------------+
//! ```
//!
//! Das Relay sieht nur oeffentliche Schluessel und Base64-Umschlaege. Shared
//! Secret und Session Key existieren ausschliesslich in den Endpunkten.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use relaychat_core::{ConnectionId, Username};
use relaychat_crypto::{DhParameters, DiffieHellmanEngine};
use relaychat_protocol::ServerMessage;

use crate::broadcast::PeerSender;
use crate::error::{SignalingError, SignalingResult};

/// Obergrenze gleichzeitig registrierter Peers
pub const MAX_PEERS: usize = 2;

// ---------------------------------------------------------------------------
// Typen
// ---------------------------------------------------------------------------

/// Beobachtbare Phase des Relays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayPhase {
    Idle,
    ParametersGenerated,
    AcceptingConnections,
    TwoPeersRegistered,
    Active,
}

/// Eintrag eines registrierten Peers
#[derive(Debug, Clone)]
pub struct PeerRecord {
    pub username: Username,
    pub connection: ConnectionId,
    pub sender: PeerSender,
    /// Oeffentlicher Schluessel (Base64, unveraendert vom Wire)
    pub public_key: Option<String>,
}

#[derive(Debug)]
struct PeerRegistry {
    peers: Vec<PeerRecord>,
    /// Austausch fuer das aktuelle Paar bereits erfolgt
    ausgetauscht: bool,
    phase: RelayPhase,
}

impl PeerRegistry {
    fn finden(&self, connection: ConnectionId) -> Option<usize> {
        self.peers.iter().position(|p| p.connection == connection)
    }

    fn beide_schluessel(&self) -> bool {
        self.peers.len() == MAX_PEERS && self.peers.iter().all(|p| p.public_key.is_some())
    }
}

// ---------------------------------------------------------------------------
// RelayCoordinator
// ---------------------------------------------------------------------------

/// Koordiniert Registrierung, Schluesselaustausch und Weiterleitung
#[derive(Debug)]
pub struct RelayCoordinator {
    parameter: Arc<DhParameters>,
    max_peers: usize,
    registry: Mutex<PeerRegistry>,
}

impl RelayCoordinator {
    /// Erstellt den Koordinator mit bereits erzeugten Parametern
    pub fn neu(parameter: DhParameters, max_peers: usize) -> Self {
        Self {
            parameter: Arc::new(parameter),
            max_peers: max_peers.clamp(1, MAX_PEERS),
            registry: Mutex::new(PeerRegistry {
                peers: Vec::with_capacity(MAX_PEERS),
                ausgetauscht: false,
                phase: RelayPhase::ParametersGenerated,
            }),
        }
    }

    /// Erzeugt die DH-Parameter einmalig und baut den Koordinator
    ///
    /// Ein Fehler hier ist fatal: ohne Parameter ist keine sichere Sitzung
    /// moeglich.
    pub fn generate_parameters(
        engine: &dyn DiffieHellmanEngine,
        max_peers: usize,
    ) -> SignalingResult<Self> {
        tracing::debug!(phase = ?RelayPhase::Idle, "Erzeuge DH-Parameter");
        let parameter = engine.generate_parameters()?;
        tracing::info!(gruppe = %parameter.group(), "DH-Parameter erzeugt");
        Ok(Self::neu(parameter, max_peers))
    }

    /// Markiert den Beginn der Accept-Loop
    pub fn annahme_starten(&self) {
        let mut reg = self.registry.lock();
        if reg.phase == RelayPhase::ParametersGenerated {
            reg.phase = RelayPhase::AcceptingConnections;
        }
    }

    pub fn parameter(&self) -> &DhParameters {
        &self.parameter
    }

    pub fn phase(&self) -> RelayPhase {
        self.registry.lock().phase
    }

    pub fn peer_anzahl(&self) -> usize {
        self.registry.lock().peers.len()
    }

    pub fn ist_voll(&self) -> bool {
        self.registry.lock().peers.len() >= self.max_peers
    }

    /// Registrierte Benutzernamen in Registrierungsreihenfolge
    pub fn usernames(&self) -> Vec<Username> {
        self.registry
            .lock()
            .peers
            .iter()
            .map(|p| p.username.clone())
            .collect()
    }

    /// Registriert einen Peer und sendet ihm sofort die DH-Parameter
    pub fn register_peer(
        &self,
        connection: ConnectionId,
        username: &str,
        sender: PeerSender,
    ) -> SignalingResult<PeerRecord> {
        let username = Username::parse(username)?;
        let mut reg = self.registry.lock();

        if reg.finden(connection).is_some() {
            return Err(SignalingError::BereitsRegistriert);
        }
        if reg.peers.iter().any(|p| p.username == username) {
            return Err(SignalingError::DoppelterName(username.to_string()));
        }
        if reg.peers.len() >= self.max_peers {
            return Err(SignalingError::RelayVoll);
        }

        let record = PeerRecord {
            username,
            connection,
            sender,
            public_key: None,
        };
        reg.peers.push(record.clone());
        if reg.peers.len() == MAX_PEERS {
            reg.phase = RelayPhase::TwoPeersRegistered;
        } else {
            reg.phase = RelayPhase::AcceptingConnections;
        }

        tracing::info!(
            username = %record.username,
            connection = %connection,
            peers = reg.peers.len(),
            "Peer registriert"
        );

        record.sender.senden(ServerMessage::RegistrationSuccess {
            message: format!("Welcome {}!", record.username),
        });
        if record.sender.senden(ServerMessage::DhParameters {
            parameters: self.parameter.to_wire(),
        }) {
            tracing::info!(username = %record.username, "DH-Parameter gesendet");
        }

        Ok(record)
    }

    /// Speichert den oeffentlichen Schluessel eines Peers
    ///
    /// Gibt `true` zurueck wenn dadurch der Austausch ausgeloest wurde. Ein
    /// identischer zweiter Schluessel wird ignoriert, ein abweichender
    /// abgelehnt.
    pub fn receive_public_key(
        &self,
        connection: ConnectionId,
        public_key: &str,
    ) -> SignalingResult<bool> {
        let public_key = public_key.trim();
        if public_key.is_empty() {
            return Err(SignalingError::protokoll("Leerer oeffentlicher Schluessel"));
        }

        let mut reg = self.registry.lock();
        let index = reg
            .finden(connection)
            .ok_or(SignalingError::NichtRegistriert)?;
        let peer = &mut reg.peers[index];

        if let Some(vorhanden) = peer.public_key.as_deref() {
            if vorhanden == public_key {
                tracing::debug!(username = %peer.username, "Identischer Schluessel erneut empfangen – ignoriert");
                return Ok(false);
            }
            tracing::warn!(username = %peer.username, "Abweichender zweiter Schluessel abgelehnt");
            return Err(SignalingError::SchluesselKonflikt(peer.username.to_string()));
        }
        peer.public_key = Some(public_key.to_string());
        tracing::info!(username = %peer.username, "Oeffentlicher Schluessel empfangen");

        if reg.beide_schluessel() {
            Self::austauschen(&mut reg)
        } else {
            Ok(false)
        }
    }

    /// Tauscht die Schluessel des aktuellen Paars aus (hoechstens einmal)
    ///
    /// `Ok(false)` wenn der Austausch fuer dieses Paar bereits erfolgt ist.
    pub fn exchange_public_keys(&self) -> SignalingResult<bool> {
        let mut reg = self.registry.lock();
        Self::austauschen(&mut reg)
    }

    fn austauschen(reg: &mut PeerRegistry) -> SignalingResult<bool> {
        if reg.ausgetauscht {
            return Ok(false);
        }
        if reg.peers.len() != MAX_PEERS {
            return Err(SignalingError::KeinGegenueber);
        }
        let (a, b) = (&reg.peers[0], &reg.peers[1]);
        let (Some(key_a), Some(key_b)) = (a.public_key.clone(), b.public_key.clone()) else {
            return Err(SignalingError::protokoll(
                "Austausch erst nach beiden oeffentlichen Schluesseln",
            ));
        };

        b.sender.senden(ServerMessage::DhPeerPublicKey {
            from: a.username.to_string(),
            public_key: key_a,
        });
        a.sender.senden(ServerMessage::DhPeerPublicKey {
            from: b.username.to_string(),
            public_key: key_b,
        });

        tracing::info!(
            peer_a = %a.username,
            peer_b = %b.username,
            "Schluesselaustausch abgeschlossen"
        );

        reg.ausgetauscht = true;
        reg.phase = RelayPhase::Active;
        Ok(true)
    }

    /// Leitet einen verschluesselten Umschlag unveraendert an den anderen
    /// Peer weiter
    ///
    /// `Ok(false)` wenn der Empfaenger nicht erreichbar ist; die Nachricht
    /// wird dann verworfen.
    pub fn relay_ciphertext(
        &self,
        connection: ConnectionId,
        encrypted_content: String,
    ) -> SignalingResult<bool> {
        let reg = self.registry.lock();
        let absender = reg
            .peers
            .iter()
            .find(|p| p.connection == connection)
            .ok_or(SignalingError::NichtRegistriert)?;
        let empfaenger = reg
            .peers
            .iter()
            .find(|p| p.connection != connection)
            .ok_or(SignalingError::KeinGegenueber)?;

        let zugestellt = empfaenger.sender.senden(ServerMessage::EncryptedMessage {
            from: absender.username.to_string(),
            encrypted_content,
            timestamp: Utc::now(),
        });

        if zugestellt {
            tracing::info!(
                von = %absender.username,
                an = %empfaenger.username,
                "Verschluesselte Nachricht weitergeleitet"
            );
        } else {
            tracing::warn!(
                von = %absender.username,
                an = %empfaenger.username,
                "Empfaenger nicht erreichbar – Nachricht verworfen"
            );
        }
        Ok(zugestellt)
    }

    /// Entfernt den Peer dieser Verbindung samt Schluessel
    ///
    /// Der verbleibende Peer behaelt seinen Session Key; ein spaeterer
    /// Neuankoemmling bildet mit ihm ein neues Paar.
    pub fn disconnect(&self, connection: ConnectionId) -> Option<Username> {
        let mut reg = self.registry.lock();
        let index = reg.finden(connection)?;
        let record = reg.peers.remove(index);

        reg.ausgetauscht = false;
        reg.phase = RelayPhase::AcceptingConnections;

        tracing::info!(
            username = %record.username,
            connection = %connection,
            verbleibend = reg.peers.len(),
            "Peer getrennt"
        );
        Some(record.username)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use relaychat_crypto::X25519Engine;
    use relaychat_protocol::{DhGroup, ErrorCode};
    use tokio::sync::mpsc;

    struct TestPeer {
        id: ConnectionId,
        sender: PeerSender,
        rx: mpsc::Receiver<ServerMessage>,
    }

    fn peer() -> TestPeer {
        let id = ConnectionId::new();
        let (sender, rx) = PeerSender::kanal(id, 16);
        TestPeer { id, sender, rx }
    }

    fn koordinator() -> RelayCoordinator {
        let c = RelayCoordinator::generate_parameters(&X25519Engine::new(), MAX_PEERS).unwrap();
        c.annahme_starten();
        c
    }

    fn alle(rx: &mut mpsc::Receiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    fn registrieren(c: &RelayCoordinator, p: &mut TestPeer, name: &str) {
        c.register_peer(p.id, name, p.sender.clone()).unwrap();
        alle(&mut p.rx);
    }

    #[test]
    fn registrierung_sendet_willkommen_und_parameter() {
        let c = koordinator();
        let mut alice = peer();
        let record = c.register_peer(alice.id, "alice", alice.sender.clone()).unwrap();
        assert_eq!(record.username.as_str(), "alice");

        let msgs = alle(&mut alice.rx);
        assert_eq!(msgs.len(), 2);
        assert_eq!(
            msgs[0],
            ServerMessage::RegistrationSuccess {
                message: "Welcome alice!".to_string()
            }
        );
        match &msgs[1] {
            ServerMessage::DhParameters { parameters } => {
                assert_eq!(parameters.group, DhGroup::X25519);
                assert_eq!(parameters, &c.parameter().to_wire());
            }
            andere => panic!("Unerwartet: {andere:?}"),
        }
        assert_eq!(c.phase(), RelayPhase::AcceptingConnections);
    }

    #[test]
    fn beide_peers_erhalten_identische_parameter() {
        let c = koordinator();
        let mut alice = peer();
        let mut bob = peer();
        c.register_peer(alice.id, "alice", alice.sender.clone()).unwrap();
        c.register_peer(bob.id, "bob", bob.sender.clone()).unwrap();
        assert_eq!(alle(&mut alice.rx)[1], alle(&mut bob.rx)[1]);
        assert_eq!(c.phase(), RelayPhase::TwoPeersRegistered);
    }

    #[test]
    fn doppelter_name_wird_abgelehnt() {
        let c = koordinator();
        let mut alice = peer();
        registrieren(&c, &mut alice, "alice");

        let zweite = peer();
        let result = c.register_peer(zweite.id, " alice ", zweite.sender.clone());
        assert!(matches!(result, Err(SignalingError::DoppelterName(_))));
        assert_eq!(c.peer_anzahl(), 1);
    }

    #[test]
    fn dritter_peer_wird_abgelehnt() {
        let c = koordinator();
        let mut alice = peer();
        let mut bob = peer();
        registrieren(&c, &mut alice, "alice");
        registrieren(&c, &mut bob, "bob");
        assert!(c.ist_voll());

        let mut carol = peer();
        let result = c.register_peer(carol.id, "carol", carol.sender.clone());
        assert!(matches!(result, Err(SignalingError::RelayVoll)));
        assert_eq!(
            result.unwrap_err().error_code(),
            Some(ErrorCode::RelayFull)
        );
        assert!(alle(&mut carol.rx).is_empty());
        assert_eq!(c.usernames().len(), 2);
    }

    #[test]
    fn zweite_registrierung_derselben_verbindung() {
        let c = koordinator();
        let mut alice = peer();
        registrieren(&c, &mut alice, "alice");
        let result = c.register_peer(alice.id, "alice2", alice.sender.clone());
        assert!(matches!(result, Err(SignalingError::BereitsRegistriert)));
    }

    #[test]
    fn ungueltiger_name() {
        let c = koordinator();
        let p = peer();
        let result = c.register_peer(p.id, "   ", p.sender.clone());
        assert!(matches!(result, Err(SignalingError::UngueltigerName(_))));
    }

    #[test]
    fn austausch_genau_einmal_nach_beiden_schluesseln() {
        let c = koordinator();
        let mut alice = peer();
        let mut bob = peer();
        registrieren(&c, &mut alice, "alice");
        registrieren(&c, &mut bob, "bob");

        assert!(!c.receive_public_key(alice.id, "QUxJQ0U=").unwrap());
        assert!(alle(&mut alice.rx).is_empty());
        assert!(alle(&mut bob.rx).is_empty());

        assert!(c.receive_public_key(bob.id, "Qk9C").unwrap());

        let bei_alice = alle(&mut alice.rx);
        let bei_bob = alle(&mut bob.rx);
        assert_eq!(
            bei_alice,
            vec![ServerMessage::DhPeerPublicKey {
                from: "bob".to_string(),
                public_key: "Qk9C".to_string()
            }]
        );
        assert_eq!(
            bei_bob,
            vec![ServerMessage::DhPeerPublicKey {
                from: "alice".to_string(),
                public_key: "QUxJQ0U=".to_string()
            }]
        );
        assert_eq!(c.phase(), RelayPhase::Active);

        // Wiederholte Einreichung loest keinen zweiten Austausch aus
        assert!(!c.receive_public_key(bob.id, "Qk9C").unwrap());
        assert!(!c.exchange_public_keys().unwrap());
        assert!(alle(&mut alice.rx).is_empty());
        assert!(alle(&mut bob.rx).is_empty());
    }

    #[test]
    fn abweichender_schluessel_ist_konflikt() {
        let c = koordinator();
        let mut alice = peer();
        registrieren(&c, &mut alice, "alice");
        c.receive_public_key(alice.id, "AAAA").unwrap();
        let result = c.receive_public_key(alice.id, "BBBB");
        assert!(matches!(result, Err(SignalingError::SchluesselKonflikt(_))));
    }

    #[test]
    fn schluessel_ohne_registrierung() {
        let c = koordinator();
        let p = peer();
        assert!(matches!(
            c.receive_public_key(p.id, "AAAA"),
            Err(SignalingError::NichtRegistriert)
        ));
        assert!(matches!(
            c.receive_public_key(p.id, "  "),
            Err(SignalingError::Protokoll(_))
        ));
    }

    #[test]
    fn austausch_ohne_zweiten_peer() {
        let c = koordinator();
        let mut alice = peer();
        registrieren(&c, &mut alice, "alice");
        c.receive_public_key(alice.id, "AAAA").unwrap();
        assert!(matches!(
            c.exchange_public_keys(),
            Err(SignalingError::KeinGegenueber)
        ));
    }

    #[test]
    fn gleichzeitige_schluessel_loesen_genau_einen_austausch_aus() {
        for _ in 0..50 {
            let c = Arc::new(koordinator());
            let mut alice = peer();
            let mut bob = peer();
            registrieren(&c, &mut alice, "alice");
            registrieren(&c, &mut bob, "bob");

            let (c1, c2) = (Arc::clone(&c), Arc::clone(&c));
            let (id_a, id_b) = (alice.id, bob.id);
            let t1 = std::thread::spawn(move || c1.receive_public_key(id_a, "AAAA").unwrap());
            let t2 = std::thread::spawn(move || c2.receive_public_key(id_b, "BBBB").unwrap());
            let ausgeloest = [t1.join().unwrap(), t2.join().unwrap()];

            assert_eq!(ausgeloest.iter().filter(|x| **x).count(), 1);
            assert_eq!(alle(&mut alice.rx).len(), 1);
            assert_eq!(alle(&mut bob.rx).len(), 1);
        }
    }

    #[test]
    fn chiffrat_wird_unveraendert_weitergeleitet() {
        let c = koordinator();
        let mut alice = peer();
        let mut bob = peer();
        registrieren(&c, &mut alice, "alice");
        registrieren(&c, &mut bob, "bob");

        assert!(c.relay_ciphertext(alice.id, "b3BhcXVl".to_string()).unwrap());
        let msgs = alle(&mut bob.rx);
        match &msgs[..] {
            [ServerMessage::EncryptedMessage {
                from,
                encrypted_content,
                ..
            }] => {
                assert_eq!(from, "alice");
                assert_eq!(encrypted_content, "b3BhcXVl");
            }
            andere => panic!("Unerwartet: {andere:?}"),
        }
        assert!(alle(&mut alice.rx).is_empty());
    }

    #[test]
    fn weiterleitung_ohne_gegenueber() {
        let c = koordinator();
        let mut alice = peer();
        registrieren(&c, &mut alice, "alice");
        assert!(matches!(
            c.relay_ciphertext(alice.id, "x".to_string()),
            Err(SignalingError::KeinGegenueber)
        ));
    }

    #[test]
    fn kaputter_empfaenger_verwirft_nachricht() {
        let c = koordinator();
        let mut alice = peer();
        let mut bob = peer();
        registrieren(&c, &mut alice, "alice");
        registrieren(&c, &mut bob, "bob");
        drop(bob.rx);

        assert!(!c.relay_ciphertext(alice.id, "x".to_string()).unwrap());
        // Relay und Absender bleiben unberuehrt
        assert_eq!(c.peer_anzahl(), 2);
    }

    #[test]
    fn disconnect_raeumt_auf_und_erlaubt_neues_paar() {
        let c = koordinator();
        let mut alice = peer();
        let mut bob = peer();
        registrieren(&c, &mut alice, "alice");
        registrieren(&c, &mut bob, "bob");
        c.receive_public_key(alice.id, "AAAA").unwrap();
        c.receive_public_key(bob.id, "BBBB").unwrap();
        alle(&mut alice.rx);

        assert_eq!(c.disconnect(bob.id).map(|u| u.to_string()), Some("bob".into()));
        assert_eq!(c.disconnect(bob.id), None);
        assert_eq!(c.phase(), RelayPhase::AcceptingConnections);
        assert!(!c.ist_voll());

        // Name ist wieder frei, neues Paar tauscht erneut aus
        let mut bob2 = peer();
        registrieren(&c, &mut bob2, "bob");
        assert!(c.receive_public_key(bob2.id, "CCCC").unwrap());
        assert_eq!(
            alle(&mut alice.rx),
            vec![ServerMessage::DhPeerPublicKey {
                from: "bob".into(),
                public_key: "CCCC".into()
            }]
        );
    }
}
