//! Send-Queues der verbundenen Peers
//!
//! Jeder Verbindungs-Worker besitzt eine begrenzte Queue, die er selbst in
//! den TCP-Stream leert. Der Koordinator schreibt nicht-blockierend hinein,
//! auch waehrend er die Registry-Sperre haelt.

use relaychat_core::ConnectionId;
use relaychat_protocol::ServerMessage;
use tokio::sync::mpsc;

/// Standard-Groesse der Send-Queue pro Peer
pub const SEND_QUEUE_GROESSE: usize = 64;

/// Handle auf die Send-Queue eines verbundenen Peers
#[derive(Clone, Debug)]
pub struct PeerSender {
    pub connection: ConnectionId,
    tx: mpsc::Sender<ServerMessage>,
}

impl PeerSender {
    pub fn neu(connection: ConnectionId, tx: mpsc::Sender<ServerMessage>) -> Self {
        Self { connection, tx }
    }

    /// Erstellt Sender und zugehoerige Empfangs-Queue
    pub fn kanal(
        connection: ConnectionId,
        groesse: usize,
    ) -> (Self, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(groesse.max(1));
        (Self::neu(connection, tx), rx)
    }

    /// Sendet eine Nachricht nicht-blockierend an den Peer
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn senden(&self, nachricht: ServerMessage) -> bool {
        match self.tx.try_send(nachricht) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(n)) => {
                tracing::warn!(
                    connection = %self.connection,
                    art = n.kind(),
                    "Send-Queue voll – Nachricht verworfen"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(n)) => {
                tracing::debug!(
                    connection = %self.connection,
                    art = n.kind(),
                    "Send-Queue geschlossen (Peer getrennt)"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaychat_protocol::ErrorCode;

    #[tokio::test]
    async fn senden_und_empfangen() {
        let (sender, mut rx) = PeerSender::kanal(ConnectionId::new(), 4);
        assert!(sender.senden(ServerMessage::error(ErrorCode::NoPeer, "x")));
        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.kind(), "error");
    }

    #[test]
    fn volle_queue_verwirft() {
        let (sender, _rx) = PeerSender::kanal(ConnectionId::new(), 1);
        assert!(sender.senden(ServerMessage::error(ErrorCode::NoPeer, "1")));
        assert!(!sender.senden(ServerMessage::error(ErrorCode::NoPeer, "2")));
    }

    #[test]
    fn geschlossene_queue() {
        let (sender, rx) = PeerSender::kanal(ConnectionId::new(), 4);
        drop(rx);
        assert!(!sender.senden(ServerMessage::error(ErrorCode::NoPeer, "x")));
    }
}
