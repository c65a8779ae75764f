//! Wire-Format fuer TCP-Verbindungen
//!
//! Zeilenbasiertes Protokoll: ein kompaktes JSON-Objekt pro Zeile,
//! abgeschlossen mit `\n`.
//!
//! ## Frame-Format
//!
//! ```text
//! {"type":"register","username":"alice"}\n
//! {"type":"dh_public_key","public_key":"..."}\n
//! ```
//!
//! - Teil-Frames werden gepuffert bis das `\n` eintrifft
//! - Mehrere Frames in einem Read werden einzeln und in Reihenfolge geliefert
//! - Leere Zeilen und reine Whitespace-Zeilen werden uebersprungen
//! - Ein fehlerhaftes Frame ergibt ein `Err(ProtocolError)` als Item; der
//!   Stream laeuft danach weiter
//! - Eine Zeile ueber der maximalen Frame-Groesse zerstoert die Framing-
//!   Synchronisation und beendet den Stream mit einem IO-Fehler

use bytes::{BufMut, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io;
use std::marker::PhantomData;
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

use crate::control::{ClientMessage, ServerMessage};

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Standard-maximale Frame-Groesse (64 KiB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024;

/// Frame-Trennzeichen
pub const DELIMITER: u8 = b'\n';

// ---------------------------------------------------------------------------
// Fehler
// ---------------------------------------------------------------------------

/// Fehlerhaftes Frame (nicht verbindungsbeendend)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Frame ist kein gueltiges UTF-8")]
    Utf8,

    #[error("Ungueltiges Frame: {0}")]
    Json(String),
}

/// Ergebnis eines einzelnen dekodierten Frames
pub type Frame<T> = Result<T, ProtocolError>;

// ---------------------------------------------------------------------------
// JsonLineCodec
// ---------------------------------------------------------------------------

/// tokio-util Codec fuer zeilenbasierte JSON-Frames
///
/// `D` ist der Nachrichtentyp der dekodiert wird. Kodiert werden kann jeder
/// `Serialize`-Typ.
#[derive(Debug)]
pub struct JsonLineCodec<D> {
    /// Maximale erlaubte Frame-Groesse in Bytes (ohne Trennzeichen)
    max_frame_size: usize,
    /// Bereits nach `\n` durchsuchter Teil des Buffers
    next_index: usize,
    _nachricht: PhantomData<fn() -> D>,
}

/// Codec auf Relay-Seite (dekodiert Endpunkt-Nachrichten)
pub type ServerCodec = JsonLineCodec<ClientMessage>;

/// Codec auf Endpunkt-Seite (dekodiert Relay-Nachrichten)
pub type ClientCodec = JsonLineCodec<ServerMessage>;

impl<D> JsonLineCodec<D> {
    /// Erstellt einen neuen Codec mit Standard-Limits
    pub fn new() -> Self {
        Self::with_max_size(DEFAULT_MAX_FRAME_SIZE)
    }

    /// Erstellt einen Codec mit benutzerdefinierter maximaler Frame-Groesse
    pub fn with_max_size(max_frame_size: usize) -> Self {
        Self {
            max_frame_size,
            next_index: 0,
            _nachricht: PhantomData,
        }
    }

    /// Gibt die konfigurierte maximale Frame-Groesse zurueck
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    fn zu_gross(&self, laenge: usize) -> io::Error {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "Frame zu gross: {} Bytes (Maximum: {} Bytes)",
                laenge, self.max_frame_size
            ),
        )
    }
}

impl<D> Default for JsonLineCodec<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> Clone for JsonLineCodec<D> {
    fn clone(&self) -> Self {
        Self::with_max_size(self.max_frame_size)
    }
}

/// Parst eine einzelne Zeile. `None` bei leerer Zeile.
fn zeile_parsen<D: DeserializeOwned>(zeile: &[u8]) -> Option<Frame<D>> {
    let text = match std::str::from_utf8(zeile) {
        Ok(t) => t,
        Err(_) => return Some(Err(ProtocolError::Utf8)),
    };
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(serde_json::from_str(text).map_err(|e| ProtocolError::Json(e.to_string())))
}

// ---------------------------------------------------------------------------
// Decoder-Implementierung
// ---------------------------------------------------------------------------

impl<D: DeserializeOwned> Decoder for JsonLineCodec<D> {
    type Item = Frame<D>;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let suche_ab = self.next_index.min(src.len());
            let position = src[suche_ab..].iter().position(|b| *b == DELIMITER);

            let Some(offset) = position else {
                // Kein vollstaendiges Frame – auf mehr Daten warten
                if src.len() > self.max_frame_size {
                    return Err(self.zu_gross(src.len()));
                }
                self.next_index = src.len();
                return Ok(None);
            };

            let zeilen_ende = suche_ab + offset;
            self.next_index = 0;

            if zeilen_ende > self.max_frame_size {
                return Err(self.zu_gross(zeilen_ende));
            }

            let zeile = src.split_to(zeilen_ende + 1);
            if let Some(frame) = zeile_parsen(&zeile[..zeilen_ende]) {
                return Ok(Some(frame));
            }
            // Leere Zeile: naechste versuchen
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        if src.is_empty() {
            return Ok(None);
        }
        // Letzte Zeile ohne abschliessendes Trennzeichen
        let rest = src.split_to(src.len());
        self.next_index = 0;
        Ok(zeile_parsen(&rest))
    }
}

// ---------------------------------------------------------------------------
// Encoder-Implementierung
// ---------------------------------------------------------------------------

impl<D, E: Serialize> Encoder<E> for JsonLineCodec<D> {
    type Error = io::Error;

    fn encode(&mut self, item: E, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let json = serde_json::to_vec(&item).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("JSON-Serialisierung fehlgeschlagen: {}", e),
            )
        })?;

        if json.len() > self.max_frame_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Nachricht zu gross: {} Bytes (Maximum: {} Bytes)",
                    json.len(),
                    self.max_frame_size
                ),
            ));
        }

        dst.reserve(json.len() + 1);
        dst.put_slice(&json);
        dst.put_u8(DELIMITER);

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
