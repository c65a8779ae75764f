//! relaychat-protocol – Netzwerkprotokoll-Definitionen
//!
//! Dieses Crate definiert alle Nachrichtentypen, die zwischen Endpunkt und
//! Relay ausgetauscht werden, sowie den zeilenbasierten JSON-Codec.

pub mod control;
pub mod crypto;
pub mod wire;

pub use control::{ClientMessage, ErrorCode, ServerMessage};
pub use crypto::{DhGroup, DhParameterSet};
pub use wire::{ClientCodec, Frame, JsonLineCodec, ProtocolError, ServerCodec};
