//! Gemeinsame Identifikationstypen fuer Relaychat
//!
//! Newtype-Pattern, damit Verbindungs-IDs und Benutzernamen nicht mit
//! beliebigen Strings/UUIDs verwechselt werden.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::UsernameError;

/// Maximale Laenge eines Benutzernamens in Zeichen
pub const MAX_USERNAME_LAENGE: usize = 64;

/// Eindeutige ID einer Relay-Verbindung (Connection-Handle)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Erstellt eine neue zufaellige ConnectionId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn:{}", self.0)
    }
}

/// Validierter Benutzername
///
/// Fuehrende/abschliessende Leerzeichen werden entfernt. Leere Namen,
/// Namen ueber `MAX_USERNAME_LAENGE` Zeichen und Steuerzeichen werden
/// abgelehnt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    pub fn parse(raw: &str) -> Result<Self, UsernameError> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(UsernameError::Leer);
        }
        let laenge = name.chars().count();
        if laenge > MAX_USERNAME_LAENGE {
            return Err(UsernameError::ZuLang {
                laenge,
                max: MAX_USERNAME_LAENGE,
            });
        }
        if name.chars().any(char::is_control) {
            return Err(UsernameError::Steuerzeichen);
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Username {
    type Error = UsernameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.0
    }
}

impl std::fmt::Display for Username {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_id_eindeutig() {
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        assert_ne!(a, b, "Zwei neue ConnectionIds muessen verschieden sein");
    }

    #[test]
    fn connection_id_display() {
        let id = ConnectionId(Uuid::nil());
        assert!(id.to_string().starts_with("conn:"));
    }

    #[test]
    fn username_wird_getrimmt() {
        let name = Username::parse("  alice ").unwrap();
        assert_eq!(name.as_str(), "alice");
    }

    #[test]
    fn username_ablehnungen() {
        assert_eq!(Username::parse("   "), Err(UsernameError::Leer));
        assert_eq!(Username::parse("a\u{7}b"), Err(UsernameError::Steuerzeichen));
        let lang = "x".repeat(MAX_USERNAME_LAENGE + 1);
        assert!(matches!(
            Username::parse(&lang),
            Err(UsernameError::ZuLang { .. })
        ));
    }

    #[test]
    fn username_serde_validiert() {
        let ok: Username = serde_json::from_str("\"bob\"").unwrap();
        assert_eq!(ok.as_str(), "bob");
        assert!(serde_json::from_str::<Username>("\"\"").is_err());
        assert_eq!(serde_json::to_string(&ok).unwrap(), "\"bob\"");
    }
}
