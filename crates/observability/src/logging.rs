//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable (hat Vorrang vor der Konfiguration):
//! - `RC_LOG_LEVEL`: Filter-Ausdruck (z.B. `info`, `relaychat_signaling=debug`)
//! - `RC_LOG_FORMAT`: Format (text/json)
//!
//! Ausgabe geht nach stderr, damit stdout dem Chat gehoert.

use std::str::FromStr;

use thiserror::Error;
use tracing_subscriber::{fmt, EnvFilter};

/// Umgebungsvariable fuer den Log-Filter
pub const LOG_LEVEL_ENV: &str = "RC_LOG_LEVEL";

/// Umgebungsvariable fuer das Log-Format
pub const LOG_FORMAT_ENV: &str = "RC_LOG_FORMAT";

/// Ausgabeformat der Logs
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            andere => Err(LoggingError::UngueltigesFormat(andere.to_string())),
        }
    }
}

/// Fehler beim Initialisieren des Loggings
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Ungueltiges Log-Format: '{0}' (erlaubt: text, json)")]
    UngueltigesFormat(String),

    #[error("Logging bereits initialisiert: {0}")]
    BereitsInitialisiert(String),
}

/// Initialisiert das Logging-System.
///
/// `RC_LOG_LEVEL` / `RC_LOG_FORMAT` ueberschreiben die Argumente. Ein
/// ungueltiger Filter faellt auf `info` zurueck.
pub fn logging_initialisieren(level: &str, format: &str) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_env(LOG_LEVEL_ENV)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let format = format_waehlen(std::env::var(LOG_FORMAT_ENV).ok(), format)?;

    let ergebnis = match format {
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_current_span(true)
            .try_init(),
        LogFormat::Text => fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .try_init(),
    };
    ergebnis.map_err(|e| LoggingError::BereitsInitialisiert(e.to_string()))
}

/// Waehlt das Format: Umgebung vor Konfiguration
fn format_waehlen(aus_env: Option<String>, konfiguriert: &str) -> Result<LogFormat, LoggingError> {
    match aus_env {
        Some(wert) if !wert.trim().is_empty() => wert.trim().parse(),
        _ => konfiguriert.parse(),
    }
}

/// Validiert ob ein Log-Level-String gueltig ist.
pub fn log_level_gueltig(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}

/// Validiert ob ein Log-Format-String gueltig ist.
pub fn log_format_gueltig(format: &str) -> bool {
    format.parse::<LogFormat>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_werte() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            assert!(log_level_gueltig(level));
        }
        assert!(!log_level_gueltig("verbose"));
        assert!(!log_level_gueltig("INFO")); // Gross-/Kleinschreibung
        assert!(!log_level_gueltig(""));
    }

    #[test]
    fn log_format_werte() {
        assert!(log_format_gueltig("text"));
        assert!(log_format_gueltig("json"));
        assert!(!log_format_gueltig("xml"));
        assert!(!log_format_gueltig("JSON"));
    }

    #[test]
    fn umgebung_hat_vorrang() {
        assert_eq!(
            format_waehlen(Some("json".into()), "text").unwrap(),
            LogFormat::Json
        );
        assert_eq!(format_waehlen(None, "json").unwrap(), LogFormat::Json);
        assert_eq!(format_waehlen(Some("  ".into()), "text").unwrap(), LogFormat::Text);
        assert!(format_waehlen(Some("yaml".into()), "text").is_err());
    }
}
