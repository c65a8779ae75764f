//! # relaychat-observability
//!
//! Structured Logging via tracing-subscriber, gemeinsam fuer Relay und
//! Endpunkt. Text- oder JSON-Ausgabe, Level per `EnvFilter`.

pub mod logging;

pub use logging::{
    log_format_gueltig, log_level_gueltig, logging_initialisieren, LogFormat, LoggingError,
};
