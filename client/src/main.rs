//! Relaychat Terminal-Client
//!
//! Verbindet sich mit dem Relay, fuehrt den Handshake durch und zeigt
//! danach den Fingerprint des Session Keys an. Jede Zeile von stdin wird
//! verschluesselt an das Gegenueber gesendet, `quit` beendet die Sitzung.

mod ausgabe;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use relaychat_endpoint::{ClientEvent, EndpointSession};
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;

/// Ende-zu-Ende verschluesselter Chat ueber ein Relay
#[derive(Parser, Debug)]
#[command(name = "relaychat-client")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Eigener Benutzername
    username: String,

    /// Host des Relays
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Port des Relays
    #[arg(short, long, default_value_t = 8888)]
    port: u16,

    /// Maximale Wartezeit auf das Gegenueber in Sekunden (ohne: unbegrenzt)
    #[arg(long)]
    handshake_timeout_sek: Option<u64>,

    /// Log-Level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    relaychat_observability::logging_initialisieren(&cli.log_level, "text")?;

    let (session, events) = EndpointSession::connect(&cli.host, cli.port, &cli.username)
        .await
        .with_context(|| format!("Verbindung zu {}:{} fehlgeschlagen", cli.host, cli.port))?;
    println!(
        "Verbunden mit {}:{} als {}. Warte auf Gegenueber...",
        cli.host,
        cli.port,
        session.username()
    );

    tracing::info!(host = %cli.host, port = cli.port, username = %session.username(), "Sitzung gestartet");

    let mut ausgabe_task = tokio::spawn(ereignisse_ausgeben(events));

    let timeout = cli.handshake_timeout_sek.map(Duration::from_secs);
    let (fingerprint, peer) = match session.wait_established(timeout).await {
        Ok(ergebnis) => ergebnis,
        Err(e) => {
            tracing::warn!(fehler = %e, "Handshake fehlgeschlagen");
            session.disconnect().await;
            return Err(e).context("Handshake fehlgeschlagen");
        }
    };

    tracing::info!(peer = %peer, fingerprint = %fingerprint.kurz(), "Session Key etabliert");
    println!("Sichere Verbindung mit {peer} hergestellt.");
    println!("Fingerprint: {}", fingerprint.vollstaendig());
    println!("Vergleiche den Fingerprint mit {peer} ueber einen unabhaengigen Kanal.");
    println!("Nachricht eingeben und Enter druecken, 'quit' beendet.");

    let mut zeilen = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            zeile = zeilen.next_line() => {
                let Some(zeile) = zeile.context("stdin nicht lesbar")? else {
                    break;
                };
                if zeile.trim().eq_ignore_ascii_case("quit") {
                    break;
                }
                match session.send_chat(&zeile).await {
                    Ok(_) => {}
                    Err(e) if e.class().beendet_verbindung() => {
                        tracing::warn!(fehler = %e, "Senden fehlgeschlagen, Sitzung beendet");
                        eprintln!("Senden fehlgeschlagen: {e}");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(fehler = %e, klasse = %e.class(), "Senden fehlgeschlagen");
                        eprintln!("Senden fehlgeschlagen: {e}");
                    }
                }
            }
            _ = &mut ausgabe_task => {
                break;
            }
        }
    }

    session.disconnect().await;
    ausgabe_task.abort();
    tracing::info!("Client beendet");
    Ok(())
}

/// Gibt Ereignisse aus bis die Sitzung endet
async fn ereignisse_ausgeben(mut events: mpsc::UnboundedReceiver<ClientEvent>) {
    while let Some(event) = events.recv().await {
        if let Some(text) = ausgabe::ereignis_text(&event) {
            println!("{text}");
        }
        if ausgabe::ist_endgueltig(&event) {
            break;
        }
    }
}
