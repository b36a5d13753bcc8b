//! `dermlink pair` - run a browser-style pairing session.

use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use console::style;

use dermlink_core::socket::{
    ClientEvent, ClientSession, ClientSessionConfig, WebSocketTransport,
};

use super::extension_for;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Args)]
pub struct PairArgs {
    /// Relay pairing endpoint, e.g. ws://127.0.0.1:5003/ws/client
    #[arg(long, env = "DERMLINK_RELAY_URL")]
    pub url: String,

    /// Where to write the pairing barcode PNG
    #[arg(long, default_value = "pairing-qr.png")]
    pub barcode_out: PathBuf,

    /// Directory for received images
    #[arg(long, default_value = ".")]
    pub image_dir: PathBuf,
}

pub fn run(args: PairArgs) -> Result<()> {
    let config = ClientSessionConfig::for_url(&args.url);
    let mut session = ClientSession::new(WebSocketTransport::new(), config);

    let mut received = 0usize;
    let mut pending = session.connect();
    loop {
        for event in pending.drain(..) {
            handle_event(event, &args, &mut received)?;
        }
        thread::sleep(POLL_INTERVAL);
        pending = session.poll();
    }
}

fn handle_event(event: ClientEvent, args: &PairArgs, received: &mut usize) -> Result<()> {
    match event {
        ClientEvent::Connected => {
            println!("Connected to {}", args.url);
        }
        ClientEvent::BarcodeReceived(barcode) => {
            fs::write(&args.barcode_out, &barcode.data)
                .with_context(|| format!("writing {}", args.barcode_out.display()))?;
            println!(
                "Pairing barcode written to {}; scan it with the capture device",
                style(args.barcode_out.display()).cyan()
            );
        }
        ClientEvent::PeerAttached { verifier } => {
            println!(
                "Capture device paired. Verifier: {} (confirm on the device)",
                style(verifier).green().bold()
            );
        }
        ClientEvent::PeerDetached => {
            println!("Capture device disconnected; pairing reopened");
        }
        ClientEvent::ImageReceived(image) => {
            *received += 1;
            let name = format!("capture-{}.{}", received, extension_for(&image.content_type));
            let path = args.image_dir.join(name);
            fs::write(&path, &image.data)
                .with_context(|| format!("writing {}", path.display()))?;
            println!(
                "Received {} ({} bytes) -> {}",
                image.content_type,
                image.data.len(),
                style(path.display()).cyan()
            );
        }
        ClientEvent::Reconnecting => {
            eprintln!("{}", style("Connection lost; reconnecting...").yellow());
        }
        ClientEvent::ProtocolError { code, reason } => {
            eprintln!(
                "{}",
                style(format!("Protocol error ({}): {}", code, reason)).red()
            );
        }
        ClientEvent::Closed { reason, .. } => {
            bail!("Session closed: {}", reason);
        }
        ClientEvent::Pong => {}
    }
    Ok(())
}
