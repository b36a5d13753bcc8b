//! `dermlink capture` - upload an image as a paired capture device.

use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use console::style;

use dermlink_core::socket::{
    MobileEvent, MobileSession, MobileSessionConfig, WebSocketTransport,
};

use super::content_type_for;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Args)]
pub struct CaptureArgs {
    /// Relay capture endpoint, e.g. ws://127.0.0.1:5003/ws/mobile
    #[arg(long, env = "DERMLINK_RELAY_URL")]
    pub url: String,

    /// Pairing token from the scanned barcode URL
    #[arg(long)]
    pub token: String,

    /// Image file to upload (png, jpg or gif)
    pub image: PathBuf,
}

pub fn run(args: CaptureArgs) -> Result<()> {
    let data = fs::read(&args.image)
        .with_context(|| format!("reading {}", args.image.display()))?;
    let Some(content_type) = content_type_for(&args.image) else {
        bail!("unsupported image type: {}", args.image.display());
    };

    let config = MobileSessionConfig::new(&args.url, &args.token);
    let mut session = MobileSession::new(WebSocketTransport::new(), config);

    let mut pending = session.connect();
    loop {
        for event in pending.drain(..) {
            match event {
                MobileEvent::Connected => {
                    println!("Connected to {}; authenticating...", args.url);
                }
                MobileEvent::Authenticated { verifier } => {
                    println!(
                        "Authenticated. Verifier: {} (confirm in the browser)",
                        style(verifier).green().bold()
                    );
                    session
                        .send_image(content_type, data.clone())
                        .context("uploading image")?;
                    println!("Uploading {} ({} bytes)...", content_type, data.len());
                }
                MobileEvent::AckReceived { pending: 0 } => {
                    println!("{}", style("Image delivered").green());
                    return Ok(());
                }
                MobileEvent::AckReceived { .. } => {}
                MobileEvent::ProtocolError { code, reason } => {
                    eprintln!(
                        "{}",
                        style(format!("Protocol error ({}): {}", code, reason)).red()
                    );
                }
                MobileEvent::Closed { reason, .. } => {
                    bail!("Session closed: {}", reason);
                }
                MobileEvent::Pong => {}
            }
        }
        thread::sleep(POLL_INTERVAL);
        pending = session.poll();
    }
}
