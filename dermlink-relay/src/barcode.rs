//! Pairing Barcode
//!
//! Renders the pairing URL as a QR code PNG. Sent as the first binary frame
//! of every browser connection; the mobile capture page scans it to obtain
//! its pairing token.

use std::io::Cursor;

use image::Luma;
use qrcode::{EcLevel, QrCode};

/// PNG file signature, for sanity checks.
pub const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Renders a pairing URL as a QR code PNG.
///
/// Low error correction and no quiet zone keep the image small; the
/// surrounding page provides its own margin.
pub fn pairing_barcode(url: &str) -> Result<Vec<u8>, String> {
    let code = QrCode::with_error_correction_level(url.as_bytes(), EcLevel::L)
        .map_err(|e| format!("QR encoding failed: {}", e))?;

    let image = code
        .render::<Luma<u8>>()
        .module_dimensions(4, 4)
        .quiet_zone(false)
        .build();

    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| format!("PNG encoding failed: {}", e))?;
    Ok(png)
}
