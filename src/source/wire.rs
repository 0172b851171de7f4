//! BLE notification payload codec.
//!
//! The peripheral notifies a characteristic whose value is a base64 envelope
//! around ASCII text `"x,y,z"`. Fields that are missing, unparsable or not
//! finite decode as 0 so one bad reading cannot stall a session.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::DecodeError;
use crate::models::Acceleration;

/// Decode one characteristic value into an acceleration triple
pub fn decode_payload(encoded: &str) -> Result<Acceleration, DecodeError> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| DecodeError::InvalidEnvelope {
            reason: e.to_string(),
        })?;

    if !bytes.is_ascii() {
        return Err(DecodeError::NotAscii);
    }
    // ASCII checked above, so this cannot fail
    let text = String::from_utf8_lossy(&bytes);

    Ok(parse_triple(&text))
}

/// Parse `"x,y,z"` text, defaulting bad or missing fields to 0
pub fn parse_triple(text: &str) -> Acceleration {
    let mut fields = text
        .trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .split(',')
        .map(|field| field.trim().parse::<f64>().ok());

    let x = fields.next().flatten();
    let y = fields.next().flatten();
    let z = fields.next().flatten();

    Acceleration::from_partial(x, y, z)
}

/// Encode a triple the way the peripheral firmware does
pub fn encode_payload(acceleration: &Acceleration) -> String {
    let text = format!(
        "{:.3},{:.3},{:.3}",
        acceleration.x, acceleration.y, acceleration.z
    );
    STANDARD.encode(text.as_bytes())
}
