//! Conversion between the 16-byte wire form of an identifier and its
//! canonical `8-4-4-4-12` lowercase hex string.

use thiserror::Error;
use uuid::Uuid;

pub const WIRE_LEN: usize = 16;
pub const CANONICAL_LEN: usize = 36;

const HEX_DIGITS: usize = WIRE_LEN * 2;
const GROUPS: [usize; 5] = [8, 4, 4, 4, 12];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("malformed wire value: expected 16 bytes, got {len}")]
    MalformedWireValue { len: usize },
    #[error("malformed canonical value {value:?}: {reason}")]
    MalformedCanonicalValue { value: String, reason: &'static str },
}

impl CodecError {
    fn canonical(value: &str, reason: &'static str) -> Self {
        Self::MalformedCanonicalValue { value: value.to_string(), reason }
    }
}

/// Renders wire bytes as the canonical hyphenated string.
pub fn decode(wire: &[u8]) -> Result<String, CodecError> {
    let wire: &[u8; WIRE_LEN] = wire
        .try_into()
        .map_err(|_| CodecError::MalformedWireValue { len: wire.len() })?;
    Ok(render(wire))
}

/// Parses a canonical string back into wire bytes.
///
/// Hyphens are dropped wherever they appear; what remains must be exactly 32
/// hex digits in either case.
pub fn encode(canonical: &str) -> Result<[u8; WIRE_LEN], CodecError> {
    let digits: String = canonical.chars().filter(|c| *c != '-').collect();
    if digits.chars().count() != HEX_DIGITS {
        return Err(CodecError::canonical(canonical, "expected 32 hex digits"));
    }

    let mut wire = [0u8; WIRE_LEN];
    hex::decode_to_slice(&digits, &mut wire)
        .map_err(|_| CodecError::canonical(canonical, "contains a non-hex character"))?;
    Ok(wire)
}

/// Lowercase hyphenated form of any well-formed canonical input.
pub fn normalize(canonical: &str) -> Result<String, CodecError> {
    encode(canonical).map(|wire| render(&wire))
}

/// Fresh random identifier (UUID v4 from the OS random source), in canonical form.
pub fn generate() -> String {
    render(Uuid::new_v4().as_bytes())
}

fn render(wire: &[u8; WIRE_LEN]) -> String {
    let digits = hex::encode(wire);
    let mut out = String::with_capacity(CANONICAL_LEN);
    let mut start = 0;
    for (i, len) in GROUPS.iter().enumerate() {
        if i > 0 {
            out.push('-');
        }
        out.push_str(&digits[start..start + len]);
        start += len;
    }
    out
}
