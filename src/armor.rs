//! Structural validation of OpenPGP public keys
//!
//! apt accepts a signing key either ASCII-armored (`.asc`) or as raw binary
//! packets (`.gpg`). This module checks that downloaded bytes are one of
//! those shapes and that the first packet is a public-key packet. It does
//! not verify signatures or trust.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use thiserror::Error;

const ARMOR_HEADER: &str = "-----BEGIN PGP PUBLIC KEY BLOCK-----";
const ARMOR_FOOTER: &str = "-----END PGP PUBLIC KEY BLOCK-----";

/// Packet tag for a Public-Key packet.
const TAG_PUBLIC_KEY: u8 = 6;

/// Why a byte string is not a usable public key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyFormatError {
    #[error("key data is empty")]
    Empty,

    #[error("armored key is not valid UTF-8")]
    NotUtf8,

    #[error("armored key has no END PGP PUBLIC KEY BLOCK line")]
    MissingFooter,

    #[error("armored key body is not valid base64: {0}")]
    Base64(String),

    #[error("armor checksum mismatch (expected {expected:06X}, computed {actual:06X})")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("data does not start with an OpenPGP packet header")]
    NotAPacket,

    #[error("first packet has an indeterminate or partial length")]
    UnsupportedLength,

    #[error("packet is truncated")]
    Truncated,

    #[error("first packet is tag {0}, expected a public key (tag 6)")]
    UnexpectedPacket(u8),

    #[error("unsupported public key version {0}")]
    UnsupportedVersion(u8),
}

/// Summary of a structurally valid key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicKeyInfo {
    /// Key packet version (4, 5 or 6)
    pub version: u8,
    /// Whether the input was ASCII-armored
    pub armored: bool,
    /// Length of the decoded packet stream
    pub packet_bytes: usize,
}

/// Validate that `data` is an armored or binary OpenPGP public key.
pub fn validate_public_key(data: &[u8]) -> Result<PublicKeyInfo, KeyFormatError> {
    let trimmed = data.trim_ascii_start();
    if trimmed.is_empty() {
        return Err(KeyFormatError::Empty);
    }

    let (packets, armored) = if trimmed.starts_with(ARMOR_HEADER.as_bytes()) {
        let text = std::str::from_utf8(trimmed).map_err(|_| KeyFormatError::NotUtf8)?;
        (dearmor(text)?, true)
    } else {
        (trimmed.to_vec(), false)
    };

    let version = check_first_packet(&packets)?;
    Ok(PublicKeyInfo {
        version,
        armored,
        packet_bytes: packets.len(),
    })
}

/// Strip the armor and return the decoded packet bytes.
fn dearmor(text: &str) -> Result<Vec<u8>, KeyFormatError> {
    let mut lines = text.lines().map(str::trim_end).skip(1).peekable();

    // Armor headers ("Comment: ...") end at the first blank line
    while let Some(line) = lines.peek() {
        if line.is_empty() {
            lines.next();
            break;
        }
        if !line.contains(": ") {
            break;
        }
        lines.next();
    }

    let mut body = String::new();
    let mut checksum = None;
    let mut closed = false;
    for line in lines {
        if line == ARMOR_FOOTER {
            closed = true;
            break;
        }
        if let Some(crc) = line.strip_prefix('=').filter(|c| c.len() == 4) {
            checksum = Some(crc.to_string());
            continue;
        }
        body.push_str(line.trim());
    }
    if !closed {
        return Err(KeyFormatError::MissingFooter);
    }

    let packets = BASE64
        .decode(body.as_bytes())
        .map_err(|e| KeyFormatError::Base64(e.to_string()))?;

    if let Some(crc) = checksum {
        let raw = BASE64
            .decode(crc.as_bytes())
            .map_err(|e| KeyFormatError::Base64(e.to_string()))?;
        let [a, b, c] = raw.as_slice() else {
            return Err(KeyFormatError::Base64("checksum is not 3 bytes".to_string()));
        };
        let expected = (u32::from(*a) << 16) | (u32::from(*b) << 8) | u32::from(*c);
        let actual = crc24(&packets);
        if expected != actual {
            return Err(KeyFormatError::ChecksumMismatch { expected, actual });
        }
    }

    Ok(packets)
}

/// Parse the first packet header and check it holds a public key.
/// Returns the key version.
fn check_first_packet(data: &[u8]) -> Result<u8, KeyFormatError> {
    let first = *data.first().ok_or(KeyFormatError::Empty)?;
    if first & 0x80 == 0 {
        return Err(KeyFormatError::NotAPacket);
    }

    let (tag, header_len, body_len) = if first & 0x40 != 0 {
        let tag = first & 0x3f;
        let (len_octets, body_len) = new_format_length(&data[1..])?;
        (tag, 1 + len_octets, body_len)
    } else {
        let tag = (first >> 2) & 0x0f;
        let (len_octets, body_len) = old_format_length(first & 0x03, &data[1..])?;
        (tag, 1 + len_octets, body_len)
    };

    if tag != TAG_PUBLIC_KEY {
        return Err(KeyFormatError::UnexpectedPacket(tag));
    }

    let body = data
        .get(header_len..header_len.saturating_add(body_len))
        .ok_or(KeyFormatError::Truncated)?;

    // version (1) + creation time (4) + algorithm (1)
    if body.len() < 6 {
        return Err(KeyFormatError::Truncated);
    }
    match body[0] {
        version @ 4..=6 => Ok(version),
        other => Err(KeyFormatError::UnsupportedVersion(other)),
    }
}

fn new_format_length(rest: &[u8]) -> Result<(usize, usize), KeyFormatError> {
    let o1 = *rest.first().ok_or(KeyFormatError::Truncated)? as usize;
    match o1 {
        0..=191 => Ok((1, o1)),
        192..=223 => {
            let o2 = *rest.get(1).ok_or(KeyFormatError::Truncated)? as usize;
            Ok((2, ((o1 - 192) << 8) + o2 + 192))
        }
        255 => {
            let bytes: [u8; 4] = rest
                .get(1..5)
                .and_then(|b| b.try_into().ok())
                .ok_or(KeyFormatError::Truncated)?;
            Ok((5, u32::from_be_bytes(bytes) as usize))
        }
        _ => Err(KeyFormatError::UnsupportedLength),
    }
}

fn old_format_length(length_type: u8, rest: &[u8]) -> Result<(usize, usize), KeyFormatError> {
    let octets = match length_type {
        0 => 1,
        1 => 2,
        2 => 4,
        _ => return Err(KeyFormatError::UnsupportedLength),
    };
    let bytes = rest.get(..octets).ok_or(KeyFormatError::Truncated)?;
    let len = bytes.iter().fold(0usize, |acc, b| (acc << 8) | *b as usize);
    Ok((octets, len))
}

/// CRC-24 as used by OpenPGP ASCII armor.
pub fn crc24(data: &[u8]) -> u32 {
    const INIT: u32 = 0x00B7_04CE;
    const POLY: u32 = 0x0186_4CFB;

    let mut crc = INIT;
    for &byte in data {
        crc ^= u32::from(byte) << 16;
        for _ in 0..8 {
            crc <<= 1;
            if crc & 0x0100_0000 != 0 {
                crc ^= POLY;
            }
        }
    }
    crc & 0x00FF_FFFF
}
