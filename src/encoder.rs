//! Payload encodings for the forwarding path.
//!
//! Each bridge destination carries one encoder, applied to every
//! datagram before it is sent to the channel. Encoders are total:
//! any byte sequence, including the empty one, encodes to a line of
//! text without a failure path.

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Deserialize;
use thiserror::Error;

/// Transformation applied to a datagram before channel delivery.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Encoder {
    /// Forward the payload verbatim (invalid UTF-8 is replaced).
    #[default]
    Raw,
    /// Length-prefixed base64: `[<len>]<base64>`.
    Base64,
    /// Gzip the payload, then apply the base64 transform.
    GzipBase64,
}

/// A name that matches no known encoding.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown encoding {0:?} (expected raw, base64, or gzip-base64)")]
pub struct UnknownEncoding(pub String);

impl Encoder {
    /// Every supported encoding, in the order `--list-encodings` prints.
    pub const ALL: [Encoder; 3] = [Encoder::Raw, Encoder::Base64, Encoder::GzipBase64];

    /// Encode a payload into a wire-ready message body.
    pub fn encode(&self, payload: &[u8]) -> String {
        match self {
            Encoder::Raw => String::from_utf8_lossy(payload).into_owned(),
            Encoder::Base64 => bracketed_base64(payload),
            Encoder::GzipBase64 => bracketed_base64(&gzip(payload)),
        }
    }

    /// The configuration name of this encoding.
    pub fn name(&self) -> &'static str {
        match self {
            Encoder::Raw => "raw",
            Encoder::Base64 => "base64",
            Encoder::GzipBase64 => "gzip-base64",
        }
    }

    /// One-line human-readable description.
    pub fn description(&self) -> &'static str {
        match self {
            Encoder::Raw => "forward the datagram body unchanged",
            Encoder::Base64 => "base64 with a [length] prefix counting the encoded text",
            Encoder::GzipBase64 => "gzip-compress, then base64 with a [length] prefix",
        }
    }
}

impl fmt::Display for Encoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Encoder {
    type Err = UnknownEncoding;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Encoder::ALL
            .into_iter()
            .find(|e| e.name() == s)
            .ok_or_else(|| UnknownEncoding(s.to_owned()))
    }
}

/// The length prefix counts the base64 text, not the original payload.
fn bracketed_base64(payload: &[u8]) -> String {
    let encoded = STANDARD.encode(payload);
    format!("[{}]{}", encoded.len(), encoded)
}

fn gzip(payload: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(payload.len()), Compression::default());
    // Writing to an in-memory buffer cannot fail.
    if encoder.write_all(payload).is_err() {
        return Vec::new();
    }
    encoder.finish().unwrap_or_default()
}
