//! Static mapping from UDP listening ports to destination channels.
//!
//! The table is built once at startup from the `[[bridge]]` blocks and
//! never mutated. Every validation failure here is reported before any
//! socket is opened.

use std::collections::{BTreeSet, HashMap};

use thiserror::Error;
use udpirc_proto::ChannelExt;

use crate::config::BridgeBlock;
use crate::encoder::Encoder;

/// Invalid or incomplete bridge specification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BridgeError {
    #[error("no UDP bridge is configured")]
    NoBridges,

    #[error("bridge for {channels:?} has no udp_port")]
    MissingPort { channels: Vec<String> },

    #[error("bridge for UDP port {0} names no destination channel")]
    NoChannels(u16),

    #[error("UDP port {0} is configured more than once")]
    DuplicatePort(u16),

    #[error("invalid channel name {0:?} (expected a leading '#')")]
    InvalidChannel(String),
}

/// One forwarding destination: a channel and the encoding applied on
/// the way in.
///
/// The encoder is fixed per destination so receivers can reverse the
/// transform deterministically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// Case-sensitive channel name, leading `#`.
    pub channel: String,
    /// Transform applied to every datagram for this channel.
    pub encoder: Encoder,
}

/// Immutable table of configured bridges.
#[derive(Debug, Default, PartialEq)]
pub struct BridgeTable {
    bridges: HashMap<u16, Vec<Destination>>,
}

impl BridgeTable {
    /// Build and validate the table from configuration blocks.
    pub fn from_blocks(blocks: &[BridgeBlock]) -> Result<Self, BridgeError> {
        if blocks.is_empty() {
            return Err(BridgeError::NoBridges);
        }

        let mut bridges: HashMap<u16, Vec<Destination>> = HashMap::new();
        for block in blocks {
            let port = block.udp_port.ok_or_else(|| BridgeError::MissingPort {
                channels: block.channels.clone(),
            })?;
            if block.channels.is_empty() {
                return Err(BridgeError::NoChannels(port));
            }
            if bridges.contains_key(&port) {
                return Err(BridgeError::DuplicatePort(port));
            }

            let mut destinations = Vec::with_capacity(block.channels.len());
            for channel in &block.channels {
                if !channel.is_channel_name() {
                    return Err(BridgeError::InvalidChannel(channel.clone()));
                }
                destinations.push(Destination {
                    channel: channel.clone(),
                    encoder: block.encoding,
                });
            }
            bridges.insert(port, destinations);
        }

        Ok(Self { bridges })
    }

    /// The destinations registered for a UDP port.
    pub fn resolve(&self, udp_port: u16) -> &[Destination] {
        self.bridges
            .get(&udp_port)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every configured UDP port.
    pub fn ports(&self) -> impl Iterator<Item = u16> + '_ {
        self.bridges.keys().copied()
    }

    /// Every configured port together with its destinations.
    pub fn entries(&self) -> impl Iterator<Item = (u16, &[Destination])> + '_ {
        self.bridges
            .iter()
            .map(|(port, dests)| (*port, dests.as_slice()))
    }

    /// Every destination channel, deduplicated, in deterministic order.
    pub fn channels(&self) -> BTreeSet<&str> {
        self.bridges
            .values()
            .flatten()
            .map(|d| d.channel.as_str())
            .collect()
    }
}
