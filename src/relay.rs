//! UDP listeners forwarding datagrams into IRC channels.
//!
//! One relay exists per configured UDP port, created when the session
//! signs on and aborted when it disconnects. A relay never waits on IRC
//! delivery: encoded messages are pushed into the session's outbound
//! queue and forgotten.

use std::net::SocketAddr;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use udpirc_proto::Message;

use crate::bridge::Destination;
use crate::error::RelayError;
use crate::membership::SharedMembership;

/// Largest datagram a single read accepts.
const MAX_DATAGRAM: usize = 65_535;

/// A bound UDP listener and its forwarding table.
pub struct UdpRelay {
    socket: UdpSocket,
    destinations: Vec<Destination>,
    membership: SharedMembership,
    out_tx: mpsc::UnboundedSender<Message>,
}

impl UdpRelay {
    /// Bind the relay's socket. Failure is fatal to the process.
    pub async fn bind(
        port: u16,
        destinations: Vec<Destination>,
        membership: SharedMembership,
        out_tx: mpsc::UnboundedSender<Message>,
    ) -> Result<Self, RelayError> {
        let socket = UdpSocket::bind(("0.0.0.0", port))
            .await
            .map_err(|source| RelayError::Bind { port, source })?;
        Ok(Self {
            socket,
            destinations,
            membership,
            out_tx,
        })
    }

    /// The bound address (useful when binding port 0 in tests).
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Spawn the receive loop. Aborting the handle closes the socket.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.recv_loop().await })
    }

    async fn recv_loop(self) {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            match self.socket.recv_from(&mut buf).await {
                Ok((len, source)) => self.forward(&buf[..len], source),
                Err(e) => {
                    warn!(error = %e, "UDP receive failed");
                }
            }
        }
    }

    /// Forward one datagram to every destination that is currently
    /// joined; anything else is dropped with a diagnostic, never
    /// buffered.
    fn forward(&self, payload: &[u8], source: SocketAddr) {
        for dest in &self.destinations {
            if self.membership.lock().is_joined(&dest.channel) {
                let body = dest.encoder.encode(payload);
                debug!(source = %source, channel = %dest.channel, "forwarding datagram");
                let _ = self
                    .out_tx
                    .send(Message::privmsg(dest.channel.as_str(), body));
            } else {
                warn!(
                    source = %source,
                    channel = %dest.channel,
                    "dropping datagram: channel not joined"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::Encoder;
    use crate::membership::ChannelMembership;
    use std::sync::Arc;
    use std::time::Duration;
    use udpirc_proto::Command;

    fn destinations() -> Vec<Destination> {
        vec![Destination {
            channel: "#demo".to_string(),
            encoder: Encoder::Raw,
        }]
    }

    async fn bind_test_relay(
        destinations: Vec<Destination>,
    ) -> (
        UdpRelay,
        SharedMembership,
        mpsc::UnboundedReceiver<Message>,
    ) {
        let membership: SharedMembership = Arc::new(parking_lot::Mutex::new(
            ChannelMembership::new(),
        ));
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let relay = UdpRelay::bind(0, destinations, Arc::clone(&membership), out_tx)
            .await
            .unwrap();
        (relay, membership, out_rx)
    }

    #[tokio::test]
    async fn datagram_before_join_is_dropped() {
        let (relay, _membership, mut out_rx) = bind_test_relay(destinations()).await;
        relay.forward(b"hello", "127.0.0.1:9".parse().unwrap());
        assert!(out_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn datagram_after_join_is_forwarded() {
        let (relay, membership, mut out_rx) = bind_test_relay(destinations()).await;
        membership.lock().set_joined("#demo");

        relay.forward(b"hello", "127.0.0.1:9".parse().unwrap());

        let msg = out_rx.try_recv().unwrap();
        assert_eq!(
            msg.command,
            Command::PRIVMSG("#demo".to_string(), "hello".to_string())
        );
        // Exactly one send for one datagram.
        assert!(out_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn datagram_after_leave_is_dropped_again() {
        let (relay, membership, mut out_rx) = bind_test_relay(destinations()).await;
        membership.lock().set_joined("#demo");
        relay.forward(b"one", "127.0.0.1:9".parse().unwrap());
        assert!(out_rx.try_recv().is_ok());

        membership.lock().set_left("#demo");
        relay.forward(b"two", "127.0.0.1:9".parse().unwrap());
        assert!(out_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn encoded_destination_applies_its_encoder() {
        let dests = vec![Destination {
            channel: "#demo".to_string(),
            encoder: Encoder::Base64,
        }];
        let (relay, membership, mut out_rx) = bind_test_relay(dests).await;
        membership.lock().set_joined("#demo");

        relay.forward(b"ab", "127.0.0.1:9".parse().unwrap());

        let msg = out_rx.try_recv().unwrap();
        assert_eq!(
            msg.command,
            Command::PRIVMSG("#demo".to_string(), "[4]YWI=".to_string())
        );
    }

    #[tokio::test]
    async fn end_to_end_datagram_through_socket() {
        let (relay, membership, mut out_rx) = bind_test_relay(destinations()).await;
        membership.lock().set_joined("#demo");
        let addr = relay.local_addr().unwrap();
        let handle = relay.spawn();

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender
            .send_to(b"hello", ("127.0.0.1", addr.port()))
            .await
            .unwrap();

        let msg = tokio::time::timeout(Duration::from_secs(5), out_rx.recv())
            .await
            .expect("timed out waiting for forwarded datagram")
            .expect("relay channel closed");
        assert_eq!(
            msg.command,
            Command::PRIVMSG("#demo".to_string(), "hello".to_string())
        );

        handle.abort();
        let _ = handle.await;
    }

    #[tokio::test]
    async fn multiple_destinations_fan_out() {
        let dests = vec![
            Destination {
                channel: "#a".to_string(),
                encoder: Encoder::Raw,
            },
            Destination {
                channel: "#b".to_string(),
                encoder: Encoder::Raw,
            },
        ];
        let (relay, membership, mut out_rx) = bind_test_relay(dests).await;
        // Only #a is joined; #b's share of the datagram drops.
        membership.lock().set_joined("#a");

        relay.forward(b"x", "127.0.0.1:9".parse().unwrap());

        let msg = out_rx.try_recv().unwrap();
        assert_eq!(msg.command, Command::PRIVMSG("#a".to_string(), "x".to_string()));
        assert!(out_rx.try_recv().is_err());
    }
}
