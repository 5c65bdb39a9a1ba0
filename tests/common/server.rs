//! Scripted IRC server.
//!
//! The relay under test connects here; tests read what it sends and
//! feed it scripted replies.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tokio::time::timeout;

use udpirc_proto::{Command, Message};

/// A listening scripted server.
pub struct ScriptedServer {
    listener: TcpListener,
}

impl ScriptedServer {
    /// Bind on an ephemeral port.
    pub async fn bind() -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        Ok(Self { listener })
    }

    /// The port the relay should be configured with.
    pub fn port(&self) -> u16 {
        self.listener
            .local_addr()
            .map(|a| a.port())
            .unwrap_or_default()
    }

    /// Accept the relay's next connection.
    pub async fn accept(&self, dur: Duration) -> anyhow::Result<ServerConn> {
        let (stream, _) = timeout(dur, self.listener.accept()).await??;
        let (read_half, write_half) = stream.into_split();
        Ok(ServerConn {
            reader: BufReader::new(read_half),
            writer: write_half,
        })
    }
}

/// One accepted connection from the relay.
pub struct ServerConn {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl ServerConn {
    /// Send a raw IRC line.
    pub async fn send_raw(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        if !line.ends_with("\r\n") {
            self.writer.write_all(b"\r\n").await?;
        }
        self.writer.flush().await?;
        Ok(())
    }

    /// Receive a single message from the relay.
    #[allow(dead_code)]
    pub async fn recv(&mut self) -> anyhow::Result<Message> {
        self.recv_timeout(Duration::from_secs(10)).await
    }

    /// Receive a message with a timeout.
    pub async fn recv_timeout(&mut self, dur: Duration) -> anyhow::Result<Message> {
        let mut line = String::new();
        let n = timeout(dur, self.reader.read_line(&mut line)).await??;
        if n == 0 {
            anyhow::bail!("relay closed the connection");
        }
        line.trim_end()
            .parse::<Message>()
            .map_err(|e| anyhow::anyhow!("parse error: {e}"))
    }

    /// Receive messages until the predicate matches, returning them all.
    pub async fn recv_until<F>(&mut self, mut predicate: F) -> anyhow::Result<Vec<Message>>
    where
        F: FnMut(&Message) -> bool,
    {
        let mut messages = Vec::new();
        loop {
            let msg = self.recv().await?;
            let done = predicate(&msg);
            messages.push(msg);
            if done {
                break;
            }
        }
        Ok(messages)
    }

    /// Expect NICK + USER from the relay.
    pub async fn expect_registration(&mut self, nick: &str) -> anyhow::Result<()> {
        let messages = self
            .recv_until(|msg| matches!(&msg.command, Command::USER(..)))
            .await?;
        anyhow::ensure!(
            messages
                .iter()
                .any(|msg| matches!(&msg.command, Command::NICK(n) if n == nick)),
            "relay never sent NICK {nick}"
        );
        Ok(())
    }

    /// Complete registration and send the welcome reply.
    pub async fn sign_on(&mut self, nick: &str) -> anyhow::Result<()> {
        self.expect_registration(nick).await?;
        self.send_raw(&format!(":test.server 001 {nick} :Welcome to TestNet"))
            .await
    }

    /// Wait for the relay's JOIN and echo it back as the server would.
    #[allow(dead_code)]
    pub async fn expect_join_and_echo(&mut self, nick: &str, channel: &str) -> anyhow::Result<()> {
        self.recv_until(
            |msg| matches!(&msg.command, Command::JOIN(c, _) if c == channel),
        )
        .await?;
        self.send_raw(&format!(":{nick}!{nick}@test JOIN {channel}"))
            .await
    }
}
