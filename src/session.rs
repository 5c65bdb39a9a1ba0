//! The IRC session state machine.
//!
//! One `IrcSession` lives for the duration of one IRC connection: it
//! registers, schedules services identification, joins the bridged
//! channels, starts the UDP relays, and reacts to protocol events until
//! the transport drops. Everything outbound funnels through a single
//! unbounded queue drained by the run loop, so relay tasks never touch
//! the transport directly.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use udpirc_proto::{ChannelExt, Command, IrcCodec, Message, Response};

use crate::bridge::BridgeTable;
use crate::config::ServerConfig;
use crate::error::RelayError;
use crate::membership::{ChannelMembership, SharedMembership};
use crate::relay::UdpRelay;

/// Anything the session can speak IRC over.
pub trait IrcStream: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> IrcStream for T {}

/// Framed transport, plain or TLS behind one type.
pub type IrcTransport = Framed<Box<dyn IrcStream>, IrcCodec>;

/// Nickname of the services bot handling IDENTIFY and GHOST.
const SERVICES_NICK: &str = "NickServ";

/// Delay between sign-on and the IDENTIFY message, giving services time
/// to recognize the connection.
const IDENTIFY_DELAY: Duration = Duration::from_secs(5);

const WHISPER_REPLY: &str = "It isn't nice to whisper! Play nice with the group.";

/// Session states once the transport is established. `Disconnected` and
/// `Connecting` belong to the supervisor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SessionState {
    /// NICK/USER sent, waiting for the welcome reply.
    Registering,
    /// Signed on with a pending services identification.
    Identifying,
    /// Channels joined, relays running.
    Ready,
}

/// Why the session ended.
#[derive(Debug)]
pub enum Disconnect {
    /// Remote closed or the transport failed; the supervisor decides
    /// whether to reconnect.
    Lost(Option<String>),
    /// Shutdown was requested; the supervisor must exit.
    Shutdown,
}

/// One IRC connection's worth of state.
pub struct IrcSession {
    config: Arc<ServerConfig>,
    bridges: Arc<BridgeTable>,
    membership: SharedMembership,
    state: SessionState,
    out_tx: mpsc::UnboundedSender<Message>,
    relays: Vec<JoinHandle<()>>,
    identify: Option<JoinHandle<()>>,
    ghost_sent: bool,
}

impl IrcSession {
    /// Create a session with a fresh membership table and outbound
    /// queue. The receiver must be handed back to [`IrcSession::run`].
    pub fn new(
        config: Arc<ServerConfig>,
        bridges: Arc<BridgeTable>,
    ) -> (Self, mpsc::UnboundedReceiver<Message>) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        (
            Self {
                config,
                bridges,
                membership: Arc::new(Mutex::new(ChannelMembership::new())),
                state: SessionState::Registering,
                out_tx,
                relays: Vec::new(),
                identify: None,
                ghost_sent: false,
            },
            out_rx,
        )
    }

    /// Drive the session until the connection ends.
    pub async fn run(
        mut self,
        mut transport: IrcTransport,
        mut out_rx: mpsc::UnboundedReceiver<Message>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<Disconnect, RelayError> {
        info!(nickname = %self.config.nickname, "registering");
        self.send(Message::nick(self.config.nickname.as_str()));
        self.send(Message::user(
            self.config.nickname.as_str(),
            "UDP to IRC relay",
        ));

        loop {
            tokio::select! {
                incoming = transport.next() => match incoming {
                    Some(Ok(msg)) => {
                        if let Some(disconnect) = self.handle_message(msg).await? {
                            self.teardown().await;
                            return Ok(disconnect);
                        }
                    }
                    Some(Err(e)) => {
                        // An unframeable stream is unrecoverable; start over.
                        warn!(error = %e, "transport decode failed");
                        self.teardown().await;
                        return Ok(Disconnect::Lost(Some(e.to_string())));
                    }
                    None => {
                        info!("server closed the connection");
                        self.teardown().await;
                        return Ok(Disconnect::Lost(None));
                    }
                },
                outbound = out_rx.recv() => {
                    if let Some(msg) = outbound {
                        if let Err(e) = transport.send(msg).await {
                            warn!(error = %e, "write failed; connection lost");
                            self.teardown().await;
                            return Ok(Disconnect::Lost(Some(e.to_string())));
                        }
                    }
                },
                // A dropped sender counts as shutdown too.
                _ = shutdown.changed() => {
                    info!("shutdown requested; quitting");
                    let _ = transport
                        .send(Message::quit_with_message("shutting down"))
                        .await;
                    self.teardown().await;
                    return Ok(Disconnect::Shutdown);
                }
            }
        }
    }

    /// Queue an outbound message; the run loop writes it.
    fn send(&self, msg: Message) {
        let _ = self.out_tx.send(msg);
    }

    async fn handle_message(&mut self, msg: Message) -> Result<Option<Disconnect>, RelayError> {
        match &msg.command {
            Command::PING(token, _) => {
                self.send(Message::pong(token.as_str()));
            }
            Command::Response(Response::RPL_WELCOME, _) => {
                if self.state == SessionState::Registering {
                    self.on_welcome().await?;
                }
            }
            Command::Response(Response::ERR_NICKNAMEINUSE, _) => {
                self.on_nick_collision();
            }
            Command::JOIN(channel, _) => {
                if msg.source_nickname() == Some(self.config.nickname.as_str()) {
                    info!(channel = %channel, "joined");
                    self.membership.lock().set_joined(channel);
                }
            }
            Command::PART(channel, _) => {
                if msg.source_nickname() == Some(self.config.nickname.as_str()) {
                    info!(channel = %channel, "left");
                    self.membership.lock().set_left(channel);
                }
            }
            Command::KICK(channel, victim, reason) => {
                if victim == &self.config.nickname {
                    warn!(
                        channel = %channel,
                        reason = reason.as_deref().unwrap_or(""),
                        "kicked"
                    );
                    self.membership.lock().set_left(channel);
                }
            }
            Command::PRIVMSG(target, text) => {
                self.on_privmsg(&msg, target, text);
            }
            Command::ERROR(reason) => {
                warn!(reason = %reason, "server error");
                return Ok(Some(Disconnect::Lost(Some(reason.clone()))));
            }
            _ => {}
        }
        Ok(None)
    }

    /// Sign-on confirmed. Identification is fire-and-forget; the
    /// session becomes ready without waiting on it.
    async fn on_welcome(&mut self) -> Result<(), RelayError> {
        info!(nickname = %self.config.nickname, "signed on");
        if let Some(password) = self.config.password.clone() {
            self.state = SessionState::Identifying;
            self.schedule_identify(password);
        }
        self.enter_ready().await
    }

    /// One-shot identify task, aborted on disconnect.
    fn schedule_identify(&mut self, password: String) {
        let out_tx = self.out_tx.clone();
        let nickname = self.config.nickname.clone();
        self.identify = Some(tokio::spawn(async move {
            sleep(IDENTIFY_DELAY).await;
            debug!("identifying with services");
            let _ = out_tx.send(Message::privmsg(
                SERVICES_NICK,
                format!("IDENTIFY {nickname} {password}"),
            ));
        }));
    }

    /// Join every bridged channel, then bring up one relay per port.
    async fn enter_ready(&mut self) -> Result<(), RelayError> {
        let bridges = Arc::clone(&self.bridges);
        for channel in bridges.channels() {
            self.send(Message::join(channel));
        }
        for (port, destinations) in bridges.entries() {
            let relay = UdpRelay::bind(
                port,
                destinations.to_vec(),
                Arc::clone(&self.membership),
                self.out_tx.clone(),
            )
            .await?;
            match relay.local_addr() {
                Ok(addr) => info!(port = addr.port(), "UDP relay listening"),
                Err(_) => info!(port, "UDP relay listening"),
            }
            self.relays.push(relay.spawn());
        }
        self.state = SessionState::Ready;
        Ok(())
    }

    /// The desired nickname is taken. Ask services to disconnect the
    /// stale session; reclaiming the nickname is left to the next
    /// registration attempt.
    fn on_nick_collision(&mut self) {
        if self.state == SessionState::Ready {
            return;
        }
        let Some(password) = &self.config.password else {
            warn!(
                nickname = %self.config.nickname,
                "nickname in use and no services password configured"
            );
            return;
        };
        if self.ghost_sent {
            return;
        }
        self.ghost_sent = true;
        info!(nickname = %self.config.nickname, "nickname in use; requesting ghost");
        self.send(Message::privmsg(
            SERVICES_NICK,
            format!("GHOST {} {}", self.config.nickname, password),
        ));
    }

    fn on_privmsg(&self, msg: &Message, target: &str, text: &str) {
        let Some(sender) = msg.source_nickname() else {
            return;
        };
        let nickname = self.config.nickname.as_str();

        if target == nickname {
            debug!(from = %sender, "private message");
            self.send(Message::privmsg(sender, WHISPER_REPLY));
            return;
        }

        if target.is_channel_name()
            && text
                .strip_prefix(nickname)
                .and_then(|rest| rest.strip_prefix(':'))
                .is_some()
        {
            self.send(Message::privmsg(target, format!("{sender}: I am a log bot")));
        }
    }

    /// Stop the relays and the identify timer, then discard membership.
    async fn teardown(&mut self) {
        if let Some(identify) = self.identify.take() {
            identify.abort();
        }
        let relays: Vec<_> = self.relays.drain(..).collect();
        for relay in &relays {
            relay.abort();
        }
        // Await the aborted tasks so every socket is closed before the
        // membership table goes away.
        for relay in relays {
            let _ = relay.await;
        }
        self.membership.lock().clear();
        debug!("session torn down");
    }
}
