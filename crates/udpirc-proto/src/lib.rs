//! # udpirc-proto
//!
//! A small library for parsing and serializing client-side IRC protocol
//! messages, with a tokio codec for framed transports.
//!
//! ## Features
//!
//! - IRC message parsing with tags, prefixes, commands, and parameters
//! - Typed commands for the client subset; everything else kept as `Raw`
//! - Line-limited tokio codec with outbound sanitization
//! - Convenient message construction
//!
//! ## Quick Start
//!
//! ```rust
//! use udpirc_proto::{Command, Message};
//!
//! // Basic message construction
//! let privmsg = Message::privmsg("#rust", "Hello, world!");
//! let join = Message::join("#channel");
//!
//! // Parsing
//! let raw = ":nick!user@host PRIVMSG #channel :Hello!";
//! let message: Message = raw.parse().expect("valid IRC message");
//! assert!(matches!(message.command, Command::PRIVMSG(_, _)));
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod chan;
pub mod codec;
pub mod command;
pub mod error;
pub mod message;
pub mod prefix;
pub mod response;

pub use self::chan::ChannelExt;
pub use self::codec::{IrcCodec, LineCodec, MAX_LINE_LEN};
pub use self::command::Command;
pub use self::error::{MessageParseError, ProtocolError};
pub use self::message::{Message, Tag};
pub use self::prefix::Prefix;
pub use self::response::Response;
