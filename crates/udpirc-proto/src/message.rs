//! Owned IRC message type, parsing, and serialization.
//!
//! A [`Message`] contains the complete parsed representation of an IRC
//! line: optional IRCv3 tags, an optional prefix/source, and the command
//! with its parameters.
//!
//! # Example
//!
//! ```
//! use udpirc_proto::Message;
//!
//! // Parse a message
//! let msg: Message = ":nick!user@host PRIVMSG #channel :Hello!".parse().unwrap();
//!
//! // Construct a message
//! let msg = Message::privmsg("#channel", "Hello!");
//! ```

use std::fmt;
use std::str::FromStr;

use crate::chan::ChannelExt;
use crate::command::Command;
use crate::error::{MessageParseError, ProtocolError};
use crate::prefix::Prefix;

/// An owned IRC message.
#[derive(Clone, PartialEq, Debug)]
pub struct Message {
    /// IRCv3 message tags (e.g., `time`, `msgid`).
    pub tags: Option<Vec<Tag>>,
    /// Message prefix/source (e.g., `nick!user@host`).
    pub prefix: Option<Prefix>,
    /// The IRC command and its parameters.
    pub command: Command,
}

/// An IRCv3 message tag: key and optional value.
#[derive(Clone, PartialEq, Debug)]
pub struct Tag(
    /// Tag key (e.g., `time`, `msgid`).
    pub String,
    /// Optional tag value.
    pub Option<String>,
);

impl Message {
    /// Get the nickname from the message prefix, if present.
    pub fn source_nickname(&self) -> Option<&str> {
        self.prefix.as_ref().and_then(Prefix::nick)
    }

    /// Get the appropriate target for a response.
    ///
    /// For channel messages, returns the channel name.
    /// For private messages, returns the sender's nickname.
    pub fn response_target(&self) -> Option<&str> {
        match self.command {
            Command::PRIVMSG(ref target, _) if target.is_channel_name() => Some(target),
            Command::NOTICE(ref target, _) if target.is_channel_name() => Some(target),
            _ => self.source_nickname(),
        }
    }

    /// Create a PRIVMSG message to a target with text.
    #[must_use]
    pub fn privmsg<T, M>(target: T, text: M) -> Self
    where
        T: Into<String>,
        M: Into<String>,
    {
        Command::PRIVMSG(target.into(), text.into()).into()
    }

    /// Create a NOTICE message to a target with text.
    #[must_use]
    pub fn notice<T, M>(target: T, text: M) -> Self
    where
        T: Into<String>,
        M: Into<String>,
    {
        Command::NOTICE(target.into(), text.into()).into()
    }

    /// Create a JOIN message for a channel.
    #[must_use]
    pub fn join<C>(channel: C) -> Self
    where
        C: Into<String>,
    {
        Command::JOIN(channel.into(), None).into()
    }

    /// Create a PART message to leave a channel.
    #[must_use]
    pub fn part<C>(channel: C) -> Self
    where
        C: Into<String>,
    {
        Command::PART(channel.into(), None).into()
    }

    /// Create a NICK message to claim a nickname.
    #[must_use]
    pub fn nick<N>(nickname: N) -> Self
    where
        N: Into<String>,
    {
        Command::NICK(nickname.into()).into()
    }

    /// Create a USER message for registration.
    #[must_use]
    pub fn user<U, R>(username: U, realname: R) -> Self
    where
        U: Into<String>,
        R: Into<String>,
    {
        Command::USER(username.into(), "0".into(), realname.into()).into()
    }

    /// Create a PONG message in response to a PING.
    #[must_use]
    pub fn pong<S>(server: S) -> Self
    where
        S: Into<String>,
    {
        Command::PONG(server.into(), None).into()
    }

    /// Create a QUIT message with a quit message.
    #[must_use]
    pub fn quit_with_message<M>(message: M) -> Self
    where
        M: Into<String>,
    {
        Command::QUIT(Some(message.into())).into()
    }

    /// Set the prefix/source of this message.
    #[must_use]
    pub fn with_prefix(mut self, prefix: Prefix) -> Self {
        self.prefix = Some(prefix);
        self
    }
}

impl From<Command> for Message {
    fn from(cmd: Command) -> Message {
        Message {
            tags: None,
            prefix: None,
            command: cmd,
        }
    }
}

/// Unescape a tag value from wire format.
fn unescape_tag_value(value: &str) -> String {
    let mut unescaped = String::with_capacity(value.len());
    let mut iter = value.chars();
    while let Some(c) = iter.next() {
        let r = if c == '\\' {
            match iter.next() {
                Some(':') => ';',
                Some('s') => ' ',
                Some('\\') => '\\',
                Some('r') => '\r',
                Some('n') => '\n',
                Some(c) => c,
                None => break,
            }
        } else {
            c
        };
        unescaped.push(r);
    }
    unescaped
}

/// Escape a tag value for serialization.
fn escape_tag_value(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    for c in value.chars() {
        match c {
            ';' => f.write_str("\\:")?,
            ' ' => f.write_str("\\s")?,
            '\\' => f.write_str("\\\\")?,
            '\r' => f.write_str("\\r")?,
            '\n' => f.write_str("\\n")?,
            c => write!(f, "{}", c)?,
        }
    }
    Ok(())
}

/// Parse the tags portion of a line, without the leading `@`.
fn parse_tags(tags_str: &str) -> Vec<Tag> {
    tags_str
        .split(';')
        .filter(|s| !s.is_empty())
        .map(|tag| {
            let mut iter = tag.splitn(2, '=');
            let key = iter.next().unwrap_or("").to_owned();
            let value = iter.next().map(unescape_tag_value);
            Tag(key, value)
        })
        .collect()
}

fn invalid(s: &str, cause: MessageParseError) -> ProtocolError {
    ProtocolError::InvalidMessage {
        string: s.to_owned(),
        cause,
    }
}

impl FromStr for Message {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Message, Self::Err> {
        let mut rest = s.trim_end_matches(&['\r', '\n'][..]);
        if rest.is_empty() {
            return Err(invalid(s, MessageParseError::EmptyMessage));
        }

        let tags = if let Some(tag_rest) = rest.strip_prefix('@') {
            let (raw_tags, after) = tag_rest
                .split_once(' ')
                .ok_or_else(|| invalid(s, MessageParseError::TruncatedMessage))?;
            rest = after.trim_start_matches(' ');
            Some(parse_tags(raw_tags))
        } else {
            None
        };

        let prefix = if let Some(prefix_rest) = rest.strip_prefix(':') {
            let (raw_prefix, after) = prefix_rest
                .split_once(' ')
                .ok_or_else(|| invalid(s, MessageParseError::TruncatedMessage))?;
            rest = after.trim_start_matches(' ');
            Some(Prefix::new_from_str(raw_prefix))
        } else {
            None
        };

        // Everything after the first " :" is a single trailing argument.
        let (head, trailing) = match rest.find(" :") {
            Some(i) => (&rest[..i], Some(&rest[i + 2..])),
            None => (rest, None),
        };

        let mut parts = head.split(' ').filter(|p| !p.is_empty());
        let cmd = parts
            .next()
            .ok_or_else(|| invalid(s, MessageParseError::MissingCommand))?;
        let mut args: Vec<&str> = parts.collect();
        if let Some(trailing) = trailing {
            args.push(trailing);
        }

        Ok(Message {
            tags,
            prefix,
            command: Command::new(cmd, args),
        })
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref tags) = self.tags {
            f.write_str("@")?;
            for (i, tag) in tags.iter().enumerate() {
                if i > 0 {
                    f.write_str(";")?;
                }
                f.write_str(&tag.0)?;
                if let Some(ref value) = tag.1 {
                    f.write_str("=")?;
                    escape_tag_value(f, value)?;
                }
            }
            f.write_str(" ")?;
        }

        if let Some(ref prefix) = self.prefix {
            write!(f, ":{} ", prefix)?;
        }

        write!(f, "{}\r\n", self.command)
    }
}
