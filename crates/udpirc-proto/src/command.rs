//! IRC command types.
//!
//! This module provides type-safe representations of the client-side
//! subset of IRC commands. Commands the relay never dispatches on are
//! captured in the `Raw` variant rather than rejected, so the parser is
//! total over well-formed lines.
//!
//! # Reference
//! - RFC 2812: Internet Relay Chat: Client Protocol

use std::fmt;

use crate::response::Response;

/// IRC command with its parameters.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Command {
    /// `PASS password`
    PASS(String),
    /// `NICK nickname`
    NICK(String),
    /// `USER username mode realname`
    USER(String, String, String),
    /// `QUIT [message]`
    QUIT(Option<String>),
    /// `JOIN channel [key]`
    JOIN(String, Option<String>),
    /// `PART channel [message]`
    PART(String, Option<String>),
    /// `KICK channel user [comment]`
    KICK(String, String, Option<String>),
    /// `PRIVMSG target text`
    PRIVMSG(String, String),
    /// `NOTICE target text`
    NOTICE(String, String),
    /// `PING server1 [server2]`
    PING(String, Option<String>),
    /// `PONG server1 [server2]`
    PONG(String, Option<String>),
    /// `ERROR message`
    ERROR(String),
    /// A numeric reply with its arguments.
    Response(Response, Vec<String>),
    /// Any command without a typed variant, or one whose arguments did
    /// not match the expected arity.
    Raw(String, Vec<String>),
}

impl Command {
    /// Build a command from its wire name and arguments.
    ///
    /// Unknown commands and arity mismatches fall through to
    /// [`Command::Raw`]; numeric replies without a named
    /// [`Response`] variant do the same.
    pub fn new(cmd: &str, args: Vec<&str>) -> Command {
        let upper = cmd.to_ascii_uppercase();
        match (upper.as_str(), args.len()) {
            ("PASS", 1) => Command::PASS(args[0].to_owned()),
            ("NICK", 1) => Command::NICK(args[0].to_owned()),
            ("USER", 3) => {
                Command::USER(args[0].to_owned(), args[1].to_owned(), args[2].to_owned())
            }
            // `USER u m * :realname` - the unused third parameter is dropped.
            ("USER", 4) => {
                Command::USER(args[0].to_owned(), args[1].to_owned(), args[3].to_owned())
            }
            ("QUIT", 0) => Command::QUIT(None),
            ("QUIT", 1) => Command::QUIT(Some(args[0].to_owned())),
            ("JOIN", 1) => Command::JOIN(args[0].to_owned(), None),
            ("JOIN", 2) => Command::JOIN(args[0].to_owned(), Some(args[1].to_owned())),
            ("PART", 1) => Command::PART(args[0].to_owned(), None),
            ("PART", 2) => Command::PART(args[0].to_owned(), Some(args[1].to_owned())),
            ("KICK", 2) => Command::KICK(args[0].to_owned(), args[1].to_owned(), None),
            ("KICK", 3) => Command::KICK(
                args[0].to_owned(),
                args[1].to_owned(),
                Some(args[2].to_owned()),
            ),
            ("PRIVMSG", 2) => Command::PRIVMSG(args[0].to_owned(), args[1].to_owned()),
            ("NOTICE", 2) => Command::NOTICE(args[0].to_owned(), args[1].to_owned()),
            ("PING", 1) => Command::PING(args[0].to_owned(), None),
            ("PING", 2) => Command::PING(args[0].to_owned(), Some(args[1].to_owned())),
            ("PONG", 1) => Command::PONG(args[0].to_owned(), None),
            ("PONG", 2) => Command::PONG(args[0].to_owned(), Some(args[1].to_owned())),
            ("ERROR", 1) => Command::ERROR(args[0].to_owned()),
            _ => {
                let owned: Vec<String> = args.into_iter().map(str::to_owned).collect();
                if let Ok(code) = upper.parse::<u16>() {
                    if let Some(resp) = Response::from_code(code) {
                        return Command::Response(resp, owned);
                    }
                }
                Command::Raw(upper, owned)
            }
        }
    }
}

/// Check if a string needs colon-prefixing as a trailing IRC argument.
fn needs_colon_prefix(s: &str) -> bool {
    s.is_empty() || s.contains(' ') || s.starts_with(':')
}

/// Write arguments, colon-prefixing the last one when required.
fn write_args<S: AsRef<str>>(f: &mut fmt::Formatter<'_>, args: &[S]) -> fmt::Result {
    let last = args.len().saturating_sub(1);
    for (i, arg) in args.iter().enumerate() {
        let arg = arg.as_ref();
        f.write_str(" ")?;
        if i == last && needs_colon_prefix(arg) {
            f.write_str(":")?;
        }
        f.write_str(arg)?;
    }
    Ok(())
}

fn write_cmd(f: &mut fmt::Formatter<'_>, cmd: &str, args: &[&str]) -> fmt::Result {
    f.write_str(cmd)?;
    write_args(f, args)
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::PASS(p) => write_cmd(f, "PASS", &[p]),
            Command::NICK(n) => write_cmd(f, "NICK", &[n]),
            Command::USER(u, m, r) => write_cmd(f, "USER", &[u, m, "*", r]),
            Command::QUIT(Some(m)) => write_cmd(f, "QUIT", &[m]),
            Command::QUIT(None) => write_cmd(f, "QUIT", &[]),
            Command::JOIN(c, Some(k)) => write_cmd(f, "JOIN", &[c, k]),
            Command::JOIN(c, None) => write_cmd(f, "JOIN", &[c]),
            Command::PART(c, Some(m)) => write_cmd(f, "PART", &[c, m]),
            Command::PART(c, None) => write_cmd(f, "PART", &[c]),
            Command::KICK(c, n, Some(r)) => write_cmd(f, "KICK", &[c, n, r]),
            Command::KICK(c, n, None) => write_cmd(f, "KICK", &[c, n]),
            Command::PRIVMSG(t, m) => write_cmd(f, "PRIVMSG", &[t, m]),
            Command::NOTICE(t, m) => write_cmd(f, "NOTICE", &[t, m]),
            Command::PING(s1, Some(s2)) => write_cmd(f, "PING", &[s1, s2]),
            Command::PING(s1, None) => write_cmd(f, "PING", &[s1]),
            Command::PONG(s1, Some(s2)) => write_cmd(f, "PONG", &[s1, s2]),
            Command::PONG(s1, None) => write_cmd(f, "PONG", &[s1]),
            Command::ERROR(m) => write_cmd(f, "ERROR", &[m]),
            Command::Response(resp, args) => {
                write!(f, "{}", resp)?;
                write_args(f, args)
            }
            Command::Raw(cmd, args) => {
                f.write_str(cmd)?;
                write_args(f, args)
            }
        }
    }
}
