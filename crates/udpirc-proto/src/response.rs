//! Numeric reply codes.
//!
//! Only the numerics a client dispatches on are given named variants;
//! everything else surfaces as [`Command::Raw`](crate::Command::Raw).
//!
//! # Reference
//! - RFC 2812 Section 5: Replies

use std::fmt;

/// A named IRC numeric reply.
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Response {
    /// `001 <nick> :Welcome ...` - registration succeeded.
    RPL_WELCOME = 1,
    /// `002 <nick> :Your host is ...`
    RPL_YOURHOST = 2,
    /// `003 <nick> :This server was created ...`
    RPL_CREATED = 3,
    /// `004 <nick> <servername> <version> ...`
    RPL_MYINFO = 4,
    /// `005 <nick> <tokens> :are supported by this server`
    RPL_ISUPPORT = 5,
    /// `353 <nick> <symbol> <channel> :<nicks>`
    RPL_NAMREPLY = 353,
    /// `366 <nick> <channel> :End of /NAMES list`
    RPL_ENDOFNAMES = 366,
    /// `372 <nick> :- <text>`
    RPL_MOTD = 372,
    /// `375 <nick> :- <server> Message of the day -`
    RPL_MOTDSTART = 375,
    /// `376 <nick> :End of /MOTD command`
    RPL_ENDOFMOTD = 376,
    /// `401 <nick> <target> :No such nick/channel`
    ERR_NOSUCHNICK = 401,
    /// `403 <nick> <channel> :No such channel`
    ERR_NOSUCHCHANNEL = 403,
    /// `432 <nick> <bad> :Erroneous nickname`
    ERR_ERRONEUSNICKNAME = 432,
    /// `433 <nick> <bad> :Nickname is already in use`
    ERR_NICKNAMEINUSE = 433,
    /// `451 <nick> :You have not registered`
    ERR_NOTREGISTERED = 451,
    /// `461 <nick> <command> :Not enough parameters`
    ERR_NEEDMOREPARAMS = 461,
    /// `462 <nick> :You may not reregister`
    ERR_ALREADYREGISTRED = 462,
    /// `474 <nick> <channel> :Cannot join channel (+b)`
    ERR_BANNEDFROMCHAN = 474,
}

impl Response {
    /// The numeric code.
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Look up a named numeric by code.
    pub fn from_code(code: u16) -> Option<Self> {
        Some(match code {
            1 => Response::RPL_WELCOME,
            2 => Response::RPL_YOURHOST,
            3 => Response::RPL_CREATED,
            4 => Response::RPL_MYINFO,
            5 => Response::RPL_ISUPPORT,
            353 => Response::RPL_NAMREPLY,
            366 => Response::RPL_ENDOFNAMES,
            372 => Response::RPL_MOTD,
            375 => Response::RPL_MOTDSTART,
            376 => Response::RPL_ENDOFMOTD,
            401 => Response::ERR_NOSUCHNICK,
            403 => Response::ERR_NOSUCHCHANNEL,
            432 => Response::ERR_ERRONEUSNICKNAME,
            433 => Response::ERR_NICKNAMEINUSE,
            451 => Response::ERR_NOTREGISTERED,
            461 => Response::ERR_NEEDMOREPARAMS,
            462 => Response::ERR_ALREADYREGISTRED,
            474 => Response::ERR_BANNEDFROMCHAN,
            _ => return None,
        })
    }

    /// Whether this numeric is an error reply (4xx/5xx).
    pub fn is_error(&self) -> bool {
        self.code() >= 400
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Numerics are always three digits on the wire.
        write!(f, "{:03}", self.code())
    }
}
