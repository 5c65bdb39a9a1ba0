//! Per-channel joined/left state for one IRC connection.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

/// Shared handle: written by the session's event handlers, read by the
/// relay tasks.
pub type SharedMembership = Arc<Mutex<ChannelMembership>>;

/// Mutable joined/left state, created fresh on each successful sign-on
/// and discarded on disconnect.
///
/// A channel never seen in a join event is not joined; the forwarding
/// path must not assume optimistic membership.
#[derive(Debug, Default)]
pub struct ChannelMembership {
    joined: HashMap<String, bool>,
}

impl ChannelMembership {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_joined(&mut self, channel: &str) {
        self.joined.insert(channel.to_owned(), true);
    }

    pub fn set_left(&mut self, channel: &str) {
        self.joined.insert(channel.to_owned(), false);
    }

    pub fn is_joined(&self, channel: &str) -> bool {
        self.joined.get(channel).copied().unwrap_or(false)
    }

    /// Forget everything; used when the connection tears down.
    pub fn clear(&mut self) {
        self.joined.clear();
    }
}
