use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::models::{CursorMovedMessage, ServerEvent};

/// Outbound queue of a single connection. Events pushed by one task arrive
/// in push order.
pub type Outbound = mpsc::UnboundedSender<Arc<ServerEvent>>;
pub type OutboundRx = mpsc::UnboundedReceiver<Arc<ServerEvent>>;

/// Identity of a live connection, unique for the lifetime of the process
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Per-connection context held by the broadcaster
#[derive(Debug)]
pub struct ConnCtx {
    pub outbound: Outbound,
    /// Last cursor this connection reported, with the room it was sent in
    pub cursor: Mutex<Option<(String, CursorMovedMessage)>>,
}

impl ConnCtx {
    pub fn new(outbound: Outbound) -> Self {
        Self { outbound, cursor: Mutex::new(None) }
    }
}
