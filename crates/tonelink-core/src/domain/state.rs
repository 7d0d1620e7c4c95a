//! The connection-state machine.
//!
//! The whole service has exactly one `ConnectionState` value. It is owned by
//! the connection manager, mutated only while the manager's lock is held, and
//! published to every other task through a [`StateCell`] — an `AtomicU8`
//! snapshot that can be read without taking the lock.
//!
//! The lifecycle is:
//!
//! ```text
//! None ──start()──► Listening ──connect()──► Connecting
//!                        ▲                        │
//!                        │                   connected()
//!                     stop()/restart              ▼
//! None ◄──stop()──── Connected ◄──────────────────┘
//! ```
//!
//! `Connected` is reached on every successful promotion. A failed attempt or
//! a lost session re-enters `Listening` (the restart arc above), even when
//! other sessions remain; only `stop()` returns the service to `None`.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Current state of the connection service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    /// Doing nothing; no listeners, no sessions.
    None = 0,
    /// Listening for incoming connections.
    Listening = 1,
    /// Initiating an outgoing connection.
    Connecting = 2,
    /// Connected to at least one remote peer.
    Connected = 3,
}

impl ConnectionState {
    /// Decodes a state from its wire/atomic representation.
    ///
    /// Unknown values map to `None`; the cell is only ever written from
    /// [`ConnectionState::as_u8`] so this path is unreachable in practice.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionState::Listening,
            2 => ConnectionState::Connecting,
            3 => ConnectionState::Connected,
            _ => ConnectionState::None,
        }
    }

    /// Returns the atomic representation of this state.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::None => "none",
            ConnectionState::Listening => "listening",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        f.write_str(name)
    }
}

/// Lock-free snapshot cell for the current [`ConnectionState`].
///
/// Writes happen only under the connection manager's lock; reads may happen
/// from any task at any time. `Ordering::Relaxed` is sufficient because the
/// state value carries no cross-thread data dependencies — readers that need
/// a consistent view of the session registry take the manager lock instead.
pub struct StateCell {
    inner: AtomicU8,
}

impl StateCell {
    /// Creates a cell starting in [`ConnectionState::None`].
    pub fn new() -> Self {
        Self {
            inner: AtomicU8::new(ConnectionState::None.as_u8()),
        }
    }

    /// Returns the current state snapshot.
    pub fn load(&self) -> ConnectionState {
        ConnectionState::from_u8(self.inner.load(Ordering::Relaxed))
    }

    /// Publishes a new state, returning the previous one.
    pub fn store(&self, state: ConnectionState) -> ConnectionState {
        ConnectionState::from_u8(self.inner.swap(state.as_u8(), Ordering::Relaxed))
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}
