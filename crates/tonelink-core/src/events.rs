//! Notification events emitted by the connection service.
//!
//! The service never consumes UI state; it only produces these tagged events
//! through its notification sink. Ordering is guaranteed per session (a
//! session's `DeviceName` precedes the `BytesRead` for the same frame) but
//! not across event kinds from different sessions.

use crate::domain::state::ConnectionState;

/// Fixed toast text for a failed outbound connection attempt.
pub const TOAST_CONNECT_FAILED: &str = "Unable to connect device";

/// Fixed toast text for a lost established connection.
pub const TOAST_CONNECTION_LOST: &str = "Device connection was lost";

/// A lifecycle or data event for the notification sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// The connection state changed. Emitted on every transition, including
    /// re-entering the same state on a restart.
    StateChanged(ConnectionState),
    /// A peer's display name: once when a session is established, and again
    /// before each frame that session receives.
    DeviceName(String),
    /// One decoded inbound frame, delimiter stripped.
    BytesRead(Vec<u8>),
    /// One payload successfully written to a session.
    BytesWritten(Vec<u8>),
    /// User-facing error text.
    Toast(String),
}
