//! # tonelink-service
//!
//! The Tonelink connection service: accepts inbound connections, initiates
//! outbound ones, promotes successful handshakes into long-lived sessions,
//! and fans outgoing payloads out to every active session while reading and
//! dispatching inbound frames per session.
//!
//! The hard part of this crate is concurrency and lifecycle correctness:
//! concurrent listeners (one per transport flavor), concurrent outbound
//! attempts, many concurrent established sessions, and a single written
//! policy for what happens on failure (restart to listening vs. give up vs.
//! notify). Everything else (discovery, pairing, playback, UI) lives
//! behind two narrow seams this crate only calls *out* through:
//!
//! - [`transport::Transport`] supplies listen/connect primitives over an
//!   arbitrary reliable byte stream (a TCP implementation is included).
//! - [`notify::NotificationSink`] receives lifecycle and data events; the
//!   service produces events, it never consumes UI state.
//!
//! # Module map
//!
//! - **`manager`** – [`manager::ConnectionManager`] plus its accept-loop and
//!   connect-attempt tasks.
//! - **`session`** – One established stream: read loop + serialized writes.
//! - **`transport`** – The provider traits and the TCP implementation.
//! - **`notify`** – Notification and tone sink traits, channel-backed sink.
//! - **`config`** – TOML configuration with platform config-dir persistence.

pub mod config;
pub mod manager;
pub mod notify;
pub mod session;
pub mod transport;

pub use config::{ConfigError, GeneralConfig, NetworkConfig, ServiceConfig};
pub use manager::{BroadcastReport, ConnectionManager};
pub use notify::{ChannelSink, NotificationSink, NullToneSink, ToneSink};
pub use session::{Session, SessionError, SessionId};
pub use transport::tcp::TcpTransport;
pub use transport::{BoxedStream, Flavor, SessionStream, Transport, TransportError, TransportListener};
