//! # tonelink-core
//!
//! Shared library for Tonelink containing the connection-state machine,
//! peer identity, the notification event model, inbound frame decoding, and
//! the tone tables consumed by the sound collaborator.
//!
//! This crate is used by the connection service and by any front end that
//! consumes its notifications. It has zero dependencies on sockets, OS APIs,
//! or audio devices.
//!
//! Tonelink is a multi-peer tone chat: every byte a peer sends names a note,
//! and the service fans each outgoing payload out to all connected peers.
//! This crate defines:
//!
//! - **`domain`** – The `ConnectionState` machine, `PeerIdentity`, and the
//!   tone/sample tables that map payload bytes to notes.
//!
//! - **`protocol`** – Inbound framing: consecutive bytes up to and including
//!   a newline form one frame, with the delimiter stripped before dispatch.
//!
//! - **`events`** – The tagged `Notification` events the service emits to its
//!   notification sink (state changes, device names, bytes read/written,
//!   toast-level errors).

pub mod domain;
pub mod events;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `tonelink_core::ConnectionState` instead of the full module path.
pub use domain::peer::PeerIdentity;
pub use domain::state::{ConnectionState, StateCell};
pub use domain::tones::{sample_index, synthesize, tone_frequency, SAMPLE_RATE, TONE_SAMPLES};
pub use events::{Notification, TOAST_CONNECT_FAILED, TOAST_CONNECTION_LOST};
pub use protocol::framing::{FrameDecoder, MAX_FRAME_LEN};
