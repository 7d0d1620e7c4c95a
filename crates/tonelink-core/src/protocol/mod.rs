//! Wire-level concerns.
//!
//! Tonelink's inbound protocol is deliberately simple: consecutive bytes up
//! to and including a newline form one frame. There is no header, no length
//! prefix, and no checksum — the transport is assumed reliable and ordered.

pub mod framing;
