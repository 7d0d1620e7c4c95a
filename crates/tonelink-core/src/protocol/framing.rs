//! Newline-delimited frame decoding.
//!
//! One frame is every byte up to and including a `\n` delimiter; the
//! delimiter is stripped before dispatch. Frame length is bounded by
//! [`MAX_FRAME_LEN`]: an overlong line is truncated at the bound, the rest of
//! the line is discarded, a warning is logged, and decoding continues with
//! the next line. Overflow never fails the decoder and never disturbs frames
//! from other sessions (each session owns its own decoder).
//!
//! The decoder is push-based so the read loop can feed it whatever chunk
//! sizes the transport produces; frame boundaries need not align with read
//! boundaries.

use tracing::warn;

/// Maximum frame length in bytes, excluding the delimiter.
pub const MAX_FRAME_LEN: usize = 1024;

/// Incremental decoder for newline-delimited frames.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: Vec<u8>,
    max_len: usize,
    /// Set while discarding the remainder of an overlong line.
    discarding: bool,
    truncated: u64,
}

impl FrameDecoder {
    /// Creates a decoder with the default [`MAX_FRAME_LEN`] bound.
    pub fn new() -> Self {
        Self::with_max_len(MAX_FRAME_LEN)
    }

    /// Creates a decoder with a custom frame-length bound.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_len,
            discarding: false,
            truncated: 0,
        }
    }

    /// Feeds a chunk of inbound bytes, returning every frame it completes.
    ///
    /// Partial frames stay buffered until a later chunk supplies their
    /// delimiter. Completed frames are returned in wire order.
    pub fn extend(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        let mut frames = Vec::new();
        for &byte in bytes {
            if byte == b'\n' {
                self.discarding = false;
                frames.push(std::mem::take(&mut self.buf));
            } else if self.discarding {
                // Remainder of a truncated line; drop until the delimiter.
            } else if self.buf.len() == self.max_len {
                warn!(
                    max_len = self.max_len,
                    "inbound frame exceeds bound; truncating"
                );
                self.truncated += 1;
                self.discarding = true;
            } else {
                self.buf.push(byte);
            }
        }
        frames
    }

    /// Number of bytes buffered for the frame currently in progress.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Number of frames truncated at the length bound so far.
    pub fn truncated(&self) -> u64 {
        self.truncated
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}
