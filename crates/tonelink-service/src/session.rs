//! One established connection to one peer.
//!
//! A [`Session`] owns the write half of its stream and the handle of the
//! spawned read-loop task; the read half is consumed by the read loop itself.
//! Writes are serialized through an async mutex so concurrent broadcasters
//! never interleave bytes on the wire. Payloads pass through verbatim: a
//! caller that wants the frame delimiter includes the `\n` itself.
//!
//! Death is recorded exactly once: whichever path notices first (a failed
//! write, a read-loop error, EOF) wins `mark_dead`, and every later path sees
//! the session already inactive.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::PoisonError;

use thiserror::Error;
use tokio::io::{AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::trace;

use tonelink_core::{Notification, PeerIdentity};

use crate::notify::NotificationSink;
use crate::transport::BoxedStream;

/// Monotonic identifier for one session, unique for the process lifetime.
pub type SessionId = u64;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Error type for session writes.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session has been cancelled or its peer is gone.
    #[error("session is closed")]
    Closed,

    /// The underlying stream write failed.
    #[error("session write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// One established, bidirectional connection to a peer.
pub struct Session {
    id: SessionId,
    identity: PeerIdentity,
    active: AtomicBool,
    writer: Mutex<Option<WriteHalf<BoxedStream>>>,
    read_task: StdMutex<Option<JoinHandle<()>>>,
    sink: Arc<dyn NotificationSink>,
}

impl Session {
    /// Splits `stream` into a session plus the read half its read loop will
    /// consume. The caller spawns the read loop and attaches its handle via
    /// [`Session::attach_read_task`]. Successful writes are reported to
    /// `sink` as [`Notification::BytesWritten`].
    pub fn establish(
        stream: BoxedStream,
        sink: Arc<dyn NotificationSink>,
    ) -> (Self, ReadHalf<BoxedStream>) {
        let identity = stream.peer();
        let (read_half, write_half) = tokio::io::split(stream);

        let session = Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            identity,
            active: AtomicBool::new(true),
            writer: Mutex::new(Some(write_half)),
            read_task: StdMutex::new(None),
            sink,
        };
        (session, read_half)
    }

    /// This session's process-unique identifier.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Identity of the peer at the far end.
    pub fn peer(&self) -> &PeerIdentity {
        &self.identity
    }

    /// Whether this session is still live. Turns false on cancel or the
    /// first recorded death and never turns true again.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    /// Stores the read-loop task handle so [`Session::cancel`] can abort it.
    pub fn attach_read_task(&self, handle: JoinHandle<()>) {
        let mut slot = self
            .read_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = Some(handle);
    }

    /// Writes `payload` to the peer, byte-for-byte.
    ///
    /// Concurrent callers are serialized; each call writes its full payload
    /// contiguously and flushes before returning.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] if the session is no longer live and
    /// [`SessionError::Io`] if the stream write fails. An I/O failure also
    /// marks the session dead.
    pub async fn write(&self, payload: &[u8]) -> Result<(), SessionError> {
        if !self.is_active() {
            return Err(SessionError::Closed);
        }

        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(SessionError::Closed)?;

        let result = async {
            writer.write_all(payload).await?;
            writer.flush().await?;
            Ok::<(), std::io::Error>(())
        }
        .await;

        match result {
            Ok(()) => {
                trace!(session = self.id, len = payload.len(), "payload written");
                self.sink.notify(Notification::BytesWritten(payload.to_vec()));
                Ok(())
            }
            Err(e) => {
                // The peer is unreachable; record the death so the next
                // lifecycle pass removes this session.
                self.mark_dead();
                Err(SessionError::Io(e))
            }
        }
    }

    /// Records this session's death, returning `true` only for the first
    /// caller. Callers that win use the return value to run the
    /// connection-lost path exactly once.
    pub fn mark_dead(&self) -> bool {
        self.active.swap(false, Ordering::AcqRel)
    }

    /// Cancels the session: marks it inactive, aborts the read loop, and
    /// drops the write half (closing the stream). Idempotent.
    pub async fn cancel(&self) {
        self.active.store(false, Ordering::Release);

        let handle = {
            let mut slot = self
                .read_task
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            slot.take()
        };
        if let Some(handle) = handle {
            handle.abort();
        }

        let mut guard = self.writer.lock().await;
        if guard.take().is_some() {
            trace!(session = self.id, peer = %self.identity.address, "session cancelled");
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("peer", &self.identity.address)
            .field("active", &self.is_active())
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
