//! ConnectionManager: the lifecycle core of the service.
//!
//! One manager owns the whole connection lifecycle: at most one accept loop
//! per transport flavor, at most one tracked outbound attempt, and a registry
//! of established sessions. All shared mutable state lives behind a single
//! `std::sync::Mutex` that is never held across an `.await`; the connection
//! state is additionally mirrored in an atomic cell so any task can snapshot
//! it without the lock.
//!
//! Lifecycle policy, in one place:
//!
//! - A failed outbound attempt toasts `"Unable to connect device"` and
//!   restarts listening.
//! - A lost established session toasts `"Device connection was lost"`,
//!   leaves the registry, and restarts listening.
//! - `stop()` is the only total shutdown; everything else keeps the service
//!   available to the remaining peers.

mod accept;
mod connect;

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use tokio::io::{AsyncReadExt, ReadHalf};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use tonelink_core::{
    sample_index, synthesize, tone_frequency, ConnectionState, FrameDecoder, Notification,
    PeerIdentity, StateCell, MAX_FRAME_LEN, TOAST_CONNECTION_LOST, TOAST_CONNECT_FAILED,
};

use crate::notify::{NotificationSink, NullToneSink, ToneSink};
use crate::session::{Session, SessionId};
use crate::transport::{BoxedStream, Flavor, Transport};

/// Outcome of one broadcast: how many sessions took the payload and how many
/// failed. Failures never abort the broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

impl BroadcastReport {
    /// True when the broadcast reached nothing and failed nothing (the
    /// not-connected no-op case).
    pub fn is_empty(&self) -> bool {
        self.delivered == 0 && self.failed == 0
    }
}

/// State guarded by the manager lock.
struct Inner {
    sessions: Vec<Arc<Session>>,
    accept_loops: HashMap<Flavor, JoinHandle<()>>,
    connect_attempt: Option<JoinHandle<()>>,
}

/// Multi-peer connection manager.
///
/// Created behind an `Arc` because its accept loops, connect attempts, and
/// session read loops each hold a reference back to it.
pub struct ConnectionManager {
    transport: Arc<dyn Transport>,
    sink: Arc<dyn NotificationSink>,
    tone_sink: Arc<dyn ToneSink>,
    state: StateCell,
    max_frame_len: usize,
    inner: StdMutex<Inner>,
}

impl ConnectionManager {
    /// Creates a manager with no tone output and the default frame bound.
    pub fn new(transport: Arc<dyn Transport>, sink: Arc<dyn NotificationSink>) -> Arc<Self> {
        Self::with_options(transport, sink, Arc::new(NullToneSink), MAX_FRAME_LEN)
    }

    /// Creates a manager with an explicit tone sink and frame bound.
    pub fn with_options(
        transport: Arc<dyn Transport>,
        sink: Arc<dyn NotificationSink>,
        tone_sink: Arc<dyn ToneSink>,
        max_frame_len: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            transport,
            sink,
            tone_sink,
            state: StateCell::new(),
            max_frame_len,
            inner: StdMutex::new(Inner {
                sessions: Vec::new(),
                accept_loops: HashMap::new(),
                connect_attempt: None,
            }),
        })
    }

    /// Current connection state, readable from any task without the lock.
    pub fn state(&self) -> ConnectionState {
        self.state.load()
    }

    /// Number of sessions currently registered.
    pub fn session_count(&self) -> usize {
        self.lock().sessions.len()
    }

    /// Identities of every registered peer, in establishment order.
    pub fn peers(&self) -> Vec<PeerIdentity> {
        self.lock()
            .sessions
            .iter()
            .map(|s| s.peer().clone())
            .collect()
    }

    // ── Lifecycle operations ──────────────────────────────────────────────────

    /// Enters listening mode.
    ///
    /// Aborts any tracked outbound attempt, ensures one accept loop is
    /// running per flavor (a flavor whose loop is already alive is left
    /// alone, so the transport's `listen` is called at most once per flavor
    /// while the service runs), and publishes `Listening`. Established
    /// sessions are not touched; peers stay connected across a restart.
    pub fn start(self: &Arc<Self>) {
        info!("entering listening mode");
        let attempt = {
            let mut inner = self.lock();
            let attempt = inner.connect_attempt.take();
            self.ensure_accept_loops(&mut inner);
            self.set_state(ConnectionState::Listening);
            attempt
        };
        if let Some(handle) = attempt {
            handle.abort();
        }
    }

    /// Starts a one-shot outbound attempt to `peer` over `flavor`.
    ///
    /// If an attempt is already tracked while `Connecting`, its handle is
    /// dropped without aborting: the old task keeps running untracked and
    /// may still promote its stream if it completes.
    pub fn connect(self: &Arc<Self>, peer: PeerIdentity, flavor: Flavor) {
        info!(peer = %peer.address, %flavor, "starting outbound attempt");
        let mut inner = self.lock();
        if self.state() == ConnectionState::Connecting {
            inner.connect_attempt.take();
        }
        inner.connect_attempt = Some(tokio::spawn(connect::run(self.clone(), peer, flavor)));
        self.set_state(ConnectionState::Connecting);
    }

    /// Promotes an established stream into a registered session.
    ///
    /// Splits the stream, registers the session, spawns its read loop,
    /// emits the peer's `DeviceName`, and publishes `Connected`. Called by
    /// the accept loops and connect attempts; also public so hosts can hand
    /// in streams established out-of-band.
    pub fn connected(self: &Arc<Self>, stream: BoxedStream, flavor: Flavor) {
        let (session, read_half) = Session::establish(stream, self.sink.clone());
        let session = Arc::new(session);
        info!(
            session = session.id(),
            peer = %session.peer().address,
            %flavor,
            "session established"
        );

        {
            let mut inner = self.lock();
            inner.sessions.push(session.clone());
            self.sink
                .notify(Notification::DeviceName(session.peer().display_name.clone()));
            self.set_state(ConnectionState::Connected);
        }

        let handle = tokio::spawn(Self::read_loop(self.clone(), session.clone(), read_half));
        session.attach_read_task(handle);
    }

    /// Shuts everything down: the tracked attempt, every accept loop, every
    /// session. Publishes `None`. The manager can be `start()`ed again.
    pub async fn stop(self: &Arc<Self>) {
        info!("stopping connection manager");
        let (attempt, loops, sessions) = {
            let mut inner = self.lock();
            (
                inner.connect_attempt.take(),
                std::mem::take(&mut inner.accept_loops),
                std::mem::take(&mut inner.sessions),
            )
        };

        if let Some(handle) = attempt {
            handle.abort();
        }
        for (flavor, handle) in loops {
            debug!(%flavor, "aborting accept loop");
            handle.abort();
        }
        for session in sessions {
            session.cancel().await;
        }

        let _inner = self.lock();
        self.set_state(ConnectionState::None);
    }

    /// Broadcasts `payload` to every registered session.
    ///
    /// A no-op (empty report) unless `Connected`. Delivery is best-effort:
    /// each session gets the full payload or is counted as failed; a failed
    /// session is removed from the registry and never blocks the rest.
    pub async fn write(&self, payload: &[u8]) -> BroadcastReport {
        if self.state() != ConnectionState::Connected {
            return BroadcastReport::default();
        }

        // Point-in-time snapshot; all I/O happens outside the lock.
        let sessions: Vec<Arc<Session>> = self.lock().sessions.clone();

        let mut report = BroadcastReport::default();
        for session in sessions {
            match session.write(payload).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(
                        session = session.id(),
                        peer = %session.peer().address,
                        error = %e,
                        "broadcast write failed"
                    );
                    report.failed += 1;
                    self.remove_session(session.id());
                }
            }
        }
        report
    }

    // ── Failure paths ─────────────────────────────────────────────────────────

    /// An outbound attempt failed: toast, then back to listening.
    pub(crate) fn connection_failed(self: &Arc<Self>) {
        warn!("outbound connection attempt failed");
        self.sink
            .notify(Notification::Toast(TOAST_CONNECT_FAILED.to_string()));
        self.start();
    }

    /// An established session died: toast, then back to listening.
    pub(crate) fn connection_lost(self: &Arc<Self>) {
        warn!("established connection lost");
        self.sink
            .notify(Notification::Toast(TOAST_CONNECTION_LOST.to_string()));
        self.start();
    }

    // ── Internals shared with the accept/connect tasks ────────────────────────

    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub(crate) fn notify(&self, event: Notification) {
        self.sink.notify(event);
    }

    /// Untracks the current attempt handle, if any. The attempt task calls
    /// this before its outcome path so the `start()` inside that path cannot
    /// abort the very task running it.
    pub(crate) fn clear_connect_attempt(&self) {
        self.lock().connect_attempt.take();
    }

    /// Forgets the accept loop for `flavor`; the loop calls this on its way
    /// out so a later `start()` can respawn it.
    pub(crate) fn remove_accept_loop(&self, flavor: Flavor) {
        self.lock().accept_loops.remove(&flavor);
    }

    fn remove_session(&self, id: SessionId) {
        let mut inner = self.lock();
        let before = inner.sessions.len();
        inner.sessions.retain(|s| s.id() != id);
        if inner.sessions.len() < before {
            debug!(session = id, remaining = inner.sessions.len(), "session removed");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publishes a state transition. Must be called with the manager lock
    /// held so transitions are totally ordered. Emits `StateChanged` on
    /// every call, including re-entry into the same state.
    fn set_state(&self, next: ConnectionState) {
        let prev = self.state.store(next);
        debug!(%prev, %next, "connection state changed");
        self.sink.notify(Notification::StateChanged(next));
    }

    /// Spawns an accept loop for any flavor that lacks a live one.
    fn ensure_accept_loops(self: &Arc<Self>, inner: &mut Inner) {
        for flavor in Flavor::ALL {
            let alive = inner
                .accept_loops
                .get(&flavor)
                .is_some_and(|handle| !handle.is_finished());
            if !alive {
                debug!(%flavor, "spawning accept loop");
                inner
                    .accept_loops
                    .insert(flavor, tokio::spawn(accept::run(self.clone(), flavor)));
            }
        }
    }

    // ── Inbound data path ─────────────────────────────────────────────────────

    /// Per-session read loop. Decodes newline frames, dispatches each as
    /// `DeviceName` + `BytesRead` + tone output, and on EOF or error runs
    /// the lost-connection path exactly once (unless the session was
    /// cancelled first).
    async fn read_loop(
        manager: Arc<Self>,
        session: Arc<Session>,
        mut read_half: ReadHalf<BoxedStream>,
    ) {
        let mut decoder = FrameDecoder::with_max_len(manager.max_frame_len);
        let mut buf = vec![0u8; manager.max_frame_len.max(64)];

        loop {
            match read_half.read(&mut buf).await {
                Ok(0) => {
                    debug!(session = session.id(), "peer closed the stream");
                    break;
                }
                Ok(n) => {
                    for frame in decoder.extend(&buf[..n]) {
                        manager.sink.notify(Notification::DeviceName(
                            session.peer().display_name.clone(),
                        ));
                        manager.sink.notify(Notification::BytesRead(frame.clone()));
                        manager.dispatch_tones(&frame);
                    }
                }
                Err(e) => {
                    warn!(session = session.id(), error = %e, "session read failed");
                    break;
                }
            }
        }

        // mark_dead returns true for exactly one caller, so a session that
        // was cancelled (or already failed a write) does not re-run the
        // lost path.
        if session.mark_dead() {
            manager.remove_session(session.id());
            manager.connection_lost();
        }
    }

    /// Maps each payload byte to tone output: synthesized note when the byte
    /// names a pitch, sample-bank entry otherwise. Unmapped bytes are
    /// silent.
    fn dispatch_tones(&self, frame: &[u8]) {
        for &byte in frame {
            if let Some(freq) = tone_frequency(byte) {
                self.tone_sink.play_tone(synthesize(freq));
            } else if let Some(index) = sample_index(byte) {
                self.tone_sink.play_sample(index);
            }
        }
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("state", &self.state())
            .field("sessions", &self.session_count())
            .finish()
    }
}
