//! Shared test harness: an in-memory transport, scripted dial outcomes, and
//! notification helpers.
//!
//! The integration suites drive `ConnectionManager` through its public API
//! only. Instead of real sockets they use `MemoryTransport`, whose listeners
//! accept whatever streams the test pushes in and whose `connect` returns
//! whatever outcome the test scripted. Every stream is one end of a tokio
//! duplex pipe; the test keeps the far end to play the remote peer.

#![allow(dead_code)] // not every suite uses every helper

use std::collections::{HashMap, VecDeque};
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};
use tokio::sync::mpsc;

use tonelink_core::{Notification, PeerIdentity};
use tonelink_service::{
    BoxedStream, Flavor, SessionStream, Transport, TransportError, TransportListener,
};

/// Initialises a test subscriber once per process; later calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ── In-memory streams ─────────────────────────────────────────────────────────

/// One end of a duplex pipe, tagged with a peer identity.
pub struct MemoryStream {
    peer: PeerIdentity,
    inner: DuplexStream,
}

impl MemoryStream {
    /// Builds a connected pair: the near end (boxed, ready for the service)
    /// and the far end the test drives.
    pub fn pair(name: &str) -> (BoxedStream, DuplexStream) {
        let (near, far) = tokio::io::duplex(4096);
        let stream = MemoryStream {
            peer: PeerIdentity::new(format!("{name}:0"), name.to_string()),
            inner: near,
        };
        (Box::new(stream), far)
    }
}

impl SessionStream for MemoryStream {
    fn peer(&self) -> PeerIdentity {
        self.peer.clone()
    }
}

impl AsyncRead for MemoryStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for MemoryStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write(cx, buf)
    }
    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }
    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

/// A stream whose writes always fail and whose reads never complete.
///
/// Stands in for a peer that silently stopped draining its socket: the
/// broadcast path must count it as failed without stalling the others.
pub struct FailingStream {
    peer: PeerIdentity,
}

impl FailingStream {
    pub fn boxed(name: &str) -> BoxedStream {
        Box::new(FailingStream {
            peer: PeerIdentity::new(format!("{name}:0"), name.to_string()),
        })
    }
}

impl SessionStream for FailingStream {
    fn peer(&self) -> PeerIdentity {
        self.peer.clone()
    }
}

impl AsyncRead for FailingStream {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        // Never ready: the read loop just parks here.
        Poll::Pending
    }
}

impl AsyncWrite for FailingStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Poll::Ready(Err(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "peer stopped draining",
        )))
    }
    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }
    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

// ── Memory transport ──────────────────────────────────────────────────────────

enum DialScript {
    Succeed(BoxedStream),
    Fail,
}

struct TransportState {
    /// Inbound queue receivers, taken by `listen`; one per flavor.
    inbound_rx: HashMap<Flavor, mpsc::UnboundedReceiver<BoxedStream>>,
    inbound_tx: HashMap<Flavor, mpsc::UnboundedSender<BoxedStream>>,
    listen_calls: HashMap<Flavor, usize>,
    fail_listen: HashMap<Flavor, bool>,
    dial_scripts: VecDeque<DialScript>,
}

/// In-memory [`Transport`]: listeners yield test-pushed streams, dials pop
/// scripted outcomes.
pub struct MemoryTransport {
    state: Mutex<TransportState>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        let mut inbound_rx = HashMap::new();
        let mut inbound_tx = HashMap::new();
        for flavor in Flavor::ALL {
            let (tx, rx) = mpsc::unbounded_channel();
            inbound_tx.insert(flavor, tx);
            inbound_rx.insert(flavor, rx);
        }
        Self {
            state: Mutex::new(TransportState {
                inbound_rx,
                inbound_tx,
                listen_calls: HashMap::new(),
                fail_listen: HashMap::new(),
                dial_scripts: VecDeque::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TransportState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// How many times `listen` has been called for `flavor`.
    pub fn listen_calls(&self, flavor: Flavor) -> usize {
        *self.lock().listen_calls.get(&flavor).unwrap_or(&0)
    }

    /// Makes the next `listen(flavor)` fail with an address-in-use error.
    pub fn fail_next_listen(&self, flavor: Flavor) {
        self.lock().fail_listen.insert(flavor, true);
    }

    /// Queues an inbound stream for `flavor`'s listener and returns the far
    /// end for the test to drive.
    pub fn push_inbound(&self, flavor: Flavor, name: &str) -> DuplexStream {
        let (near, far) = MemoryStream::pair(name);
        let state = self.lock();
        state.inbound_tx[&flavor]
            .send(near)
            .expect("listener receiver must exist");
        far
    }

    /// Scripts the next dial to succeed, returning the far end of the new
    /// stream.
    pub fn script_dial_success(&self, name: &str) -> DuplexStream {
        let (near, far) = MemoryStream::pair(name);
        self.lock().dial_scripts.push_back(DialScript::Succeed(near));
        far
    }

    /// Scripts the next dial to fail.
    pub fn script_dial_failure(&self) {
        self.lock().dial_scripts.push_back(DialScript::Fail);
    }
}

struct MemoryListener {
    rx: mpsc::UnboundedReceiver<BoxedStream>,
}

#[async_trait]
impl TransportListener for MemoryListener {
    async fn accept(&mut self) -> Result<BoxedStream, TransportError> {
        match self.rx.recv().await {
            Some(stream) => Ok(stream),
            None => Err(TransportError::Accept(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "inbound queue closed",
            ))),
        }
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn listen(&self, flavor: Flavor) -> Result<Box<dyn TransportListener>, TransportError> {
        let mut state = self.lock();
        *state.listen_calls.entry(flavor).or_insert(0) += 1;

        if state.fail_listen.remove(&flavor).unwrap_or(false) {
            return Err(TransportError::ListenFailed {
                flavor,
                source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "scripted bind failure"),
            });
        }

        let rx = state
            .inbound_rx
            .remove(&flavor)
            .expect("listen called twice for the same flavor");
        Ok(Box::new(MemoryListener { rx }))
    }

    async fn connect(
        &self,
        peer: &PeerIdentity,
        _flavor: Flavor,
    ) -> Result<BoxedStream, TransportError> {
        match self.lock().dial_scripts.pop_front() {
            Some(DialScript::Succeed(stream)) => Ok(stream),
            Some(DialScript::Fail) | None => Err(TransportError::ConnectFailed {
                peer: peer.address.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "scripted dial failure",
                ),
            }),
        }
    }
}

// ── Recording tone sink ───────────────────────────────────────────────────────

/// What a tone sink was asked to play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TonePlayed {
    /// A synthesized buffer, recorded by its sample count.
    Tone { samples: usize },
    /// A sample-bank entry.
    Sample(u8),
}

/// A [`tonelink_service::ToneSink`] that records every request.
#[derive(Default)]
pub struct RecordingToneSink {
    played: Mutex<Vec<TonePlayed>>,
}

impl RecordingToneSink {
    pub fn played(&self) -> Vec<TonePlayed> {
        self.played
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl tonelink_service::ToneSink for RecordingToneSink {
    fn play_tone(&self, samples: Vec<i16>) {
        self.played
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(TonePlayed::Tone {
                samples: samples.len(),
            });
    }

    fn play_sample(&self, index: u8) {
        self.played
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(TonePlayed::Sample(index));
    }
}

// ── Async assertion helpers ───────────────────────────────────────────────────

/// Polls `cond` until it holds, panicking after two seconds.
pub async fn wait_for(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !cond() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for: {what}");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Receives notifications until `pred` matches one, returning it. Panics
/// after two seconds.
pub async fn recv_matching(
    rx: &mut mpsc::UnboundedReceiver<Notification>,
    what: &str,
    mut pred: impl FnMut(&Notification) -> bool,
) -> Notification {
    let result = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match rx.recv().await {
                Some(event) if pred(&event) => return event,
                Some(_) => continue,
                None => panic!("notification channel closed while waiting for: {what}"),
            }
        }
    })
    .await;
    match result {
        Ok(event) => event,
        Err(_) => panic!("timed out waiting for notification: {what}"),
    }
}

/// Drains every notification currently queued.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<Notification>) -> Vec<Notification> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
