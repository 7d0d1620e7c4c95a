//! Transport provider seam.
//!
//! The connection manager is written against [`Transport`] and
//! [`TransportListener`] rather than any concrete socket type, so the same
//! lifecycle machinery runs over TCP today and over anything stream-oriented
//! tomorrow. A transport supplies two primitives:
//!
//! - `listen(flavor)` – a listener bound for one [`Flavor`], producing
//!   inbound streams until dropped or closed.
//! - `connect(peer)` – a one-shot outbound dial to a peer.
//!
//! Both yield a [`SessionStream`]: an ordered, reliable byte stream that also
//! knows which peer sits at its far end.

pub mod tcp;

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use tonelink_core::PeerIdentity;

/// The two service flavors a listener can be bound for.
///
/// Secure and insecure connections are accepted independently and
/// concurrently; a session carries no memory of which flavor accepted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flavor {
    Secure,
    Insecure,
}

impl Flavor {
    /// Both flavors, in the order listeners are started.
    pub const ALL: [Flavor; 2] = [Flavor::Secure, Flavor::Insecure];

    /// The service name advertised for this flavor.
    pub fn service_name(self) -> &'static str {
        match self {
            Flavor::Secure => "TonelinkSecure",
            Flavor::Insecure => "TonelinkInsecure",
        }
    }
}

impl std::fmt::Display for Flavor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Flavor::Secure => write!(f, "secure"),
            Flavor::Insecure => write!(f, "insecure"),
        }
    }
}

/// Errors produced by transport providers.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Binding the listener for a flavor failed.
    #[error("failed to listen for {flavor} connections: {source}")]
    ListenFailed {
        flavor: Flavor,
        #[source]
        source: std::io::Error,
    },

    /// Accepting an inbound stream failed.
    #[error("failed to accept inbound connection: {0}")]
    Accept(#[source] std::io::Error),

    /// An outbound dial failed.
    #[error("failed to connect to {peer}: {source}")]
    ConnectFailed {
        peer: String,
        #[source]
        source: std::io::Error,
    },

    /// An outbound dial did not complete within the configured timeout.
    #[error("connection to {peer} timed out after {timeout:?}")]
    Timeout { peer: String, timeout: Duration },
}

/// An established, ordered, reliable byte stream to one peer.
pub trait SessionStream: AsyncRead + AsyncWrite + Send + Unpin {
    /// Identity of the peer at the far end of this stream.
    fn peer(&self) -> PeerIdentity;
}

/// Type-erased session stream handed across the transport seam.
pub type BoxedStream = Box<dyn SessionStream>;

/// A bound listener producing inbound session streams.
#[async_trait]
pub trait TransportListener: Send {
    /// Waits for and returns the next inbound stream.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Accept`] when the accept operation fails;
    /// the listener remains usable afterwards unless the underlying socket
    /// is gone.
    async fn accept(&mut self) -> Result<BoxedStream, TransportError>;

    /// The local address this listener is bound to, when meaningful.
    fn local_addr(&self) -> Option<String> {
        None
    }
}

/// A provider of listen/connect primitives over some stream transport.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Binds a listener for `flavor`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ListenFailed`] when binding fails.
    async fn listen(&self, flavor: Flavor) -> Result<Box<dyn TransportListener>, TransportError>;

    /// Dials `peer` over the given flavor and returns the established stream.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ConnectFailed`] on dial failure or
    /// [`TransportError::Timeout`] if the dial exceeds the provider's
    /// configured timeout.
    async fn connect(
        &self,
        peer: &PeerIdentity,
        flavor: Flavor,
    ) -> Result<BoxedStream, TransportError>;
}
