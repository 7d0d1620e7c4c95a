//! TCP implementation of the transport seam.
//!
//! One listener per flavor: the secure flavor binds `secure_port`, the
//! insecure flavor `insecure_port`. Outbound dials go straight to the peer's
//! `host:port` address and are bounded by a connect timeout.
//!
//! TCP carries no authenticated channel of its own, so here "secure" versus
//! "insecure" only selects which port is used; wrapping the stream in TLS
//! would slot in behind the same [`Transport`] trait.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

use tonelink_core::PeerIdentity;

use super::{BoxedStream, Flavor, SessionStream, Transport, TransportError, TransportListener};

/// TCP transport provider.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    bind_address: String,
    secure_port: u16,
    insecure_port: u16,
    connect_timeout: Duration,
}

impl TcpTransport {
    /// Creates a provider from explicit settings.
    pub fn new(
        bind_address: impl Into<String>,
        secure_port: u16,
        insecure_port: u16,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            bind_address: bind_address.into(),
            secure_port,
            insecure_port,
            connect_timeout,
        }
    }

    /// Creates a provider from the service network config.
    pub fn from_config(config: &crate::config::NetworkConfig) -> Self {
        Self::new(
            config.bind_address.clone(),
            config.secure_port,
            config.insecure_port,
            config.connect_timeout(),
        )
    }

    fn port_for(&self, flavor: Flavor) -> u16 {
        match flavor {
            Flavor::Secure => self.secure_port,
            Flavor::Insecure => self.insecure_port,
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn listen(&self, flavor: Flavor) -> Result<Box<dyn TransportListener>, TransportError> {
        let addr = format!("{}:{}", self.bind_address, self.port_for(flavor));
        let listener =
            TcpListener::bind(&addr)
                .await
                .map_err(|source| TransportError::ListenFailed { flavor, source })?;

        info!(%flavor, %addr, service = flavor.service_name(), "listener bound");
        Ok(Box::new(TcpFlavorListener { listener }))
    }

    async fn connect(
        &self,
        peer: &PeerIdentity,
        flavor: Flavor,
    ) -> Result<BoxedStream, TransportError> {
        let dial = TcpStream::connect(&peer.address);
        let stream = match tokio::time::timeout(self.connect_timeout, dial).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                return Err(TransportError::ConnectFailed {
                    peer: peer.address.clone(),
                    source,
                })
            }
            Err(_) => {
                return Err(TransportError::Timeout {
                    peer: peer.address.clone(),
                    timeout: self.connect_timeout,
                })
            }
        };

        debug!(peer = %peer.address, %flavor, "outbound TCP connection established");
        Ok(Box::new(TcpSessionStream {
            peer: peer.clone(),
            inner: stream,
        }))
    }
}

/// A bound TCP listener for one flavor.
struct TcpFlavorListener {
    listener: TcpListener,
}

#[async_trait]
impl TransportListener for TcpFlavorListener {
    async fn accept(&mut self) -> Result<BoxedStream, TransportError> {
        let (stream, remote) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::Accept)?;

        debug!(%remote, "inbound TCP connection accepted");
        Ok(Box::new(TcpSessionStream {
            peer: PeerIdentity::from_address(remote.to_string()),
            inner: stream,
        }))
    }

    fn local_addr(&self) -> Option<String> {
        self.listener.local_addr().ok().map(|a| a.to_string())
    }
}

/// A connected TCP stream with its peer identity attached.
struct TcpSessionStream {
    peer: PeerIdentity,
    inner: TcpStream,
}

impl SessionStream for TcpSessionStream {
    fn peer(&self) -> PeerIdentity {
        self.peer.clone()
    }
}

impl AsyncRead for TcpSessionStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for TcpSessionStream {
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

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn loopback_transport(secure_port: u16, insecure_port: u16) -> TcpTransport {
        TcpTransport::new("127.0.0.1", secure_port, insecure_port, Duration::from_secs(2))
    }

    #[tokio::test]
    async fn test_listen_accept_connect_round_trip() {
        // Bind on an ephemeral port, then dial the address the OS picked.
        let transport = loopback_transport(0, 0);
        let mut listener = transport.listen(Flavor::Secure).await.expect("listen");
        let addr = listener.local_addr().expect("local addr");

        let dialer = loopback_transport(0, 0);
        let peer = PeerIdentity::from_address(addr);
        let (accepted, dialed) =
            tokio::join!(listener.accept(), dialer.connect(&peer, Flavor::Secure));

        let mut accepted = accepted.expect("accept");
        let mut dialed = dialed.expect("connect");

        dialed.write_all(b"ping\n").await.expect("write");
        let mut buf = [0u8; 5];
        accepted.read_exact(&mut buf).await.expect("read");
        assert_eq!(&buf, b"ping\n");
    }

    #[tokio::test]
    async fn test_accepted_stream_reports_remote_peer() {
        let transport = loopback_transport(0, 0);
        let mut listener = transport.listen(Flavor::Insecure).await.expect("listen");
        let addr = listener.local_addr().expect("local addr");

        let peer = PeerIdentity::from_address(addr);
        let (accepted, dialed) =
            tokio::join!(listener.accept(), transport.connect(&peer, Flavor::Insecure));

        let accepted = accepted.expect("accept");
        let _dialed = dialed.expect("connect");
        assert!(accepted.peer().address.starts_with("127.0.0.1:"));
    }

    #[tokio::test]
    async fn test_connect_to_closed_port_fails() {
        // Bind and immediately drop a listener so the port is closed.
        let probe = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = probe.local_addr().expect("addr").to_string();
        drop(probe);

        let transport = loopback_transport(0, 0);
        let peer = PeerIdentity::from_address(addr);
        let result = transport.connect(&peer, Flavor::Secure).await;
        assert!(matches!(
            result,
            Err(TransportError::ConnectFailed { .. }) | Err(TransportError::Timeout { .. })
        ));
    }
}
