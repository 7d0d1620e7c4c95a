//! One-shot outbound connection attempt.
//!
//! Dials a peer, and on success hands the stream to
//! [`ConnectionManager::connected`]. On failure the stream resources are
//! already gone and the manager runs its connection-failed path. There is no
//! automatic retry.

use std::sync::Arc;

use tonelink_core::PeerIdentity;
use tracing::{info, warn};

use crate::transport::Flavor;

use super::ConnectionManager;

pub(super) async fn run(manager: Arc<ConnectionManager>, peer: PeerIdentity, flavor: Flavor) {
    info!(peer = %peer.address, %flavor, "dialing peer");

    let result = manager.transport().connect(&peer, flavor).await;

    // Untrack before either outcome path: both can reach start(), which
    // aborts whatever attempt handle is still tracked.
    manager.clear_connect_attempt();

    match result {
        Ok(stream) => {
            info!(peer = %peer.address, %flavor, "outbound attempt succeeded");
            manager.connected(stream, flavor);
        }
        Err(e) => {
            warn!(peer = %peer.address, %flavor, error = %e, "outbound attempt failed");
            manager.connection_failed();
        }
    }
}
