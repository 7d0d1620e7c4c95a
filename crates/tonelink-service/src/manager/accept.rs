//! Accept loop: one per transport flavor.
//!
//! Binds a listener and promotes inbound streams until the task is aborted
//! or the listener fails. Promotion policy: every accepted stream becomes a
//! session whenever the service is running (listening, connecting, or
//! already connected); a stream accepted while the service is stopped is
//! dropped, which closes it.

use std::sync::Arc;

use tonelink_core::{ConnectionState, Notification};
use tracing::{debug, error, info, warn};

use crate::transport::Flavor;

use super::ConnectionManager;

pub(super) async fn run(manager: Arc<ConnectionManager>, flavor: Flavor) {
    let mut listener = match manager.transport().listen(flavor).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(%flavor, error = %e, "could not start listener");
            // Unregister before toasting so a restart triggered by the
            // toast can already respawn this flavor.
            manager.remove_accept_loop(flavor);
            manager.notify(Notification::Toast(e.to_string()));
            return;
        }
    };

    info!(
        %flavor,
        service = flavor.service_name(),
        addr = listener.local_addr().as_deref().unwrap_or("unknown"),
        "accept loop running"
    );

    loop {
        match listener.accept().await {
            Ok(stream) => match manager.state() {
                ConnectionState::None => {
                    // Service is stopped; dropping the stream closes it.
                    debug!(%flavor, "dropping stream accepted while stopped");
                }
                ConnectionState::Listening
                | ConnectionState::Connecting
                | ConnectionState::Connected => {
                    manager.connected(stream, flavor);
                }
            },
            Err(e) => {
                warn!(%flavor, error = %e, "accept failed; loop ending");
                break;
            }
        }
    }

    manager.remove_accept_loop(flavor);
}
