//! Identity of a remote peer.

/// Identity of a remote peer as reported by the transport layer at
/// accept/connect time. Immutable once obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerIdentity {
    /// Transport-level address (e.g. an RFCOMM MAC or a TCP socket address).
    pub address: String,
    /// Human-readable name surfaced in `DeviceName` notifications.
    pub display_name: String,
}

impl PeerIdentity {
    /// Creates an identity whose display name equals its address.
    ///
    /// Transports without a naming service (plain TCP) use this form.
    pub fn from_address(address: impl Into<String>) -> Self {
        let address = address.into();
        Self {
            display_name: address.clone(),
            address,
        }
    }

    pub fn new(address: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            display_name: display_name.into(),
        }
    }
}
