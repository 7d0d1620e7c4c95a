//! Notification delivery seams.
//!
//! The connection service produces [`Notification`] events but knows nothing
//! about what consumes them. Front ends implement [`NotificationSink`] (or
//! use the channel-backed [`ChannelSink`]) and react however they like.
//!
//! A second, narrower seam exists for sound: [`ToneSink`] receives synthesized
//! tone buffers and sample-bank indices. The service decodes payload bytes
//! into notes; actually producing audio belongs to the host application.

#[cfg(test)]
use mockall::automock;
use tokio::sync::mpsc;
use tracing::trace;

use tonelink_core::Notification;

/// Receives lifecycle and data events from the connection service.
///
/// Implementations must not block and must not call back into the
/// [`crate::manager::ConnectionManager`] that emitted the event: `notify` is
/// invoked while the manager holds its internal lock. Hand the event off to a
/// channel or queue and return.
#[cfg_attr(test, automock)]
pub trait NotificationSink: Send + Sync {
    /// Delivers one event. Infallible by design; a sink that can fail
    /// internally (a closed channel, say) drops the event.
    fn notify(&self, event: Notification);
}

/// A [`NotificationSink`] backed by an unbounded tokio channel.
///
/// The service side never awaits on delivery, so the channel must be
/// unbounded; the consuming side reads at its own pace.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelSink {
    /// Creates a sink and the receiver its events arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, event: Notification) {
        // A dropped receiver means nobody is listening any more; the event
        // is simply discarded.
        if self.tx.send(event).is_err() {
            trace!("notification receiver dropped; event discarded");
        }
    }
}

/// Receives decoded tone output from inbound frames.
///
/// Every payload byte names either a synthesized note (`play_tone`) or an
/// entry in a pre-recorded sample bank (`play_sample`). Bytes that name
/// neither are ignored by the service and never reach the sink.
#[cfg_attr(test, automock)]
pub trait ToneSink: Send + Sync {
    /// Plays one synthesized tone buffer of [`tonelink_core::TONE_SAMPLES`]
    /// signed 16-bit samples at [`tonelink_core::SAMPLE_RATE`] Hz.
    fn play_tone(&self, samples: Vec<i16>);

    /// Plays the pre-recorded sample at `index` in the host's sample bank.
    fn play_sample(&self, index: u8);
}

/// A [`ToneSink`] that discards everything. Useful for headless deployments
/// and tests that only care about connection lifecycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullToneSink;

impl ToneSink for NullToneSink {
    fn play_tone(&self, _samples: Vec<i16>) {}
    fn play_sample(&self, _index: u8) {}
}
