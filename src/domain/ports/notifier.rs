//! Broadcast/notification sink port.
//!
//! Transport is pluggable; the core treats delivery as fire-and-forget.
//! Implementations must filter so an event is only observable by
//! subscriptions authenticated as the owning user.

use crate::domain::models::ChangeEvent;

pub trait ChangeNotifier: Send + Sync {
    /// Publish a change event. Must never block or fail the calling use
    /// case; delivery problems are the sink's concern.
    fn notify(&self, event: ChangeEvent);
}

/// Sink that drops every event. Used when no transport is wired.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl ChangeNotifier for NullNotifier {
    fn notify(&self, _event: ChangeEvent) {}
}
