//! Events emitted by the tray event loop.
//!
//! These are the only notifications flowing from the loop to the host. They are
//! delivered on the event loop thread.

/// Upward notification from the event loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrayEvent {
    /// Native handles were created and the loop is about to start waiting for input.
    Ready,
    /// The user selected the tracked menu item with this id.
    ItemSelected(i32),
}
