//! Native tray backends.
//!
//! Each backend owns the platform's tray icon and popup menu handles and is only
//! ever used from the event loop thread.

mod staging;

#[cfg(target_os = "linux")]
pub mod ksni_impl;
#[cfg(windows)]
pub mod windows;

pub use staging::IconStaging;

use crate::config::TrayConfig;
use crate::error::TrayError;
use crate::menu::MenuItem;
use crate::tray::dispatcher::{InputSender, LoopMessage, Mailbox, Wake};
use crate::tray::task::IconSource;

/// The backend for the target platform.
#[cfg(target_os = "linux")]
pub type NativeBackend = ksni_impl::KsniBackend;
#[cfg(windows)]
pub type NativeBackend = windows::WindowsBackend;
#[cfg(not(any(target_os = "linux", windows)))]
pub type NativeBackend = Unsupported;

/// Platform operations the event loop drives.
pub trait Backend: Sized {
    /// Native handle of one menu entry.
    type Item;

    /// Creates the tray icon and popup menu. Native input is reported through `inputs`.
    fn initialize(config: &TrayConfig, inputs: InputSender) -> Result<Self, TrayError>;

    /// Hook interrupting [`Backend::next_message`] when a message is queued from
    /// another thread. Not needed if the wait is on the mailbox itself.
    fn waker(&self) -> Option<Box<dyn Wake>> {
        None
    }

    /// Blocks until the next task or native input. `None` ends the loop.
    fn next_message(&mut self, mailbox: &Mailbox) -> Option<LoopMessage> {
        mailbox.recv()
    }

    fn set_icon(&mut self, icon: IconSource) -> Result<(), TrayError>;

    fn set_title(&mut self, title: &str) -> Result<(), TrayError>;

    fn set_tooltip(&mut self, tooltip: &str) -> Result<(), TrayError>;

    /// Appends a new entry to the end of the menu. Its selection must report `item.menu_id`.
    fn append_item(&mut self, item: &MenuItem) -> Result<Self::Item, TrayError>;

    /// Updates title, enabled and checked state of an existing entry.
    fn update_item(&mut self, native: &mut Self::Item, item: &MenuItem) -> Result<(), TrayError>;

    /// Makes menu changes visible without reopening the menu.
    fn show_menu(&mut self) {}

    /// Removes or hides the icon. Best effort, called once when the loop ends.
    fn teardown(&mut self);
}

/// Backend for platforms without native tray support. Initialization always fails.
#[cfg(not(any(target_os = "linux", windows)))]
pub struct Unsupported;

#[cfg(not(any(target_os = "linux", windows)))]
impl Backend for Unsupported {
    type Item = ();

    fn initialize(_config: &TrayConfig, _inputs: InputSender) -> Result<Self, TrayError> {
        Err(TrayError::Unsupported)
    }

    fn set_icon(&mut self, _icon: IconSource) -> Result<(), TrayError> {
        Err(TrayError::Unsupported)
    }

    fn set_title(&mut self, _title: &str) -> Result<(), TrayError> {
        Err(TrayError::Unsupported)
    }

    fn set_tooltip(&mut self, _tooltip: &str) -> Result<(), TrayError> {
        Err(TrayError::Unsupported)
    }

    fn append_item(&mut self, _item: &MenuItem) -> Result<(), TrayError> {
        Err(TrayError::Unsupported)
    }

    fn update_item(&mut self, _native: &mut (), _item: &MenuItem) -> Result<(), TrayError> {
        Err(TrayError::Unsupported)
    }

    fn teardown(&mut self) {}
}
