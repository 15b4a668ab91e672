//! Tray core functionality.
//!
//! This module contains the event loop that owns the native tray handles, the
//! dispatcher that marshals calls onto it, and the events it reports back.

pub mod dispatcher;
pub mod event;
pub mod event_loop;
pub mod registry;
pub mod task;

pub use dispatcher::{InputSender, LoopMessage, Mailbox, NativeInput, TrayProxy, Wake, channel};
pub use event::TrayEvent;
pub use event_loop::{LoopState, run, run_with};
pub use registry::SessionSlot;
pub use task::{IconSource, Task};
