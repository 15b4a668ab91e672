//! Deferred tasks executed on the event loop thread.

use crate::menu::{MenuItem, MenuItemTable};
use crate::platform::Backend;
use std::ops::ControlFlow;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Icon payload accepted by [`Task::SetIcon`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IconSource {
    /// Encoded image bytes (PNG, SVG or ICO). Staged to a temporary file by the backend.
    Bytes(Vec<u8>),
    /// Path to an image file the platform can load directly.
    Path(PathBuf),
}

/// A mutation request captured on a caller thread.
///
/// A task owns all of its arguments and is consumed when it runs, so it executes at
/// most once and its buffers are released right after.
#[derive(Debug)]
pub enum Task {
    SetIcon(IconSource),
    SetTitle(String),
    SetTooltip(String),
    UpsertMenuItem(MenuItem),
    Quit,
}

impl Task {
    /// Operation name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Task::SetIcon(_) => "set icon",
            Task::SetTitle(_) => "set title",
            Task::SetTooltip(_) => "set tooltip",
            Task::UpsertMenuItem(_) => "upsert menu item",
            Task::Quit => "quit",
        }
    }

    /// Applies the task. `Break` asks the loop to terminate.
    ///
    /// Native failures are logged and leave prior state in place.
    pub fn run<B: Backend>(
        self,
        backend: &mut B,
        table: &mut MenuItemTable<B::Item>,
    ) -> ControlFlow<()> {
        let operation = self.name();
        debug!(operation, "running deferred task");
        let result = match self {
            Task::SetIcon(icon) => backend.set_icon(icon),
            Task::SetTitle(title) => backend.set_title(&title),
            Task::SetTooltip(tooltip) => backend.set_tooltip(&tooltip),
            Task::UpsertMenuItem(item) => table.upsert(item, backend).map(drop),
            Task::Quit => return ControlFlow::Break(()),
        };
        if let Err(error) = result {
            warn!(operation, %error, "tray operation failed");
        }
        ControlFlow::Continue(())
    }
}
