//! Recording backend used by unit tests.

use crate::config::TrayConfig;
use crate::error::TrayError;
use crate::menu::MenuItem;
use crate::platform::Backend;
use crate::tray::dispatcher::{InputSender, Wake};
use crate::tray::task::IconSource;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Icon(IconSource),
    Title(String),
    Tooltip(String),
    Append {
        menu_id: i32,
        handle: usize,
        title: String,
        disabled: bool,
        checked: bool,
    },
    Update {
        menu_id: i32,
        handle: usize,
        title: String,
        disabled: bool,
        checked: bool,
    },
    ShowMenu,
    Teardown,
}

/// Shared log of backend calls, with the thread each call ran on.
#[derive(Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<(ThreadId, Call)>>>,
    wakes: Arc<AtomicUsize>,
}

impl CallLog {
    fn push(&self, call: Call) {
        self.calls
            .lock()
            .unwrap()
            .push((thread::current().id(), call));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, call)| call.clone())
            .collect()
    }

    pub fn threads(&self) -> Vec<ThreadId> {
        self.calls.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    /// Last `(title, disabled, checked)` applied to the native item for `menu_id`.
    pub fn last_state(&self, menu_id: i32) -> Option<(String, bool, bool)> {
        self.calls().into_iter().rev().find_map(|call| match call {
            Call::Append {
                menu_id: id,
                title,
                disabled,
                checked,
                ..
            }
            | Call::Update {
                menu_id: id,
                title,
                disabled,
                checked,
                ..
            } if id == menu_id => Some((title, disabled, checked)),
            _ => None,
        })
    }

    pub fn wakes(&self) -> usize {
        self.wakes.load(Ordering::SeqCst)
    }
}

struct CountingWaker(Arc<AtomicUsize>);

impl Wake for CountingWaker {
    fn wake(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Backend that records every call instead of touching a platform.
pub struct RecordingBackend {
    log: CallLog,
    next_handle: usize,
    fail_next_append: bool,
    _inputs: Option<InputSender>,
}

impl RecordingBackend {
    /// A backend not connected to any mailbox.
    pub fn detached() -> (Self, CallLog) {
        let log = CallLog::default();
        let backend = Self {
            log: log.clone(),
            next_handle: 0,
            fail_next_append: false,
            _inputs: None,
        };
        (backend, log)
    }

    pub fn with_log(log: CallLog, inputs: InputSender) -> Self {
        Self {
            log,
            next_handle: 0,
            fail_next_append: false,
            _inputs: Some(inputs),
        }
    }

    pub fn fail_next_append(&mut self) {
        self.fail_next_append = true;
    }
}

impl Backend for RecordingBackend {
    type Item = usize;

    fn initialize(_config: &TrayConfig, inputs: InputSender) -> Result<Self, TrayError> {
        Ok(Self::with_log(CallLog::default(), inputs))
    }

    fn waker(&self) -> Option<Box<dyn Wake>> {
        Some(Box::new(CountingWaker(self.log.wakes.clone())))
    }

    fn set_icon(&mut self, icon: IconSource) -> Result<(), TrayError> {
        self.log.push(Call::Icon(icon));
        Ok(())
    }

    fn set_title(&mut self, title: &str) -> Result<(), TrayError> {
        self.log.push(Call::Title(title.to_string()));
        Ok(())
    }

    fn set_tooltip(&mut self, tooltip: &str) -> Result<(), TrayError> {
        self.log.push(Call::Tooltip(tooltip.to_string()));
        Ok(())
    }

    fn append_item(&mut self, item: &MenuItem) -> Result<usize, TrayError> {
        if std::mem::take(&mut self.fail_next_append) {
            return Err(TrayError::Native {
                operation: "insert menu item",
                source: io::Error::other("injected failure"),
            });
        }
        let handle = self.next_handle;
        self.next_handle += 1;
        self.log.push(Call::Append {
            menu_id: item.menu_id,
            handle,
            title: item.title.clone(),
            disabled: item.disabled,
            checked: item.checked,
        });
        Ok(handle)
    }

    fn update_item(&mut self, native: &mut usize, item: &MenuItem) -> Result<(), TrayError> {
        self.log.push(Call::Update {
            menu_id: item.menu_id,
            handle: *native,
            title: item.title.clone(),
            disabled: item.disabled,
            checked: item.checked,
        });
        Ok(())
    }

    fn show_menu(&mut self) {
        self.log.push(Call::ShowMenu);
    }

    fn teardown(&mut self) {
        self.log.push(Call::Teardown);
    }
}
