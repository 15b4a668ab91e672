//! Thread-marshaling dispatcher.
//!
//! Native tray handles may only be touched on the thread running the event loop.
//! Every other thread talks to the loop through a [`TrayProxy`], which turns each
//! call into a [`Task`] and pushes it onto an unbounded FIFO channel drained by the
//! loop. Backends whose native wait does not watch the channel install a [`Wake`]
//! hook so a send also interrupts that wait.

use crate::menu::MenuItem;
use crate::tray::task::{IconSource, Task};
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, Sender, channel as mpsc_channel};
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

/// Interrupts the event loop's native wait after a message was queued.
pub trait Wake: Send + Sync {
    fn wake(&self);
}

type WakerSlot = OnceLock<Box<dyn Wake>>;

/// Input produced by the native platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NativeInput {
    /// A menu item whose selection hook captured its id.
    ItemSelected(i32),
    /// A menu item reported by its position in the native menu.
    ItemAtPosition(usize),
    /// The native side is closing.
    Close,
}

/// Anything the event loop can wake up for.
#[derive(Debug)]
pub enum LoopMessage {
    Task(Task),
    Input(NativeInput),
}

/// Creates a connected proxy and mailbox.
pub fn channel() -> (TrayProxy, Mailbox) {
    let (tx, rx) = mpsc_channel();
    let waker = Arc::new(WakerSlot::new());
    let proxy = TrayProxy {
        tx: tx.clone(),
        waker: waker.clone(),
    };
    (proxy, Mailbox { rx, tx, waker })
}

fn wake(slot: &WakerSlot) {
    if let Some(waker) = slot.get() {
        waker.wake();
    }
}

/// Cloneable handle for queuing tray mutations from any thread.
///
/// All methods return immediately. There is no completion signal; failures are
/// only visible in the logs.
#[derive(Clone)]
pub struct TrayProxy {
    tx: Sender<LoopMessage>,
    waker: Arc<WakerSlot>,
}

impl TrayProxy {
    pub fn set_icon(&self, icon: IconSource) {
        self.enqueue(Task::SetIcon(icon));
    }

    pub fn set_icon_bytes(&self, bytes: impl Into<Vec<u8>>) {
        self.set_icon(IconSource::Bytes(bytes.into()));
    }

    pub fn set_icon_path(&self, path: impl Into<PathBuf>) {
        self.set_icon(IconSource::Path(path.into()));
    }

    pub fn set_title(&self, title: impl Into<String>) {
        self.enqueue(Task::SetTitle(title.into()));
    }

    pub fn set_tooltip(&self, tooltip: impl Into<String>) {
        self.enqueue(Task::SetTooltip(tooltip.into()));
    }

    pub fn upsert_menu_item(&self, item: MenuItem) {
        self.enqueue(Task::UpsertMenuItem(item));
    }

    /// Adds the item with `menu_id`, or updates it if it already exists.
    pub fn add_or_update_menu_item(
        &self,
        menu_id: i32,
        title: impl Into<String>,
        tooltip: impl Into<String>,
        disabled: bool,
        checked: bool,
    ) {
        self.upsert_menu_item(MenuItem {
            menu_id,
            title: title.into(),
            tooltip: tooltip.into(),
            disabled,
            checked,
        });
    }

    /// Asks the event loop to tear down the icon and return.
    pub fn quit(&self) {
        self.enqueue(Task::Quit);
    }

    pub fn enqueue(&self, task: Task) {
        let operation = task.name();
        if self.tx.send(LoopMessage::Task(task)).is_err() {
            debug!(operation, "event loop is gone, dropping task");
            return;
        }
        wake(&self.waker);
    }
}

/// Sender for native input, handed to the backend at initialization.
#[derive(Clone)]
pub struct InputSender {
    tx: Sender<LoopMessage>,
    waker: Arc<WakerSlot>,
}

impl InputSender {
    pub fn send(&self, input: NativeInput) {
        if self.tx.send(LoopMessage::Input(input)).is_err() {
            debug!(?input, "event loop is gone, dropping input");
            return;
        }
        wake(&self.waker);
    }
}

/// Receiving end, drained only by the event loop.
pub struct Mailbox {
    rx: Receiver<LoopMessage>,
    tx: Sender<LoopMessage>,
    waker: Arc<WakerSlot>,
}

impl Mailbox {
    /// Blocks until the next message arrives.
    pub fn recv(&self) -> Option<LoopMessage> {
        self.rx.recv().ok()
    }

    pub fn try_recv(&self) -> Option<LoopMessage> {
        self.rx.try_recv().ok()
    }

    pub fn input_sender(&self) -> InputSender {
        InputSender {
            tx: self.tx.clone(),
            waker: self.waker.clone(),
        }
    }

    pub(crate) fn install_waker(&self, waker: Box<dyn Wake>) {
        if self.waker.set(waker).is_err() {
            warn!("event loop waker already installed");
        }
    }
}
