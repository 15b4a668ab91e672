//! C interface.
//!
//! Exposes the tray to non-Rust hosts as plain functions. `systray_run` blocks the
//! thread it is called on; every other function may be called from any thread,
//! including before `systray_run`, and only queues work for the event loop.

use crate::config::TrayConfig;
use crate::platform::NativeBackend;
use crate::tray::dispatcher::{Mailbox, TrayProxy, channel};
use crate::tray::event::TrayEvent;
use crate::tray::event_loop;
use std::ffi::{CStr, c_char, c_int, c_short};
use std::sync::{Mutex, OnceLock};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Called once when the tray is ready. May be NULL.
pub type ReadyCallback = Option<extern "C" fn()>;
/// Called with the id of each selected menu item. May be NULL.
pub type MenuItemSelectedCallback = Option<extern "C" fn(menu_id: c_int)>;

const EXIT_SUCCESS: c_int = 0;
const EXIT_FAILURE: c_int = 1;

struct Session {
    proxy: TrayProxy,
    mailbox: Mutex<Option<Mailbox>>,
}

static SESSION: OnceLock<Session> = OnceLock::new();

fn session() -> &'static Session {
    SESSION.get_or_init(|| {
        let (proxy, mailbox) = channel();
        Session {
            proxy,
            mailbox: Mutex::new(Some(mailbox)),
        }
    })
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("systray_bridge=info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn deliver(event: TrayEvent, on_ready: ReadyCallback, on_selected: MenuItemSelectedCallback) {
    match event {
        TrayEvent::Ready => {
            if let Some(callback) = on_ready {
                callback();
            }
        }
        TrayEvent::ItemSelected(menu_id) => {
            if let Some(callback) = on_selected {
                callback(menu_id);
            }
        }
    }
}

/// Copies a C string into an owned `String`. Null becomes empty.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string.
unsafe fn owned_string(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

/// Runs the tray event loop on the calling thread until `systray_quit`.
///
/// Returns 0 on success and 1 if the tray could not be created or the loop was
/// already started.
#[unsafe(no_mangle)]
pub extern "C" fn systray_run(
    on_ready: ReadyCallback,
    on_menu_item_selected: MenuItemSelectedCallback,
) -> c_int {
    init_logging();
    let mailbox = match session().mailbox.lock() {
        Ok(mut slot) => slot.take(),
        Err(_) => None,
    };
    let Some(mailbox) = mailbox else {
        error!("tray event loop was already started");
        return EXIT_FAILURE;
    };

    let config = TrayConfig::from_env();
    let result = event_loop::run::<NativeBackend, _>(&config, mailbox, |event| {
        deliver(event, on_ready, on_menu_item_selected)
    });
    match result {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            error!(error = %e, "tray event loop failed");
            EXIT_FAILURE
        }
    }
}

/// Sets the icon from encoded image bytes. The bytes are copied before returning.
///
/// # Safety
///
/// `bytes` must be valid for reads of `len` bytes, or null with `len` 0.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn systray_set_icon(bytes: *const u8, len: usize) {
    let data = if bytes.is_null() || len == 0 {
        Vec::new()
    } else {
        unsafe { std::slice::from_raw_parts(bytes, len) }.to_vec()
    };
    session().proxy.set_icon_bytes(data);
}

/// Sets the icon from an image file path.
///
/// # Safety
///
/// `path` must be null or a NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn systray_set_icon_path(path: *const c_char) {
    let path = unsafe { owned_string(path) };
    session().proxy.set_icon_path(path);
}

/// # Safety
///
/// `title` must be null or a NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn systray_set_title(title: *const c_char) {
    let title = unsafe { owned_string(title) };
    session().proxy.set_title(title);
}

/// # Safety
///
/// `tooltip` must be null or a NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn systray_set_tooltip(tooltip: *const c_char) {
    let tooltip = unsafe { owned_string(tooltip) };
    session().proxy.set_tooltip(tooltip);
}

/// Adds the menu item `menu_id`, or updates it if it already exists.
///
/// `disabled` and `checked` are treated as true when equal to 1.
///
/// # Safety
///
/// `title` and `tooltip` must be null or NUL-terminated strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn systray_add_or_update_menu_item(
    menu_id: c_int,
    title: *const c_char,
    tooltip: *const c_char,
    disabled: c_short,
    checked: c_short,
) {
    let title = unsafe { owned_string(title) };
    let tooltip = unsafe { owned_string(tooltip) };
    session()
        .proxy
        .add_or_update_menu_item(menu_id, title, tooltip, disabled == 1, checked == 1);
}

/// Removes the tray icon and makes `systray_run` return.
#[unsafe(no_mangle)]
pub extern "C" fn systray_quit() {
    session().proxy.quit();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};

    static READY_CALLS: AtomicUsize = AtomicUsize::new(0);
    static LAST_SELECTED: AtomicI32 = AtomicI32::new(0);

    extern "C" fn record_ready() {
        READY_CALLS.fetch_add(1, Ordering::SeqCst);
    }

    extern "C" fn record_selected(menu_id: c_int) {
        LAST_SELECTED.store(menu_id, Ordering::SeqCst);
    }

    #[test]
    fn events_reach_registered_callbacks() {
        deliver(TrayEvent::Ready, Some(record_ready), Some(record_selected));
        deliver(TrayEvent::ItemSelected(7), Some(record_ready), Some(record_selected));
        assert_eq!(READY_CALLS.load(Ordering::SeqCst), 1);
        assert_eq!(LAST_SELECTED.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn null_callbacks_are_skipped() {
        deliver(TrayEvent::Ready, None, None);
        deliver(TrayEvent::ItemSelected(3), None, None);
    }

    #[test]
    fn owned_string_copies_and_handles_null() {
        let source = CString::new("Open").unwrap();
        let copy = unsafe { owned_string(source.as_ptr()) };
        drop(source);
        assert_eq!(copy, "Open");
        assert_eq!(unsafe { owned_string(std::ptr::null()) }, "");
    }
}
