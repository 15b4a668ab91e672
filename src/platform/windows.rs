//! Win32 backend: a hidden message window plus a Shell notification icon.
//!
//! The popup menu uses `MNS_NOTIFYBYPOS`, so selections arrive as `WM_MENUCOMMAND`
//! with the item position and are resolved through the menu item table. Tasks queued
//! from other threads wake `GetMessageW` by posting [`WM_SYSTRAY_WAKE`].

use super::Backend;
use super::staging::{IconStaging, icon_suffix};
use crate::config::TrayConfig;
use crate::error::TrayError;
use crate::menu::MenuItem;
use crate::tray::dispatcher::{InputSender, LoopMessage, Mailbox, NativeInput, Wake};
use crate::tray::registry::SessionSlot;
use crate::tray::task::IconSource;
use std::cell::RefCell;
use std::ffi::OsStr;
use std::os::windows::ffi::OsStrExt;
use std::path::Path;
use std::{io, mem, ptr};
use tracing::{debug, error, warn};
use windows_sys::Win32::Foundation::{
    ERROR_CLASS_ALREADY_EXISTS, GetLastError, HWND, LPARAM, LRESULT, POINT, WPARAM,
};
use windows_sys::Win32::System::LibraryLoader::GetModuleHandleW;
use windows_sys::Win32::UI::Shell::{
    NIF_ICON, NIF_MESSAGE, NIF_TIP, NIM_ADD, NIM_DELETE, NIM_MODIFY, NOTIFYICONDATAW,
    Shell_NotifyIconW,
};
use windows_sys::Win32::UI::WindowsAndMessaging::{
    CS_HREDRAW, CS_VREDRAW, CW_USEDEFAULT, CreatePopupMenu, CreateWindowExW, DefWindowProcW,
    DestroyIcon, DestroyMenu, DestroyWindow, DispatchMessageW, GetCursorPos, GetMenuItemCount,
    GetMessageW, HICON, HMENU, IMAGE_ICON, InsertMenuItemW, LR_LOADFROMFILE, LoadImageW, MENUINFO,
    MENUITEMINFOW, MFS_CHECKED, MFS_DISABLED, MFT_STRING, MIIM_DATA, MIIM_FTYPE, MIIM_STATE,
    MIIM_STRING, MIM_APPLYTOSUBMENUS, MIM_STYLE, MNS_NOTIFYBYPOS, MSG, PostMessageW,
    PostQuitMessage, RegisterClassExW, SetForegroundWindow, SetMenuInfo, SetMenuItemInfoW,
    TPM_BOTTOMALIGN, TPM_LEFTALIGN, TrackPopupMenu, TranslateMessage, WM_DESTROY, WM_LBUTTONUP,
    WM_MENUCOMMAND, WM_RBUTTONUP, WM_USER, WNDCLASSEXW, WS_OVERLAPPEDWINDOW,
};

/// Callback message of the notification icon.
const WM_SYSTRAY_MESSAGE: u32 = WM_USER + 1;
/// Posted by [`HwndWaker`] so `GetMessageW` returns and the mailbox is drained.
const WM_SYSTRAY_WAKE: u32 = WM_USER + 2;
const NOTIFY_ICON_ID: u32 = 100;

/// State the window procedure needs. Only set on the event loop thread.
struct WindowContext {
    menu: HMENU,
    inputs: InputSender,
}

thread_local! {
    static WINDOW: RefCell<Option<WindowContext>> = const { RefCell::new(None) };
}

/// NUL-terminated UTF-16 copy of `s`.
fn to_wide(s: impl AsRef<OsStr>) -> Vec<u16> {
    s.as_ref().encode_wide().chain(Some(0)).collect()
}

/// Copies `text` into a fixed UTF-16 buffer, truncating to leave room for the NUL.
fn copy_truncated(dst: &mut [u16], text: &str) {
    let capacity = dst.len().saturating_sub(1);
    let mut written = 0;
    for (slot, unit) in dst.iter_mut().zip(text.encode_utf16().take(capacity)) {
        *slot = unit;
        written += 1;
    }
    if let Some(rest) = dst.get_mut(written..) {
        rest.fill(0);
    }
}

fn show_menu(hwnd: HWND, menu: HMENU) {
    let mut point = POINT { x: 0, y: 0 };
    if unsafe { GetCursorPos(&mut point) } == 0 {
        error!(error = %io::Error::last_os_error(), "failed to get tray menu position");
        return;
    }
    unsafe {
        // The menu does not close on outside clicks unless the window is foreground.
        SetForegroundWindow(hwnd);
        TrackPopupMenu(
            menu,
            TPM_BOTTOMALIGN | TPM_LEFTALIGN,
            point.x,
            point.y,
            0,
            hwnd,
            ptr::null(),
        );
    }
}

unsafe extern "system" fn wnd_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        WM_MENUCOMMAND => {
            WINDOW.with_borrow(|window| {
                if let Some(window) = window {
                    window.inputs.send(NativeInput::ItemAtPosition(wparam));
                }
            });
            0
        }
        WM_SYSTRAY_MESSAGE => match lparam as u32 {
            WM_LBUTTONUP | WM_RBUTTONUP => {
                let menu = WINDOW.with_borrow(|window| window.as_ref().map(|w| w.menu));
                if let Some(menu) = menu {
                    show_menu(hwnd, menu);
                }
                0
            }
            _ => unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) },
        },
        WM_SYSTRAY_WAKE => 0,
        WM_DESTROY => {
            unsafe { PostQuitMessage(0) };
            0
        }
        _ => unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) },
    }
}

/// Posts [`WM_SYSTRAY_WAKE`] to the tray window from any thread.
struct HwndWaker(isize);

impl Wake for HwndWaker {
    fn wake(&self) {
        let hwnd = self.0 as HWND;
        if unsafe { PostMessageW(hwnd, WM_SYSTRAY_WAKE, 0, 0) } == 0 {
            debug!(error = %io::Error::last_os_error(), "failed to wake tray window");
        }
    }
}

/// Windows backend: the hidden window, its notification icon and popup menu.
pub struct WindowsBackend {
    hwnd: HWND,
    menu: HMENU,
    nid: NOTIFYICONDATAW,
    icon: HICON,
    icon_size: i32,
    staging: IconStaging,
    torn_down: bool,
    _slot: SessionSlot,
}

/// Applies `edit` to a copy of `nid` and commits it only if `shell_notify` accepts it.
fn modify_icon_data(
    nid: &mut NOTIFYICONDATAW,
    flags: u32,
    operation: &'static str,
    edit: impl FnOnce(&mut NOTIFYICONDATAW),
    shell_notify: impl FnOnce(&NOTIFYICONDATAW) -> bool,
) -> Result<(), TrayError> {
    let mut next = *nid;
    edit(&mut next);
    next.uFlags = flags;
    if !shell_notify(&next) {
        return Err(TrayError::native(operation));
    }
    *nid = next;
    Ok(())
}

/// Outcome of one `GetMessageW` call.
#[derive(Debug, PartialEq, Eq)]
enum Pumped {
    Message,
    Quit,
    Failed,
}

impl Pumped {
    fn from_result(result: i32) -> Self {
        match result {
            0 => Self::Quit,
            -1 => Self::Failed,
            _ => Self::Message,
        }
    }
}

impl WindowsBackend {
    fn notify(
        &mut self,
        flags: u32,
        operation: &'static str,
        edit: impl FnOnce(&mut NOTIFYICONDATAW),
    ) -> Result<(), TrayError> {
        modify_icon_data(&mut self.nid, flags, operation, edit, |data| unsafe {
            Shell_NotifyIconW(NIM_MODIFY, data) != 0
        })
    }

    fn item_info(item: &MenuItem, title: &mut [u16]) -> MENUITEMINFOW {
        let mut info: MENUITEMINFOW = unsafe { mem::zeroed() };
        info.cbSize = mem::size_of::<MENUITEMINFOW>() as u32;
        info.fMask = MIIM_FTYPE | MIIM_STRING | MIIM_DATA | MIIM_STATE;
        info.fType = MFT_STRING;
        info.dwTypeData = title.as_mut_ptr();
        info.cch = title.len().saturating_sub(1) as u32;
        info.dwItemData = item.menu_id as usize;
        if item.disabled {
            info.fState |= MFS_DISABLED;
        }
        if item.checked {
            info.fState |= MFS_CHECKED;
        }
        info
    }

    fn load_icon(&self, path: &Path) -> Result<HICON, TrayError> {
        let wide = to_wide(path.as_os_str());
        let icon = unsafe {
            LoadImageW(
                ptr::null_mut(),
                wide.as_ptr(),
                IMAGE_ICON,
                self.icon_size,
                self.icon_size,
                LR_LOADFROMFILE,
            )
        };
        if icon.is_null() {
            return Err(TrayError::native("load icon image"));
        }
        Ok(icon as HICON)
    }
}

impl Backend for WindowsBackend {
    /// Position in the popup menu.
    type Item = u32;

    fn initialize(config: &TrayConfig, inputs: InputSender) -> Result<Self, TrayError> {
        let slot = SessionSlot::claim()?;
        let class_name = to_wide(format!("SystrayClass_{}", config.id));

        let instance = unsafe { GetModuleHandleW(ptr::null()) };
        let mut class: WNDCLASSEXW = unsafe { mem::zeroed() };
        class.cbSize = mem::size_of::<WNDCLASSEXW>() as u32;
        class.style = CS_HREDRAW | CS_VREDRAW;
        class.lpfnWndProc = Some(wnd_proc);
        class.hInstance = instance;
        class.lpszClassName = class_name.as_ptr();
        if unsafe { RegisterClassExW(&class) } == 0
            && unsafe { GetLastError() } != ERROR_CLASS_ALREADY_EXISTS
        {
            return Err(TrayError::init("register window class"));
        }

        let title = to_wide(&config.title);
        let hwnd = unsafe {
            CreateWindowExW(
                0,
                class_name.as_ptr(),
                title.as_ptr(),
                WS_OVERLAPPEDWINDOW,
                CW_USEDEFAULT,
                0,
                CW_USEDEFAULT,
                0,
                ptr::null_mut(),
                ptr::null_mut(),
                instance,
                ptr::null(),
            )
        };
        if hwnd.is_null() {
            return Err(TrayError::init("create tray window"));
        }

        let menu = unsafe { CreatePopupMenu() };
        if menu.is_null() {
            let err = TrayError::init("create popup menu");
            unsafe { DestroyWindow(hwnd) };
            return Err(err);
        }
        let mut menu_info: MENUINFO = unsafe { mem::zeroed() };
        menu_info.cbSize = mem::size_of::<MENUINFO>() as u32;
        menu_info.fMask = MIM_APPLYTOSUBMENUS | MIM_STYLE;
        menu_info.dwStyle = MNS_NOTIFYBYPOS;
        if unsafe { SetMenuInfo(menu, &menu_info) } == 0 {
            let err = TrayError::init("set popup menu style");
            unsafe {
                DestroyMenu(menu);
                DestroyWindow(hwnd);
            }
            return Err(err);
        }

        let mut nid: NOTIFYICONDATAW = unsafe { mem::zeroed() };
        nid.cbSize = mem::size_of::<NOTIFYICONDATAW>() as u32;
        nid.hWnd = hwnd;
        nid.uID = NOTIFY_ICON_ID;
        nid.uCallbackMessage = WM_SYSTRAY_MESSAGE;
        nid.uFlags = NIF_MESSAGE;
        if unsafe { Shell_NotifyIconW(NIM_ADD, &nid) } == 0 {
            let err = TrayError::init("add notification icon");
            unsafe {
                DestroyMenu(menu);
                DestroyWindow(hwnd);
            }
            return Err(err);
        }

        WINDOW.set(Some(WindowContext { menu, inputs }));
        Ok(Self {
            hwnd,
            menu,
            nid,
            icon: ptr::null_mut(),
            icon_size: config.icon_size,
            staging: IconStaging::new(config.icon_dir.as_deref()),
            torn_down: false,
            _slot: slot,
        })
    }

    fn waker(&self) -> Option<Box<dyn Wake>> {
        Some(Box::new(HwndWaker(self.hwnd as isize)))
    }

    fn next_message(&mut self, mailbox: &Mailbox) -> Option<LoopMessage> {
        loop {
            if let Some(message) = mailbox.try_recv() {
                return Some(message);
            }
            let mut msg: MSG = unsafe { mem::zeroed() };
            match Pumped::from_result(unsafe { GetMessageW(&mut msg, ptr::null_mut(), 0, 0) }) {
                Pumped::Quit => return None,
                Pumped::Failed => {
                    let error = io::Error::last_os_error();
                    error!(%error, "failed to get window message");
                }
                Pumped::Message => unsafe {
                    TranslateMessage(&msg);
                    DispatchMessageW(&msg);
                },
            }
        }
    }

    fn set_icon(&mut self, icon: IconSource) -> Result<(), TrayError> {
        let path = match icon {
            IconSource::Bytes(bytes) => self
                .staging
                .stage(&bytes, icon_suffix(&bytes))
                .map_err(|source| TrayError::Native {
                    operation: "write temp icon file",
                    source,
                })?,
            IconSource::Path(path) => path,
        };
        let loaded = self.load_icon(&path)?;
        if let Err(e) = self.notify(NIF_ICON, "set tray icon", |nid| nid.hIcon = loaded) {
            unsafe { DestroyIcon(loaded) };
            return Err(e);
        }
        let previous = mem::replace(&mut self.icon, loaded);
        if !previous.is_null() {
            unsafe { DestroyIcon(previous) };
        }
        Ok(())
    }

    fn set_title(&mut self, title: &str) -> Result<(), TrayError> {
        debug!(title, "notification icons have no title on this platform");
        Ok(())
    }

    fn set_tooltip(&mut self, tooltip: &str) -> Result<(), TrayError> {
        self.notify(NIF_TIP, "set tray tooltip", |nid| {
            copy_truncated(&mut nid.szTip, tooltip)
        })
    }

    fn append_item(&mut self, item: &MenuItem) -> Result<u32, TrayError> {
        let count = unsafe { GetMenuItemCount(self.menu) };
        if count < 0 {
            return Err(TrayError::native("count menu items"));
        }
        let mut title = to_wide(&item.title);
        let info = Self::item_info(item, &mut title);
        // u32::MAX with by-position set appends at the end.
        if unsafe { InsertMenuItemW(self.menu, u32::MAX, 1, &info) } == 0 {
            return Err(TrayError::native("insert menu item"));
        }
        Ok(count as u32)
    }

    fn update_item(&mut self, native: &mut u32, item: &MenuItem) -> Result<(), TrayError> {
        let mut title = to_wide(&item.title);
        let info = Self::item_info(item, &mut title);
        if unsafe { SetMenuItemInfoW(self.menu, *native, 1, &info) } == 0 {
            return Err(TrayError::native("update menu item"));
        }
        Ok(())
    }

    fn teardown(&mut self) {
        if mem::replace(&mut self.torn_down, true) {
            return;
        }
        unsafe {
            if Shell_NotifyIconW(NIM_DELETE, &self.nid) == 0 {
                let error = io::Error::last_os_error();
                warn!(%error, "failed to remove notification icon");
            }
            if !self.icon.is_null() {
                DestroyIcon(self.icon);
            }
            DestroyMenu(self.menu);
            DestroyWindow(self.hwnd);
        }
        WINDOW.set(None);
        self.staging.cleanup();
    }
}

impl Drop for WindowsBackend {
    fn drop(&mut self) {
        self.teardown();
    }
}
