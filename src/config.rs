//! Tray configuration.
//!
//! The configuration is read once by the event loop when the native handles are
//! created. Later changes go through [`TrayProxy`](crate::tray::TrayProxy).

use std::env;
use std::path::PathBuf;

/// Environment variable overriding [`TrayConfig::id`].
pub const ENV_ID: &str = "SYSTRAY_ID";
/// Environment variable overriding [`TrayConfig::icon_dir`].
pub const ENV_ICON_DIR: &str = "SYSTRAY_ICON_DIR";

/// Startup configuration of the tray icon.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrayConfig {
    /// Identifier registered with the platform (SNI id, window class suffix).
    pub id: String,
    /// Initial title shown next to the icon where the platform supports it.
    pub title: String,
    /// Directory for staged icon files. `None` uses the OS temp directory.
    pub icon_dir: Option<PathBuf>,
    /// Edge length in pixels used when loading icon files on Windows.
    pub icon_size: i32,
}

impl Default for TrayConfig {
    fn default() -> Self {
        Self {
            id: "systray".to_string(),
            title: String::new(),
            icon_dir: None,
            icon_size: 64,
        }
    }
}

impl TrayConfig {
    /// Default configuration with [`ENV_ID`] and [`ENV_ICON_DIR`] applied.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Applies [`ENV_ID`] and [`ENV_ICON_DIR`] on top of `self`. Empty values are ignored.
    pub fn with_env_overrides(self) -> Self {
        self.apply_overrides(|key| env::var(key).ok())
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_icon_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.icon_dir = Some(dir.into());
        self
    }

    pub fn with_icon_size(mut self, size: i32) -> Self {
        self.icon_size = size;
        self
    }

    fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(id) = lookup(ENV_ID).filter(|v| !v.is_empty()) {
            self.id = id;
        }
        if let Some(dir) = lookup(ENV_ICON_DIR).filter(|v| !v.is_empty()) {
            self.icon_dir = Some(PathBuf::from(dir));
        }
        self
    }
}
