//! Error types.

use std::io;

/// Errors produced by the tray event loop and its native backends.
#[derive(Debug, thiserror::Error)]
pub enum TrayError {
    /// Native resource creation failed before the loop started.
    #[error("failed to {operation}: {source}")]
    Init {
        operation: &'static str,
        #[source]
        source: io::Error,
    },

    /// A native call failed while the loop was running.
    #[error("failed to {operation}: {source}")]
    Native {
        operation: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("a tray session is already running in this process")]
    AlreadyRunning,

    #[error("no tray backend is available on this platform")]
    Unsupported,

    #[error("tray service is no longer running")]
    ServiceGone,

    #[error("failed to spawn tray service: {0}")]
    Spawn(String),
}

impl TrayError {
    /// Captures the calling thread's last OS error for a failed initialization step.
    pub fn init(operation: &'static str) -> Self {
        Self::Init {
            operation,
            source: io::Error::last_os_error(),
        }
    }

    /// Captures the calling thread's last OS error for a failed steady-state call.
    pub fn native(operation: &'static str) -> Self {
        Self::Native {
            operation,
            source: io::Error::last_os_error(),
        }
    }
}
