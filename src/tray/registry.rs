//! Native handle registry.
//!
//! A process has at most one live tray session. Native backends claim a
//! [`SessionSlot`] while creating their handles and hold it until they are dropped.

use crate::config::TrayConfig;
use crate::error::TrayError;
use crate::platform::Backend;
use crate::tray::dispatcher::InputSender;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info};

static SESSION_ACTIVE: AtomicBool = AtomicBool::new(false);

/// One-shot guard for the process-wide tray session.
#[derive(Debug)]
pub struct SessionSlot {
    _claimed: (),
}

impl SessionSlot {
    /// Claims the slot, failing if another session currently holds it.
    pub fn claim() -> Result<Self, TrayError> {
        SESSION_ACTIVE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self { _claimed: () })
            .map_err(|_| TrayError::AlreadyRunning)
    }
}

impl Drop for SessionSlot {
    fn drop(&mut self) {
        SESSION_ACTIVE.store(false, Ordering::Release);
    }
}

/// Creates the tray and menu handles on the calling thread.
pub fn initialize<B: Backend>(config: &TrayConfig, inputs: InputSender) -> Result<B, TrayError> {
    match B::initialize(config, inputs) {
        Ok(backend) => {
            info!(id = %config.id, "tray handles created");
            Ok(backend)
        }
        Err(e) => {
            error!(id = %config.id, error = %e, "tray initialization failed");
            Err(e)
        }
    }
}
