//! On-demand stack logging triggered by a signal.
//!
//! The hook only raises a flag from the signal handler. The owner polls it at
//! safe points and logs its own stack there, then the registration is removed
//! when the hook is dropped.

use std::backtrace::Backtrace;
use std::fmt::Display;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use signal_hook::SigId;
use tracing::{info, warn};

pub use signal_hook::consts::SIGUSR2;

/// Settings for [`DebugHook::install`].
#[derive(Debug, Clone)]
pub struct DebugHookConfig {
    pub signal: i32,
    pub log_stack: bool,
    /// Requests an interactive debugger session. Not available for native
    /// code; a set password is only reported as unsupported.
    pub debugger_password: Option<String>,
}

impl Default for DebugHookConfig {
    fn default() -> Self {
        Self {
            signal: SIGUSR2,
            log_stack: true,
            debugger_password: None,
        }
    }
}

/// A registered signal handler plus its pending flag.
pub struct DebugHook {
    config: DebugHookConfig,
    pending: Arc<AtomicBool>,
    id: SigId,
}

impl DebugHook {
    pub fn install(config: DebugHookConfig) -> io::Result<Self> {
        let pending = Arc::new(AtomicBool::new(false));
        let id = signal_hook::flag::register(config.signal, Arc::clone(&pending))?;

        Ok(Self {
            config,
            pending,
            id,
        })
    }

    pub fn signal(&self) -> i32 {
        self.config.signal
    }

    /// Logs the caller's stack if the signal arrived since the last poll.
    ///
    /// Returns whether it had.
    pub fn poll(&self, context: impl Display) -> bool {
        if !self.pending.swap(false, Ordering::SeqCst) {
            return false;
        }

        if self.config.log_stack {
            info!(
                "Got signal {} ({}). Traceback:\n{}",
                self.config.signal,
                context,
                Backtrace::force_capture()
            );
        }

        if self.config.debugger_password.is_some() {
            warn!("An interactive debugger cannot be attached to this process; ignoring password");
        }

        true
    }
}

impl Drop for DebugHook {
    fn drop(&mut self) {
        signal_hook::low_level::unregister(self.id);
    }
}
