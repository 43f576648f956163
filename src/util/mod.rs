//! Utility modules for memtools.

mod logging;

pub use logging::init_logging;

use std::any::Any;

/// Environment variable overriding the directory of `show-mem` scratch files.
pub const STATE_DIR_ENV: &str = "MEMTOOLS_STATE_DIR";

/// Text carried by a caught panic payload.
pub fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panicked".to_string()
    }
}
