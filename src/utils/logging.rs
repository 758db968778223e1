//! Conditional logging macros gated on a module-level `ENABLE_LOGS` const.
//!
//! High-frequency paths (event forwards, display ticks) define
//! `const ENABLE_LOGS: bool = false;` and still keep their log statements
//! in place for debugging; flipping the const turns them back on.

/// Conditional info logging. The calling module must define
/// `const ENABLE_LOGS: bool`.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// Conditional warn logging. The calling module must define
/// `const ENABLE_LOGS: bool`.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

/// Conditional error logging. The calling module must define
/// `const ENABLE_LOGS: bool`.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}
