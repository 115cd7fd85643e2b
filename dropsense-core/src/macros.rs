//! Optional diagnostic logging
//!
//! Forwards to the `log` crate when the `log` feature is enabled and compiles
//! to nothing otherwise. Arguments are still type-checked in both cases.

#[cfg(feature = "log")]
macro_rules! log_info {
    ($($arg:tt)*) => { log::info!($($arg)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! log_info {
    ($($arg:tt)*) => {{
        if false {
            let _ = core::format_args!($($arg)*);
        }
    }};
}

#[cfg(feature = "log")]
macro_rules! log_warn {
    ($($arg:tt)*) => { log::warn!($($arg)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! log_warn {
    ($($arg:tt)*) => {{
        if false {
            let _ = core::format_args!($($arg)*);
        }
    }};
}

#[cfg(feature = "log")]
macro_rules! log_debug {
    ($($arg:tt)*) => { log::debug!($($arg)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! log_debug {
    ($($arg:tt)*) => {{
        if false {
            let _ = core::format_args!($($arg)*);
        }
    }};
}

/// Record a formatted message on a [`TelemetrySink`](crate::traits::TelemetrySink)
macro_rules! record {
    ($sink:expr, $($arg:tt)*) => {
        $crate::traits::TelemetrySink::record(&mut $sink, core::format_args!($($arg)*))
    };
}
