// Thin forwarding macros so call sites compile with or without the `tracing` feature.

macro_rules! trace_event {
    ($level:ident, $($arg:tt)*) => {{
        #[cfg(feature = "tracing")]
        {
            tracing::$level!($($arg)*);
        }
    }};
}

macro_rules! log_debug {
    ($($arg:tt)*) => { trace_event!(debug, $($arg)*) };
}

macro_rules! log_info {
    ($($arg:tt)*) => { trace_event!(info, $($arg)*) };
}

macro_rules! log_warn {
    ($($arg:tt)*) => { trace_event!(warn, $($arg)*) };
}
