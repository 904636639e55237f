//! ---
//! pulse_section: "03-persistence-logging"
//! pulse_subsection: "module"
//! pulse_type: "source"
//! pulse_scope: "code"
//! pulse_description: "Structured logging macros carrying permission context."
//! pulse_version: "v0.0.0-prealpha"
//! pulse_owner: "tbd"
//! ---
/// Emit an event carrying the fields of a [`LogContext`](crate::LogContext).
///
/// `$level` is a `tracing::Level` constant name; the bracketed list adds
/// extra `key = value` fields ahead of the message.
#[doc(hidden)]
#[macro_export]
macro_rules! __pulse_event {
    ($level:ident, $ctx:expr, [$($key:ident = $value:expr),* $(,)?], $($arg:tt)+) => {{
        let ctx: &$crate::LogContext<'_> = &$ctx;
        $crate::__tracing::event!(
            $crate::__tracing::Level::$level,
            user = ctx.user.unwrap_or(""),
            role = ctx.role.unwrap_or(""),
            permission = ctx.permission.unwrap_or(""),
            actor = ctx.actor.unwrap_or(""),
            $($key = $value,)*
            message = %format_args!($($arg)+)
        );
    }};
}

/// Informational event with permission context.
#[macro_export]
macro_rules! pulse_info {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__pulse_event!(INFO, $ctx, [], $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__pulse_event!(INFO, $crate::LogContext::default(), [], $($arg)+)
    };
}

/// Debug event with permission context.
#[macro_export]
macro_rules! pulse_debug {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__pulse_event!(DEBUG, $ctx, [], $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__pulse_event!(DEBUG, $crate::LogContext::default(), [], $($arg)+)
    };
}

/// Warning with permission context, e.g. a user evaluated without a profile.
#[macro_export]
macro_rules! pulse_warn {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__pulse_event!(WARN, $ctx, [], $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__pulse_event!(WARN, $crate::LogContext::default(), [], $($arg)+)
    };
}

/// Error with permission context.
#[macro_export]
macro_rules! pulse_error {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__pulse_event!(ERROR, $ctx, [], $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__pulse_event!(ERROR, $crate::LogContext::default(), [], $($arg)+)
    };
}
