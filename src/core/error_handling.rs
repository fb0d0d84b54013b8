//! Error reporting at the application boundary
//!
//! Module errors implement [`ContextualError`] so the CLI can decide whether to
//! show the error text itself (the user can act on it) or a generic line with
//! the detail pushed to debug output.

/// Errors that know whether the user can fix them
///
/// When `is_user_actionable()` is true, `user_message()` must return `Some`.
pub trait ContextualError: std::error::Error {
    /// True for configuration and validation problems the user can correct
    fn is_user_actionable(&self) -> bool;

    /// The message to show the user for actionable errors
    fn user_message(&self) -> Option<String>;
}

/// Log a fatal error, choosing the level of detail from its kind
pub fn log_error_with_context<E: ContextualError + std::fmt::Debug>(
    error: &E,
    operation_context: &str,
) {
    match error.user_message().filter(|_| error.is_user_actionable()) {
        Some(message) => log::error!("FATAL: {}", message),
        None => log::error!("FATAL: {}: {}", operation_context, error),
    }
    log::debug!("DEBUG_DETAILS: {:?}", error);
}
