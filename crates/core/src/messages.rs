//! User-facing error messages

use bookmart_domain::ApiError;

/// Pick the message to show for `err`.
///
/// Preference order: the server's `error` field, the error's own message,
/// then `fallback`.
pub fn error_message(err: &ApiError, fallback: &str) -> String {
    if let Some(message) = err.server_message() {
        return message.to_string();
    }
    let own = err.to_string();
    if own.trim().is_empty() {
        fallback.to_string()
    } else {
        own
    }
}
