//! Fallback error logging.

use std::error::Error;
use tracing::error;

/// Formats an error followed by its `source()` chain, one cause per line.
pub fn error_chain(err: &(dyn Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str("\ncaused by: ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

/// Logs an error without dispatching anything.
///
/// Used for failures of the error-report listeners themselves, which must
/// never produce another error report.
pub fn default_error_handler(source: &str, err: &(dyn Error + Send + Sync + 'static)) {
    error!(source, "ignoring error: {}", error_chain(err));
}
