//! Process-wide failure surfaces.
//!
//! Nothing that escapes a background task is allowed to take the process down:
//! panics are routed into the log, and supervised tasks log their errors instead
//! of silently dropping them.

use std::future::Future;

use tokio::task::JoinHandle;
use tracing::{Instrument, error};

use super::{error_detail::ErrorDetail, types::Void};

/// Routes every panic (on any thread or task) into the `tracing` error log.
///
/// Tokio already keeps the process alive when a task panics; this makes sure the
/// failure is visible in the same place as everything else.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let detail = ErrorDetail::from_panic(info.payload());
        let location = info.location().map(|l| format!("{}:{}", l.file(), l.line())).unwrap_or_else(|| "unknown".to_string());

        error!(location = %location, "Unhandled panic: {}", detail);
    }));
}

/// Spawns a task whose error result is logged rather than lost.
pub fn spawn_supervised<F>(label: &'static str, future: F) -> JoinHandle<()>
where
    F: Future<Output = Void> + Send + 'static,
{
    tokio::spawn(
        async move {
            if let Err(err) = future.await {
                error!(task = label, "Unhandled failure: {}", ErrorDetail::from_error(&err));
            }
        }
        .in_current_span(),
    )
}
