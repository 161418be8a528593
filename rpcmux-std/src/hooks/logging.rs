//! Logging hook for request observation.

use rpcmux_core::{After, RequestInfo};

/// An after-hook that logs one event per dispatched request.
///
/// Successful calls are logged at `INFO`, failed ones at `WARN` with the
/// recorded error.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingAfter;

impl After for LoggingAfter {
    async fn after(&self, info: &RequestInfo) {
        #[cfg(feature = "tracing")]
        {
            let status = info.status.as_u16();
            match &info.error {
                None => tracing::info!(method = %info.method, status, "rpc call served"),
                Some(error) => {
                    tracing::warn!(method = %info.method, status, %error, "rpc call failed")
                }
            }
        }
        #[cfg(not(feature = "tracing"))]
        {
            let _ = info; // Suppress unused warning
        }
    }
}
