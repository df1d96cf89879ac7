use crate::core::config::DeviceConfig;
use crate::core::error::AdminError;
use crate::device::session::Connector;
use crate::models::response::{ErrorResponse, SuccessResponse};
use crate::ops::Command;
use serde::Serialize;
use tracing::{debug, error, info, warn};

/// Connect, run one command, close.
///
/// The session is closed on every path once it is open. A failed close is
/// logged and never replaces the command's own outcome.
pub async fn run_command<C: Command>(
    connector: &dyn Connector,
    config: &DeviceConfig,
    command: &C,
) -> Result<SuccessResponse<C::Body>, AdminError> {
    info!(
        operation = command.name(),
        host = %config.host,
        port = config.port,
        timeout_secs = config.timeout.as_secs(),
        "Connecting to device"
    );

    let mut session = connector.connect(config).await?;
    debug!(operation = command.name(), "Connected");

    let outcome = command.execute(session.as_mut()).await;

    match session.close().await {
        Ok(()) => debug!("Session closed"),
        Err(e) => warn!(error = %e, "Failed to close session cleanly"),
    }

    outcome
}

/// The single result line of an invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub line: String,
    pub success: bool,
}

/// Render an outcome as one JSON line. Failures echo `context`.
pub fn report<B, C>(outcome: Result<SuccessResponse<B>, AdminError>, context: C) -> Report
where
    B: Serialize,
    C: Serialize,
{
    let (rendered, mut success) = match outcome {
        Ok(response) => (serde_json::to_string(&response), true),
        Err(err) => {
            error!(error = %err, error_type = err.kind(), "Operation failed");
            let response = ErrorResponse::new(err.to_string(), err.kind(), context);
            (serde_json::to_string(&response), false)
        }
    };

    let line = match rendered {
        Ok(line) => line,
        Err(e) => {
            error!(error = %e, "Failed to serialize result");
            success = false;
            serde_json::json!({
                "success": false,
                "error": format!("Failed to serialize result: {}", e),
            })
            .to_string()
        }
    };

    Report { line, success }
}
