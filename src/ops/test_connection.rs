use crate::core::error::AdminError;
use crate::device::session::DeviceSession;
use crate::models::response::SuccessResponse;
use crate::ops::Command;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

const DEVICE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone)]
pub struct TestConnection {
    pub host: String,
    pub port: u16,
    pub timeout_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct ConnectionReport {
    pub ip: String,
    pub port: u16,
    pub firmware_version: Option<String>,
    pub serial_number: Option<String>,
    pub device_time: Option<String>,
    pub user_count: Option<u32>,
    pub fingerprint_count: Option<u32>,
    pub user_capacity: Option<u32>,
    pub timeout: u64,
}

#[derive(Debug, Serialize)]
pub struct TestConnectionBody {
    pub device_info: ConnectionReport,
}

#[async_trait]
impl Command for TestConnection {
    type Body = TestConnectionBody;

    fn name(&self) -> &'static str {
        "test-connection"
    }

    async fn execute(
        &self,
        session: &mut dyn DeviceSession,
    ) -> Result<SuccessResponse<TestConnectionBody>, AdminError> {
        let info = session
            .device_info()
            .await
            .map_err(|e| AdminError::rejected("read device info", e))?;

        let user_count = match info.user_count {
            Some(count) => Some(count),
            None => match session.list_users().await {
                Ok(users) => Some(users.len() as u32),
                Err(e) => {
                    warn!(error = %e, "Could not count users");
                    None
                }
            },
        };

        info!(
            host = %self.host,
            firmware = info.firmware_version.as_deref().unwrap_or("unknown"),
            user_count = ?user_count,
            "Device reachable"
        );

        Ok(SuccessResponse::new(
            "Connection test successful",
            TestConnectionBody {
                device_info: ConnectionReport {
                    ip: self.host.clone(),
                    port: self.port,
                    firmware_version: info.firmware_version,
                    serial_number: info.serial_number,
                    device_time: info
                        .device_time
                        .map(|time| time.format(DEVICE_TIME_FORMAT).to_string()),
                    user_count,
                    fingerprint_count: info.fingerprint_count,
                    user_capacity: info.user_capacity,
                    timeout: self.timeout_secs,
                },
            },
        ))
    }
}
