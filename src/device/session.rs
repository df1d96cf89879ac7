use crate::core::config::DeviceConfig;
use crate::core::error::{AdminError, ProtocolError};
use crate::models::device::DeviceInfo;
use crate::models::user::UserRecord;
use async_trait::async_trait;

/// An open, authenticated connection to one terminal.
///
/// Writes always replace the whole record stored under `uid`.
#[async_trait]
pub trait DeviceSession: Send {
    /// Fresh read of the full user table
    async fn list_users(&mut self) -> Result<Vec<UserRecord>, ProtocolError>;

    async fn get_user(&mut self, uid: u16) -> Result<Option<UserRecord>, ProtocolError>;

    async fn write_user(&mut self, user: &UserRecord) -> Result<(), ProtocolError>;

    async fn delete_user(&mut self, uid: u16) -> Result<(), ProtocolError>;

    /// Arm fingerprint capture for `uid`; the scan itself happens on the device
    async fn begin_enrollment(&mut self, uid: u16, finger: u8) -> Result<(), ProtocolError>;

    async fn device_info(&mut self) -> Result<DeviceInfo, ProtocolError>;

    async fn close(&mut self) -> Result<(), ProtocolError>;
}

/// Opens sessions. One attempt, no retries.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, config: &DeviceConfig) -> Result<Box<dyn DeviceSession>, AdminError>;
}
