use crate::core::error::{AdminError, ProtocolError};
use crate::device::session::DeviceSession;
use crate::models::response::SuccessResponse;
use crate::ops::Command;
use crate::reconcile::merge::find_record;
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

/// Arms fingerprint capture; the scan itself happens at the terminal
#[derive(Debug, Clone)]
pub struct EnrollFingerprint {
    pub uid: u16,
    pub finger: u8,
}

#[derive(Debug, Serialize)]
pub struct EnrollBody {
    pub uid: u16,
    pub finger_index: u8,
}

#[async_trait]
impl Command for EnrollFingerprint {
    type Body = EnrollBody;

    fn name(&self) -> &'static str {
        "enroll-fingerprint"
    }

    async fn execute(
        &self,
        session: &mut dyn DeviceSession,
    ) -> Result<SuccessResponse<EnrollBody>, AdminError> {
        let users = session
            .list_users()
            .await
            .map_err(|e| AdminError::rejected("read user table", e))?;
        let user = find_record(&users, self.uid)?;
        info!(uid = self.uid, name = %user.display_name(), finger = self.finger, "Arming fingerprint capture");

        session
            .begin_enrollment(self.uid, self.finger)
            .await
            .map_err(|e| match e {
                // Deleted between our read and the device's own lookup
                ProtocolError::UnknownUser(uid) => AdminError::RecordNotFound(uid),
                other => AdminError::rejected("start enrollment", other),
            })?;

        Ok(SuccessResponse::new(
            format!(
                "Fingerprint enrollment initiated for user UID {}. Please place finger on device scanner.",
                self.uid
            ),
            EnrollBody {
                uid: self.uid,
                finger_index: self.finger,
            },
        ))
    }
}
