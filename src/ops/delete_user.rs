use crate::core::error::AdminError;
use crate::device::session::DeviceSession;
use crate::models::response::SuccessResponse;
use crate::ops::Command;
use crate::reconcile::merge::find_record;
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone)]
pub struct DeleteUser {
    pub uid: u16,
}

#[derive(Debug, Serialize)]
pub struct DeleteUserBody {
    pub uid: u16,
}

#[async_trait]
impl Command for DeleteUser {
    type Body = DeleteUserBody;

    fn name(&self) -> &'static str {
        "delete-user"
    }

    async fn execute(
        &self,
        session: &mut dyn DeviceSession,
    ) -> Result<SuccessResponse<DeleteUserBody>, AdminError> {
        // The device silently ignores unknown uids, so check first
        let users = session
            .list_users()
            .await
            .map_err(|e| AdminError::rejected("read user table", e))?;
        let existing = find_record(&users, self.uid)?;
        info!(uid = self.uid, name = %existing.display_name(), "Deleting user");

        session
            .delete_user(self.uid)
            .await
            .map_err(|e| AdminError::rejected("delete user", e))?;

        Ok(SuccessResponse::new(
            format!("User with UID {} deleted successfully", self.uid),
            DeleteUserBody { uid: self.uid },
        ))
    }
}
