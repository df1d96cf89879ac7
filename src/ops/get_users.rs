use crate::core::error::AdminError;
use crate::device::session::DeviceSession;
use crate::models::response::SuccessResponse;
use crate::models::user::UserRecord;
use crate::ops::Command;
use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone, Default)]
pub struct GetUsers;

#[derive(Debug, Serialize)]
pub struct GetUsersBody {
    pub users: Vec<UserRecord>,
    pub count: usize,
}

#[async_trait]
impl Command for GetUsers {
    type Body = GetUsersBody;

    fn name(&self) -> &'static str {
        "get-users"
    }

    async fn execute(
        &self,
        session: &mut dyn DeviceSession,
    ) -> Result<SuccessResponse<GetUsersBody>, AdminError> {
        let users = session
            .list_users()
            .await
            .map_err(|e| AdminError::rejected("read user table", e))?;
        let users: Vec<UserRecord> = users.into_iter().map(UserRecord::for_display).collect();
        let count = users.len();

        Ok(SuccessResponse::new(
            format!("Retrieved {} users", count),
            GetUsersBody { users, count },
        ))
    }
}
