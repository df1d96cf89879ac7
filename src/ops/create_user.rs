use crate::core::error::AdminError;
use crate::device::session::DeviceSession;
use crate::models::response::SuccessResponse;
use crate::ops::Command;
use crate::reconcile::create::create_user;
use crate::validation::params::ValidatedCreateUser;
use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct CreateUser {
    pub request: ValidatedCreateUser,
}

#[derive(Debug, Serialize)]
pub struct CreatedUser {
    pub uid: u16,
    pub name: String,
    pub user_id: String,
    pub privilege: u8,
    pub original_uid: u16,
    pub uid_changed: bool,
    pub policy: &'static str,
    pub verified: bool,
}

#[derive(Debug, Serialize)]
pub struct CreateUserBody {
    pub user: CreatedUser,
}

#[async_trait]
impl Command for CreateUser {
    type Body = CreateUserBody;

    fn name(&self) -> &'static str {
        "create-user"
    }

    async fn execute(
        &self,
        session: &mut dyn DeviceSession,
    ) -> Result<SuccessResponse<CreateUserBody>, AdminError> {
        let request = &self.request;
        let created = create_user(session, &request.user, request.preferred_uid, request.policy).await?;
        let record = created.record;

        Ok(SuccessResponse::new(
            format!("User {} created successfully", record.name),
            CreateUserBody {
                user: CreatedUser {
                    uid: record.uid,
                    name: record.name,
                    user_id: record.user_id,
                    privilege: record.privilege.as_u8(),
                    original_uid: created.allocation.preferred,
                    uid_changed: created.allocation.uid_changed,
                    policy: request.policy.as_str(),
                    verified: created.verified,
                },
            },
        ))
    }
}
