use crate::core::error::AdminError;
use crate::device::session::DeviceSession;
use crate::models::response::SuccessResponse;
use crate::ops::Command;
use crate::reconcile::allocator::OccupiedUids;
use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone, Default)]
pub struct LastUid;

#[derive(Debug, Serialize)]
pub struct UidEntry {
    pub uid: u16,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct LastUidBody {
    /// 0 when the table is empty
    pub last_uid: u16,
    /// Widened so a full table reports 65535 rather than wrapping
    pub next_uid: u32,
    pub user_count: usize,
    pub users: Vec<UidEntry>,
}

#[async_trait]
impl Command for LastUid {
    type Body = LastUidBody;

    fn name(&self) -> &'static str {
        "last-uid"
    }

    async fn execute(
        &self,
        session: &mut dyn DeviceSession,
    ) -> Result<SuccessResponse<LastUidBody>, AdminError> {
        let users = session
            .list_users()
            .await
            .map_err(|e| AdminError::rejected("read user table", e))?;

        let last_uid = OccupiedUids::from_records(&users).max().unwrap_or(0);
        let body = LastUidBody {
            last_uid,
            next_uid: u32::from(last_uid) + 1,
            user_count: users.len(),
            users: users
                .into_iter()
                .map(|user| UidEntry {
                    uid: user.uid,
                    name: user.display_name(),
                })
                .collect(),
        };

        let message = if body.user_count == 0 {
            "No users found in device".to_string()
        } else {
            format!("Found {} users, highest UID: {}", body.user_count, last_uid)
        };

        Ok(SuccessResponse::new(message, body))
    }
}
