//! One administrative operation per subcommand.
//!
//! Each operation receives an already-open session; connecting and
//! closing belong to [`crate::core::runner`].

pub mod create_user;
pub mod delete_user;
pub mod enroll;
pub mod get_users;
pub mod last_uid;
pub mod set_field;
pub mod test_connection;

use crate::core::error::AdminError;
use crate::device::session::DeviceSession;
use crate::models::response::SuccessResponse;
use async_trait::async_trait;
use serde::Serialize;

#[async_trait]
pub trait Command: Send + Sync {
    /// Operation-specific fields of the success line
    type Body: Serialize + Send;

    /// Short name used in logs
    fn name(&self) -> &'static str;

    async fn execute(
        &self,
        session: &mut dyn DeviceSession,
    ) -> Result<SuccessResponse<Self::Body>, AdminError>;
}
