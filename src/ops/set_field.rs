use crate::core::error::AdminError;
use crate::device::session::DeviceSession;
use crate::models::response::SuccessResponse;
use crate::ops::Command;
use crate::reconcile::merge::{update_user, FieldUpdate};
use async_trait::async_trait;
use serde::Serialize;

/// set-password, set-card and set-privilege: one field, read-merge-write
#[derive(Debug, Clone)]
pub struct SetField {
    pub uid: u16,
    pub field: FieldUpdate,
}

#[derive(Debug, Serialize)]
pub struct SetFieldBody {
    pub uid: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privilege: Option<u8>,
}

#[async_trait]
impl Command for SetField {
    type Body = SetFieldBody;

    fn name(&self) -> &'static str {
        match self.field {
            FieldUpdate::Password(_) => "set-password",
            FieldUpdate::Card(_) => "set-card",
            FieldUpdate::Privilege(_) => "set-privilege",
        }
    }

    async fn execute(
        &self,
        session: &mut dyn DeviceSession,
    ) -> Result<SuccessResponse<SetFieldBody>, AdminError> {
        let written = update_user(session, self.uid, &self.field.changes()).await?;
        let uid = written.uid;

        let (message, body) = match &self.field {
            FieldUpdate::Password(_) => (
                format!("Password set for user UID {}", uid),
                SetFieldBody {
                    uid,
                    card_number: None,
                    privilege: None,
                },
            ),
            FieldUpdate::Card(card) => (
                if written.has_card() {
                    format!("Card number {} set for user UID {}", card, uid)
                } else {
                    format!("Card removed from user UID {}", uid)
                },
                SetFieldBody {
                    uid,
                    card_number: Some(*card),
                    privilege: None,
                },
            ),
            FieldUpdate::Privilege(privilege) => (
                format!("Privilege {} set for user UID {}", privilege, uid),
                SetFieldBody {
                    uid,
                    card_number: None,
                    privilege: Some(privilege.as_u8()),
                },
            ),
        };

        Ok(SuccessResponse::new(message, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::fake::FakeDevice;
    use crate::models::user::{Privilege, UserRecord};

    fn user() -> UserRecord {
        UserRecord {
            uid: 3,
            name: "Lin".to_string(),
            user_id: "3003".to_string(),
            privilege: Privilege::USER,
            password: "1111".to_string(),
            group_id: String::new(),
            card: 10,
        }
    }

    #[tokio::test]
    async fn test_set_password_never_echoes_it() {
        let device = FakeDevice::with_users(vec![user()]);
        let mut session = device.session();

        let command = SetField {
            uid: 3,
            field: FieldUpdate::Password("2468".to_string()),
        };
        let response = command.execute(&mut session).await.unwrap();
        let line = serde_json::to_string(&response).unwrap();

        assert_eq!(
            line,
            r#"{"success":true,"message":"Password set for user UID 3","uid":3}"#
        );
        assert_eq!(device.state().users[0].password, "2468");
        assert_eq!(device.state().users[0].card, 10);
    }

    #[tokio::test]
    async fn test_set_card() {
        let device = FakeDevice::with_users(vec![user()]);
        let mut session = device.session();

        let command = SetField {
            uid: 3,
            field: FieldUpdate::Card(8_675_309),
        };
        assert_eq!(command.name(), "set-card");
        let response = command.execute(&mut session).await.unwrap();

        assert_eq!(response.message, "Card number 8675309 set for user UID 3");
        assert_eq!(response.body.card_number, Some(8_675_309));

        let state = device.state();
        let stored = &state.users[0];
        assert_eq!(stored.card, 8_675_309);
        assert_eq!(stored.password, "1111");
    }

    #[tokio::test]
    async fn test_card_zero_removes_card() {
        let device = FakeDevice::with_users(vec![user()]);
        let mut session = device.session();

        let command = SetField {
            uid: 3,
            field: FieldUpdate::Card(0),
        };
        let response = command.execute(&mut session).await.unwrap();

        assert_eq!(response.message, "Card removed from user UID 3");
        assert_eq!(response.body.card_number, Some(0));
        assert!(!device.state().users[0].has_card());
    }

    #[tokio::test]
    async fn test_set_privilege() {
        let device = FakeDevice::with_users(vec![user()]);
        let mut session = device.session();

        let command = SetField {
            uid: 3,
            field: FieldUpdate::Privilege(Privilege::ADMIN),
        };
        let response = command.execute(&mut session).await.unwrap();

        assert_eq!(response.message, "Privilege 14 (admin) set for user UID 3");
        assert_eq!(response.body.privilege, Some(14));
        assert_eq!(device.state().users[0].privilege, Privilege::ADMIN);
    }

    #[tokio::test]
    async fn test_set_card_on_absent_uid() {
        let device = FakeDevice::with_users(vec![user()]);
        let mut session = device.session();

        let command = SetField {
            uid: 44,
            field: FieldUpdate::Card(1),
        };
        let err = command.execute(&mut session).await.unwrap_err();

        assert!(matches!(err, AdminError::RecordNotFound(44)));
        assert!(err.to_string().contains("44"));
    }
}
