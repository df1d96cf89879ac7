use crate::core::error::AdminError;
use crate::device::session::DeviceSession;
use crate::models::user::{truncate_name, Privilege, UserRecord};
use tracing::{debug, info};

/// Fields to overwrite on an existing record. `None` keeps the stored value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub name: Option<String>,
    pub privilege: Option<Privilege>,
    pub password: Option<String>,
    pub user_id: Option<String>,
    pub card: Option<u32>,
    pub group_id: Option<String>,
}

impl UserChanges {
    pub fn password(password: impl Into<String>) -> Self {
        Self {
            password: Some(password.into()),
            ..Self::default()
        }
    }

    pub fn card(card: u32) -> Self {
        Self {
            card: Some(card),
            ..Self::default()
        }
    }

    pub fn privilege(privilege: Privilege) -> Self {
        Self {
            privilege: Some(privilege),
            ..Self::default()
        }
    }

    /// Names of the fields this change touches, for logging
    pub fn fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.name.is_some() {
            fields.push("name");
        }
        if self.privilege.is_some() {
            fields.push("privilege");
        }
        if self.password.is_some() {
            fields.push("password");
        }
        if self.user_id.is_some() {
            fields.push("user_id");
        }
        if self.card.is_some() {
            fields.push("card");
        }
        if self.group_id.is_some() {
            fields.push("group_id");
        }
        fields
    }
}

/// A single-field change issued by one of the set-* operations
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldUpdate {
    Password(String),
    Card(u32),
    Privilege(Privilege),
}

impl FieldUpdate {
    pub fn changes(&self) -> UserChanges {
        match self {
            FieldUpdate::Password(password) => UserChanges::password(password.clone()),
            FieldUpdate::Card(card) => UserChanges::card(*card),
            FieldUpdate::Privilege(privilege) => UserChanges::privilege(*privilege),
        }
    }
}

/// Linear scan by uid; the table carries no ordering guarantee
pub fn find_record(users: &[UserRecord], uid: u16) -> Result<&UserRecord, AdminError> {
    users
        .iter()
        .find(|user| user.uid == uid)
        .ok_or(AdminError::RecordNotFound(uid))
}

/// Copy of `existing` with the present fields of `changes` applied
pub fn merge(existing: &UserRecord, changes: &UserChanges) -> UserRecord {
    let mut merged = existing.clone();

    if let Some(name) = &changes.name {
        merged.name = truncate_name(name);
    }
    if let Some(privilege) = changes.privilege {
        merged.privilege = privilege;
    }
    if let Some(password) = &changes.password {
        merged.password = password.clone();
    }
    if let Some(user_id) = &changes.user_id {
        merged.user_id = user_id.clone();
    }
    if let Some(card) = changes.card {
        merged.card = card;
    }
    if let Some(group_id) = &changes.group_id {
        merged.group_id = group_id.clone();
    }

    merged
}

/// Fetch the table, merge `changes` into the record at `uid` and write the
/// whole record back. Returns the record as written.
pub async fn update_user(
    session: &mut dyn DeviceSession,
    uid: u16,
    changes: &UserChanges,
) -> Result<UserRecord, AdminError> {
    let users = session
        .list_users()
        .await
        .map_err(|e| AdminError::rejected("read user table", e))?;
    debug!(count = users.len(), "Fetched user table");

    let existing = find_record(&users, uid)?;
    let merged = merge(existing, changes);

    session
        .write_user(&merged)
        .await
        .map_err(|e| AdminError::rejected("write user", e))?;

    info!(uid, fields = ?changes.fields(), "Updated user");
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::fake::FakeDevice;

    fn existing() -> UserRecord {
        UserRecord {
            uid: 7,
            name: "Grace Hopper".to_string(),
            user_id: "E-1906".to_string(),
            privilege: Privilege::ADMIN,
            password: "1234".to_string(),
            group_id: "3".to_string(),
            card: 555_123,
        }
    }

    #[test]
    fn test_password_change_touches_only_password() {
        let before = existing();
        let after = merge(&before, &UserChanges::password("9999"));

        assert_eq!(after.password, "9999");
        assert_eq!(
            UserRecord {
                password: before.password.clone(),
                ..after
            },
            before
        );
    }

    #[test]
    fn test_card_change_keeps_credentials() {
        let after = merge(&existing(), &UserChanges::card(42));

        assert_eq!(after.card, 42);
        assert_eq!(after.password, "1234");
        assert_eq!(after.privilege, Privilege::ADMIN);
        assert_eq!(after.user_id, "E-1906");
        assert_eq!(after.group_id, "3");
    }

    #[test]
    fn test_empty_changes_are_identity() {
        assert_eq!(merge(&existing(), &UserChanges::default()), existing());
        assert!(UserChanges::default().fields().is_empty());
    }

    #[test]
    fn test_name_change_is_truncated() {
        let changes = UserChanges {
            name: Some("N".repeat(30)),
            ..UserChanges::default()
        };
        assert_eq!(merge(&existing(), &changes).name, "N".repeat(24));
    }

    #[test]
    fn test_find_record_unsorted_table() {
        let mut a = existing();
        a.uid = 9;
        let mut b = existing();
        b.uid = 2;
        let table = vec![a, existing(), b];

        assert_eq!(find_record(&table, 7).unwrap().uid, 7);
        assert!(matches!(
            find_record(&table, 8),
            Err(AdminError::RecordNotFound(8))
        ));
    }

    #[tokio::test]
    async fn test_update_user_writes_merged_record() {
        let device = FakeDevice::with_users(vec![existing()]);
        let mut session = device.session();

        let written = update_user(&mut session, 7, &UserChanges::privilege(Privilege::USER))
            .await
            .unwrap();

        assert_eq!(written.privilege, Privilege::USER);
        let state = device.state();
        assert_eq!(state.writes, vec![written.clone()]);
        assert_eq!(state.users, vec![written]);
    }

    #[tokio::test]
    async fn test_update_missing_uid_skips_write() {
        let device = FakeDevice::with_users(vec![existing()]);
        let mut session = device.session();

        let result = update_user(&mut session, 8, &UserChanges::card(1)).await;

        assert!(matches!(result, Err(AdminError::RecordNotFound(8))));
        assert!(device.state().writes.is_empty());
    }

    #[tokio::test]
    async fn test_update_rejected_by_device() {
        let device = FakeDevice::with_users(vec![existing()]);
        device.state().reject_writes = true;
        let mut session = device.session();

        let err = update_user(&mut session, 7, &UserChanges::card(1)).await.unwrap_err();
        assert_eq!(err.kind(), "DeviceRejected");
    }
}
