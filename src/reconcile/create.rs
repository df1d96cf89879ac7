use crate::core::error::AdminError;
use crate::device::session::DeviceSession;
use crate::models::user::{truncate_name, Privilege, UserRecord};
use crate::reconcile::allocator::{allocate, Allocation, AllocationPolicy, OccupiedUids};
use tracing::{info, warn};

/// Caller-supplied fields of a record to create
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub privilege: Option<Privilege>,
    pub password: Option<String>,
    pub user_id: Option<String>,
    pub card: Option<u32>,
    pub group_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Created {
    pub record: UserRecord,
    pub allocation: Allocation,
    /// Read-back of the stored record matched what was written
    pub verified: bool,
}

/// Build the full record to store under `uid`, filling defaults
pub fn compose(new: &NewUser, uid: u16) -> UserRecord {
    let user_id = match &new.user_id {
        Some(user_id) => user_id.clone(),
        None => itoa::Buffer::new().format(uid).to_string(),
    };

    UserRecord {
        uid,
        name: truncate_name(&new.name),
        user_id,
        privilege: new.privilege.unwrap_or_default(),
        password: new.password.clone().unwrap_or_default(),
        group_id: new.group_id.clone().unwrap_or_default(),
        card: new.card.unwrap_or(0),
    }
}

async fn occupied_uids(session: &mut dyn DeviceSession) -> Result<OccupiedUids, AdminError> {
    let users = session
        .list_users()
        .await
        .map_err(|e| AdminError::rejected("read user table", e))?;
    Ok(OccupiedUids::from_records(&users))
}

/// Allocate a uid, write the new record and read it back.
///
/// The device has no compare-and-swap and a write to an occupied uid
/// silently replaces the holder. The chosen uid is therefore checked again
/// right before the write; if another client claimed it meanwhile,
/// allocation runs once more against a fresh table.
pub async fn create_user(
    session: &mut dyn DeviceSession,
    new: &NewUser,
    preferred: u16,
    policy: AllocationPolicy,
) -> Result<Created, AdminError> {
    let occupied = occupied_uids(session).await?;
    let mut allocation = allocate(policy, preferred, &occupied)?;
    if allocation.uid_changed {
        warn!(
            preferred,
            uid = allocation.uid,
            policy = policy.as_str(),
            "Preferred uid is taken, using another"
        );
    }

    let holder = session
        .get_user(allocation.uid)
        .await
        .map_err(|e| AdminError::rejected("read user", e))?;
    if let Some(holder) = holder {
        warn!(
            uid = allocation.uid,
            holder = %holder.display_name(),
            "Uid was claimed concurrently, allocating again"
        );
        let fresh = occupied_uids(session).await?;
        allocation = allocate(policy, preferred, &fresh)?;
    }

    let record = compose(new, allocation.uid);
    session
        .write_user(&record)
        .await
        .map_err(|e| AdminError::rejected("write user", e))?;

    let verified = match session.get_user(record.uid).await {
        Ok(Some(stored)) => stored == record,
        Ok(None) => false,
        Err(e) => {
            warn!(uid = record.uid, error = %e, "Could not read back new user");
            false
        }
    };

    info!(uid = record.uid, name = %record.name, verified, "Created user");

    Ok(Created {
        record,
        allocation,
        verified,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::fake::FakeDevice;

    fn stored(uid: u16) -> UserRecord {
        UserRecord {
            uid,
            name: format!("User {}", uid),
            user_id: uid.to_string(),
            privilege: Privilege::USER,
            password: String::new(),
            group_id: String::new(),
            card: 0,
        }
    }

    fn new_user(name: &str) -> NewUser {
        NewUser {
            name: name.to_string(),
            ..NewUser::default()
        }
    }

    #[test]
    fn test_compose_defaults() {
        let record = compose(&new_user("Ada"), 12);

        assert_eq!(record.uid, 12);
        assert_eq!(record.name, "Ada");
        assert_eq!(record.user_id, "12");
        assert_eq!(record.privilege, Privilege::USER);
        assert_eq!(record.password, "");
        assert_eq!(record.group_id, "");
        assert_eq!(record.card, 0);
    }

    #[test]
    fn test_compose_keeps_explicit_fields() {
        let new = NewUser {
            name: "Ada".to_string(),
            privilege: Some(Privilege::ADMIN),
            password: Some("4321".to_string()),
            user_id: Some("EMP-12".to_string()),
            card: Some(900),
            group_id: None,
        };
        let record = compose(&new, 12);

        assert_eq!(record.user_id, "EMP-12");
        assert_eq!(record.privilege, Privilege::ADMIN);
        assert_eq!(record.password, "4321");
        assert_eq!(record.card, 900);
    }

    #[tokio::test]
    async fn test_create_with_long_name() {
        let device = FakeDevice::default();
        let mut session = device.session();
        let name = "ABCDEFGHIJKLMNOPQRSTUVWXYZ1234";

        let created = create_user(&mut session, &new_user(name), 1, AllocationPolicy::FirstAvailable)
            .await
            .unwrap();

        assert_eq!(created.record.name, &name[..24]);
        assert!(created.verified);
        assert_eq!(device.state().users[0].name, "ABCDEFGHIJKLMNOPQRSTUVWX");
    }

    #[tokio::test]
    async fn test_create_moves_off_taken_uid() {
        let device = FakeDevice::with_users(vec![stored(1), stored(2), stored(3), stored(5)]);
        let mut session = device.session();

        let created = create_user(&mut session, &new_user("Dana"), 3, AllocationPolicy::FirstAvailable)
            .await
            .unwrap();

        assert_eq!(created.record.uid, 4);
        assert_eq!(created.record.user_id, "4");
        assert!(created.allocation.uid_changed);
        // The occupant of the preferred uid is untouched
        assert_eq!(device.state().users[2], stored(3));
    }

    #[tokio::test]
    async fn test_create_sequential() {
        let device = FakeDevice::with_users(vec![stored(1), stored(2), stored(3)]);
        let mut session = device.session();

        let created = create_user(&mut session, &new_user("Eli"), 2, AllocationPolicy::SequentialAppend)
            .await
            .unwrap();

        assert_eq!(created.record.uid, 4);
    }

    #[tokio::test]
    async fn test_create_avoids_uid_claimed_after_table_read() {
        let device = FakeDevice::with_users(vec![stored(1)]);
        device.state().intruder = Some(stored(2));
        let mut session = device.session();

        let created = create_user(&mut session, &new_user("Fay"), 2, AllocationPolicy::FirstAvailable)
            .await
            .unwrap();

        assert_eq!(created.record.uid, 3);
        assert!(created.allocation.uid_changed);
        assert!(created.verified);

        let state = device.state();
        // The claimed uid is never written, so its holder survives
        assert_eq!(state.writes.len(), 1);
        assert_eq!(state.writes[0].uid, 3);
        assert!(state.users.contains(&stored(2)));
    }

    #[tokio::test]
    async fn test_create_ignores_concurrent_claim_elsewhere() {
        let device = FakeDevice::with_users(vec![stored(1)]);
        device.state().intruder = Some(stored(7));
        let mut session = device.session();

        let created = create_user(&mut session, &new_user("Gil"), 2, AllocationPolicy::FirstAvailable)
            .await
            .unwrap();

        assert_eq!(created.record.uid, 2);
        assert!(!created.allocation.uid_changed);

        let state = device.state();
        assert!(state.users.contains(&stored(7)));
        assert_eq!(state.users.len(), 3);
    }

    #[tokio::test]
    async fn test_create_plain_rejection_is_not_retried() {
        let device = FakeDevice::default();
        device.state().reject_writes = true;
        let mut session = device.session();

        let err = create_user(&mut session, &new_user("Gus"), 1, AllocationPolicy::FirstAvailable)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "DeviceRejected");
        assert_eq!(device.state().writes.len(), 1);
    }

    #[tokio::test]
    async fn test_create_lost_write_is_unverified() {
        let device = FakeDevice::default();
        device.state().lose_writes = true;
        let mut session = device.session();

        let created = create_user(&mut session, &new_user("Hal"), 1, AllocationPolicy::FirstAvailable)
            .await
            .unwrap();

        assert!(!created.verified);
    }

    #[tokio::test]
    async fn test_create_exhausted_writes_nothing() {
        let device = FakeDevice::with_users((1..=65534).map(stored).collect());
        let mut session = device.session();

        let err = create_user(&mut session, &new_user("Ivy"), 1, AllocationPolicy::SequentialAppend)
            .await
            .unwrap_err();

        assert!(matches!(err, AdminError::AllocationExhausted));
        assert!(device.state().writes.is_empty());
    }
}
