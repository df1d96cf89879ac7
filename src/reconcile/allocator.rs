use crate::core::error::AdminError;
use crate::models::user::{UserRecord, MAX_UID, MIN_UID};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// How a new record's uid is chosen when the caller's preference is taken
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AllocationPolicy {
    /// Preferred uid if free, else the lowest free uid
    #[default]
    FirstAvailable,
    /// Preferred uid if free and above the current maximum, else max + 1
    SequentialAppend,
}

impl AllocationPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            AllocationPolicy::FirstAvailable => "first-available",
            AllocationPolicy::SequentialAppend => "sequential",
        }
    }
}

impl fmt::Display for AllocationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AllocationPolicy {
    type Err = AdminError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first-available" | "first_available" | "first" => Ok(AllocationPolicy::FirstAvailable),
            "sequential" | "sequential-append" | "sequential_append" | "append" => {
                Ok(AllocationPolicy::SequentialAppend)
            }
            other => Err(AdminError::invalid(format!(
                "Unknown allocation policy '{}'. Must be one of: first-available, sequential",
                other
            ))),
        }
    }
}

/// Uids present in a freshly read user table
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OccupiedUids(BTreeSet<u16>);

impl OccupiedUids {
    pub fn from_records(users: &[UserRecord]) -> Self {
        users.iter().map(|user| user.uid).collect()
    }

    pub fn contains(&self, uid: u16) -> bool {
        self.0.contains(&uid)
    }

    pub fn max(&self) -> Option<u16> {
        self.0.last().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn is_free(&self, uid: u16) -> bool {
        (MIN_UID..=MAX_UID).contains(&uid) && !self.contains(uid)
    }
}

impl FromIterator<u16> for OccupiedUids {
    fn from_iter<I: IntoIterator<Item = u16>>(iter: I) -> Self {
        OccupiedUids(iter.into_iter().collect())
    }
}

/// Outcome of one allocation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Allocation {
    pub uid: u16,
    pub preferred: u16,
    /// Must be reported to the operator
    pub uid_changed: bool,
}

/// Pick an unoccupied uid for a new record. Pure over `occupied`.
pub fn allocate(
    policy: AllocationPolicy,
    preferred: u16,
    occupied: &OccupiedUids,
) -> Result<Allocation, AdminError> {
    let uid = match policy {
        AllocationPolicy::FirstAvailable => first_available(preferred, occupied),
        AllocationPolicy::SequentialAppend => sequential_append(preferred, occupied),
    }
    .ok_or(AdminError::AllocationExhausted)?;

    debug!(
        policy = policy.as_str(),
        preferred,
        uid,
        occupied = occupied.len(),
        "Allocated uid"
    );

    Ok(Allocation {
        uid,
        preferred,
        uid_changed: uid != preferred,
    })
}

fn first_available(preferred: u16, occupied: &OccupiedUids) -> Option<u16> {
    if occupied.is_free(preferred) {
        return Some(preferred);
    }

    (MIN_UID..=MAX_UID).find(|&uid| !occupied.contains(uid))
}

fn sequential_append(preferred: u16, occupied: &OccupiedUids) -> Option<u16> {
    let Some(max) = occupied.max() else {
        return Some(preferred.clamp(MIN_UID, MAX_UID));
    };

    if preferred > max && occupied.is_free(preferred) {
        return Some(preferred);
    }

    // max + 1 is free unless the table holds uids we did not expect
    (max.saturating_add(1)..=MAX_UID).find(|&uid| !occupied.contains(uid))
}
