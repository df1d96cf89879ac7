use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowest uid the terminal accepts
pub const MIN_UID: u16 = 1;
/// Highest uid the terminal accepts; 0 and 65535 are reserved
pub const MAX_UID: u16 = 65534;
/// Display names longer than this are truncated, never rejected
pub const MAX_NAME_CHARS: usize = 24;

/// Privilege level stored with each user.
///
/// Kept as the raw device byte so that levels this crate does not name
/// survive a read-merge-write cycle unchanged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Privilege(pub u8);

impl Privilege {
    pub const USER: Privilege = Privilege(0);
    pub const ENROLLER: Privilege = Privilege(2);
    pub const MANAGER: Privilege = Privilege(6);
    pub const ADMIN: Privilege = Privilege(14);

    pub fn as_u8(self) -> u8 {
        self.0
    }

    pub fn label(self) -> &'static str {
        match self {
            Privilege::USER => "user",
            Privilege::ENROLLER => "enroller",
            Privilege::MANAGER => "manager",
            Privilege::ADMIN => "admin",
            _ => "custom",
        }
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.0, self.label())
    }
}

/// One row of the device's user table
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Device-internal primary key, 1..=65534
    pub uid: u16,
    pub name: String,
    /// External identifier, usually the uid in decimal
    pub user_id: String,
    pub privilege: Privilege,
    pub password: String,
    pub group_id: String,
    /// Badge number; 0 means no card assigned
    pub card: u32,
}

impl UserRecord {
    pub fn has_card(&self) -> bool {
        self.card != 0
    }

    /// Name to show for this user; unnamed entries render as `NN-<user_id>`
    pub fn display_name(&self) -> String {
        if self.name.is_empty() {
            format!("NN-{}", self.user_id)
        } else {
            self.name.clone()
        }
    }

    /// Copy for output, with the display name filled in
    pub fn for_display(mut self) -> Self {
        self.name = self.display_name();
        self
    }
}

/// Cut a display name down to the device limit, counting characters
pub fn truncate_name(name: &str) -> String {
    name.chars().take(MAX_NAME_CHARS).collect()
}

pub fn is_valid_uid(uid: u32) -> bool {
    (u32::from(MIN_UID)..=u32::from(MAX_UID)).contains(&uid)
}
