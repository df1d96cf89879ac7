use crate::core::error::AdminError;
use crate::models::user::{is_valid_uid, truncate_name, Privilege, MAX_UID, MIN_UID};
use crate::reconcile::allocator::AllocationPolicy;
use crate::reconcile::create::NewUser;
use crate::reconcile::merge::FieldUpdate;

/// Widest password the device stores
pub const MAX_PASSWORD_BYTES: usize = 8;
/// Widest external user id the device stores
pub const MAX_USER_ID_BYTES: usize = 24;
/// Fingers are numbered 0..=9
pub const MAX_FINGER_INDEX: u8 = 9;

/// Parse a uid argument, 1..=65534
pub fn parse_uid(raw: &str) -> Result<u16, AdminError> {
    let value = raw.trim().parse::<u32>().map_err(|_| {
        AdminError::invalid(format!("UID must be a positive integer, got '{}'", raw))
    })?;

    if !is_valid_uid(value) {
        return Err(AdminError::invalid(format!(
            "UID must be between {} and {}, got {}",
            MIN_UID, MAX_UID, value
        )));
    }

    Ok(value as u16)
}

/// Card numbers are unsigned 32-bit; 0 clears the card
pub fn parse_card(raw: &str) -> Result<u32, AdminError> {
    raw.trim().parse::<u32>().map_err(|_| {
        AdminError::invalid(format!(
            "Card number must be an integer between 0 and {}, got '{}'",
            u32::MAX,
            raw
        ))
    })
}

/// Accepts the raw device byte or one of the named levels
pub fn parse_privilege(raw: &str) -> Result<Privilege, AdminError> {
    let trimmed = raw.trim();

    let named = match trimmed.to_ascii_lowercase().as_str() {
        "user" | "default" => Some(Privilege::USER),
        "enroller" => Some(Privilege::ENROLLER),
        "manager" => Some(Privilege::MANAGER),
        "admin" | "administrator" => Some(Privilege::ADMIN),
        _ => None,
    };
    if let Some(privilege) = named {
        return Ok(privilege);
    }

    trimmed.parse::<u8>().map(Privilege).map_err(|_| {
        AdminError::invalid(format!(
            "Privilege must be 0-255 or one of user, enroller, manager, admin, got '{}'",
            raw
        ))
    })
}

pub fn parse_finger_index(raw: &str) -> Result<u8, AdminError> {
    match raw.trim().parse::<u8>() {
        Ok(finger) if finger <= MAX_FINGER_INDEX => Ok(finger),
        _ => Err(AdminError::invalid(format!(
            "Finger index must be between 0 and {}, got '{}'",
            MAX_FINGER_INDEX, raw
        ))),
    }
}

pub fn parse_policy(raw: &str) -> Result<AllocationPolicy, AdminError> {
    raw.parse()
}

/// Names must carry text; long names are cut, not rejected
pub fn validate_name(raw: &str) -> Result<String, AdminError> {
    let name = raw.trim();

    if name.is_empty() {
        return Err(AdminError::invalid("Name must not be empty"));
    }
    if name.chars().any(char::is_control) {
        return Err(AdminError::invalid("Name must not contain control characters"));
    }

    Ok(truncate_name(name))
}

pub fn validate_password(raw: &str) -> Result<String, AdminError> {
    if raw.len() > MAX_PASSWORD_BYTES {
        return Err(AdminError::invalid(format!(
            "Password must be at most {} bytes, got {}",
            MAX_PASSWORD_BYTES,
            raw.len()
        )));
    }
    if raw.chars().any(char::is_control) {
        return Err(AdminError::invalid("Password must not contain control characters"));
    }

    Ok(raw.to_string())
}

pub fn validate_user_id(raw: &str) -> Result<String, AdminError> {
    let user_id = raw.trim();

    if user_id.is_empty() {
        return Err(AdminError::invalid("User ID must not be empty when given"));
    }
    if user_id.len() > MAX_USER_ID_BYTES {
        return Err(AdminError::invalid(format!(
            "User ID must be at most {} bytes, got {}",
            MAX_USER_ID_BYTES,
            user_id.len()
        )));
    }
    if user_id.chars().any(char::is_control) {
        return Err(AdminError::invalid("User ID must not contain control characters"));
    }

    Ok(user_id.to_string())
}

/// Raw create-user arguments as they arrive on the command line
#[derive(Debug, Clone, Default)]
pub struct CreateUserParams {
    pub uid: String,
    pub name: String,
    pub user_id: Option<String>,
    pub privilege: Option<String>,
    pub password: Option<String>,
    pub policy: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCreateUser {
    pub preferred_uid: u16,
    pub user: NewUser,
    pub policy: AllocationPolicy,
}

impl CreateUserParams {
    pub fn validate(&self) -> Result<ValidatedCreateUser, AdminError> {
        let preferred_uid = parse_uid(&self.uid)?;
        let name = validate_name(&self.name)?;

        // Empty optional arguments count as absent
        let present = |value: &Option<String>| {
            value
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .map(str::to_string)
        };

        let user_id = present(&self.user_id).map(|v| validate_user_id(&v)).transpose()?;
        let privilege = present(&self.privilege).map(|v| parse_privilege(&v)).transpose()?;
        let password = self.password.as_deref().map(validate_password).transpose()?;
        let policy = parse_policy(&self.policy)?;

        Ok(ValidatedCreateUser {
            preferred_uid,
            user: NewUser {
                name,
                privilege,
                password,
                user_id,
                card: None,
                group_id: None,
            },
            policy,
        })
    }
}

/// A uid plus the change to apply to the record it names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUpdate {
    pub uid: u16,
    pub field: FieldUpdate,
}

pub fn validate_password_update(uid: &str, password: &str) -> Result<ValidatedUpdate, AdminError> {
    Ok(ValidatedUpdate {
        uid: parse_uid(uid)?,
        field: FieldUpdate::Password(validate_password(password)?),
    })
}

pub fn validate_card_update(uid: &str, card: &str) -> Result<ValidatedUpdate, AdminError> {
    Ok(ValidatedUpdate {
        uid: parse_uid(uid)?,
        field: FieldUpdate::Card(parse_card(card)?),
    })
}

pub fn validate_privilege_update(uid: &str, privilege: &str) -> Result<ValidatedUpdate, AdminError> {
    Ok(ValidatedUpdate {
        uid: parse_uid(uid)?,
        field: FieldUpdate::Privilege(parse_privilege(privilege)?),
    })
}
