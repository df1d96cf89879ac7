use crate::core::config::DeviceConfig;
use crate::core::error::AdminError;
use crate::core::runner::{report, run_command, Report};
use crate::device::session::Connector;
use crate::models::response::{NoContext, UidContext};
use crate::models::user::UserRecord;
use crate::ops::create_user::CreateUser;
use crate::ops::delete_user::DeleteUser;
use crate::ops::enroll::EnrollFingerprint;
use crate::ops::get_users::GetUsers;
use crate::ops::last_uid::LastUid;
use crate::ops::set_field::SetField;
use crate::ops::test_connection::TestConnection;
use crate::ops::Command;
use crate::validation::params::{
    parse_finger_index, parse_uid, validate_card_update, validate_password_update,
    validate_privilege_update, CreateUserParams,
};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

/// Manage users on ZK biometric terminals.
///
/// Every subcommand prints exactly one JSON line on stdout and exits 0 on
/// success, 1 on failure. Progress logs go to stderr.
#[derive(Parser, Debug)]
#[command(name = "zk-admin", version)]
pub struct Cli {
    /// Log level: trace, debug, info, warn or error
    #[arg(long, global = true, env = "ZK_ADMIN_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log format: console or json
    #[arg(long, global = true, env = "ZK_ADMIN_LOG_FORMAT", default_value = "console")]
    pub log_format: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Connection arguments shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct DeviceArgs {
    /// Device IP address or host name
    pub host: String,
    /// Device TCP port, usually 4370
    pub port: String,
    /// Numeric device password; "None" or 0 when unset
    pub password: String,
    /// Timeout in seconds
    pub timeout: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Connect and report device information
    TestConnection(TestConnectionArgs),
    /// List every user on the device
    GetUsers(GetUsersArgs),
    /// Report the highest uid in use and the next one
    LastUid(LastUidArgs),
    /// Create a user, moving to a free uid if the preferred one is taken
    CreateUser(CreateUserArgs),
    /// Delete a user by uid
    DeleteUser(UidArgs),
    /// Set a user's password
    SetPassword(SetPasswordArgs),
    /// Assign a card number to a user (0 removes it)
    SetCard(SetCardArgs),
    /// Change a user's privilege level
    SetPrivilege(SetPrivilegeArgs),
    /// Start fingerprint enrollment on the device for a user
    EnrollFingerprint(EnrollArgs),
}

#[derive(Args, Debug, Clone)]
pub struct TestConnectionArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
}

#[derive(Args, Debug, Clone)]
pub struct GetUsersArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
}

#[derive(Args, Debug, Clone)]
pub struct LastUidArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
}

#[derive(Args, Debug, Clone)]
pub struct CreateUserArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    /// Preferred uid
    pub uid: String,
    /// Display name, cut to 24 characters
    pub name: String,
    /// External user id; defaults to the final uid
    pub user_id: Option<String>,
    /// Privilege: number or user, enroller, manager, admin
    pub privilege: Option<String>,
    /// User password, at most 8 characters
    pub user_password: Option<String>,
    /// Uid allocation policy: first-available or sequential
    #[arg(long, default_value = "first-available")]
    pub policy: String,
}

#[derive(Args, Debug, Clone)]
pub struct UidArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    pub uid: String,
}

#[derive(Args, Debug, Clone)]
pub struct SetPasswordArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    pub uid: String,
    pub user_password: String,
}

#[derive(Args, Debug, Clone)]
pub struct SetCardArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    pub uid: String,
    pub card_number: String,
}

#[derive(Args, Debug, Clone)]
pub struct SetPrivilegeArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    pub uid: String,
    pub privilege: String,
}

#[derive(Args, Debug, Clone)]
pub struct EnrollArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    pub uid: String,
    /// Finger slot 0-9
    #[arg(default_value = "0")]
    pub finger_index: String,
}

/// A parsed subcommand that can be validated into a [`Command`]
pub trait Invocation {
    type Command: Command;
    /// Input echoed back on failure
    type Context: Serialize;

    fn device(&self) -> &DeviceArgs;

    fn failure_context(&self) -> Self::Context;

    fn to_command(&self, config: &DeviceConfig) -> Result<Self::Command, AdminError>;
}

/// Validate, connect, execute and render. Nothing touches the device until
/// every argument has been validated.
pub async fn invoke<I: Invocation>(connector: &dyn Connector, invocation: &I) -> Report {
    let outcome = match prepare(invocation) {
        Ok((config, command)) => run_command(connector, &config, &command).await,
        Err(e) => Err(e),
    };

    report(outcome, invocation.failure_context())
}

fn prepare<I: Invocation>(invocation: &I) -> Result<(DeviceConfig, I::Command), AdminError> {
    let device = invocation.device();
    let config = DeviceConfig::from_raw(&device.host, &device.port, &device.password, &device.timeout)
        .map_err(|e| AdminError::invalid(format!("{:#}", e)))?;

    let command = invocation.to_command(&config)?;
    Ok((config, command))
}

impl Commands {
    pub async fn invoke(&self, connector: &dyn Connector) -> Report {
        match self {
            Commands::TestConnection(args) => invoke(connector, args).await,
            Commands::GetUsers(args) => invoke(connector, args).await,
            Commands::LastUid(args) => invoke(connector, args).await,
            Commands::CreateUser(args) => invoke(connector, args).await,
            Commands::DeleteUser(args) => invoke(connector, args).await,
            Commands::SetPassword(args) => invoke(connector, args).await,
            Commands::SetCard(args) => invoke(connector, args).await,
            Commands::SetPrivilege(args) => invoke(connector, args).await,
            Commands::EnrollFingerprint(args) => invoke(connector, args).await,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeviceContext {
    pub ip: String,
    pub port: String,
    pub timeout: String,
}

#[derive(Debug, Serialize)]
pub struct TestConnectionContext {
    pub device_info: DeviceContext,
}

#[derive(Debug, Serialize)]
pub struct GetUsersContext {
    pub users: Vec<UserRecord>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct NewUserContext {
    pub uid: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct CreateUserContext {
    pub user: NewUserContext,
}

#[derive(Debug, Serialize)]
pub struct CardContext {
    pub uid: String,
    pub card_number: String,
}

impl Invocation for TestConnectionArgs {
    type Command = TestConnection;
    type Context = TestConnectionContext;

    fn device(&self) -> &DeviceArgs {
        &self.device
    }

    fn failure_context(&self) -> TestConnectionContext {
        TestConnectionContext {
            device_info: DeviceContext {
                ip: self.device.host.clone(),
                port: self.device.port.clone(),
                timeout: self.device.timeout.clone(),
            },
        }
    }

    fn to_command(&self, config: &DeviceConfig) -> Result<TestConnection, AdminError> {
        Ok(TestConnection {
            host: config.host.clone(),
            port: config.port,
            timeout_secs: config.timeout.as_secs(),
        })
    }
}

impl Invocation for GetUsersArgs {
    type Command = GetUsers;
    type Context = GetUsersContext;

    fn device(&self) -> &DeviceArgs {
        &self.device
    }

    fn failure_context(&self) -> GetUsersContext {
        GetUsersContext {
            users: Vec::new(),
            count: 0,
        }
    }

    fn to_command(&self, _config: &DeviceConfig) -> Result<GetUsers, AdminError> {
        Ok(GetUsers)
    }
}

impl Invocation for LastUidArgs {
    type Command = LastUid;
    type Context = NoContext;

    fn device(&self) -> &DeviceArgs {
        &self.device
    }

    fn failure_context(&self) -> NoContext {
        NoContext::default()
    }

    fn to_command(&self, _config: &DeviceConfig) -> Result<LastUid, AdminError> {
        Ok(LastUid)
    }
}

impl Invocation for CreateUserArgs {
    type Command = CreateUser;
    type Context = CreateUserContext;

    fn device(&self) -> &DeviceArgs {
        &self.device
    }

    fn failure_context(&self) -> CreateUserContext {
        CreateUserContext {
            user: NewUserContext {
                uid: self.uid.clone(),
                name: self.name.clone(),
            },
        }
    }

    fn to_command(&self, _config: &DeviceConfig) -> Result<CreateUser, AdminError> {
        let params = CreateUserParams {
            uid: self.uid.clone(),
            name: self.name.clone(),
            user_id: self.user_id.clone(),
            privilege: self.privilege.clone(),
            password: self.user_password.clone(),
            policy: self.policy.clone(),
        };

        Ok(CreateUser {
            request: params.validate()?,
        })
    }
}

impl Invocation for UidArgs {
    type Command = DeleteUser;
    type Context = UidContext;

    fn device(&self) -> &DeviceArgs {
        &self.device
    }

    fn failure_context(&self) -> UidContext {
        UidContext {
            uid: self.uid.clone(),
        }
    }

    fn to_command(&self, _config: &DeviceConfig) -> Result<DeleteUser, AdminError> {
        Ok(DeleteUser {
            uid: parse_uid(&self.uid)?,
        })
    }
}

impl Invocation for SetPasswordArgs {
    type Command = SetField;
    type Context = UidContext;

    fn device(&self) -> &DeviceArgs {
        &self.device
    }

    fn failure_context(&self) -> UidContext {
        UidContext {
            uid: self.uid.clone(),
        }
    }

    fn to_command(&self, _config: &DeviceConfig) -> Result<SetField, AdminError> {
        let update = validate_password_update(&self.uid, &self.user_password)?;
        Ok(SetField {
            uid: update.uid,
            field: update.field,
        })
    }
}

impl Invocation for SetCardArgs {
    type Command = SetField;
    type Context = CardContext;

    fn device(&self) -> &DeviceArgs {
        &self.device
    }

    fn failure_context(&self) -> CardContext {
        CardContext {
            uid: self.uid.clone(),
            card_number: self.card_number.clone(),
        }
    }

    fn to_command(&self, _config: &DeviceConfig) -> Result<SetField, AdminError> {
        let update = validate_card_update(&self.uid, &self.card_number)?;
        Ok(SetField {
            uid: update.uid,
            field: update.field,
        })
    }
}

impl Invocation for SetPrivilegeArgs {
    type Command = SetField;
    type Context = UidContext;

    fn device(&self) -> &DeviceArgs {
        &self.device
    }

    fn failure_context(&self) -> UidContext {
        UidContext {
            uid: self.uid.clone(),
        }
    }

    fn to_command(&self, _config: &DeviceConfig) -> Result<SetField, AdminError> {
        let update = validate_privilege_update(&self.uid, &self.privilege)?;
        Ok(SetField {
            uid: update.uid,
            field: update.field,
        })
    }
}

impl Invocation for EnrollArgs {
    type Command = EnrollFingerprint;
    type Context = UidContext;

    fn device(&self) -> &DeviceArgs {
        &self.device
    }

    fn failure_context(&self) -> UidContext {
        UidContext {
            uid: self.uid.clone(),
        }
    }

    fn to_command(&self, _config: &DeviceConfig) -> Result<EnrollFingerprint, AdminError> {
        Ok(EnrollFingerprint {
            uid: parse_uid(&self.uid)?,
            finger: parse_finger_index(&self.finger_index)?,
        })
    }
}
