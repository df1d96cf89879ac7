//! In-memory terminal used by operation tests

use crate::core::config::DeviceConfig;
use crate::core::error::{AdminError, ProtocolError};
use crate::device::session::{Connector, DeviceSession};
use crate::models::device::DeviceInfo;
use crate::models::user::UserRecord;
use crate::protocol::constants::CMD_ACK_ERROR;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
pub struct FakeState {
    pub users: Vec<UserRecord>,
    pub info: DeviceInfo,
    /// Every record passed to `write_user`, accepted or not
    pub writes: Vec<UserRecord>,
    pub deletes: Vec<u16>,
    pub enrollments: Vec<(u16, u8)>,
    pub list_calls: usize,
    pub reject_writes: bool,
    pub reject_deletes: bool,
    /// Stored by another client on the next `get_user`, after the table
    /// read and before the write. Writes still overwrite, as on a terminal.
    pub intruder: Option<UserRecord>,
    /// Accept writes without storing them
    pub lose_writes: bool,
    pub closed: bool,
    pub fail_close: bool,
}

#[derive(Clone, Debug, Default)]
pub struct FakeDevice {
    state: Arc<Mutex<FakeState>>,
}

impl FakeDevice {
    pub fn with_users(users: Vec<UserRecord>) -> Self {
        let device = Self::default();
        device.state().users = users;
        device
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn session(&self) -> FakeSession {
        FakeSession {
            state: self.state.clone(),
        }
    }
}

pub struct FakeSession {
    state: Arc<Mutex<FakeState>>,
}

impl FakeSession {
    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }
}

fn refused(command: &'static str) -> ProtocolError {
    ProtocolError::Refused {
        command,
        code: CMD_ACK_ERROR,
    }
}

#[async_trait]
impl DeviceSession for FakeSession {
    async fn list_users(&mut self) -> Result<Vec<UserRecord>, ProtocolError> {
        let mut state = self.state();
        state.list_calls += 1;
        Ok(state.users.clone())
    }

    async fn get_user(&mut self, uid: u16) -> Result<Option<UserRecord>, ProtocolError> {
        {
            let mut state = self.state();
            if let Some(intruder) = state.intruder.take() {
                state.users.retain(|u| u.uid != intruder.uid);
                state.users.push(intruder);
            }
        }

        let users = self.list_users().await?;
        Ok(users.into_iter().find(|u| u.uid == uid))
    }

    async fn write_user(&mut self, user: &UserRecord) -> Result<(), ProtocolError> {
        let mut state = self.state();
        state.writes.push(user.clone());

        if state.reject_writes {
            return Err(refused("CMD_USER_WRQ"));
        }
        if state.lose_writes {
            return Ok(());
        }

        state.users.retain(|u| u.uid != user.uid);
        state.users.push(user.clone());
        Ok(())
    }

    async fn delete_user(&mut self, uid: u16) -> Result<(), ProtocolError> {
        let mut state = self.state();
        state.deletes.push(uid);

        if state.reject_deletes {
            return Err(refused("CMD_DELETE_USER"));
        }

        state.users.retain(|u| u.uid != uid);
        Ok(())
    }

    async fn begin_enrollment(&mut self, uid: u16, finger: u8) -> Result<(), ProtocolError> {
        let mut state = self.state();
        if !state.users.iter().any(|u| u.uid == uid) {
            return Err(ProtocolError::UnknownUser(uid));
        }

        state.enrollments.push((uid, finger));
        Ok(())
    }

    async fn device_info(&mut self) -> Result<DeviceInfo, ProtocolError> {
        let state = self.state();
        let mut info = state.info.clone();
        info.user_count.get_or_insert(state.users.len() as u32);
        Ok(info)
    }

    async fn close(&mut self) -> Result<(), ProtocolError> {
        let mut state = self.state();
        state.closed = true;

        if state.fail_close {
            return Err(refused("CMD_EXIT"));
        }
        Ok(())
    }
}

/// Hands out sessions on a shared [`FakeDevice`], or refuses to connect
#[derive(Clone, Debug, Default)]
pub struct FakeConnector {
    pub device: FakeDevice,
    pub refuse: bool,
}

impl FakeConnector {
    pub fn new(device: FakeDevice) -> Self {
        Self {
            device,
            refuse: false,
        }
    }

    pub fn refusing() -> Self {
        Self {
            device: FakeDevice::default(),
            refuse: true,
        }
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, config: &DeviceConfig) -> Result<Box<dyn DeviceSession>, AdminError> {
        if self.refuse {
            return Err(AdminError::connection(config, ProtocolError::Unauthenticated));
        }

        Ok(Box::new(self.device.session()))
    }
}
