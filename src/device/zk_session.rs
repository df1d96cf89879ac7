use crate::core::config::DeviceConfig;
use crate::core::error::{AdminError, ProtocolError};
use crate::device::session::{Connector, DeviceSession};
use crate::models::device::{DeviceInfo, TableSizes};
use crate::models::user::UserRecord;
use crate::protocol::commkey::make_commkey;
use crate::protocol::constants::*;
use crate::protocol::info_codec::{
    buffered_read_request, chunk_request, decode_option, decode_sizes, decode_text, decode_time,
    enroll_request, read_u32,
};
use crate::protocol::packet::{
    encode_request, frame, parse_frame_prefix, Packet, FRAME_PREFIX_LEN, MAX_FRAME_LEN,
};
use crate::protocol::user_codec::{decode_users, encode_user, UserLayout};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

/// Session speaking the ZK terminal protocol over a byte stream.
///
/// Generic over the stream so tests can drive it through an in-memory
/// duplex pipe; production uses [`TcpStream`].
pub struct ZkSession<S> {
    stream: S,
    timeout: Duration,
    session_id: u16,
    reply_id: u16,
    /// Learned from the first table read
    layout: Option<UserLayout>,
}

impl<S> ZkSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S, timeout: Duration) -> Self {
        Self {
            stream,
            timeout,
            session_id: 0,
            reply_id: USHRT_MAX - 1,
            layout: None,
        }
    }

    /// `CMD_CONNECT`, followed by `CMD_AUTH` when the device asks for it
    pub async fn handshake(&mut self, password: u32) -> Result<(), ProtocolError> {
        let reply = self.send_command(CMD_CONNECT, &[]).await?;
        self.session_id = reply.session_id;

        match reply.command {
            CMD_ACK_UNAUTH => {
                debug!(session_id = self.session_id, "Device requires authentication");
                let key = make_commkey(password, self.session_id, COMMKEY_TICKS);
                let reply = self.send_command(CMD_AUTH, &key).await?;
                if !is_success(reply.command) {
                    return Err(ProtocolError::Unauthenticated);
                }
            }
            code if is_success(code) => {}
            code => {
                return Err(ProtocolError::Refused {
                    command: "CMD_CONNECT",
                    code,
                })
            }
        }

        debug!(session_id = self.session_id, "Session established");
        Ok(())
    }

    async fn write_frame(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        let limit = self.timeout;
        timeout(limit, self.stream.write_all(bytes))
            .await
            .map_err(|_| ProtocolError::Timeout(limit))??;
        Ok(())
    }

    async fn read_packet(&mut self) -> Result<Packet, ProtocolError> {
        let limit = self.timeout;

        let mut prefix = [0u8; FRAME_PREFIX_LEN];
        timeout(limit, self.stream.read_exact(&mut prefix))
            .await
            .map_err(|_| ProtocolError::Timeout(limit))??;
        let len = parse_frame_prefix(&prefix)?;

        let mut body = vec![0u8; len as usize];
        timeout(limit, self.stream.read_exact(&mut body))
            .await
            .map_err(|_| ProtocolError::Timeout(limit))??;

        let packet = Packet::decode(&body)?;
        trace!(
            command = command_name(packet.command),
            len,
            reply_id = packet.reply_id,
            "Received packet"
        );
        Ok(packet)
    }

    /// Send one request and return the reply, whatever its code
    async fn send_command(&mut self, command: u16, payload: &[u8]) -> Result<Packet, ProtocolError> {
        let request = encode_request(command, self.session_id, self.reply_id, payload);
        trace!(
            command = command_name(command),
            packet = %hex::encode(&request),
            "Sending packet"
        );

        self.write_frame(&frame(&request)).await?;
        let reply = self.read_packet().await?;
        self.reply_id = reply.reply_id;
        Ok(reply)
    }

    /// Send one request and require a success reply
    async fn execute(&mut self, command: u16, payload: &[u8]) -> Result<Packet, ProtocolError> {
        let reply = self.send_command(command, payload).await?;
        if is_success(reply.command) {
            Ok(reply)
        } else {
            Err(ProtocolError::Refused {
                command: command_name(command),
                code: reply.command,
            })
        }
    }

    async fn read_sizes(&mut self) -> Result<TableSizes, ProtocolError> {
        let reply = self.execute(CMD_GET_FREE_SIZES, &[]).await?;
        decode_sizes(&reply.payload)
    }

    async fn refresh(&mut self) -> Result<(), ProtocolError> {
        self.execute(CMD_REFRESHDATA, &[]).await?;
        Ok(())
    }

    /// Buffered read of a whole device table
    async fn read_buffer(&mut self, command: u16, fct: u8) -> Result<Vec<u8>, ProtocolError> {
        let request = buffered_read_request(command, fct, 0);
        let reply = self.execute(CMD_DATA_WRRQ, &request).await?;

        // Small tables come back inline
        if reply.command == CMD_DATA {
            return Ok(reply.payload);
        }

        let size = read_u32(&reply.payload, 1)?;
        if size > MAX_FRAME_LEN {
            return Err(ProtocolError::Oversized(size));
        }
        debug!(size, "Reading table in chunks");

        let mut data = Vec::with_capacity(size as usize);
        let mut start = 0u32;
        while start < size {
            let chunk = MAX_CHUNK.min(size - start);
            let bytes = self.read_chunk(start, chunk).await?;
            data.extend_from_slice(&bytes);
            start += chunk;
        }

        self.execute(CMD_FREE_DATA, &[]).await?;
        Ok(data)
    }

    async fn read_chunk(&mut self, start: u32, size: u32) -> Result<Vec<u8>, ProtocolError> {
        let reply = self.send_command(CMD_DATA_RDY, &chunk_request(start, size)).await?;

        match reply.command {
            CMD_DATA => Ok(reply.payload),
            CMD_PREPARE_DATA => {
                let expected = read_u32(&reply.payload, 0)? as usize;
                let mut data = Vec::with_capacity(expected);

                while data.len() < expected {
                    let packet = self.read_packet().await?;
                    if packet.command != CMD_DATA {
                        return Err(ProtocolError::UnexpectedReply {
                            stage: "receiving table data",
                            code: packet.command,
                        });
                    }
                    data.extend_from_slice(&packet.payload);
                }

                let ack = self.read_packet().await?;
                if ack.command != CMD_ACK_OK {
                    return Err(ProtocolError::UnexpectedReply {
                        stage: "finishing table chunk",
                        code: ack.command,
                    });
                }

                data.truncate(expected);
                Ok(data)
            }
            code => Err(ProtocolError::Refused {
                command: "CMD_DATA_RDY",
                code,
            }),
        }
    }

    async fn user_layout(&mut self) -> Result<UserLayout, ProtocolError> {
        if let Some(layout) = self.layout {
            return Ok(layout);
        }

        self.list_users().await?;
        // An empty table reveals nothing; current firmware uses 72-byte entries
        Ok(self.layout.unwrap_or(UserLayout::Extended))
    }
}

#[async_trait]
impl<S> DeviceSession for ZkSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn list_users(&mut self) -> Result<Vec<UserRecord>, ProtocolError> {
        let sizes = self.read_sizes().await?;
        if sizes.users == 0 {
            debug!("Device reports an empty user table");
            return Ok(Vec::new());
        }

        let data = self.read_buffer(CMD_USERTEMP_RRQ, FCT_USER).await?;
        if data.len() <= 4 {
            return Ok(Vec::new());
        }

        let total_size = read_u32(&data, 0)?;
        let layout = UserLayout::from_table(total_size, sizes.users);
        self.layout = Some(layout);

        let users = decode_users(&data[4..], layout);
        debug!(count = users.len(), ?layout, "Decoded user table");
        Ok(users)
    }

    async fn get_user(&mut self, uid: u16) -> Result<Option<UserRecord>, ProtocolError> {
        let users = self.list_users().await?;
        Ok(users.into_iter().find(|user| user.uid == uid))
    }

    async fn write_user(&mut self, user: &UserRecord) -> Result<(), ProtocolError> {
        let layout = self.user_layout().await?;
        let entry = encode_user(user, layout)?;

        self.execute(CMD_USER_WRQ, &entry).await?;
        self.refresh().await
    }

    async fn delete_user(&mut self, uid: u16) -> Result<(), ProtocolError> {
        self.execute(CMD_DELETE_USER, &uid.to_le_bytes()).await?;
        self.refresh().await
    }

    async fn begin_enrollment(&mut self, uid: u16, finger: u8) -> Result<(), ProtocolError> {
        let user = self
            .get_user(uid)
            .await?
            .ok_or(ProtocolError::UnknownUser(uid))?;
        let request = enroll_request(&user.user_id, finger)?;

        let cancel = self.send_command(CMD_CANCELCAPTURE, &[]).await?;
        if !is_success(cancel.command) {
            debug!(code = cancel.command, "Cancel capture was not acknowledged");
        }

        self.execute(CMD_STARTENROLL, &request).await?;
        Ok(())
    }

    async fn device_info(&mut self) -> Result<DeviceInfo, ProtocolError> {
        let mut info = DeviceInfo::default();

        match self.execute(CMD_GET_VERSION, &[]).await {
            Ok(reply) => {
                let version = decode_text(&reply.payload);
                info.firmware_version = (!version.is_empty()).then_some(version);
            }
            Err(e) => warn!(error = %e, "Could not read firmware version"),
        }

        match self.execute(CMD_OPTIONS_RRQ, b"~SerialNumber\0").await {
            Ok(reply) => info.serial_number = decode_option(&reply.payload),
            Err(e) => warn!(error = %e, "Could not read serial number"),
        }

        match self.execute(CMD_GET_TIME, &[]).await {
            Ok(reply) => match read_u32(&reply.payload, 0) {
                Ok(raw) => info.device_time = decode_time(raw),
                Err(e) => warn!(error = %e, "Could not decode device time"),
            },
            Err(e) => warn!(error = %e, "Could not read device time"),
        }

        match self.read_sizes().await {
            Ok(sizes) => {
                info.user_count = Some(sizes.users);
                info.fingerprint_count = Some(sizes.fingers);
                info.user_capacity = Some(sizes.users_capacity);
            }
            Err(e) => warn!(error = %e, "Could not read table sizes"),
        }

        Ok(info)
    }

    async fn close(&mut self) -> Result<(), ProtocolError> {
        self.execute(CMD_EXIT, &[]).await?;
        self.stream.shutdown().await?;
        Ok(())
    }
}

/// Opens TCP sessions to real terminals
#[derive(Debug, Clone, Copy, Default)]
pub struct ZkConnector;

#[async_trait]
impl Connector for ZkConnector {
    async fn connect(&self, config: &DeviceConfig) -> Result<Box<dyn DeviceSession>, AdminError> {
        let limit = config.timeout;

        let stream = match timeout(limit, TcpStream::connect((config.host.as_str(), config.port))).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(AdminError::connection(config, e.into())),
            Err(_) => return Err(AdminError::connection(config, ProtocolError::Timeout(limit))),
        };

        if let Err(e) = stream.set_nodelay(true) {
            debug!(error = %e, "Could not disable Nagle's algorithm");
        }

        let mut session = ZkSession::new(stream, limit);
        session
            .handshake(config.password)
            .await
            .map_err(|e| AdminError::connection(config, e))?;

        Ok(Box::new(session))
    }
}
