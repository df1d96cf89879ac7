// Command and reply codes of the ZK terminal protocol

pub const CMD_CONNECT: u16 = 1000;
pub const CMD_EXIT: u16 = 1001;
pub const CMD_AUTH: u16 = 1102;
pub const CMD_GET_VERSION: u16 = 1100;
pub const CMD_REFRESHDATA: u16 = 1013;

pub const CMD_USER_WRQ: u16 = 8;
pub const CMD_USERTEMP_RRQ: u16 = 9;
pub const CMD_OPTIONS_RRQ: u16 = 11;
pub const CMD_DELETE_USER: u16 = 18;
pub const CMD_GET_FREE_SIZES: u16 = 50;
pub const CMD_STARTENROLL: u16 = 61;
pub const CMD_CANCELCAPTURE: u16 = 62;
pub const CMD_GET_TIME: u16 = 201;

pub const CMD_PREPARE_DATA: u16 = 1500;
pub const CMD_DATA: u16 = 1501;
pub const CMD_FREE_DATA: u16 = 1502;
pub const CMD_DATA_WRRQ: u16 = 1503;
pub const CMD_DATA_RDY: u16 = 1504;

pub const CMD_ACK_OK: u16 = 2000;
pub const CMD_ACK_ERROR: u16 = 2001;
pub const CMD_ACK_DATA: u16 = 2002;
pub const CMD_ACK_UNAUTH: u16 = 2005;

/// Table selector for the user table in buffered reads
pub const FCT_USER: u8 = 5;

/// TCP frame magic, sent as `50 50 82 7d`
pub const MACHINE_PREPARE_DATA_1: u16 = 0x5050;
pub const MACHINE_PREPARE_DATA_2: u16 = 0x7d82;

pub const USHRT_MAX: u16 = 65535;

/// Largest chunk requested per buffered read over TCP
pub const MAX_CHUNK: u32 = 0xFFC0;

/// Tick byte mixed into the auth comm key
pub const COMMKEY_TICKS: u8 = 50;

/// Reply codes that count as success for a plain command
pub fn is_success(code: u16) -> bool {
    matches!(code, CMD_ACK_OK | CMD_PREPARE_DATA | CMD_DATA)
}

/// Human-readable name for logs and error messages
pub fn command_name(code: u16) -> &'static str {
    match code {
        CMD_CONNECT => "CMD_CONNECT",
        CMD_EXIT => "CMD_EXIT",
        CMD_AUTH => "CMD_AUTH",
        CMD_GET_VERSION => "CMD_GET_VERSION",
        CMD_REFRESHDATA => "CMD_REFRESHDATA",
        CMD_USER_WRQ => "CMD_USER_WRQ",
        CMD_USERTEMP_RRQ => "CMD_USERTEMP_RRQ",
        CMD_OPTIONS_RRQ => "CMD_OPTIONS_RRQ",
        CMD_DELETE_USER => "CMD_DELETE_USER",
        CMD_GET_FREE_SIZES => "CMD_GET_FREE_SIZES",
        CMD_STARTENROLL => "CMD_STARTENROLL",
        CMD_CANCELCAPTURE => "CMD_CANCELCAPTURE",
        CMD_GET_TIME => "CMD_GET_TIME",
        CMD_PREPARE_DATA => "CMD_PREPARE_DATA",
        CMD_DATA => "CMD_DATA",
        CMD_FREE_DATA => "CMD_FREE_DATA",
        CMD_DATA_WRRQ => "CMD_DATA_WRRQ",
        CMD_DATA_RDY => "CMD_DATA_RDY",
        CMD_ACK_OK => "CMD_ACK_OK",
        CMD_ACK_ERROR => "CMD_ACK_ERROR",
        CMD_ACK_DATA => "CMD_ACK_DATA",
        CMD_ACK_UNAUTH => "CMD_ACK_UNAUTH",
        _ => "CMD_UNKNOWN",
    }
}
