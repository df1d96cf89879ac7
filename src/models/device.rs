use chrono::NaiveDateTime;
use serde::Serialize;

/// Metadata reported by a terminal.
///
/// Each field is collected independently; one that the device fails to
/// report is left empty instead of failing the whole query.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub firmware_version: Option<String>,
    pub serial_number: Option<String>,
    pub device_time: Option<NaiveDateTime>,
    pub user_count: Option<u32>,
    pub fingerprint_count: Option<u32>,
    pub user_capacity: Option<u32>,
}

/// Counters returned by the free-sizes query
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TableSizes {
    pub users: u32,
    pub fingers: u32,
    pub records: u32,
    pub cards: u32,
    pub fingers_capacity: u32,
    pub users_capacity: u32,
    pub records_capacity: u32,
}
