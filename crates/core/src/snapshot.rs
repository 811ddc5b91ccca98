use serde::{Deserialize, Serialize};

/// Serializable view of the device state after a session.
#[derive(Serialize, Deserialize, Debug)]
pub struct DeviceSnapshot {
    pub program: Vec<u8>,
    pub catalog_cursor: usize,
    pub flash: Vec<u8>,
    pub slept_ms: Option<u64>,
}
