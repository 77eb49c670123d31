/// Fixed header length on the wire: type(2) || timestamp(8) || encrypted(1).
pub const HEADER_LEN: usize = 11;

/// Message header, big-endian on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Header {
    pub msg_type: u16,
    pub timestamp: u64,
    pub encrypted: bool,
}

impl Header {
    pub fn serialize(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[..2].copy_from_slice(&self.msg_type.to_be_bytes());
        out[2..10].copy_from_slice(&self.timestamp.to_be_bytes());
        out[10] = self.encrypted as u8;
        out
    }

    pub fn deserialize(raw: &[u8; HEADER_LEN]) -> Self {
        let mut ts = [0u8; 8];
        ts.copy_from_slice(&raw[2..10]);
        Self {
            msg_type: u16::from_be_bytes([raw[0], raw[1]]),
            timestamp: u64::from_be_bytes(ts),
            encrypted: raw[10] == 1,
        }
    }
}
