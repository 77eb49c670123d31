use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::crypto::MAX_DIFFICULTY;
use crate::network::message::VERSION_FIELD_LEN;
use crate::utils::{BootstrapError, Result};

pub const DEFAULT_PORT: u64 = 40102;
pub const DEFAULT_PEER_NUM: usize = 100;
pub const DEFAULT_NAME: &str = "Rust Bootstrap";
pub const DEFAULT_PROTOCOL_ID: &str = "31";
pub const DEFAULT_GOLEM_MESSAGES_VERSION: &str = "2.24.3";
pub const DEFAULT_GOLEM_VERSION: &str = "0.19.0";
pub const DEFAULT_KEY_DIFFICULTY: u32 = 14;

/// Static session parameters, read-only once the service starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub name: String,
    /// Client key id announced in Hello; the node public key hex when empty.
    pub id: String,
    pub port: u64,
    pub prv_addr: String,
    pub pub_addr: String,
    pub prv_addresses: Vec<String>,
    pub nat_type: Vec<String>,
    /// Size cap of the peer set.
    pub peer_num: usize,
    /// Minimum difficulty required from remote keys.
    pub key_difficulty: u32,
    pub protocol_id: String,
    pub golem_messages_version: String,
    pub golem_version: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            id: String::new(),
            port: DEFAULT_PORT,
            prv_addr: String::new(),
            pub_addr: String::new(),
            prv_addresses: Vec::new(),
            nat_type: Vec::new(),
            peer_num: DEFAULT_PEER_NUM,
            key_difficulty: DEFAULT_KEY_DIFFICULTY,
            protocol_id: DEFAULT_PROTOCOL_ID.to_string(),
            golem_messages_version: DEFAULT_GOLEM_MESSAGES_VERSION.to_string(),
            golem_version: DEFAULT_GOLEM_VERSION.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file; missing keys take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_toml(&data)
    }

    pub fn from_toml(data: &str) -> Result<Self> {
        toml::from_str(data).map_err(|e| BootstrapError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.peer_num == 0 {
            return Err(BootstrapError::Config("peer_num must be positive".into()));
        }
        if self.key_difficulty > MAX_DIFFICULTY {
            return Err(BootstrapError::Config(format!(
                "key_difficulty {} above {}",
                self.key_difficulty, MAX_DIFFICULTY
            )));
        }
        if self.golem_messages_version.len() > VERSION_FIELD_LEN {
            return Err(BootstrapError::Config(format!(
                "golem_messages_version longer than {} bytes",
                VERSION_FIELD_LEN
            )));
        }
        if self.port > u16::MAX as u64 {
            return Err(BootstrapError::Config(format!("port {} out of range", self.port)));
        }
        Ok(())
    }

    /// Listen address for the accept loop.
    pub fn listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}
