use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::crypto::generate_difficult_key;
use crate::network::RandomizedPeerKeeper;
use crate::node::config::Config;
use crate::node::service::Service;
use crate::utils::{init_logging, METRICS};

/// CLI for the bootstrap node.
#[derive(Parser)]
#[clap(name = "overlay-bootstrap", version)]
pub struct Cli {
    #[clap(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand)]
pub enum Cmd {
    /// Run the bootstrap node
    Run(RunArgs),
    /// Generate a key of the given difficulty and print it
    GenKey {
        #[clap(long, default_value_t = crate::node::config::DEFAULT_KEY_DIFFICULTY)]
        difficulty: u32,
    },
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// TOML config file; flags override its values
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Port to listen to
    #[clap(long)]
    pub port: Option<u64>,

    /// Number of peers to keep and send
    #[clap(long)]
    pub peer_num: Option<usize>,

    /// Name of the node
    #[clap(long)]
    pub name: Option<String>,

    /// Version of the P2P protocol
    #[clap(long)]
    pub protocol_id: Option<String>,

    /// Version of the golem-messages library
    #[clap(long = "golem-messages")]
    pub golem_messages: Option<String>,

    /// Version of Golem
    #[clap(long)]
    pub golem_version: Option<String>,

    /// Run on mainnet (otherwise "-testnet" is appended to the protocol id)
    #[clap(long)]
    pub mainnet: bool,

    /// Private address announced in the node record
    #[clap(long)]
    pub prv_addr: Option<String>,

    /// Public address announced in the node record
    #[clap(long)]
    pub pub_addr: Option<String>,

    /// Minimum difficulty of remote keys; also used for the local key
    #[clap(long)]
    pub key_difficulty: Option<u32>,
}

impl RunArgs {
    /// Merge flags over the config file (or defaults).
    pub fn to_config(&self) -> crate::utils::Result<Config> {
        let mut cfg = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(port) = self.port {
            cfg.port = port;
        }
        if let Some(n) = self.peer_num {
            cfg.peer_num = n;
        }
        if let Some(name) = &self.name {
            cfg.name = name.clone();
        }
        if let Some(id) = &self.protocol_id {
            cfg.protocol_id = id.clone();
        }
        if let Some(v) = &self.golem_messages {
            cfg.golem_messages_version = v.clone();
        }
        if let Some(v) = &self.golem_version {
            cfg.golem_version = v.clone();
        }
        if let Some(addr) = &self.prv_addr {
            cfg.prv_addr = addr.clone();
            if !cfg.prv_addresses.contains(addr) {
                cfg.prv_addresses.insert(0, addr.clone());
            }
        }
        if let Some(addr) = &self.pub_addr {
            cfg.pub_addr = addr.clone();
        }
        if let Some(d) = self.key_difficulty {
            cfg.key_difficulty = d;
        }
        if !self.mainnet {
            cfg.protocol_id.push_str("-testnet");
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

pub async fn run_cli() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.cmd {
        Cmd::GenKey { difficulty } => {
            let key = generate_difficult_key(difficulty)?;
            println!("private key: {}", hex::encode(key.to_bytes()));
            println!("public key:  {}", key.public_key().hex());
            println!("difficulty:  {}", key.public_key().difficulty());
            Ok(())
        }
        Cmd::Run(args) => {
            let config = args.to_config().context("invalid configuration")?;
            info!(difficulty = config.key_difficulty, "generating node key");
            let key = generate_difficult_key(config.key_difficulty)?;
            let keeper = Arc::new(RandomizedPeerKeeper::new(config.peer_num));
            let service = Service::new(config, key, keeper)?;
            info!(config = ?service.context().config, "starting bootstrap node");

            let handle = service.start().await?;
            // Wait for Ctrl+C
            tokio::signal::ctrl_c().await?;
            info!("shutting down");
            handle.shutdown().await?;
            info!(metrics = ?METRICS.snapshot(), "bootstrap node stopped");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_testnet_suffix() {
        let cfg = RunArgs::default().to_config().unwrap();
        assert_eq!(cfg.protocol_id, "31-testnet");

        let cfg = RunArgs { mainnet: true, protocol_id: Some("32".into()), ..Default::default() }
            .to_config()
            .unwrap();
        assert_eq!(cfg.protocol_id, "32");
    }

    #[test]
    fn test_flags_override() {
        let cli = Cli::parse_from([
            "overlay-bootstrap",
            "run",
            "--port",
            "5555",
            "--peer-num",
            "7",
            "--golem-messages",
            "3.0.0",
            "--prv-addr",
            "10.1.1.1",
        ]);
        let Cmd::Run(args) = cli.cmd else { panic!("expected run") };
        let cfg = args.to_config().unwrap();
        assert_eq!(cfg.port, 5555);
        assert_eq!(cfg.peer_num, 7);
        assert_eq!(cfg.golem_messages_version, "3.0.0");
        assert_eq!(cfg.prv_addresses, vec!["10.1.1.1".to_string()]);
    }

    #[test]
    fn test_invalid_flags() {
        let args = RunArgs { key_difficulty: Some(400), ..Default::default() };
        assert!(args.to_config().is_err());
    }
}
