pub mod cli;
pub mod config;
pub mod service;
pub mod service_handle;
pub mod session;

pub use cli::run_cli;
pub use config::Config;
pub use service::{Service, ServiceContext};
pub use service_handle::ServiceHandle;
pub use session::{PeerSession, SessionState};
