pub mod config;
pub mod transport;

pub use config::BrowserConfig;
pub use transport::Transport;
