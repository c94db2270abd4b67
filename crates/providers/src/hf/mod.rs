pub mod client;
pub mod config;

pub use client::HfClient;
pub use config::HfConfig;
