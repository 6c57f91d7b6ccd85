pub mod client;
pub mod config;
pub mod error;
pub mod poll;
pub mod protocol;
pub mod server;

pub use crate::config::ServerConfig;
pub use server::Server;
