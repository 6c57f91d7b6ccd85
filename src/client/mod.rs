//! Client management system
//!
//! Handles client connections, the session state machine and the registry
//! of connected clients.

pub mod handler;
pub mod registry;
pub mod session;
pub mod state;

pub use handler::handle_client;
pub use registry::ClientRegistry;
pub use session::{Session, SessionContext};
pub use state::{SessionEnd, SessionTiming};
