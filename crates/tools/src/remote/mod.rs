//! The remote session core: tab discovery, CDP connections, the session
//! registry, and the code execution gateway every capability routes through.

pub mod cdp;
pub mod discovery;
pub mod gateway;
pub mod sessions;

pub use discovery::TabDescriptor;
pub use gateway::ExecOutcome;
pub use sessions::{SessionRegistry, TabSession, TargetStatus};
