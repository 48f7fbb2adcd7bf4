mod guardian;
mod machine;
mod service;

pub use guardian::Guardian;
pub use machine::{ProtectionMachine, ProtectionMode, ProtectionState};
pub use service::ProtectionService;
