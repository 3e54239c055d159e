//! Session registry
//!
//! The registry owns every live session and is the only place where
//! sessions are created or destroyed. Workers report status back through
//! its synchronized setters.

pub mod engine;
pub mod session;

pub use engine::SessionRegistry;
pub use session::{Counters, Session, SessionId, StatusFlag};

#[cfg(test)]
mod tests;
