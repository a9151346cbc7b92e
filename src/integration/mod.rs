//! Session layer
//!
//! Composes the turn store, remote chat service and speech controllers into a
//! signed-in conversational session.

pub mod config;
pub mod lifecycle;
pub mod orchestrator;

pub use config::SessionConfig;
pub use lifecycle::{SessionFactory, SessionHost, UserIdentity};
pub use orchestrator::{Session, SessionBuilder, SessionStatus};
