//! Contract of the remote chat service
//!
//! The transport behind [`ChatBackend`] is supplied by the embedding
//! application; the session only depends on this trait.

pub mod types;

pub use types::{ChatReply, HistoryEntry, HistoryPage};

use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send one user message and wait for the assistant's reply.
    ///
    /// Transport failures map to `ChatterError::Network`, rejections by the
    /// service to `ChatterError::Remote`.
    async fn send_message(&self, text: &str) -> Result<ChatReply>;

    /// Fetch the signed-in user's earlier turns
    async fn get_history(&self) -> Result<HistoryPage>;
}
