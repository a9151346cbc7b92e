//! Ordered turn log with optimistic insert, commit and rollback

use super::types::{status_for, Turn, TurnId, DEFAULT_TEMP_PREFIX};
use crate::{ChatterError, Result};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info};

/// Thread-safe turn log.
///
/// At most one turn is `Pending` at any time. Reads return sorted copies, so
/// a snapshot never observes a half-applied mutation.
#[derive(Debug, Clone)]
pub struct TurnStore {
    turns: Arc<RwLock<Vec<Turn>>>,
    temp_prefix: Arc<str>,
}

impl TurnStore {
    pub fn new() -> Self {
        Self::with_prefix(DEFAULT_TEMP_PREFIX)
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            turns: Arc::new(RwLock::new(Vec::new())),
            temp_prefix: Arc::from(prefix.into()),
        }
    }

    /// Append a pending turn with a fresh temporary id
    pub fn append_optimistic(&self, query: impl Into<String>) -> Result<Turn> {
        let mut turns = self.turns.write();

        if let Some(pending) = turns.iter().find(|t| t.is_pending()) {
            return Err(ChatterError::Conflict(format!(
                "turn {} is still awaiting a response",
                pending.id
            )));
        }

        let turn = Turn::pending(TurnId::temporary(&self.temp_prefix), query);
        debug!("Appended optimistic turn {}", turn.id);
        turns.push(turn.clone());
        Ok(turn)
    }

    /// Settle the pending turn `temp_id` with the server's response and id
    pub fn commit(
        &self,
        temp_id: &TurnId,
        response: impl Into<String>,
        server_id: TurnId,
    ) -> Result<Turn> {
        let mut turns = self.turns.write();

        let turn = turns
            .iter_mut()
            .find(|t| &t.id == temp_id && t.is_pending())
            .ok_or_else(|| {
                ChatterError::NotFound(format!("no pending turn with id {}", temp_id))
            })?;

        turn.response = response.into();
        turn.status = status_for(&turn.response);
        turn.id = server_id;

        debug!("Committed turn {} as {}", temp_id, turn.id);
        Ok(turn.clone())
    }

    /// Remove the turn `temp_id`. Returns whether anything was removed.
    ///
    /// Idempotent: a turn that is already gone or was committed under its
    /// server id is left alone.
    pub fn rollback(&self, temp_id: &TurnId) -> bool {
        let mut turns = self.turns.write();
        let before = turns.len();
        turns.retain(|t| &t.id != temp_id);
        let removed = turns.len() != before;

        if removed {
            debug!("Rolled back turn {}", temp_id);
        }
        removed
    }

    /// Seed the store with fetched turns.
    ///
    /// Fetched turns replace local turns with the same id; local turns the
    /// server did not return are kept. Turns already in the log stay ahead of
    /// new ones, so equal timestamps keep insertion order.
    pub fn replace_all(&self, mut fetched: Vec<Turn>) -> Result<()> {
        let mut turns = self.turns.write();

        if let Some(pending) = turns.iter().find(|t| t.is_pending()) {
            return Err(ChatterError::Conflict(format!(
                "cannot load history while turn {} is pending",
                pending.id
            )));
        }

        let fetched_count = fetched.len();
        let mut merged: Vec<Turn> = Vec::with_capacity(turns.len() + fetched_count);
        let mut kept = 0;

        // Existing turns keep their slot; a fetched copy replaces a local one in place
        for local in turns.drain(..) {
            match fetched.iter().position(|t| t.id == local.id) {
                Some(index) => merged.push(fetched.remove(index)),
                None => {
                    kept += 1;
                    merged.push(local);
                }
            }
        }
        merged.extend(fetched);

        info!(
            "Loaded {} turns from history ({} local turns kept)",
            fetched_count, kept
        );

        *turns = merged;
        Ok(())
    }

    /// Sorted copy of the log, oldest first. Equal timestamps keep insertion order.
    pub fn snapshot(&self) -> Vec<Turn> {
        let mut turns = self.turns.read().clone();
        turns.sort_by_key(|t| t.created_at);
        turns
    }

    pub fn get(&self, id: &TurnId) -> Option<Turn> {
        self.turns.read().iter().find(|t| &t.id == id).cloned()
    }

    pub fn pending(&self) -> Option<Turn> {
        self.turns.read().iter().find(|t| t.is_pending()).cloned()
    }

    /// Most recent complete turn in display order
    pub fn latest_complete(&self) -> Option<Turn> {
        self.snapshot().into_iter().rev().find(|t| t.is_complete())
    }

    pub fn temp_prefix(&self) -> &str {
        &self.temp_prefix
    }

    pub fn clear(&self) {
        self.turns.write().clear();
    }

    pub fn len(&self) -> usize {
        self.turns.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.read().is_empty()
    }
}

impl Default for TurnStore {
    fn default() -> Self {
        Self::new()
    }
}
