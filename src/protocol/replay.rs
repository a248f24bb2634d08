//! Persisted replays: the initial snapshot, every emitted update in order,
//! then the terminal event. A replay folds back into a [`Mirror`] without
//! re-running the simulation.

use serde::{Deserialize, Serialize};

use crate::game::GameOver;
use crate::protocol::mirror::Mirror;
use crate::protocol::Delta;

/// Immutable record of one finished (or in-progress) game stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Replay {
    /// Full state at the point recording started.
    pub snapshot: Delta,
    /// Every update emitted afterwards, in tick order.
    pub updates: Vec<Delta>,
    /// Terminal event, absent while the game still runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal: Option<GameOver>,
}

impl Replay {
    /// Starts recording from a snapshot.
    #[must_use]
    pub const fn new(snapshot: Delta) -> Self {
        Self {
            snapshot,
            updates: Vec::new(),
            terminal: None,
        }
    }

    /// Appends one emitted update.
    pub fn record(&mut self, update: Delta) {
        self.updates.push(update);
    }

    /// Seals the replay with the terminal event.
    pub fn finish(&mut self, over: GameOver) {
        self.terminal = Some(over);
    }

    /// Folds the stream into a replica, yielding the final state.
    ///
    /// # Errors
    ///
    /// The snapshot or an update is malformed or out of order.
    pub fn replay(&self) -> anyhow::Result<Mirror> {
        let mut mirror = Mirror::from_snapshot(&self.snapshot)?;
        for update in &self.updates {
            mirror.apply(update)?;
        }
        Ok(mirror)
    }
}
