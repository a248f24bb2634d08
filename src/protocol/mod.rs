//! Replication messages consumed by renderers, replay storage and remote
//! clients. A full [`Delta`] is a snapshot; a field-restricted one is an
//! update. Fractional positions turn into floats here and nowhere else.

pub mod mirror;
pub mod replay;

use serde::{Deserialize, Serialize};

use crate::chess::board::BoardKind;
use crate::chess::core::{ActiveMove, Path, PieceId, PieceKind, Player};
use crate::game::{ChangeLog, EndReason, GameState, PlayerFlags, Speed, Status};

/// Consumers interpolating past the last update clamp their extrapolation to
/// this horizon, guarding against stalled streams.
pub const VISUAL_CLAMP_MS: u64 = 10_000;

/// Wire form of one piece. `row`/`col` are fractional while the piece is in
/// flight and exact integers at rest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PieceState {
    #[allow(missing_docs)]
    pub id: PieceId,
    #[allow(missing_docs)]
    pub kind: PieceKind,
    #[allow(missing_docs)]
    pub owner: Player,
    #[allow(missing_docs)]
    pub row: f64,
    #[allow(missing_docs)]
    pub col: f64,
    #[allow(missing_docs)]
    pub captured: bool,
    #[allow(missing_docs)]
    pub moving: bool,
    #[allow(missing_docs)]
    pub on_cooldown: bool,
    #[allow(missing_docs)]
    pub has_moved: bool,
}

/// Wire form of an in-flight traversal, complete with its path so consumers
/// can interpolate without asking again.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MoveState {
    #[allow(missing_docs)]
    pub piece: PieceId,
    #[allow(missing_docs)]
    pub path: Path,
    #[allow(missing_docs)]
    pub start_tick: u64,
    #[allow(missing_docs)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner: Option<PieceId>,
}

/// Wire form of a cooldown at install time.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownState {
    #[allow(missing_docs)]
    pub piece: PieceId,
    #[allow(missing_docs)]
    pub remaining: u32,
}

/// Wire form of one seat's flags.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatState {
    #[allow(missing_docs)]
    pub player: Player,
    #[allow(missing_docs)]
    pub eliminated: bool,
    #[allow(missing_docs)]
    pub resigned: bool,
    #[allow(missing_docs)]
    pub draw_offered: bool,
}

/// One replication message. Snapshots populate every field; updates carry
/// only what changed in their tick. Consumers merge by piece id; a piece
/// arriving with `captured == true` also clears its traversal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    /// Tick this message describes.
    pub tick: u64,
    /// Milliseconds between the tick's logical instant and serialization;
    /// consumers fold it into their interpolation clock.
    pub time_since_tick: u64,
    #[allow(missing_docs)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board: Option<BoardKind>,
    #[allow(missing_docs)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<Speed>,
    #[allow(missing_docs)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[allow(missing_docs)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Player>,
    #[allow(missing_docs)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<EndReason>,
    #[allow(missing_docs)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pieces: Vec<PieceState>,
    #[allow(missing_docs)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub moves: Vec<MoveState>,
    #[allow(missing_docs)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cooldowns: Vec<CooldownState>,
    #[allow(missing_docs)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub seats: Vec<SeatState>,
}

impl Delta {
    /// Full state for a fresh consumer.
    #[must_use]
    pub fn snapshot(state: &GameState, time_since_tick: u64) -> Self {
        Self {
            tick: state.tick(),
            time_since_tick,
            board: Some(state.board().kind()),
            speed: Some(state.speed()),
            status: Some(state.status()),
            winner: state.winner(),
            reason: state.end_reason(),
            pieces: state
                .pieces()
                .iter()
                .map(|piece| piece_state(state, piece.id))
                .collect(),
            moves: state.active_moves().iter().map(move_state).collect(),
            cooldowns: state
                .cooldowns()
                .iter()
                .map(|cooldown| CooldownState {
                    piece: cooldown.piece,
                    remaining: cooldown.remaining,
                })
                .collect(),
            seats: state
                .participants()
                .map(|player| seat_state(state, player))
                .collect(),
        }
    }

    /// Minimal update for one tick, or `None` when nothing observable
    /// changed and emission is suppressed.
    #[must_use]
    pub fn update(state: &GameState, changes: &ChangeLog, time_since_tick: u64) -> Option<Self> {
        if changes.is_empty() {
            return None;
        }
        let moves = changes
            .started_moves()
            .iter()
            .filter_map(|id| {
                state
                    .active_moves()
                    .iter()
                    .find(|active| active.piece == *id)
            })
            .map(move_state)
            .collect();
        let cooldowns = changes
            .installed_cooldowns()
            .iter()
            .filter_map(|id| {
                state
                    .cooldowns()
                    .iter()
                    .find(|cooldown| cooldown.piece == *id)
            })
            .map(|cooldown| CooldownState {
                piece: cooldown.piece,
                remaining: cooldown.remaining,
            })
            .collect();
        Some(Self {
            tick: state.tick(),
            time_since_tick,
            board: None,
            speed: None,
            status: changes.status_changed().then_some(state.status()),
            winner: if changes.status_changed() {
                state.winner()
            } else {
                None
            },
            reason: if changes.status_changed() {
                state.end_reason()
            } else {
                None
            },
            pieces: changes
                .pieces()
                .iter()
                .map(|id| piece_state(state, *id))
                .collect(),
            moves,
            cooldowns,
            seats: changes
                .seats()
                .iter()
                .map(|player| seat_state(state, *player))
                .collect(),
        })
    }
}

fn seat_state(state: &GameState, player: Player) -> SeatState {
    let flags = state.flags(player);
    SeatState {
        player,
        eliminated: flags.contains(PlayerFlags::ELIMINATED),
        resigned: flags.contains(PlayerFlags::RESIGNED),
        draw_offered: flags.contains(PlayerFlags::DRAW_OFFERED),
    }
}

fn piece_state(state: &GameState, id: PieceId) -> PieceState {
    let piece = &state.pieces()[id.0 as usize];
    let tps = state.params().ticks_per_square;
    let active = state
        .active_moves()
        .iter()
        .find(|active| active.piece == id);
    let (row, col) = match active {
        Some(active) => active.scaled_position(state.tick(), tps).fractional(tps),
        None => (f64::from(piece.square.row), f64::from(piece.square.col)),
    };
    PieceState {
        id,
        kind: piece.kind,
        owner: piece.owner,
        row,
        col,
        captured: piece.captured,
        moving: active.is_some(),
        on_cooldown: state
            .cooldowns()
            .iter()
            .any(|cooldown| cooldown.piece == id),
        has_moved: piece.has_moved,
    }
}

fn move_state(active: &ActiveMove) -> MoveState {
    MoveState {
        piece: active.piece,
        path: active.path.clone(),
        start_tick: active.start_tick,
        partner: active.partner,
    }
}

/// The tick a consumer should render, interpolated from the last message and
/// clamped so a stalled stream freezes instead of running away.
#[must_use]
pub fn visual_tick(delta: &Delta, since_receive_ms: u64, tick_period_ms: u64) -> f64 {
    let advance = (since_receive_ms + delta.time_since_tick).min(VISUAL_CLAMP_MS);
    delta.tick as f64 + advance as f64 / tick_period_ms as f64
}
