//! Live game state for one match: the piece registry, in-flight traversals,
//! cooldowns and per-seat flags, mutated in place by the tick processor.
//!
//! The state is owned by exactly one tick loop at a time. Speculative
//! lookahead (bots, what-if probes) works on a [`Clone`]; cloning is cheap
//! because everything lives in short flat vectors.

use std::fmt;
use std::fmt::Write as _;

use anyhow::bail;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::chess::board::{Board, BoardKind};
use crate::chess::core::{ActiveMove, Cooldown, Piece, PieceId, PieceKind, Player, Square};
use crate::chess::legality::{Admission, Oracle, RejectReason};

pub mod collision;
pub mod motion;
pub mod tick;

pub use tick::{ChangeLog, Command, Rejection, TickReport};

/// Default tick budget: one hour of play at 10 Hz. Exceeding it ends the
/// game with [`EndReason::Timeout`].
pub const DEFAULT_TICK_LIMIT: u64 = 36_000;

/// Named speed profiles. Both run the simulation at 10 Hz; they differ in
/// travel time and post-move quiescence.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speed {
    /// One second per square, ten seconds of cooldown.
    Standard,
    /// A fifth of a second per square, two seconds of cooldown.
    Lightning,
}

impl Speed {
    /// Concrete tick parameters of the profile.
    #[must_use]
    pub const fn params(self) -> SpeedParams {
        match self {
            Self::Standard => SpeedParams {
                tick_rate: 10,
                ticks_per_square: 10,
                cooldown_ticks: 100,
            },
            Self::Lightning => SpeedParams {
                tick_rate: 10,
                ticks_per_square: 2,
                cooldown_ticks: 20,
            },
        }
    }
}

/// Tick-rate and per-move timing knobs derived from a [`Speed`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeedParams {
    /// Simulation frequency in Hz.
    pub tick_rate: u32,
    /// Ticks a traversal spends on one path segment.
    pub ticks_per_square: u32,
    /// Quiescence installed when a traversal retires.
    pub cooldown_ticks: u32,
}

impl SpeedParams {
    /// Wall-clock length of one tick.
    #[must_use]
    pub const fn tick_period_ms(self) -> u64 {
        1_000 / self.tick_rate as u64
    }
}

/// Lifecycle of a match.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum Status {
    Waiting,
    Playing,
    Finished,
}

/// Why a match ended. Serialized names are the wire codes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum EndReason {
    KingCaptured,
    Resignation,
    DrawOffered,
    Timeout,
    Cancelled,
}

impl EndReason {
    /// Wire code, identical to the serde form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::KingCaptured => "king_captured",
            Self::Resignation => "resignation",
            Self::DrawOffered => "draw_offered",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The terminal event broadcast after the final update.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOver {
    /// `None` for draws, timeouts and cancellations.
    pub winner: Option<Player>,
    #[allow(missing_docs)]
    pub reason: EndReason,
}

bitflags::bitflags! {
    /// Per-seat state. An eliminated seat spectates: its pieces stay on the
    /// board as obstacles but accept no further commands.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct PlayerFlags: u8 {
        /// Standing draw offer; the game ends when every survivor offers.
        const DRAW_OFFERED = 1;
        /// The seat resigned (implies elimination).
        const RESIGNED = 1 << 1;
        /// The seat lost its king or resigned.
        const ELIMINATED = 1 << 2;
    }
}

/// Authoritative state of one match.
#[derive(Clone, Debug, PartialEq)]
pub struct GameState {
    pub(crate) board: Board,
    pub(crate) speed: Speed,
    pub(crate) params: SpeedParams,
    pub(crate) pieces: Vec<Piece>,
    pub(crate) moves: Vec<ActiveMove>,
    pub(crate) cooldowns: Vec<Cooldown>,
    pub(crate) tick: u64,
    pub(crate) status: Status,
    pub(crate) winner: Option<Player>,
    pub(crate) reason: Option<EndReason>,
    pub(crate) seats: [PlayerFlags; 4],
    pub(crate) tick_limit: u64,
    /// Cause of the most recent elimination; becomes the end reason when the
    /// last opponent falls.
    pub(crate) last_elimination: Option<EndReason>,
}

impl GameState {
    /// Fresh match in [`Status::Waiting`] with the starting placement.
    #[must_use]
    pub fn new(kind: BoardKind, speed: Speed) -> Self {
        let board = Board::new(kind);
        Self {
            board,
            speed,
            params: speed.params(),
            pieces: board.starting_pieces(),
            moves: Vec::new(),
            cooldowns: Vec::new(),
            tick: 0,
            status: Status::Waiting,
            winner: None,
            reason: None,
            seats: [PlayerFlags::default(); 4],
            tick_limit: DEFAULT_TICK_LIMIT,
            last_elimination: None,
        }
    }

    /// Overrides the tick budget.
    #[must_use]
    pub const fn with_tick_limit(mut self, limit: u64) -> Self {
        self.tick_limit = limit;
        self
    }

    /// Builds a custom position instead of the starting placement, for
    /// variant setups and scenario probes. Ids are assigned in placement
    /// order.
    ///
    /// # Errors
    ///
    /// Every placement must name a seated player and a distinct playable
    /// square.
    pub fn with_pieces(
        kind: BoardKind,
        speed: Speed,
        placements: &[(PieceKind, Player, Square)],
    ) -> anyhow::Result<Self> {
        let board = Board::new(kind);
        let mut pieces: Vec<Piece> = Vec::with_capacity(placements.len());
        for (index, (piece_kind, owner, square)) in placements.iter().enumerate() {
            if !board.valid_square(*square) {
                bail!("placement {index} is not on a playable square: {square}");
            }
            if pieces.iter().any(|piece| piece.square == *square) {
                bail!("two placements share {square}");
            }
            if !board.players().any(|player| player == *owner) {
                bail!("{owner} has no seat on a {kind:?} board");
            }
            pieces.push(Piece::new(
                PieceId(index as u8),
                *piece_kind,
                *owner,
                *square,
            ));
        }
        let mut state = Self::new(kind, speed);
        state.pieces = pieces;
        Ok(state)
    }

    /// Empty shell used by the replication mirror; pieces and moves arrive
    /// through the snapshot.
    #[must_use]
    pub(crate) fn bare(kind: BoardKind, speed: Speed) -> Self {
        let mut state = Self::new(kind, speed);
        state.pieces.clear();
        state
    }

    /// Transitions the match into play. A no-op unless waiting.
    pub fn start(&mut self) {
        if self.status == Status::Waiting {
            self.status = Status::Playing;
            log::info!(
                "game started: {:?} board, {:?} speed, tick {}",
                self.board.kind(),
                self.speed,
                self.tick
            );
        }
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn board(&self) -> Board {
        self.board
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn speed(&self) -> Speed {
        self.speed
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn params(&self) -> SpeedParams {
        self.params
    }

    /// Ticks fully processed so far.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn winner(&self) -> Option<Player> {
        self.winner
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn end_reason(&self) -> Option<EndReason> {
        self.reason
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn active_moves(&self) -> &[ActiveMove] {
        &self.moves
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn cooldowns(&self) -> &[Cooldown] {
        &self.cooldowns
    }

    /// Seats participating in this match.
    pub fn participants(&self) -> impl Iterator<Item = Player> {
        Player::iter().take(self.board.kind().player_count())
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn flags(&self, player: Player) -> PlayerFlags {
        self.seats[player.index()]
    }

    /// Looks a piece up by its stable id.
    #[must_use]
    pub fn piece(&self, id: PieceId) -> Option<&Piece> {
        self.pieces.get(id.0 as usize)
    }

    /// The resting, uncaptured piece on a square, if any.
    #[must_use]
    pub fn piece_at(&self, square: Square) -> Option<&Piece> {
        self.pieces
            .iter()
            .find(|piece| !piece.captured && piece.square == square && !self.is_moving(piece.id))
    }

    /// Whether the piece is currently in flight.
    #[must_use]
    pub fn is_moving(&self, id: PieceId) -> bool {
        self.moves.iter().any(|active| active.piece == id)
    }

    /// Admission oracle over the current state.
    #[must_use]
    pub fn oracle(&self) -> Oracle<'_> {
        Oracle::new(self.board, &self.pieces, &self.moves, &self.cooldowns)
    }

    /// Elimination-aware admission: spectators own nothing, then the shared
    /// oracle decides.
    ///
    /// # Errors
    ///
    /// A [`RejectReason`] wire code; the state is unaffected.
    pub fn admit(
        &self,
        player: Player,
        piece: PieceId,
        target: Square,
    ) -> Result<Admission, RejectReason> {
        if self.flags(player).contains(PlayerFlags::ELIMINATED) {
            return Err(RejectReason::NotYourPiece);
        }
        self.oracle().admit(player, piece, target)
    }

    /// Squares a piece could be admitted to right now.
    #[must_use]
    pub fn legal_targets(&self, piece: PieceId) -> Vec<Square> {
        match self.piece(piece) {
            Some(record) if !self.flags(record.owner).contains(PlayerFlags::ELIMINATED) => {
                self.oracle().legal_targets(piece)
            }
            _ => Vec::new(),
        }
    }

    /// Text rendering of the resting pieces for logs: uppercase letters for
    /// seat one, lowercase for everyone else, dots elsewhere.
    #[must_use]
    pub fn pretty(&self) -> String {
        let width = self.board.kind().width();
        let mut out = String::new();
        for row in 0..width {
            for col in 0..width {
                let square = Square::new(row, col);
                let glyph = if !self.board.valid_square(square) {
                    ' '
                } else {
                    self.piece_at(square).map_or('.', |piece| {
                        if piece.owner == Player::One {
                            piece.kind.letter().to_ascii_uppercase()
                        } else {
                            piece.kind.letter()
                        }
                    })
                };
                out.push(glyph);
            }
            out.push('\n');
        }
        let _ = write!(out, "tick {} ({:?})", self.tick, self.status);
        out
    }

    pub(crate) fn piece_mut(&mut self, id: PieceId) -> &mut Piece {
        &mut self.pieces[id.0 as usize]
    }

    pub(crate) fn flags_mut(&mut self, player: Player) -> &mut PlayerFlags {
        &mut self.seats[player.index()]
    }
}
