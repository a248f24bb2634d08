//! Primitives shared by the whole engine: players, piece kinds, squares and
//! the data-model records ([`Piece`], [`ActiveMove`], [`Cooldown`]) that the
//! simulation mutates in place.

use std::fmt;

use anyhow::bail;
use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

/// The longest possible traversal is a corner-to-corner ray on the 12×12
/// board: 11 steps, 12 waypoints including the origin.
pub const MAX_PATH_LEN: usize = 12;

/// A traversal stored as explicit waypoints, origin first, destination last.
/// Paths are short, so they live inline instead of behind an allocation.
pub type Path = ArrayVec<Square, MAX_PATH_LEN>;

/// Seats at the table. Two-player games use [`Player::One`] and
/// [`Player::Two`]; the four-player board seats all four.
#[repr(u8)]
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum Player {
    One,
    Two,
    Three,
    Four,
}

impl Player {
    /// Zero-based seat index, useful for table lookups.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl TryFrom<u8> for Player {
    type Error = anyhow::Error;

    /// Accepts the one-based seat number used on the wire and in logs.
    fn try_from(seat: u8) -> anyhow::Result<Self> {
        match seat {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            3 => Ok(Self::Three),
            4 => Ok(Self::Four),
            _ => bail!("unknown player: expected seat within 1..=4, got {seat}"),
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", *self as u8 + 1)
    }
}

/// Standard chess piece kinds. There is no promotion in the real-time
/// variant, so the set is closed.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceKind {
    /// Lowercase algebraic letter, used in logs and board rendering.
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::Pawn => 'p',
            Self::Knight => 'n',
            Self::Bishop => 'b',
            Self::Rook => 'r',
            Self::Queen => 'q',
            Self::King => 'k',
        }
    }
}

impl TryFrom<char> for PieceKind {
    type Error = anyhow::Error;

    fn try_from(symbol: char) -> anyhow::Result<Self> {
        match symbol.to_ascii_lowercase() {
            'p' => Ok(Self::Pawn),
            'n' => Ok(Self::Knight),
            'b' => Ok(Self::Bishop),
            'r' => Ok(Self::Rook),
            'q' => Ok(Self::Queen),
            'k' => Ok(Self::King),
            _ => bail!("unknown piece symbol: expected within \"pnbrqk\", got '{symbol}'"),
        }
    }
}

impl fmt::Display for PieceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// A board coordinate. Row 0 is the top of the board as rendered; the
/// algebraic rank 1 is therefore the bottom row. Both board kinds fit in a
/// pair of bytes.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct Square {
    #[allow(missing_docs)]
    pub row: u8,
    #[allow(missing_docs)]
    pub col: u8,
}

impl Square {
    #[allow(missing_docs)]
    #[must_use]
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    /// Chebyshev (king-move) distance to another square.
    #[must_use]
    pub const fn chebyshev(self, other: Self) -> u8 {
        let dr = self.row.abs_diff(other.row);
        let dc = self.col.abs_diff(other.col);
        if dr > dc {
            dr
        } else {
            dc
        }
    }

    /// Steps by a signed offset without consulting any board: callers must
    /// still check validity against the board in play.
    #[must_use]
    pub fn offset(self, dr: i8, dc: i8) -> Option<Self> {
        let row = i16::from(self.row) + i16::from(dr);
        let col = i16::from(self.col) + i16::from(dc);
        if row < 0 || col < 0 {
            return None;
        }
        Some(Self::new(row as u8, col as u8))
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Stable identity of a piece within one game: the index into the piece
/// table assigned at setup. Pieces are never created after the game starts,
/// so the id doubles as the replication key.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PieceId(pub u8);

impl fmt::Display for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A piece on the board. `square` is the resting square, or the origin of
/// the traversal while the piece is in flight; fractional positions are
/// derived from the corresponding [`ActiveMove`], never stored here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Piece {
    #[allow(missing_docs)]
    pub id: PieceId,
    #[allow(missing_docs)]
    pub kind: PieceKind,
    #[allow(missing_docs)]
    pub owner: Player,
    #[allow(missing_docs)]
    pub square: Square,
    /// A captured piece never moves, blocks or collides again.
    pub captured: bool,
    /// Set once the piece completes (or aborts) its first traversal;
    /// consumes castling eligibility.
    pub has_moved: bool,
}

impl Piece {
    #[must_use]
    pub(crate) const fn new(id: PieceId, kind: PieceKind, owner: Player, square: Square) -> Self {
        Self {
            id,
            kind,
            owner,
            square,
            captured: false,
            has_moved: false,
        }
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.kind, self.owner, self.square.row, self.square.col
        )
    }
}

/// An in-flight traversal. The invariants the simulation maintains: the path
/// holds at least two waypoints, the referenced piece is not captured, and no
/// two active moves share a piece.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActiveMove {
    #[allow(missing_docs)]
    pub piece: PieceId,
    #[allow(missing_docs)]
    pub path: Path,
    /// Tick at which the command was admitted; elapsed travel is measured
    /// from here.
    pub start_tick: u64,
    /// Castling companion. The two legs of a castle share a start tick and
    /// ignore each other in collision resolution; each leg is otherwise an
    /// independent traversal.
    pub partner: Option<PieceId>,
}

impl ActiveMove {
    #[must_use]
    pub(crate) fn new(piece: PieceId, path: Path, start_tick: u64) -> Self {
        debug_assert!(path.len() >= 2, "a traversal needs origin and destination");
        Self {
            piece,
            path,
            start_tick,
            partner: None,
        }
    }

    /// Final square of the traversal.
    #[must_use]
    pub fn destination(&self) -> Square {
        self.path[self.path.len() - 1]
    }

    /// Number of waypoint-to-waypoint legs. Knight jumps and castling legs
    /// are a single leg regardless of distance covered.
    #[must_use]
    pub fn segments(&self) -> u32 {
        (self.path.len() - 1) as u32
    }
}

/// Post-move quiescence. Installed when a traversal retires and counted down
/// by the tick processor; the piece may not start a new move until expiry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cooldown {
    #[allow(missing_docs)]
    pub piece: PieceId,
    #[allow(missing_docs)]
    pub remaining: u32,
}
