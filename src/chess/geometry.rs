//! Pure move geometry: which squares a piece kind can reach and the exact
//! waypoints it travels through. Nothing here consults live game state; the
//! legality oracle layers occupancy and reservation rules on top.

use crate::chess::board::{Board, BoardKind};
use crate::chess::core::{Path, PieceKind, Player, Square};

/// Geometric shape of a candidate move. The variants drive the occupancy
/// rules: slides are blocked by resting pieces along the way, jumps ignore
/// them, and the pawn shapes differ in whether they may (or must) capture.
#[derive(Clone, Debug, PartialEq)]
pub enum MoveGeometry {
    /// Rook, bishop, queen and single-step king moves: every traversed
    /// square is a waypoint.
    Slide(Path),
    /// Knight jump: origin and destination only.
    Jump(Path),
    /// Single pawn step forward; never captures.
    PawnPush(Path),
    /// Double pawn step from the home line; never captures.
    PawnDouble(Path),
    /// Diagonal pawn step; only exists as a capture.
    PawnCapture(Path),
}

impl MoveGeometry {
    /// Waypoints of the traversal, origin first.
    #[must_use]
    pub const fn path(&self) -> &Path {
        match self {
            Self::Slide(path)
            | Self::Jump(path)
            | Self::PawnPush(path)
            | Self::PawnDouble(path)
            | Self::PawnCapture(path) => path,
        }
    }

    #[must_use]
    pub(crate) fn into_path(self) -> Path {
        match self {
            Self::Slide(path)
            | Self::Jump(path)
            | Self::PawnPush(path)
            | Self::PawnDouble(path)
            | Self::PawnCapture(path) => path,
        }
    }
}

/// Forward direction of a pawn, per board and seat. On the four-player board
/// the seats push toward the opposite edge of their home line.
#[must_use]
pub const fn pawn_advance(kind: BoardKind, player: Player) -> (i8, i8) {
    match kind {
        BoardKind::Standard => match player {
            Player::One => (-1, 0),
            _ => (1, 0),
        },
        BoardKind::FourPlayer => match player {
            Player::One => (0, -1),
            Player::Two => (-1, 0),
            Player::Three => (0, 1),
            Player::Four => (1, 0),
        },
    }
}

/// The line a pawn must still be on to be eligible for the double step.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HomeAxis {
    /// Pawns of this seat start on a fixed row.
    Row(u8),
    /// Pawns of this seat start on a fixed column.
    Col(u8),
}

impl HomeAxis {
    #[allow(missing_docs)]
    #[must_use]
    pub const fn contains(self, square: Square) -> bool {
        match self {
            Self::Row(row) => square.row == row,
            Self::Col(col) => square.col == col,
        }
    }
}

/// Home axis of a seat's pawns.
#[must_use]
pub const fn pawn_home(kind: BoardKind, player: Player) -> HomeAxis {
    match kind {
        BoardKind::Standard => match player {
            Player::One => HomeAxis::Row(6),
            _ => HomeAxis::Row(1),
        },
        BoardKind::FourPlayer => match player {
            Player::One => HomeAxis::Col(10),
            Player::Two => HomeAxis::Row(10),
            Player::Three => HomeAxis::Col(1),
            Player::Four => HomeAxis::Row(1),
        },
    }
}

/// Classifies a candidate (origin, target) pair for a piece kind. Returns
/// `None` when the kind cannot make that shape of move at all, or when the
/// straight line would pass through an excised corner.
///
/// Castling is not a shape: see [`castle_route`].
#[must_use]
pub fn classify(
    board: Board,
    kind: PieceKind,
    owner: Player,
    from: Square,
    to: Square,
) -> Option<MoveGeometry> {
    if from == to || !board.valid_square(to) {
        return None;
    }
    let dr = i16::from(to.row) - i16::from(from.row);
    let dc = i16::from(to.col) - i16::from(from.col);
    match kind {
        PieceKind::Pawn => pawn_shape(board, owner, from, to),
        PieceKind::Knight => {
            if (dr.abs() == 1 && dc.abs() == 2) || (dr.abs() == 2 && dc.abs() == 1) {
                Some(MoveGeometry::Jump(endpoints(from, to)))
            } else {
                None
            }
        }
        PieceKind::Bishop => {
            if dr.abs() == dc.abs() {
                ray(board, from, to).map(MoveGeometry::Slide)
            } else {
                None
            }
        }
        PieceKind::Rook => {
            if dr == 0 || dc == 0 {
                ray(board, from, to).map(MoveGeometry::Slide)
            } else {
                None
            }
        }
        PieceKind::Queen => {
            if dr == 0 || dc == 0 || dr.abs() == dc.abs() {
                ray(board, from, to).map(MoveGeometry::Slide)
            } else {
                None
            }
        }
        PieceKind::King => {
            if dr.abs() <= 1 && dc.abs() <= 1 {
                ray(board, from, to).map(MoveGeometry::Slide)
            } else {
                None
            }
        }
    }
}

fn pawn_shape(board: Board, owner: Player, from: Square, to: Square) -> Option<MoveGeometry> {
    let (fr, fc) = pawn_advance(board.kind(), owner);
    if let Some(forward) = from.offset(fr, fc).filter(|sq| board.valid_square(*sq)) {
        if to == forward {
            return Some(MoveGeometry::PawnPush(endpoints(from, to)));
        }
        // Double step, only from the home line; the intermediate is a
        // waypoint so the pawn physically crosses it.
        if pawn_home(board.kind(), owner).contains(from) {
            if let Some(double) = forward.offset(fr, fc) {
                if to == double && board.valid_square(double) {
                    let mut path = Path::new();
                    path.push(from);
                    path.push(forward);
                    path.push(double);
                    return Some(MoveGeometry::PawnDouble(path));
                }
            }
        }
    }
    // Diagonal captures sit one step to either side of the forward square;
    // they stay available even where the forward square is unplayable.
    for (dr, dc) in [(fr + fc, fc + fr), (fr - fc, fc - fr)] {
        if from.offset(dr, dc) == Some(to) {
            return Some(MoveGeometry::PawnCapture(endpoints(from, to)));
        }
    }
    None
}

/// Walks the straight line from `from` to `to` inclusive. `None` when any
/// traversed square is unplayable.
fn ray(board: Board, from: Square, to: Square) -> Option<Path> {
    let dr = i16::from(to.row) - i16::from(from.row);
    let dc = i16::from(to.col) - i16::from(from.col);
    let steps = dr.abs().max(dc.abs());
    debug_assert!(steps > 0);
    let mut path = Path::new();
    path.push(from);
    let mut cursor = from;
    for _ in 0..steps {
        cursor = cursor.offset(dr.signum() as i8, dc.signum() as i8)?;
        if !board.valid_square(cursor) {
            return None;
        }
        path.push(cursor);
    }
    Some(path)
}

fn endpoints(from: Square, to: Square) -> Path {
    let mut path = Path::new();
    path.push(from);
    path.push(to);
    path
}

/// Both legs of a castle. Each leg is a single-segment traversal covering
/// one square's worth of travel time regardless of the distance spanned.
#[derive(Clone, Debug, PartialEq)]
pub struct CastleRoute {
    /// Where the rook must currently rest.
    pub rook_from: Square,
    /// King leg, origin first.
    pub king_path: Path,
    /// Rook leg, origin first.
    pub rook_path: Path,
    /// Squares strictly between the king and rook homes; all must be free of
    /// resting pieces for the castle to be admitted.
    pub between: Path,
}

/// Recognizes a castle attempt: a two-square king move along its home line.
/// Returns the geometry only; eligibility (unmoved flags, clear squares,
/// reservations) is the oracle's business.
#[must_use]
pub fn castle_route(board: Board, player: Player, from: Square, to: Square) -> Option<CastleRoute> {
    let (horizontal, fixed) = home_anchor(board, player)?;
    let line = |free: u8| {
        if horizontal {
            Square::new(fixed, free)
        } else {
            Square::new(free, fixed)
        }
    };
    let free_of = |square: Square| {
        if horizontal {
            (square.row == fixed).then_some(square.col)
        } else {
            (square.col == fixed).then_some(square.row)
        }
    };

    let from_free = free_of(from)?;
    let to_free = free_of(to)?;
    if from_free != king_home_free(board.kind()) {
        return None;
    }
    let (low_rook, high_rook) = rook_homes(board.kind());
    let side: i8 = if to_free == from_free + 2 {
        1
    } else if from_free >= 2 && to_free == from_free - 2 {
        -1
    } else {
        return None;
    };
    let rook_free = if side > 0 { high_rook } else { low_rook };
    // The rook ends on the inside-adjacent square of the king's destination.
    let rook_to_free = (i16::from(to_free) - i16::from(side)) as u8;

    let mut between = Path::new();
    let (lo, hi) = (from_free.min(rook_free), from_free.max(rook_free));
    for free in lo + 1..hi {
        between.push(line(free));
    }
    let mut king_path = Path::new();
    king_path.push(from);
    king_path.push(line(to_free));
    let mut rook_path = Path::new();
    rook_path.push(line(rook_free));
    rook_path.push(line(rook_to_free));

    Some(CastleRoute {
        rook_from: line(rook_free),
        king_path,
        rook_path,
        between,
    })
}

/// Orientation and fixed coordinate of a seat's back line, when the seat
/// exists on this board.
fn home_anchor(board: Board, player: Player) -> Option<(bool, u8)> {
    let w = board.kind().width();
    match board.kind() {
        BoardKind::Standard => match player {
            Player::One => Some((true, w - 1)),
            Player::Two => Some((true, 0)),
            _ => None,
        },
        BoardKind::FourPlayer => match player {
            Player::One => Some((false, w - 1)),
            Player::Two => Some((true, w - 1)),
            Player::Three => Some((false, 0)),
            Player::Four => Some((true, 0)),
        },
    }
}

const fn king_home_free(kind: BoardKind) -> u8 {
    match kind {
        BoardKind::Standard => 4,
        BoardKind::FourPlayer => 6,
    }
}

/// Free-axis coordinates of the two rook homes. The wide board's rooks sit
/// on the surviving ends of the cut home line.
const fn rook_homes(kind: BoardKind) -> (u8, u8) {
    match kind {
        BoardKind::Standard => (0, 7),
        BoardKind::FourPlayer => (3, 8),
    }
}
