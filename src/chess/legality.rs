//! The admission oracle: decides whether a candidate move may start, given a
//! snapshot of pieces, in-flight traversals and cooldowns. The same code
//! answers on the authoritative side (command admission) and on clients
//! (move hints over a replicated snapshot), so the two can never disagree.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::chess::board::Board;
use crate::chess::core::{ActiveMove, Cooldown, Path, Piece, PieceId, PieceKind, Player, Square};
use crate::chess::geometry::{self, MoveGeometry};

/// Why a candidate move was turned away. The serialized names are the wire
/// codes reported to the submitting player; the engine state is unaffected
/// by a rejection.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum RejectReason {
    NotYourPiece,
    PieceCaptured,
    PieceMoving,
    PieceOnCooldown,
    OutOfBounds,
    InvalidSquare,
    IllegalGeometry,
    PathBlocked,
    DestinationReserved,
    CastlingIneligible,
}

impl RejectReason {
    /// Wire code, identical to the serde form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotYourPiece => "not_your_piece",
            Self::PieceCaptured => "piece_captured",
            Self::PieceMoving => "piece_moving",
            Self::PieceOnCooldown => "piece_on_cooldown",
            Self::OutOfBounds => "out_of_bounds",
            Self::InvalidSquare => "invalid_square",
            Self::IllegalGeometry => "illegal_geometry",
            Self::PathBlocked => "path_blocked",
            Self::DestinationReserved => "destination_reserved",
            Self::CastlingIneligible => "castling_ineligible",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An admitted move: the waypoints the piece will travel, plus the rook leg
/// when the move is a castle.
#[derive(Clone, Debug, PartialEq)]
pub struct Admission {
    #[allow(missing_docs)]
    pub path: Path,
    #[allow(missing_docs)]
    pub partner: Option<CastleLeg>,
}

/// The companion traversal of a castle.
#[derive(Clone, Debug, PartialEq)]
pub struct CastleLeg {
    #[allow(missing_docs)]
    pub piece: PieceId,
    #[allow(missing_docs)]
    pub path: Path,
}

/// A borrowed view of everything admission depends on. Admission never looks
/// at fractional sub-tick positions: a piece either rests on its integer
/// square or is in flight, and in-flight pieces neither block nor get
/// captured at rest.
pub struct Oracle<'a> {
    board: Board,
    pieces: &'a [Piece],
    moves: &'a [ActiveMove],
    cooldowns: &'a [Cooldown],
}

impl<'a> Oracle<'a> {
    #[allow(missing_docs)]
    #[must_use]
    pub const fn new(
        board: Board,
        pieces: &'a [Piece],
        moves: &'a [ActiveMove],
        cooldowns: &'a [Cooldown],
    ) -> Self {
        Self {
            board,
            pieces,
            moves,
            cooldowns,
        }
    }

    /// Decides a candidate move. `Ok` carries the traversal to start; `Err`
    /// carries the wire reason code.
    ///
    /// # Errors
    ///
    /// One of [`RejectReason`]; rejection leaves no trace in the state.
    pub fn admit(
        &self,
        player: Player,
        piece_id: PieceId,
        target: Square,
    ) -> Result<Admission, RejectReason> {
        let piece = self.piece(piece_id).ok_or(RejectReason::NotYourPiece)?;
        if piece.owner != player {
            return Err(RejectReason::NotYourPiece);
        }
        if piece.captured {
            return Err(RejectReason::PieceCaptured);
        }
        if self.is_moving(piece_id) {
            return Err(RejectReason::PieceMoving);
        }
        if self.on_cooldown(piece_id) {
            return Err(RejectReason::PieceOnCooldown);
        }
        if !self.board.contains(target) {
            return Err(RejectReason::OutOfBounds);
        }
        if !self.board.valid_square(target) {
            return Err(RejectReason::InvalidSquare);
        }
        if target == piece.square {
            return Err(RejectReason::IllegalGeometry);
        }

        if piece.kind == PieceKind::King {
            if let Some(route) = geometry::castle_route(self.board, player, piece.square, target) {
                return self.admit_castle(piece, &route);
            }
        }

        let shape = geometry::classify(self.board, piece.kind, player, piece.square, target)
            .ok_or(RejectReason::IllegalGeometry)?;
        let path = shape.path();

        // Intermediate squares must hold no resting piece. In-flight pieces
        // do not block: contact with them is the collision resolver's
        // business, not admission's.
        for square in &path[1..path.len() - 1] {
            if self.rester_at(*square).is_some() {
                return Err(RejectReason::PathBlocked);
            }
        }
        let occupant = self.rester_at(target);
        match shape {
            MoveGeometry::PawnCapture(_) => match occupant {
                // The diagonal only exists when there is something to take,
                // and moving enemies cannot be captured at rest.
                Some(enemy) if enemy.owner != player => {}
                _ => return Err(RejectReason::IllegalGeometry),
            },
            MoveGeometry::PawnPush(_) | MoveGeometry::PawnDouble(_) => {
                if occupant.is_some() {
                    return Err(RejectReason::PathBlocked);
                }
            }
            MoveGeometry::Slide(_) | MoveGeometry::Jump(_) => {
                if occupant.is_some_and(|rester| rester.owner == player) {
                    return Err(RejectReason::PathBlocked);
                }
            }
        }

        // No friendly traversal may already be headed to any square we will
        // cross, the target included. First command to reserve a square wins.
        for square in &path[1..] {
            if self.friendly_reserved(player, *square) {
                return Err(RejectReason::DestinationReserved);
            }
        }

        Ok(Admission {
            path: shape.into_path(),
            partner: None,
        })
    }

    /// Castling preconditions; every failure reports `castling_ineligible`.
    fn admit_castle(
        &self,
        king: &Piece,
        route: &geometry::CastleRoute,
    ) -> Result<Admission, RejectReason> {
        if king.has_moved {
            return Err(RejectReason::CastlingIneligible);
        }
        let rook = match self.rester_at(route.rook_from) {
            Some(rook)
                if rook.owner == king.owner
                    && rook.kind == PieceKind::Rook
                    && !rook.has_moved =>
            {
                rook
            }
            _ => return Err(RejectReason::CastlingIneligible),
        };
        for square in &route.between {
            if self.rester_at(*square).is_some() {
                return Err(RejectReason::CastlingIneligible);
            }
        }
        let king_to = route.king_path[1];
        let rook_to = route.rook_path[1];
        for square in [king_to, rook_to] {
            // The participants themselves may occupy each other's end square
            // (the wide board's short castle lands the king on the rook's
            // home); anyone else in the way blocks the castle.
            if self
                .rester_at(square)
                .is_some_and(|rester| rester.id != king.id && rester.id != rook.id)
            {
                return Err(RejectReason::CastlingIneligible);
            }
            if self.friendly_reserved(king.owner, square) {
                return Err(RejectReason::CastlingIneligible);
            }
        }
        Ok(Admission {
            path: route.king_path.clone(),
            partner: Some(CastleLeg {
                piece: rook.id,
                path: route.rook_path.clone(),
            }),
        })
    }

    /// Squares the piece could be admitted to right now; drives UI hints.
    #[must_use]
    pub fn legal_targets(&self, piece_id: PieceId) -> Vec<Square> {
        let Some(piece) = self.piece(piece_id) else {
            return Vec::new();
        };
        let owner = piece.owner;
        self.board
            .squares()
            .filter(|target| self.admit(owner, piece_id, *target).is_ok())
            .collect()
    }

    fn piece(&self, id: PieceId) -> Option<&Piece> {
        let piece = self.pieces.get(id.0 as usize)?;
        debug_assert_eq!(piece.id, id, "piece table must be id-indexed");
        Some(piece)
    }

    fn is_moving(&self, id: PieceId) -> bool {
        self.moves.iter().any(|active| active.piece == id)
    }

    fn on_cooldown(&self, id: PieceId) -> bool {
        self.cooldowns
            .iter()
            .any(|cooldown| cooldown.piece == id && cooldown.remaining > 0)
    }

    /// The resting, uncaptured piece on a square, if any. A piece in flight
    /// occupies no square for admission purposes.
    fn rester_at(&self, square: Square) -> Option<&Piece> {
        self.pieces
            .iter()
            .find(|piece| !piece.captured && piece.square == square && !self.is_moving(piece.id))
    }

    fn friendly_reserved(&self, player: Player, square: Square) -> bool {
        self.moves.iter().any(|active| {
            active.destination() == square
                && self
                    .piece(active.piece)
                    .is_some_and(|piece| piece.owner == player)
        })
    }
}
