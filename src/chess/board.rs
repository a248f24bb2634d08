//! Board shapes and starting placements for the two supported variants: the
//! standard 8×8 two-player board and the 12×12 four-player board with its
//! corner blocks excised.

use std::fmt::Write as _;

use anyhow::{bail, Context};
use strum::IntoEnumIterator;

use crate::chess::core::{Piece, PieceId, PieceKind, Player, Square};

/// Back-rank piece order on the standard board, queenside first.
const STANDARD_BACK_RANK: [PieceKind; 8] = [
    PieceKind::Rook,
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Queen,
    PieceKind::King,
    PieceKind::Bishop,
    PieceKind::Knight,
    PieceKind::Rook,
];

/// The four-player home line spans the six squares that survive the corner
/// cut. Bishops do not fit; the layout keeps both knights so the airborne
/// rule stays relevant on this board.
const FOUR_PLAYER_BACK_RANK: [PieceKind; 6] = [
    PieceKind::Rook,
    PieceKind::Knight,
    PieceKind::Queen,
    PieceKind::King,
    PieceKind::Knight,
    PieceKind::Rook,
];

/// Which board the game is played on. Immutable after game creation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardKind {
    /// Classic 8×8, two players.
    Standard,
    /// 12×12 with the four 3×3 corner blocks invalid, four players.
    FourPlayer,
}

impl BoardKind {
    /// Side length in squares.
    #[must_use]
    pub const fn width(self) -> u8 {
        match self {
            Self::Standard => 8,
            Self::FourPlayer => 12,
        }
    }

    /// Size of the excised corner blocks.
    #[must_use]
    pub const fn corner_cut(self) -> u8 {
        match self {
            Self::Standard => 0,
            Self::FourPlayer => 3,
        }
    }

    /// Number of seats the board hosts.
    #[must_use]
    pub const fn player_count(self) -> usize {
        match self {
            Self::Standard => 2,
            Self::FourPlayer => 4,
        }
    }
}

/// Board geometry: square validity and starting placement. Carries no piece
/// state; the live registry lives in the game state.
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Board {
    kind: BoardKind,
}

impl Board {
    #[allow(missing_docs)]
    #[must_use]
    pub const fn new(kind: BoardKind) -> Self {
        Self { kind }
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn kind(self) -> BoardKind {
        self.kind
    }

    /// True when the coordinate lies within the bounding square, whether or
    /// not it survives the corner cut.
    #[must_use]
    pub const fn contains(self, square: Square) -> bool {
        let w = self.kind.width();
        square.row < w && square.col < w
    }

    /// True for playable squares: in bounds and outside the excised corners.
    #[must_use]
    pub const fn valid_square(self, square: Square) -> bool {
        if !self.contains(square) {
            return false;
        }
        let w = self.kind.width();
        let cut = self.kind.corner_cut();
        let edge_row = square.row < cut || square.row >= w - cut;
        let edge_col = square.col < cut || square.col >= w - cut;
        !(edge_row && edge_col)
    }

    /// Iterates every playable square in row-major order.
    pub fn squares(self) -> impl Iterator<Item = Square> {
        let w = self.kind.width();
        (0..w)
            .flat_map(move |row| (0..w).map(move |col| Square::new(row, col)))
            .filter(move |square| self.valid_square(*square))
    }

    /// Renders a square in algebraic notation. Rank 1 is the bottom row as
    /// rendered, so row 7 on the standard board is rank 1.
    #[must_use]
    pub fn algebraic(self, square: Square) -> String {
        let mut result = String::new();
        let _ = write!(
            result,
            "{}{}",
            (b'a' + square.col) as char,
            self.kind.width() - square.row
        );
        result
    }

    /// Parses algebraic notation ("e2", or "k10" on the wide board) into a
    /// square.
    ///
    /// # Errors
    ///
    /// Rejects notation that does not name a playable square of this board.
    pub fn square(self, notation: &str) -> anyhow::Result<Square> {
        let mut chars = notation.chars();
        let file = match chars.next() {
            Some(ch @ 'a'..='l') => ch as u8 - b'a',
            Some(ch) => bail!("unknown file: expected within 'a'..='l', got '{ch}'"),
            None => bail!("empty square notation"),
        };
        let rank: u8 = chars
            .as_str()
            .parse()
            .with_context(|| format!("unknown rank in square notation '{notation}'"))?;
        let w = self.kind.width();
        if rank == 0 || rank > w || file >= w {
            bail!("square '{notation}' is outside the {w}x{w} board");
        }
        let square = Square::new(w - rank, file);
        if !self.valid_square(square) {
            bail!("square '{notation}' falls inside an excised corner");
        }
        Ok(square)
    }

    /// Seats participating on this board, in order.
    pub fn players(self) -> impl Iterator<Item = Player> {
        Player::iter().take(self.kind.player_count())
    }

    /// Builds the starting piece registry. Ids are assigned in placement
    /// order and stay stable for the lifetime of the game.
    #[must_use]
    pub fn starting_pieces(self) -> Vec<Piece> {
        let mut pieces = Vec::new();
        for player in self.players() {
            for (kind, square) in self.home_line(player) {
                let id = PieceId(pieces.len() as u8);
                pieces.push(Piece::new(id, kind, player, square));
            }
        }
        pieces
    }

    /// Back-rank pieces followed by pawns for one seat.
    fn home_line(self, player: Player) -> Vec<(PieceKind, Square)> {
        let w = self.kind.width();
        let mut line = Vec::new();
        match self.kind {
            BoardKind::Standard => {
                // Player one at the bottom, player two at the top.
                let (back, pawns) = match player {
                    Player::One => (w - 1, w - 2),
                    _ => (0, 1),
                };
                for (col, kind) in STANDARD_BACK_RANK.iter().enumerate() {
                    line.push((*kind, Square::new(back, col as u8)));
                }
                for col in 0..w {
                    line.push((PieceKind::Pawn, Square::new(pawns, col)));
                }
            }
            BoardKind::FourPlayer => {
                let cut = self.kind.corner_cut();
                // (back line, pawn line) expressed as the fixed axis value;
                // the free axis walks the surviving home squares.
                let span = cut..w - cut;
                for (offset, kind) in FOUR_PLAYER_BACK_RANK.iter().enumerate() {
                    let free = cut + offset as u8;
                    line.push((*kind, self.four_player_square(player, w - 1, free)));
                }
                for free in span {
                    line.push((PieceKind::Pawn, self.four_player_square(player, w - 2, free)));
                }
            }
        }
        line
    }

    /// Maps a (distance-from-far-edge, free-axis) pair onto the seat's home
    /// orientation: players one and three own vertical home lines, players
    /// two and four horizontal ones.
    fn four_player_square(self, player: Player, fixed: u8, free: u8) -> Square {
        match player {
            Player::One => Square::new(free, fixed),
            Player::Two => Square::new(fixed, free),
            Player::Three => Square::new(free, self.kind.width() - 1 - fixed),
            Player::Four => Square::new(self.kind.width() - 1 - fixed, free),
        }
    }
}
