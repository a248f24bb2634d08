//! Consumer-side replica. A [`Mirror`] folds a snapshot and its updates back
//! into a [`GameState`], so clients run the very same admission oracle the
//! server does and the two can never drift apart on hints.

use anyhow::{bail, Context};

use crate::chess::core::{ActiveMove, Cooldown, Piece, PieceId, Player, Square};
use crate::chess::legality::{Admission, RejectReason};
use crate::game::{GameState, Status};
use crate::protocol::Delta;

/// A replicated game. Construct from a full snapshot, then apply updates in
/// stream order.
#[derive(Clone, Debug)]
pub struct Mirror {
    state: GameState,
}

impl Mirror {
    /// Builds the replica from a full snapshot.
    ///
    /// # Errors
    ///
    /// The snapshot must carry board, speed and status, and its pieces must
    /// form the contiguous id range a real game produces.
    pub fn from_snapshot(snapshot: &Delta) -> anyhow::Result<Self> {
        let board = snapshot.board.context("snapshot without board kind")?;
        let speed = snapshot.speed.context("snapshot without speed")?;
        let mut state = GameState::bare(board, speed);
        state.tick = snapshot.tick;
        state.status = snapshot.status.context("snapshot without status")?;
        state.winner = snapshot.winner;
        state.reason = snapshot.reason;

        let mut pieces: Vec<Piece> = Vec::with_capacity(snapshot.pieces.len());
        let mut sorted = snapshot.pieces.clone();
        sorted.sort_by_key(|piece| piece.id);
        for (index, wire) in sorted.iter().enumerate() {
            if wire.id.0 as usize != index {
                bail!("snapshot piece ids are not contiguous at {}", wire.id);
            }
            pieces.push(Piece {
                id: wire.id,
                kind: wire.kind,
                owner: wire.owner,
                square: rounded(wire.row, wire.col),
                captured: wire.captured,
                has_moved: wire.has_moved,
            });
        }
        state.pieces = pieces;

        for wire in &snapshot.moves {
            if wire.path.len() < 2 || wire.piece.0 as usize >= state.pieces.len() {
                bail!("malformed traversal for {} in snapshot", wire.piece);
            }
            let mut active = ActiveMove::new(wire.piece, wire.path.clone(), wire.start_tick);
            active.partner = wire.partner;
            // In-flight pieces anchor on their traversal origin.
            state.pieces[wire.piece.0 as usize].square = wire.path[0];
            state.moves.push(active);
        }
        for wire in &snapshot.cooldowns {
            state.cooldowns.push(Cooldown {
                piece: wire.piece,
                remaining: wire.remaining,
            });
        }
        apply_seats(&mut state, &snapshot.seats);
        Ok(Self { state })
    }

    /// Applies one update. Ticks between the replica's clock and the
    /// update's are replayed first so cooldown countdown matches the
    /// authoritative bookkeeping; then records merge by piece id.
    ///
    /// # Errors
    ///
    /// Updates must move time forward and only reference known pieces.
    pub fn apply(&mut self, update: &Delta) -> anyhow::Result<()> {
        if update.tick < self.state.tick {
            bail!(
                "update tick {} precedes replica tick {}",
                update.tick,
                self.state.tick
            );
        }
        self.fast_forward(update.tick);

        for wire in &update.moves {
            if wire.path.len() < 2 {
                bail!("malformed traversal for {} in update", wire.piece);
            }
            let mut active = ActiveMove::new(wire.piece, wire.path.clone(), wire.start_tick);
            active.partner = wire.partner;
            match self
                .state
                .moves
                .iter_mut()
                .find(|known| known.piece == wire.piece)
            {
                Some(known) => *known = active,
                None => self.state.moves.push(active),
            }
        }

        for wire in &update.pieces {
            let index = wire.id.0 as usize;
            if index >= self.state.pieces.len() {
                bail!("update references unknown piece {}", wire.id);
            }
            let anchor = self
                .state
                .moves
                .iter()
                .find(|active| active.piece == wire.id)
                .map(|active| active.path[0]);
            let piece = &mut self.state.pieces[index];
            piece.captured = wire.captured;
            piece.has_moved = wire.has_moved;
            if wire.captured || !wire.moving {
                // A captured piece also vacates the traversal table.
                self.state.moves.retain(|active| active.piece != wire.id);
            }
            let piece = &mut self.state.pieces[index];
            piece.square = if wire.moving && !wire.captured {
                anchor.unwrap_or_else(|| rounded(wire.row, wire.col))
            } else {
                rounded(wire.row, wire.col)
            };
            if !wire.on_cooldown {
                self.state
                    .cooldowns
                    .retain(|cooldown| cooldown.piece != wire.id);
            }
        }

        for wire in &update.cooldowns {
            let cooldown = Cooldown {
                piece: wire.piece,
                remaining: wire.remaining,
            };
            match self
                .state
                .cooldowns
                .iter_mut()
                .find(|known| known.piece == wire.piece)
            {
                Some(known) => *known = cooldown,
                None => self.state.cooldowns.push(cooldown),
            }
        }

        apply_seats(&mut self.state, &update.seats);
        if let Some(status) = update.status {
            self.state.status = status;
            self.state.winner = update.winner;
            self.state.reason = update.reason;
        }
        Ok(())
    }

    /// Advances the replica's clock through quiet ticks: cooldowns count
    /// down exactly as the authoritative bookkeeping would, so the replica
    /// matches the server at any tick, updates or not.
    pub fn fast_forward(&mut self, tick: u64) {
        while self.state.tick < tick {
            for cooldown in &mut self.state.cooldowns {
                cooldown.remaining = cooldown.remaining.saturating_sub(1);
            }
            self.state
                .cooldowns
                .retain(|cooldown| cooldown.remaining > 0);
            self.state.tick += 1;
        }
    }

    /// The replicated state; feed it to the oracle or the renderer.
    #[must_use]
    pub const fn state(&self) -> &GameState {
        &self.state
    }

    /// Client-side admission, byte-for-byte the authoritative decision on
    /// the same replica.
    ///
    /// # Errors
    ///
    /// The same [`RejectReason`] the server would report.
    pub fn admit(
        &self,
        player: Player,
        piece: PieceId,
        target: Square,
    ) -> Result<Admission, RejectReason> {
        self.state.admit(player, piece, target)
    }

    /// True once a terminal update has been applied.
    #[must_use]
    pub fn finished(&self) -> bool {
        self.state.status() == Status::Finished
    }
}

fn rounded(row: f64, col: f64) -> Square {
    Square::new(row.round() as u8, col.round() as u8)
}

fn apply_seats(state: &mut GameState, seats: &[crate::protocol::SeatState]) {
    for seat in seats {
        let mut flags = crate::game::PlayerFlags::empty();
        flags.set(crate::game::PlayerFlags::ELIMINATED, seat.eliminated);
        flags.set(crate::game::PlayerFlags::RESIGNED, seat.resigned);
        flags.set(crate::game::PlayerFlags::DRAW_OFFERED, seat.draw_offered);
        *state.flags_mut(seat.player) = flags;
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::Mirror;
    use crate::chess::board::BoardKind;
    use crate::chess::core::Player;
    use crate::game::{Command, GameState, Speed};
    use crate::protocol::Delta;

    #[test]
    fn snapshot_round_trips() {
        let mut state = GameState::new(BoardKind::Standard, Speed::Standard);
        state.start();
        let mirror = Mirror::from_snapshot(&Delta::snapshot(&state, 0)).unwrap();
        assert_eq!(mirror.state().pieces(), state.pieces());
        assert_eq!(mirror.state().tick(), state.tick());
    }

    #[test]
    fn updates_keep_the_replica_in_step() {
        let mut state = GameState::new(BoardKind::Standard, Speed::Standard);
        state.start();
        let mut mirror = Mirror::from_snapshot(&Delta::snapshot(&state, 0)).unwrap();

        let board = state.board();
        let pawn = state.piece_at(board.square("e2").unwrap()).unwrap().id;
        for tick in 0..20 {
            let commands = if tick == 0 {
                vec![Command::Move {
                    player: Player::One,
                    piece: pawn,
                    target: board.square("e4").unwrap(),
                }]
            } else {
                Vec::new()
            };
            let report = state.advance(&commands);
            if let Some(update) = Delta::update(&state, &report.changes, 0) {
                mirror.apply(&update).unwrap();
            }
        }
        // The retire update at tick twenty brings the replica fully in step.
        assert_eq!(
            mirror.state().pieces()[pawn.0 as usize].square,
            board.square("e4").unwrap()
        );
        assert_eq!(mirror.state().active_moves(), state.active_moves());
        assert_eq!(mirror.state().cooldowns(), state.cooldowns());
        assert_eq!(mirror.state().tick(), state.tick());

        // Quiet ticks afterwards only count cooldowns down; fast-forwarding
        // the replica reproduces them.
        for _ in 0..5 {
            let _ = state.advance(&[]);
        }
        mirror.fast_forward(state.tick());
        assert_eq!(mirror.state().cooldowns(), state.cooldowns());
    }

    #[test]
    fn stale_updates_are_rejected() {
        let mut state = GameState::new(BoardKind::Standard, Speed::Standard);
        state.start();
        let mut mirror = Mirror::from_snapshot(&Delta::snapshot(&state, 0)).unwrap();
        let _ = state.advance(&[]);
        let fresh = Delta::snapshot(&state, 0);
        mirror.apply(&fresh).unwrap();
        let mut backwards = fresh;
        backwards.tick = 0;
        assert!(mirror.apply(&backwards).is_err());
    }
}
