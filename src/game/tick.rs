//! The tick processor: drains commands, advances the simulation one fixed
//! step and reports what changed. One call to [`GameState::advance`] is one
//! tick; the driver decides pacing and delta emission.

use crate::chess::core::{ActiveMove, Cooldown, PieceId, PieceKind, Player, Square};
use crate::chess::legality::RejectReason;
use crate::game::{collision, EndReason, GameOver, GameState, PlayerFlags, Status};

/// Player and control commands, drained once per tick in receipt order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Ask a piece to travel to a target square.
    Move {
        #[allow(missing_docs)]
        player: Player,
        #[allow(missing_docs)]
        piece: PieceId,
        #[allow(missing_docs)]
        target: Square,
    },
    /// Concede; the seat is eliminated.
    Resign {
        #[allow(missing_docs)]
        player: Player,
    },
    /// Offer a draw; the game ends when every surviving seat offers.
    OfferDraw {
        #[allow(missing_docs)]
        player: Player,
    },
    /// Return to the lobby mid-game; resignation semantics.
    Leave {
        #[allow(missing_docs)]
        player: Player,
    },
    /// Tear the game down at this tick boundary.
    Cancel,
}

/// A rejected move command, reported to its originator only.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Rejection {
    #[allow(missing_docs)]
    pub player: Player,
    #[allow(missing_docs)]
    pub piece: PieceId,
    #[allow(missing_docs)]
    pub reason: RejectReason,
}

/// Which parts of the observable state this tick touched. Drives delta
/// minimization: no entries, no emission.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeLog {
    pieces: Vec<PieceId>,
    moves: Vec<PieceId>,
    cooldowns: Vec<PieceId>,
    seats: Vec<Player>,
    status: bool,
}

impl ChangeLog {
    pub(crate) fn piece(&mut self, id: PieceId) {
        if !self.pieces.contains(&id) {
            self.pieces.push(id);
        }
    }

    pub(crate) fn move_started(&mut self, id: PieceId) {
        if !self.moves.contains(&id) {
            self.moves.push(id);
        }
        self.piece(id);
    }

    pub(crate) fn cooldown(&mut self, id: PieceId) {
        if !self.cooldowns.contains(&id) {
            self.cooldowns.push(id);
        }
        self.piece(id);
    }

    pub(crate) fn seat(&mut self, player: Player) {
        if !self.seats.contains(&player) {
            self.seats.push(player);
        }
    }

    pub(crate) fn mark_status(&mut self) {
        self.status = true;
    }

    /// True when nothing observable changed and emission can be suppressed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
            && self.moves.is_empty()
            && self.cooldowns.is_empty()
            && self.seats.is_empty()
            && !self.status
    }

    /// Pieces whose record (position or flags) changed.
    #[must_use]
    pub fn pieces(&self) -> &[PieceId] {
        &self.pieces
    }

    /// Pieces whose traversal started this tick.
    #[must_use]
    pub fn started_moves(&self) -> &[PieceId] {
        &self.moves
    }

    /// Pieces that had a cooldown installed this tick.
    #[must_use]
    pub fn installed_cooldowns(&self) -> &[PieceId] {
        &self.cooldowns
    }

    /// Seats whose flags (draw offer, resignation, elimination) changed.
    #[must_use]
    pub fn seats(&self) -> &[Player] {
        &self.seats
    }

    /// Whether status, winner or end reason changed.
    #[must_use]
    pub const fn status_changed(&self) -> bool {
        self.status
    }
}

/// Everything one tick produced.
#[derive(Clone, Debug, Default)]
pub struct TickReport {
    /// Observable changes, for delta construction.
    pub changes: ChangeLog,
    /// Per-command rejections, for the originators.
    pub rejections: Vec<Rejection>,
    /// One entry per processed command, aligned with the input slice:
    /// `Some` when a move command was rejected.
    pub verdicts: Vec<Option<RejectReason>>,
    /// Terminal event, present on the tick the game ended.
    pub ended: Option<GameOver>,
}

impl GameState {
    /// Processes one tick: command admission against the pre-tick snapshot,
    /// motion, collision, cooldown bookkeeping, terminal detection. The tick
    /// counter increments once on the way out. Ticking a game that is not
    /// playing is a no-op.
    pub fn advance(&mut self, commands: &[Command]) -> TickReport {
        let mut report = TickReport::default();
        if self.status != Status::Playing {
            return report;
        }
        let sample = self.tick + 1;

        for command in commands {
            if self.status != Status::Playing {
                break;
            }
            let verdict = self.process_command(command, &mut report);
            report.verdicts.push(verdict);
        }

        if self.status == Status::Playing {
            self.tick_cooldowns(&mut report.changes);
            collision::resolve(self, sample, &mut report.changes);
            self.retire_moves(sample, &mut report.changes);
            self.check_terminal(sample, &mut report);
        }

        self.tick = sample;
        report
    }

    fn process_command(&mut self, command: &Command, report: &mut TickReport) -> Option<RejectReason> {
        match command {
            Command::Move {
                player,
                piece,
                target,
            } => match self.admit(*player, *piece, *target) {
                Ok(admission) => {
                    let start = self.tick;
                    let mut main = ActiveMove::new(*piece, admission.path, start);
                    if let Some(leg) = &admission.partner {
                        main.partner = Some(leg.piece);
                    }
                    self.moves.push(main);
                    report.changes.move_started(*piece);
                    if let Some(leg) = admission.partner {
                        let mut rook = ActiveMove::new(leg.piece, leg.path, start);
                        rook.partner = Some(*piece);
                        self.moves.push(rook);
                        report.changes.move_started(leg.piece);
                    }
                }
                Err(reason) => {
                    report.rejections.push(Rejection {
                        player: *player,
                        piece: *piece,
                        reason,
                    });
                    return Some(reason);
                }
            },
            Command::Resign { player } | Command::Leave { player } => {
                if !self.flags(*player).contains(PlayerFlags::ELIMINATED) {
                    *self.flags_mut(*player) |= PlayerFlags::RESIGNED;
                    self.eliminate(*player, EndReason::Resignation, &mut report.changes);
                }
            }
            Command::OfferDraw { player } => {
                if !self.flags(*player).contains(PlayerFlags::ELIMINATED) {
                    *self.flags_mut(*player) |= PlayerFlags::DRAW_OFFERED;
                    report.changes.seat(*player);
                }
            }
            Command::Cancel => {
                let sample = self.tick + 1;
                let moves = std::mem::take(&mut self.moves);
                let tps = self.params.ticks_per_square;
                for active in moves {
                    let square = active.waypoint_reached(sample, tps);
                    let piece = self.piece_mut(active.piece);
                    piece.square = square;
                    piece.has_moved = true;
                    report.changes.piece(active.piece);
                }
                report.ended = Some(self.finish(None, EndReason::Cancelled, &mut report.changes));
            }
        }
        None
    }

    /// Counts down cooldowns that existed at the start of this tick; fresh
    /// installs keep their full value until the next one.
    fn tick_cooldowns(&mut self, changes: &mut ChangeLog) {
        let mut expired: Vec<PieceId> = Vec::new();
        for cooldown in &mut self.cooldowns {
            cooldown.remaining -= 1;
            if cooldown.remaining == 0 {
                expired.push(cooldown.piece);
            }
        }
        if !expired.is_empty() {
            self.cooldowns.retain(|cooldown| cooldown.remaining > 0);
            for id in expired {
                changes.piece(id);
            }
        }
    }

    /// Retires traversals that reached their destination and drops those of
    /// pieces captured mid-flight.
    fn retire_moves(&mut self, sample: u64, changes: &mut ChangeLog) {
        let tps = self.params.ticks_per_square;
        let cooldown_ticks = self.params.cooldown_ticks;
        let moves = std::mem::take(&mut self.moves);
        let mut kept = Vec::with_capacity(moves.len());
        for active in moves {
            if self.pieces[active.piece.0 as usize].captured {
                continue;
            }
            if active.is_complete(sample, tps) {
                let id = active.piece;
                let destination = active.destination();
                let piece = self.piece_mut(id);
                piece.square = destination;
                piece.has_moved = true;
                self.cooldowns.push(Cooldown {
                    piece: id,
                    remaining: cooldown_ticks,
                });
                changes.cooldown(id);
            } else {
                kept.push(active);
            }
        }
        self.moves = kept;
    }

    fn check_terminal(&mut self, sample: u64, report: &mut TickReport) {
        let fallen: Vec<Player> = self
            .pieces
            .iter()
            .filter(|piece| {
                piece.kind == PieceKind::King
                    && piece.captured
                    && !self.flags(piece.owner).contains(PlayerFlags::ELIMINATED)
            })
            .map(|piece| piece.owner)
            .collect();
        for player in fallen {
            self.eliminate(player, EndReason::KingCaptured, &mut report.changes);
        }

        let survivors: Vec<Player> = self
            .participants()
            .filter(|player| !self.flags(*player).contains(PlayerFlags::ELIMINATED))
            .collect();
        if survivors.len() <= 1 {
            if let Some(reason) = self.last_elimination {
                let winner = survivors.first().copied();
                report.ended = Some(self.finish(winner, reason, &mut report.changes));
                return;
            }
        }
        if !survivors.is_empty()
            && survivors
                .iter()
                .all(|player| self.flags(*player).contains(PlayerFlags::DRAW_OFFERED))
        {
            report.ended = Some(self.finish(None, EndReason::DrawOffered, &mut report.changes));
            return;
        }
        if sample >= self.tick_limit {
            report.ended = Some(self.finish(None, EndReason::Timeout, &mut report.changes));
        }
    }

    /// Demotes a seat to spectator. Its in-flight traversals stop at their
    /// last waypoint and its resting pieces stay on the board as obstacles.
    fn eliminate(&mut self, player: Player, cause: EndReason, changes: &mut ChangeLog) {
        *self.flags_mut(player) |= PlayerFlags::ELIMINATED;
        changes.seat(player);
        self.last_elimination = Some(cause);
        let sample = self.tick + 1;
        let tps = self.params.ticks_per_square;
        let moves = std::mem::take(&mut self.moves);
        let mut kept = Vec::with_capacity(moves.len());
        for active in moves {
            if self.pieces[active.piece.0 as usize].owner == player {
                let square = active.waypoint_reached(sample, tps);
                let piece = self.piece_mut(active.piece);
                piece.square = square;
                piece.has_moved = true;
                changes.piece(active.piece);
            } else {
                kept.push(active);
            }
        }
        self.moves = kept;
        log::info!("{player} eliminated ({cause})");
    }

    fn finish(
        &mut self,
        winner: Option<Player>,
        reason: EndReason,
        changes: &mut ChangeLog,
    ) -> GameOver {
        self.status = Status::Finished;
        self.winner = winner;
        self.reason = Some(reason);
        changes.mark_status();
        match winner {
            Some(player) => log::info!("game over: {player} wins ({reason})"),
            None => log::info!("game over: no winner ({reason})"),
        }
        GameOver { winner, reason }
    }

    pub(crate) fn capture_piece(&mut self, id: PieceId, changes: &mut ChangeLog) {
        let piece = self.piece_mut(id);
        if !piece.captured {
            piece.captured = true;
            changes.piece(id);
            log::debug!("captured {}", self.pieces[id.0 as usize]);
        }
    }

    /// Stops a traversal at its last integer waypoint and installs the
    /// configured cooldown.
    pub(crate) fn abort_move(&mut self, id: PieceId, sample: u64, changes: &mut ChangeLog) {
        let Some(index) = self.moves.iter().position(|active| active.piece == id) else {
            return;
        };
        let active = self.moves.remove(index);
        let square = active.waypoint_reached(sample, self.params.ticks_per_square);
        let piece = self.piece_mut(id);
        piece.square = square;
        piece.has_moved = true;
        self.cooldowns.push(Cooldown {
            piece: id,
            remaining: self.params.cooldown_ticks,
        });
        changes.cooldown(id);
    }
}
