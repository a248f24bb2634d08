//! Per-game driver: owns one [`GameState`] on its own thread, drains the
//! command mailbox once per tick, and fans events out to subscribers.
//!
//! The loop is single-threaded cooperative: every mutation of the game goes
//! through the mailbox, no consumer ever touches the state directly, and the
//! thread sleeps between tick boundaries. Games are independent; run as many
//! drivers as you like in one process.

use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};

use crate::chess::board::BoardKind;
use crate::chess::core::{PieceId, Player, Square};
use crate::chess::legality::RejectReason;
use crate::game::{Command, GameOver, GameState, Speed};
use crate::protocol::Delta;

/// Events a subscriber receives, in emission order per game.
#[derive(Clone, Debug)]
pub enum Event {
    /// The loop began ticking.
    Started {
        #[allow(missing_docs)]
        tick: u64,
    },
    /// An observable change happened this tick.
    Update(Delta),
    /// A move command bounced; also delivered synchronously to the
    /// submitter.
    MoveRejected {
        #[allow(missing_docs)]
        player: Player,
        #[allow(missing_docs)]
        piece: PieceId,
        #[allow(missing_docs)]
        reason: RejectReason,
    },
    /// The game is over; the final update precedes this.
    Ended(GameOver),
    /// Advisory hook for external rating computation.
    RatingHook {
        #[allow(missing_docs)]
        players: Vec<Player>,
        #[allow(missing_docs)]
        winner: Option<Player>,
    },
}

/// Mailbox traffic from handles to the loop.
enum Envelope {
    Command(Command),
    SubmitMove {
        player: Player,
        piece: PieceId,
        target: Square,
        verdict: Sender<Result<(), RejectReason>>,
    },
    Subscribe(Sender<Event>),
    Snapshot(Sender<Delta>),
}

/// Handle to a running game. Clones share the same mailbox; dropping the
/// last handle disconnects the mailbox and the loop winds down at the next
/// boundary.
#[derive(Clone)]
pub struct GameHandle {
    outbox: Sender<Envelope>,
}

impl GameHandle {
    /// Queues a move and waits for the admission verdict decided at the
    /// next tick boundary.
    ///
    /// # Errors
    ///
    /// Fails only when the game loop is gone; a rejected move is the `Ok`
    /// payload's `Err` with its wire reason code.
    pub fn submit_move(
        &self,
        player: Player,
        piece: PieceId,
        target: Square,
    ) -> anyhow::Result<Result<(), RejectReason>> {
        let (tx, rx) = bounded(1);
        self.send_envelope(Envelope::SubmitMove {
            player,
            piece,
            target,
            verdict: tx,
        })?;
        rx.recv().context("game ended before the verdict")
    }

    /// Concedes the seat.
    ///
    /// # Errors
    ///
    /// Fails when the game loop is gone.
    pub fn resign(&self, player: Player) -> anyhow::Result<()> {
        self.send_envelope(Envelope::Command(Command::Resign { player }))
    }

    /// Registers a standing draw offer for the seat.
    ///
    /// # Errors
    ///
    /// Fails when the game loop is gone.
    pub fn offer_draw(&self, player: Player) -> anyhow::Result<()> {
        self.send_envelope(Envelope::Command(Command::OfferDraw { player }))
    }

    /// Returns the seat to the lobby; counts as resignation.
    ///
    /// # Errors
    ///
    /// Fails when the game loop is gone.
    pub fn leave(&self, player: Player) -> anyhow::Result<()> {
        self.send_envelope(Envelope::Command(Command::Leave { player }))
    }

    /// Cancels the game at the next tick boundary.
    ///
    /// # Errors
    ///
    /// Fails when the game loop is gone.
    pub fn cancel(&self) -> anyhow::Result<()> {
        self.send_envelope(Envelope::Command(Command::Cancel))
    }

    /// Subscribes to the event stream from this point on. Fresh consumers
    /// pair this with [`GameHandle::snapshot`] to bootstrap.
    ///
    /// # Errors
    ///
    /// Fails when the game loop is gone.
    pub fn subscribe(&self) -> anyhow::Result<Receiver<Event>> {
        let (tx, rx) = unbounded();
        self.send_envelope(Envelope::Subscribe(tx))?;
        Ok(rx)
    }

    /// Full state for a newly connecting consumer.
    ///
    /// # Errors
    ///
    /// Fails when the game loop is gone.
    pub fn snapshot(&self) -> anyhow::Result<Delta> {
        let (tx, rx) = bounded(1);
        self.send_envelope(Envelope::Snapshot(tx))?;
        rx.recv().context("game ended before the snapshot")
    }

    fn send_envelope(&self, envelope: Envelope) -> anyhow::Result<()> {
        if self.outbox.send(envelope).is_err() {
            bail!("game loop is gone");
        }
        Ok(())
    }
}

/// Creates a game, spawns its tick loop and returns the initial snapshot.
///
/// # Errors
///
/// The seat count must match the board, and the loop thread must spawn.
pub fn create_game(
    kind: BoardKind,
    speed: Speed,
    players: usize,
) -> anyhow::Result<(GameHandle, Delta)> {
    if players != kind.player_count() {
        bail!(
            "a {kind:?} board seats {} players, got {players}",
            kind.player_count()
        );
    }
    let state = GameState::new(kind, speed);
    let snapshot = Delta::snapshot(&state, 0);
    let (outbox, inbox) = unbounded();
    let runner = Runner {
        state,
        inbox,
        subscribers: Vec::new(),
        queue: Vec::new(),
    };
    let _ = thread::Builder::new()
        .name("clutch-game".to_owned())
        .spawn(move || runner.run())
        .context("failed to spawn the game loop")?;
    Ok((GameHandle { outbox }, snapshot))
}

struct Runner {
    state: GameState,
    inbox: Receiver<Envelope>,
    subscribers: Vec<Sender<Event>>,
    queue: Vec<(Command, Option<Sender<Result<(), RejectReason>>>)>,
}

impl Runner {
    fn run(mut self) {
        let period = Duration::from_millis(self.state.params().tick_period_ms());
        self.state.start();
        let mut last_tick = Instant::now();
        let mut deadline = last_tick + period;
        self.broadcast(&Event::Started {
            tick: self.state.tick(),
        });

        loop {
            match self.inbox.recv_deadline(deadline) {
                Ok(envelope) => self.accept(envelope, last_tick),
                Err(RecvTimeoutError::Timeout) => {
                    last_tick = Instant::now();
                    deadline += period;
                    if self.process_tick(last_tick) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    log::debug!("all handles dropped, stopping the loop");
                    break;
                }
            }
        }
    }

    /// Buffers commands for the next boundary; control traffic is answered
    /// immediately.
    fn accept(&mut self, envelope: Envelope, last_tick: Instant) {
        match envelope {
            Envelope::Command(command) => self.queue.push((command, None)),
            Envelope::SubmitMove {
                player,
                piece,
                target,
                verdict,
            } => self.queue.push((
                Command::Move {
                    player,
                    piece,
                    target,
                },
                Some(verdict),
            )),
            Envelope::Subscribe(sink) => self.subscribers.push(sink),
            Envelope::Snapshot(reply) => {
                let since = last_tick.elapsed().as_millis() as u64;
                let _ = reply.send(Delta::snapshot(&self.state, since));
            }
        }
    }

    /// One tick boundary: drain, advance, answer verdicts, emit events.
    /// Returns true when the loop should stop.
    fn process_tick(&mut self, last_tick: Instant) -> bool {
        let drained = std::mem::take(&mut self.queue);
        let commands: Vec<Command> = drained.iter().map(|(command, _)| command.clone()).collect();
        let report = self.state.advance(&commands);

        for ((_, verdict), outcome) in drained.iter().zip(&report.verdicts) {
            if let Some(sender) = verdict {
                let _ = sender.send(match outcome {
                    Some(reason) => Err(*reason),
                    None => Ok(()),
                });
            }
        }
        for rejection in &report.rejections {
            self.broadcast(&Event::MoveRejected {
                player: rejection.player,
                piece: rejection.piece,
                reason: rejection.reason,
            });
        }
        let since = last_tick.elapsed().as_millis() as u64;
        if let Some(update) = Delta::update(&self.state, &report.changes, since) {
            self.broadcast(&Event::Update(update));
        }
        if let Some(over) = report.ended {
            self.broadcast(&Event::Ended(over));
            self.broadcast(&Event::RatingHook {
                players: self.state.participants().collect(),
                winner: over.winner,
            });
            return true;
        }
        false
    }

    /// Send failures mean the consumer went away; it is dropped and may
    /// reconnect through a fresh snapshot.
    fn broadcast(&mut self, event: &Event) {
        self.subscribers.retain(|sink| {
            let delivered = sink.send(event.clone()).is_ok();
            if !delivered {
                log::debug!("dropping a disconnected subscriber");
            }
            delivered
        });
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::{create_game, Event};
    use crate::chess::board::BoardKind;
    use crate::chess::core::Player;
    use crate::chess::legality::RejectReason;
    use crate::game::{EndReason, Speed, Status};
    use crate::protocol::mirror::Mirror;

    #[test]
    fn seat_count_must_match_the_board() {
        assert!(create_game(BoardKind::Standard, Speed::Standard, 4).is_err());
        assert!(create_game(BoardKind::FourPlayer, Speed::Standard, 2).is_err());
    }

    #[test]
    fn drives_a_game_end_to_end() {
        let (handle, snapshot) = create_game(BoardKind::Standard, Speed::Standard, 2).unwrap();
        assert_eq!(snapshot.pieces.len(), 32);
        assert_eq!(snapshot.status, Some(Status::Waiting));
        let events = handle.subscribe().unwrap();

        let mirror = Mirror::from_snapshot(&snapshot).unwrap();
        let board = mirror.state().board();
        let pawn = mirror
            .state()
            .piece_at(board.square("e2").unwrap())
            .unwrap()
            .id;

        let verdict = handle
            .submit_move(Player::One, pawn, board.square("e4").unwrap())
            .unwrap();
        assert_eq!(verdict, Ok(()));
        // The pawn is in flight for two seconds; a second command bounces.
        let verdict = handle
            .submit_move(Player::One, pawn, board.square("e3").unwrap())
            .unwrap();
        assert_eq!(verdict, Err(RejectReason::PieceMoving));

        handle.cancel().unwrap();
        let mut saw_update = false;
        let mut outcome = None;
        for _ in 0..100 {
            match events.recv_timeout(Duration::from_secs(2)) {
                Ok(Event::Update(_)) => saw_update = true,
                Ok(Event::Ended(over)) => {
                    outcome = Some(over);
                    break;
                }
                Ok(_) => {}
                Err(_) => break,
            }
        }
        assert!(saw_update);
        let over = outcome.expect("cancel should end the game");
        assert_eq!(over.reason, EndReason::Cancelled);
        assert_eq!(over.winner, None);

        // The advisory rating hook follows the terminal event, naming every
        // seat and the (absent) winner.
        match events.recv_timeout(Duration::from_secs(2)) {
            Ok(Event::RatingHook { players, winner }) => {
                assert_eq!(players, vec![Player::One, Player::Two]);
                assert_eq!(winner, None);
            }
            other => panic!("expected the rating hook after the end, got {other:?}"),
        }

        // The loop is gone; late submissions report that cleanly.
        std::thread::sleep(Duration::from_millis(200));
        assert!(handle
            .submit_move(Player::One, pawn, board.square("e3").unwrap())
            .is_err());
    }
}
