//! End-to-end simulation scenarios: single moves, collisions, castling,
//! terminal conditions, and the invariants every tick must preserve.

use std::collections::{HashMap, HashSet};

use clutch::chess::board::BoardKind;
use clutch::chess::core::{PieceId, PieceKind, Player, Square};
use clutch::chess::legality::RejectReason;
use clutch::game::{Command, EndReason, GameState, Speed, Status};
use pretty_assertions::assert_eq;

fn playing_standard() -> GameState {
    let mut state = GameState::new(BoardKind::Standard, Speed::Standard);
    state.start();
    state
}

fn custom(placements: &[(PieceKind, Player, &str)], speed: Speed) -> GameState {
    let board = clutch::chess::board::Board::new(BoardKind::Standard);
    let placed: Vec<(PieceKind, Player, Square)> = placements
        .iter()
        .map(|(kind, owner, notation)| (*kind, *owner, board.square(notation).unwrap()))
        .collect();
    let mut state = GameState::with_pieces(BoardKind::Standard, speed, &placed).unwrap();
    state.start();
    state
}

fn id_at(state: &GameState, notation: &str) -> PieceId {
    let square = state.board().square(notation).unwrap();
    state
        .piece_at(square)
        .unwrap_or_else(|| panic!("no piece at {notation}"))
        .id
}

fn move_cmd(state: &GameState, from: &str, to: &str) -> Command {
    let piece = id_at(state, from);
    Command::Move {
        player: state.piece(piece).unwrap().owner,
        piece,
        target: state.board().square(to).unwrap(),
    }
}

fn run(state: &mut GameState, ticks: u64) {
    for _ in 0..ticks {
        let _ = state.advance(&[]);
    }
}

#[test]
fn simple_advance() {
    let mut state = playing_standard();
    let pawn = id_at(&state, "e2");
    let report = state.advance(&[move_cmd(&state, "e2", "e4")]);
    assert!(report.rejections.is_empty());
    assert_eq!(state.active_moves().len(), 1);

    run(&mut state, 19);
    assert_eq!(state.tick(), 20);
    assert!(state.active_moves().is_empty());

    let resting = state.piece(pawn).unwrap();
    assert_eq!(resting.square, state.board().square("e4").unwrap());
    assert!(resting.has_moved);
    assert!(!resting.captured);
    assert_eq!(state.cooldowns().len(), 1);
    assert_eq!(state.cooldowns()[0].piece, pawn);
    assert_eq!(state.cooldowns()[0].remaining, 100);
    assert_eq!(
        state.pieces().iter().filter(|piece| piece.captured).count(),
        0
    );
}

#[test]
fn head_on_collision_destroys_both_movers() {
    let mut state = custom(
        &[
            (PieceKind::King, Player::One, "a1"),
            (PieceKind::Rook, Player::One, "e2"),
            (PieceKind::King, Player::Two, "h8"),
            (PieceKind::Rook, Player::Two, "e7"),
        ],
        Speed::Standard,
    );
    let white = id_at(&state, "e2");
    let black = id_at(&state, "e7");
    let report = state.advance(&[move_cmd(&state, "e2", "e7"), move_cmd(&state, "e7", "e2")]);
    assert!(report.rejections.is_empty());

    // Five squares apart, converging at a fifth of a square per tick: the
    // rooks reach the contact radius on tick 23.
    run(&mut state, 21);
    assert!(!state.piece(white).unwrap().captured);
    assert!(!state.piece(black).unwrap().captured);

    let _ = state.advance(&[]);
    assert!(state.piece(white).unwrap().captured);
    assert!(state.piece(black).unwrap().captured);
    assert!(state.active_moves().is_empty());
    assert!(state.cooldowns().is_empty());
}

#[test]
fn parallel_pawn_pushes_park_adjacent() {
    // e2-e4 against e7-e5 never comes within the contact radius: the pawns
    // end their travels on neighboring squares, one full square apart.
    let mut state = playing_standard();
    let white = id_at(&state, "e2");
    let black = id_at(&state, "e7");
    let report = state.advance(&[move_cmd(&state, "e2", "e4"), move_cmd(&state, "e7", "e5")]);
    assert!(report.rejections.is_empty());

    run(&mut state, 24);
    assert!(!state.piece(white).unwrap().captured);
    assert!(!state.piece(black).unwrap().captured);
    assert_eq!(
        state.piece(white).unwrap().square,
        state.board().square("e4").unwrap()
    );
    assert_eq!(
        state.piece(black).unwrap().square,
        state.board().square("e5").unwrap()
    );
}

#[test]
fn diagonal_pawn_capture() {
    let mut state = custom(
        &[
            (PieceKind::King, Player::One, "a1"),
            (PieceKind::Pawn, Player::One, "d4"),
            (PieceKind::King, Player::Two, "h8"),
            (PieceKind::Pawn, Player::Two, "e5"),
        ],
        Speed::Standard,
    );
    let mover = id_at(&state, "d4");
    let victim = id_at(&state, "e5");
    let report = state.advance(&[move_cmd(&state, "d4", "e5")]);
    assert!(report.rejections.is_empty());

    run(&mut state, 9);
    assert_eq!(state.tick(), 10);
    assert!(state.piece(victim).unwrap().captured);
    let resting = state.piece(mover).unwrap();
    assert_eq!(resting.square, state.board().square("e5").unwrap());
    assert!(resting.has_moved);
    assert_eq!(state.cooldowns().len(), 1);
    assert_eq!(state.cooldowns()[0].remaining, 100);
}

#[test]
fn airborne_knight_passes_over_pieces() {
    let mut state = custom(
        &[
            (PieceKind::King, Player::One, "a1"),
            (PieceKind::Knight, Player::One, "g1"),
            (PieceKind::King, Player::Two, "h8"),
            (PieceKind::Bishop, Player::Two, "e2"),
        ],
        Speed::Standard,
    );
    let knight = id_at(&state, "g1");
    let bishop = id_at(&state, "e2");
    let _ = state.advance(&[move_cmd(&state, "g1", "f3")]);

    run(&mut state, 9);
    assert!(!state.piece(bishop).unwrap().captured);
    assert_eq!(
        state.piece(knight).unwrap().square,
        state.board().square("f3").unwrap()
    );
    assert!(state.active_moves().is_empty());
}

#[test]
fn landing_knight_captures_its_square() {
    let mut state = custom(
        &[
            (PieceKind::King, Player::One, "a1"),
            (PieceKind::Knight, Player::One, "g1"),
            (PieceKind::King, Player::Two, "h8"),
            (PieceKind::Pawn, Player::Two, "f3"),
        ],
        Speed::Standard,
    );
    let pawn = id_at(&state, "f3");
    let _ = state.advance(&[move_cmd(&state, "g1", "f3")]);

    // Airborne for 85% of ten ticks: still no contact after eight.
    run(&mut state, 7);
    assert!(!state.piece(pawn).unwrap().captured);
    let _ = state.advance(&[]);
    assert!(state.piece(pawn).unwrap().captured);

    run(&mut state, 1);
    let knight = id_at(&state, "f3");
    assert_eq!(state.piece(knight).unwrap().kind, PieceKind::Knight);
}

#[test]
fn castling_kingside() {
    let mut state = custom(
        &[
            (PieceKind::King, Player::One, "e1"),
            (PieceKind::Rook, Player::One, "h1"),
            (PieceKind::King, Player::Two, "e8"),
        ],
        Speed::Standard,
    );
    let king = id_at(&state, "e1");
    let rook = id_at(&state, "h1");
    let report = state.advance(&[move_cmd(&state, "e1", "g1")]);
    assert!(report.rejections.is_empty());
    assert_eq!(state.active_moves().len(), 2);

    run(&mut state, 9);
    assert_eq!(state.tick(), 10);
    assert!(state.active_moves().is_empty());
    let king = state.piece(king).unwrap();
    let rook = state.piece(rook).unwrap();
    assert_eq!(king.square, state.board().square("g1").unwrap());
    assert_eq!(rook.square, state.board().square("f1").unwrap());
    assert!(king.has_moved);
    assert!(rook.has_moved);
    assert_eq!(state.cooldowns().len(), 2);
    assert!(state
        .cooldowns()
        .iter()
        .all(|cooldown| cooldown.remaining == 100));
}

#[test]
fn reserved_destination_rejects_the_second_mover() {
    let mut state = custom(
        &[
            (PieceKind::King, Player::One, "h1"),
            (PieceKind::Rook, Player::One, "a1"),
            (PieceKind::Queen, Player::One, "d1"),
            (PieceKind::King, Player::Two, "h8"),
        ],
        Speed::Standard,
    );
    let rook = id_at(&state, "a1");
    let report = state.advance(&[move_cmd(&state, "a1", "a4")]);
    assert!(report.rejections.is_empty());

    run(&mut state, 1);
    let queen = id_at(&state, "d1");
    let report = state.advance(&[Command::Move {
        player: Player::One,
        piece: queen,
        target: state.board().square("a4").unwrap(),
    }]);
    assert_eq!(report.rejections.len(), 1);
    assert_eq!(report.rejections[0].reason, RejectReason::DestinationReserved);

    // The first traversal proceeds unchanged.
    run(&mut state, 27);
    assert_eq!(
        state.piece(rook).unwrap().square,
        state.board().square("a4").unwrap()
    );
    assert_eq!(
        state.piece(queen).unwrap().square,
        state.board().square("d1").unwrap()
    );
}

#[test]
fn king_capture_ends_two_player_games() {
    let mut state = custom(
        &[
            (PieceKind::King, Player::One, "h1"),
            (PieceKind::Rook, Player::One, "a1"),
            (PieceKind::King, Player::Two, "a8"),
        ],
        Speed::Lightning,
    );
    let _ = state.advance(&[move_cmd(&state, "a1", "a8")]);

    let mut outcome = None;
    for _ in 0..20 {
        let report = state.advance(&[]);
        if let Some(over) = report.ended {
            outcome = Some(over);
            break;
        }
    }
    let over = outcome.expect("the rook should reach the king");
    assert_eq!(over.winner, Some(Player::One));
    assert_eq!(over.reason, EndReason::KingCaptured);
    assert_eq!(state.status(), Status::Finished);
}

#[test]
fn four_player_elimination_keeps_the_game_running() {
    let board = clutch::chess::board::Board::new(BoardKind::FourPlayer);
    let placements = [
        (PieceKind::King, Player::One, Square::new(6, 11)),
        (PieceKind::King, Player::Two, Square::new(11, 6)),
        (PieceKind::Pawn, Player::Two, Square::new(10, 5)),
        (PieceKind::King, Player::Three, Square::new(6, 0)),
        (PieceKind::King, Player::Four, Square::new(0, 6)),
        (PieceKind::Rook, Player::One, Square::new(11, 4)),
    ];
    let mut state =
        GameState::with_pieces(BoardKind::FourPlayer, Speed::Lightning, &placements).unwrap();
    state.start();
    assert!(board.valid_square(Square::new(11, 4)));

    let rook = state.piece_at(Square::new(11, 4)).unwrap().id;
    let _ = state.advance(&[Command::Move {
        player: Player::One,
        piece: rook,
        target: Square::new(11, 6),
    }]);
    for _ in 0..6 {
        let report = state.advance(&[]);
        assert!(report.ended.is_none(), "three seats still stand");
    }
    assert_eq!(state.status(), Status::Playing);
    let king_two = state
        .pieces()
        .iter()
        .find(|piece| piece.kind == PieceKind::King && piece.owner == Player::Two)
        .unwrap();
    assert!(king_two.captured);

    // The eliminated seat spectates: its pawn accepts no commands.
    let pawn = state.piece_at(Square::new(10, 5)).unwrap().id;
    let report = state.advance(&[Command::Move {
        player: Player::Two,
        piece: pawn,
        target: Square::new(9, 5),
    }]);
    assert_eq!(report.rejections[0].reason, RejectReason::NotYourPiece);

    // Two resignations later, seat one is the last survivor.
    let _ = state.advance(&[Command::Resign {
        player: Player::Three,
    }]);
    let report = state.advance(&[Command::Resign {
        player: Player::Four,
    }]);
    let over = report.ended.expect("one seat left");
    assert_eq!(over.winner, Some(Player::One));
    assert_eq!(over.reason, EndReason::Resignation);
}

fn skirmish_script(state: &GameState) -> HashMap<u64, Vec<Command>> {
    let mut script: HashMap<u64, Vec<Command>> = HashMap::new();
    script.insert(
        0,
        vec![
            move_cmd(state, "e2", "e4"),
            move_cmd(state, "d7", "d5"),
            move_cmd(state, "g1", "f3"),
        ],
    );
    script.insert(5, vec![move_cmd(state, "f1", "c4")]);
    script.insert(25, vec![move_cmd(state, "e1", "g1")]);
    let pawn = id_at(state, "e2");
    script.insert(
        26,
        vec![Command::Move {
            player: Player::One,
            piece: pawn,
            target: state.board().square("d5").unwrap(),
        }],
    );
    script
}

fn run_script(ticks: u64) -> (GameState, Vec<clutch::protocol::Delta>) {
    let mut state = GameState::new(BoardKind::Standard, Speed::Lightning);
    state.start();
    let script = skirmish_script(&state);
    let mut stream = Vec::new();
    for tick in 0..ticks {
        let commands = script.get(&tick).cloned().unwrap_or_default();
        let report = state.advance(&commands);
        if let Some(update) = clutch::protocol::Delta::update(&state, &report.changes, 0) {
            stream.push(update);
        }
    }
    (state, stream)
}

#[test]
fn invariants_hold_through_a_skirmish() {
    let mut state = GameState::new(BoardKind::Standard, Speed::Lightning);
    state.start();
    let script = skirmish_script(&state);
    let mut last_elapsed: HashMap<PieceId, u64> = HashMap::new();

    for tick in 0..40 {
        let commands = script.get(&tick).cloned().unwrap_or_default();
        let report = state.advance(&commands);
        assert!(report.ended.is_none());

        for active in state.active_moves() {
            // Captured pieces never appear in the traversal table.
            assert!(!state.piece(active.piece).unwrap().captured);
            // Progress never regresses.
            let elapsed = active.elapsed(state.tick());
            let previous = last_elapsed.insert(active.piece, elapsed).unwrap_or(0);
            assert!(elapsed >= previous);
        }
        // No two traversals of one seat share a destination.
        for player in state.participants() {
            let destinations: Vec<Square> = state
                .active_moves()
                .iter()
                .filter(|active| state.piece(active.piece).unwrap().owner == player)
                .map(clutch::chess::core::ActiveMove::destination)
                .collect();
            let unique: HashSet<Square> = destinations.iter().copied().collect();
            assert_eq!(destinations.len(), unique.len());
        }
    }

    // The scripted capture and castle both landed.
    let d5 = state.board().square("d5").unwrap();
    let winner = state.piece_at(d5).unwrap();
    assert_eq!(winner.owner, Player::One);
    assert_eq!(winner.kind, PieceKind::Pawn);
    let g1 = state.board().square("g1").unwrap();
    assert_eq!(state.piece_at(g1).unwrap().kind, PieceKind::King);
    let f1 = state.board().square("f1").unwrap();
    assert_eq!(state.piece_at(f1).unwrap().kind, PieceKind::Rook);
}

#[test]
fn identical_scripts_produce_identical_streams() {
    let (state_a, stream_a) = run_script(40);
    let (state_b, stream_b) = run_script(40);
    assert_eq!(stream_a, stream_b);
    assert_eq!(state_a.pieces(), state_b.pieces());
    assert_eq!(state_a.cooldowns(), state_b.cooldowns());

    // A clone advanced with the same input stays identical to the original.
    let mut live = GameState::new(BoardKind::Standard, Speed::Lightning);
    live.start();
    let script = skirmish_script(&live);
    for tick in 0..20 {
        let commands = script.get(&tick).cloned().unwrap_or_default();
        let _ = live.advance(&commands);
    }
    let mut probe = live.clone();
    let late = script.get(&25).cloned().unwrap_or_default();
    let report_live = live.advance(&late);
    let report_probe = probe.advance(&late);
    assert_eq!(live.pieces(), probe.pieces());
    assert_eq!(live.active_moves(), probe.active_moves());
    assert_eq!(report_live.changes, report_probe.changes);
}
