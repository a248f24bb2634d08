//! Contact detection between pieces and the capture rules that resolve it.
//! Runs once per tick after motion, before traversals retire.

use itertools::Itertools;

use crate::chess::core::{PieceId, PieceKind, Player};
use crate::game::motion::ScaledPos;
use crate::game::tick::ChangeLog;
use crate::game::GameState;

/// Chebyshev contact radius as a fraction of a square (2/5 = 0.4). A rules
/// constant, not tunable play balance.
pub const CONTACT_RADIUS: (i64, i64) = (2, 5);

/// Fraction of its travel a knight spends airborne (17/20 = 0.85). While
/// airborne the knight neither captures nor can be captured.
pub const KNIGHT_AIRBORNE: (u64, u64) = (17, 20);

/// Two positions are in contact when their Chebyshev distance is within the
/// radius. In scaled units: `|Δ| · 5 ≤ 2 · tps`.
#[must_use]
pub fn in_contact(a: ScaledPos, b: ScaledPos, ticks_per_square: u32) -> bool {
    a.chebyshev(b) * CONTACT_RADIUS.1 <= CONTACT_RADIUS.0 * i64::from(ticks_per_square)
}

/// One in-flight piece, sampled for this tick's resolution.
#[derive(Copy, Clone, Debug)]
struct Mover {
    piece: PieceId,
    owner: Player,
    pos: ScaledPos,
    start_tick: u64,
    order: usize,
    partner: Option<PieceId>,
    /// False only for airborne knights, which skip resolution entirely.
    collidable: bool,
}

/// Applies the outcome rules in priority order:
///
/// 1. a mover in contact with a resting enemy captures it and travels on;
/// 2. two moving enemies in contact destroy each other;
/// 3. two moving friends in contact abort the later-departing one;
/// 4. a mover in contact with a resting friend is an admission invariant
///    violation: logged, and the mover aborts deterministically.
///
/// Castling legs ignore their own companion but collide with everyone else.
pub(crate) fn resolve(state: &mut GameState, sample: u64, changes: &mut ChangeLog) {
    let tps = state.params.ticks_per_square;
    let movers: Vec<Mover> = state
        .moves
        .iter()
        .enumerate()
        .map(|(order, active)| {
            let piece = &state.pieces[active.piece.0 as usize];
            let airborne = piece.kind == PieceKind::Knight
                && active.elapsed(sample) * KNIGHT_AIRBORNE.1
                    < KNIGHT_AIRBORNE.0 * active.total_ticks(tps);
            Mover {
                piece: active.piece,
                owner: piece.owner,
                pos: active.scaled_position(sample, tps),
                start_tick: active.start_tick,
                order,
                partner: active.partner,
                collidable: !airborne,
            }
        })
        .filter(|mover| mover.collidable)
        .collect();

    // Rule 1: capture resting enemies caught in a mover's way.
    let mut rested_captures: Vec<PieceId> = Vec::new();
    for mover in &movers {
        for piece in &state.pieces {
            if piece.captured || piece.owner == mover.owner || state.is_moving(piece.id) {
                continue;
            }
            let rest = ScaledPos::of_square(piece.square, tps);
            if in_contact(mover.pos, rest, tps) {
                rested_captures.push(piece.id);
            }
        }
    }
    for id in rested_captures {
        state.capture_piece(id, changes);
    }

    // Rule 2: mutual destruction between moving enemies.
    let mut mutual: Vec<PieceId> = Vec::new();
    for (a, b) in movers.iter().tuple_combinations() {
        if companions(a, b) || a.owner == b.owner {
            continue;
        }
        if in_contact(a.pos, b.pos, tps) {
            mutual.push(a.piece);
            mutual.push(b.piece);
        }
    }
    for id in mutual {
        state.capture_piece(id, changes);
    }

    // Rule 3: coincident friendly traversals; the later departure backs off.
    let mut aborts: Vec<PieceId> = Vec::new();
    for (a, b) in movers.iter().tuple_combinations() {
        if companions(a, b) || a.owner != b.owner {
            continue;
        }
        if state.pieces[a.piece.0 as usize].captured || state.pieces[b.piece.0 as usize].captured {
            continue;
        }
        if in_contact(a.pos, b.pos, tps) {
            let later = if (b.start_tick, b.order) > (a.start_tick, a.order) {
                b
            } else {
                a
            };
            aborts.push(later.piece);
        }
    }
    for id in aborts {
        state.abort_move(id, sample, changes);
    }

    // Rule 4: contact with a resting friend should have been unreachable
    // through admission.
    let mut violations: Vec<PieceId> = Vec::new();
    for mover in &movers {
        if state.pieces[mover.piece.0 as usize].captured || !state.is_moving(mover.piece) {
            continue;
        }
        for piece in &state.pieces {
            if piece.captured || piece.owner != mover.owner || piece.id == mover.piece {
                continue;
            }
            if state.is_moving(piece.id) {
                continue;
            }
            let rest = ScaledPos::of_square(piece.square, tps);
            if in_contact(mover.pos, rest, tps) {
                log::warn!(
                    "invariant violation: {} in flight contacted resting friend {} at tick {}",
                    state.pieces[mover.piece.0 as usize],
                    piece,
                    sample
                );
                violations.push(mover.piece);
                break;
            }
        }
    }
    for id in violations {
        state.abort_move(id, sample, changes);
    }
}

fn companions(a: &Mover, b: &Mover) -> bool {
    a.partner == Some(b.piece) || b.partner == Some(a.piece)
}
