//! Random-playout properties of make/unmake, hashing and pin detection
//!
//! Run with: cargo test --test properties

use chess_movegen::bitboard::{sq_to_bb, Bitboard};
use chess_movegen::position::Position;
use chess_movegen::types::{Color, Move, PieceType};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const FENS: [&str; 6] = [
    "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
    "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
    "r3k2r/1bp2pP1/5n2/1P1Q4/1pPq4/5N2/1B1P2p1/R3K2R b KQkq c3 0 1",
];

const PLAYOUTS_PER_FEN: usize = 8;
const PLAYOUT_LENGTH: usize = 60;

const DIRECTIONS: [(i8, i8, bool); 8] = [
    (1, 0, false),
    (-1, 0, false),
    (0, 1, false),
    (0, -1, false),
    (1, 1, true),
    (1, -1, true),
    (-1, 1, true),
    (-1, -1, true),
];

/// Walk every ray out of the king square by square: a friendly piece
/// followed directly by an enemy slider of the ray's geometry is pinned.
fn scan_pins(pos: &Position) -> (Bitboard, Bitboard) {
    let us = pos.side_to_move();
    let king = pos.king_square(us);
    let mut pinned = 0;
    let mut pinners = 0;

    for (dr, df, diagonal) in DIRECTIONS {
        let mut rank = (king / 8) as i8;
        let mut file = (king % 8) as i8;
        let mut candidate = None;
        loop {
            rank += dr;
            file += df;
            if !(0..8).contains(&rank) || !(0..8).contains(&file) {
                break;
            }
            let sq = (rank * 8 + file) as u8;
            let Some(piece_type) = pos.piece_on(sq) else {
                continue;
            };
            if pos.color_on(sq) == Some(us) {
                if candidate.is_some() {
                    break;
                }
                candidate = Some(sq);
                continue;
            }
            let slides_here = match piece_type {
                PieceType::Queen => true,
                PieceType::Bishop => diagonal,
                PieceType::Rook => !diagonal,
                _ => false,
            };
            if let (Some(pinned_sq), true) = (candidate, slides_here) {
                pinned |= sq_to_bb(pinned_sq);
                pinners |= sq_to_bb(sq);
            }
            break;
        }
    }
    (pinned, pinners)
}

/// Play random legal moves, checking the position after each one, then
/// unwind everything and compare with the starting state.
fn playout(fen: &str, rng: &mut StdRng) {
    let mut pos = Position::from_fen(fen).unwrap();
    let start = pos.clone();
    let mut history: Vec<(Move, Position)> = Vec::new();

    for _ in 0..PLAYOUT_LENGTH {
        let moves = pos.legal_moves();
        if moves.is_empty() {
            assert!(pos.status().is_some());
            break;
        }
        let mv = moves.get(rng.gen_range(0..moves.len()));
        history.push((mv, pos.clone()));
        pos.make_move(mv);

        assert!(pos.is_valid(), "invalid after {mv}: {pos:?}");
        assert_eq!(pos.key(), pos.compute_key(), "key after {mv}");
        assert_eq!((pos.pinned(), pos.pinners()), scan_pins(&pos), "pins after {mv}: {pos:?}");
        assert_eq!(Position::from_fen(&pos.to_fen()).unwrap().key(), pos.key());
    }

    while let Some((mv, before)) = history.pop() {
        pos.unmake_move(mv);
        assert_eq!(pos, before, "unmake {mv}");
    }
    assert_eq!(pos, start);
}

#[test]
fn random_playouts_round_trip() {
    let mut rng = StdRng::seed_from_u64(0xC4E55);
    for fen in FENS {
        for _ in 0..PLAYOUTS_PER_FEN {
            playout(fen, &mut rng);
        }
    }
}

#[test]
fn transpositions_share_a_key() {
    let mut a = Position::startpos();
    let mut b = Position::startpos();
    for uci in ["g1f3", "g8f6", "b1c3", "b8c6"] {
        let mv = a.find_move(uci).unwrap();
        a.make_move(mv);
    }
    for uci in ["b1c3", "b8c6", "g1f3", "g8f6"] {
        let mv = b.find_move(uci).unwrap();
        b.make_move(mv);
    }
    assert_eq!(a.key(), b.key());
    assert_eq!(a.to_fen(), b.to_fen());

    // same placement, different side to move
    let white = Position::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
    let black = Position::from_fen("4k3/8/8/8/8/8/8/4K3 b - - 0 1").unwrap();
    assert_ne!(white.key(), black.key());
}

#[test]
fn king_never_left_in_check() {
    let mut rng = StdRng::seed_from_u64(7);
    for fen in FENS {
        let mut pos = Position::from_fen(fen).unwrap();
        for _ in 0..40 {
            let moves = pos.legal_moves();
            if moves.is_empty() {
                break;
            }
            let us = pos.side_to_move();
            for mv in &moves {
                pos.make_move(mv);
                let king = pos.king_square(us);
                assert!(
                    !pos.is_attacked(king, !us, pos.occupied()),
                    "{mv} leaves the {} king attacked",
                    us.to_human()
                );
                pos.unmake_move(mv);
            }
            pos.make_move(moves.get(rng.gen_range(0..moves.len())));
        }
    }
}

#[test]
fn double_check_yields_only_king_moves() {
    // discovered check by the rook plus the knight check
    let pos = Position::from_fen("4k3/8/3N4/8/8/8/8/4R1K1 b - - 0 1").unwrap();
    assert_eq!(pos.checkers().count_ones(), 2);
    let king = pos.king_square(Color::Black);
    assert!(pos.legal_moves().iter().all(|mv| mv.from == king));
}
