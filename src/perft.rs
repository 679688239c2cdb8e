//! Perft: count the leaf nodes of the legal move tree to a fixed depth.
//!
//! https://www.chessprogramming.org/Perft_Results

use std::time::{Duration, Instant};

use itertools::Itertools;
use log::{info, warn};
use rayon::prelude::*;

use crate::fen::FenError;
use crate::position::Position;
use crate::types::Move;

/// Count leaf nodes at `depth`. The last ply is bulk-counted from the
/// legal move list instead of being made.
pub fn perft(pos: &mut Position, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }
    let moves = pos.legal_moves();
    if depth == 1 {
        return moves.len() as u64;
    }

    let mut nodes = 0;
    for mv in &moves {
        pos.make_move(mv);
        nodes += perft(pos, depth - 1);
        pos.unmake_move(mv);
    }
    nodes
}

/// Node count under each root move, sorted by the move's UCI string.
pub fn divide(pos: &mut Position, depth: u32) -> Vec<(Move, u64)> {
    if depth == 0 {
        return Vec::new();
    }
    let moves = pos.legal_moves();
    moves
        .iter()
        .map(|mv| {
            pos.make_move(mv);
            let nodes = perft(pos, depth - 1);
            pos.unmake_move(mv);
            (mv, nodes)
        })
        .sorted_by_key(|(mv, _)| mv.to_uci())
        .collect()
}

/// `perft` with the root moves spread over the rayon pool. Every worker owns
/// a clone of the position.
pub fn perft_parallel(pos: &Position, depth: u32) -> u64 {
    if depth <= 1 {
        return perft(&mut pos.clone(), depth);
    }
    let moves: Vec<Move> = pos.legal_moves().iter().collect();
    moves
        .par_iter()
        .map(|&mv| {
            let mut child = pos.clone();
            child.make_move(mv);
            perft(&mut child, depth - 1)
        })
        .sum()
}

/// A position with its published node count at a given depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerftCase {
    pub fen: &'static str,
    pub depth: u32,
    pub nodes: u64,
}

impl PerftCase {
    pub const fn new(fen: &'static str, depth: u32, nodes: u64) -> Self {
        Self { fen, depth, nodes }
    }
}

/// Positions chosen to exercise castling, en passant, promotion, pins and
/// discovered checks.
pub const REFERENCE_SUITE: &[PerftCase] = &[
    PerftCase::new("1k6/1b6/8/8/7R/8/8/4K2R b K - 0 1", 5, 1_063_513),
    PerftCase::new("3k4/3p4/8/K1P4r/8/8/8/8 b - - 0 1", 6, 1_134_888),
    PerftCase::new("8/8/4k3/8/2p5/8/B2P2K1/8 w - - 0 1", 6, 1_015_133),
    PerftCase::new("8/8/1k6/2b5/2pP4/8/5K2/8 b - d3 0 1", 6, 1_440_467),
    PerftCase::new("5k2/8/8/8/8/8/8/4K2R w K - 0 1", 6, 661_072),
    PerftCase::new("3k4/8/8/8/8/8/8/R3K3 w Q - 0 1", 6, 803_711),
    PerftCase::new("r3k2r/1b4bq/8/8/8/8/7B/R3K2R w KQkq - 0 1", 4, 1_274_206),
    PerftCase::new("r3k2r/8/3Q4/8/8/5q2/8/R3K2R b KQkq - 0 1", 4, 1_720_476),
    PerftCase::new("2K2r2/4P3/8/8/8/8/8/3k4 w - - 0 1", 6, 3_821_001),
    PerftCase::new("8/8/1P2K3/8/2n5/1q6/8/5k2 b - - 0 1", 5, 1_004_658),
    PerftCase::new("4k3/1P6/8/8/8/8/K7/8 w - - 0 1", 6, 217_342),
    PerftCase::new("8/P1k5/K7/8/8/8/8/8 w - - 0 1", 6, 92_683),
    PerftCase::new("K1k5/8/P7/8/8/8/8/8 w - - 0 1", 6, 2_217),
    PerftCase::new("8/k1P5/8/1K6/8/8/8/8 w - - 0 1", 7, 567_584),
    PerftCase::new("8/8/2k5/5q2/5n2/8/5K2/8 b - - 0 1", 4, 23_527),
    PerftCase::new(
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        5,
        193_690_690,
    ),
    PerftCase::new("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1", 7, 178_633_661),
    PerftCase::new(
        "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
        5,
        15_833_292,
    ),
    PerftCase::new(
        "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
        5,
        89_941_194,
    ),
    PerftCase::new(
        "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
        5,
        164_075_551,
    ),
    PerftCase::new(
        "r3k2r/1bp2pP1/5n2/1P1Q4/1pPq4/5N2/1B1P2p1/R3K2R b KQkq c3 0 1",
        5,
        202_902_054,
    ),
];

#[derive(Debug, Clone, Copy)]
pub struct SuiteResult {
    pub case: PerftCase,
    pub nodes: u64,
    pub elapsed: Duration,
}

impl SuiteResult {
    pub fn passed(&self) -> bool {
        self.nodes == self.case.nodes
    }

    pub fn nodes_per_second(&self) -> f64 {
        self.nodes as f64 / self.elapsed.as_secs_f64().max(1e-9)
    }
}

/// Run every case, logging each outcome. Stops at the first FEN that fails to parse.
pub fn run_suite(cases: &[PerftCase], parallel: bool) -> Result<Vec<SuiteResult>, FenError> {
    let mut results = Vec::with_capacity(cases.len());
    for case in cases {
        let mut pos = Position::from_fen(case.fen)?;
        let start = Instant::now();
        let nodes = if parallel {
            perft_parallel(&pos, case.depth)
        } else {
            perft(&mut pos, case.depth)
        };
        let result = SuiteResult {
            case: *case,
            nodes,
            elapsed: start.elapsed(),
        };
        if result.passed() {
            info!(
                "ok    depth {} {:>11} nodes {:>8.2?} ({:.0} nps)  {}",
                case.depth,
                nodes,
                result.elapsed,
                result.nodes_per_second(),
                case.fen
            );
        } else {
            warn!(
                "FAIL  depth {} expected {} got {}  {}",
                case.depth, case.nodes, nodes, case.fen
            );
        }
        results.push(result);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::STARTING_POSITION_FEN;

    fn check(fen: &str, expected: &[u64]) {
        let mut pos = Position::from_fen(fen).unwrap();
        for (depth, &nodes) in expected.iter().enumerate() {
            assert_eq!(perft(&mut pos, depth as u32 + 1), nodes, "{fen} depth {}", depth + 1);
        }
        // perft leaves the position untouched
        assert_eq!(pos, Position::from_fen(fen).unwrap());
    }

    #[test]
    fn perft_start() {
        let mut pos = Position::startpos();
        assert_eq!(perft(&mut pos, 0), 1);
        check(STARTING_POSITION_FEN, &[20, 400, 8_902, 197_281]);
    }

    #[test]
    fn perft_kiwipete() {
        check(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            &[48, 2_039, 97_862],
        );
    }

    #[test]
    fn perft_pos_3() {
        check("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1", &[14, 191, 2_812, 43_238]);
    }

    #[test]
    fn perft_pos_4() {
        check(
            "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
            &[6, 264, 9_467],
        );
    }

    /// Run the perft test on the "position 5" from
    /// https://www.chessprogramming.org/Perft_Results
    #[test]
    fn perft_pos_5() {
        check(
            "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
            &[44, 1_486, 62_379],
        );
    }

    #[test]
    fn perft_pos_6() {
        check(
            "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
            &[46, 2_079, 89_890],
        );
    }

    #[test]
    fn divide_sums_to_perft() {
        let mut pos = Position::startpos();
        let split = divide(&mut pos, 3);
        assert_eq!(split.len(), 20);
        assert_eq!(split.iter().map(|(_, n)| n).sum::<u64>(), 8_902);
        assert_eq!(split[0].0.to_uci(), "a2a3");
        assert_eq!(split[0].1, 380);
    }

    #[test]
    fn parallel_matches_serial() {
        let pos = Position::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        )
        .unwrap();
        assert_eq!(perft_parallel(&pos, 3), 97_862);
        assert_eq!(perft_parallel(&pos, 1), 48);
    }

    #[test]
    fn suite_reports_mismatch() {
        let cases = [
            PerftCase::new(STARTING_POSITION_FEN, 2, 400),
            PerftCase::new(STARTING_POSITION_FEN, 2, 401),
        ];
        let results = run_suite(&cases, false).unwrap();
        assert!(results[0].passed());
        assert!(!results[1].passed());

        let bad = [PerftCase::new("not a fen", 1, 0)];
        assert!(run_suite(&bad, false).is_err());
    }
}
