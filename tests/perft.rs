//! Integration tests for move generation against published perft counts
//!
//! The deep cases take minutes with debug assertions on. Run them with:
//! cargo test --release --test perft -- --ignored

use chess_movegen::perft::{perft, perft_parallel, REFERENCE_SUITE};
use chess_movegen::position::Position;

fn nodes(fen: &str, depth: u32) -> u64 {
    let mut pos = Position::from_fen(fen).unwrap();
    perft(&mut pos, depth)
}

#[test]
fn startpos_depth_3() {
    assert_eq!(perft(&mut Position::startpos(), 3), 8_902);
}

#[test]
fn en_passant_with_discovered_check_shallow() {
    assert_eq!(nodes("8/8/1k6/2b5/2pP4/8/5K2/8 b - d3 0 1", 1), 15);
}

#[test]
fn promotion_with_check_shallow() {
    // 5 king moves + 4 promotions
    assert_eq!(nodes("4k3/1P6/8/8/8/8/K7/8 w - - 0 1", 1), 9);
}

#[test]
fn reference_suite_shallow() {
    // three plies below the published depth keeps this in the default run
    for case in REFERENCE_SUITE {
        let mut pos = Position::from_fen(case.fen).unwrap();
        let before = pos.clone();
        perft(&mut pos, case.depth.saturating_sub(3).max(1));
        assert_eq!(pos, before, "{}", case.fen);
    }
}

#[test]
#[ignore]
fn startpos_depth_5() {
    assert_eq!(perft(&mut Position::startpos(), 5), 4_865_609);
}

#[test]
#[ignore]
fn startpos_depth_6() {
    assert_eq!(perft_parallel(&Position::startpos(), 6), 119_060_324);
}

#[test]
#[ignore]
fn kiwipete_depth_5() {
    let pos = Position::from_fen(
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    )
    .unwrap();
    assert_eq!(perft_parallel(&pos, 5), 193_690_690);
}

#[test]
#[ignore]
fn en_passant_with_discovered_check_depth_6() {
    assert_eq!(nodes("8/8/1k6/2b5/2pP4/8/5K2/8 b - d3 0 1", 6), 1_440_467);
}

#[test]
#[ignore]
fn promotion_with_check_depth_6() {
    assert_eq!(nodes("4k3/1P6/8/8/8/8/K7/8 w - - 0 1", 6), 217_342);
}

#[test]
#[ignore]
fn reference_suite() {
    let mut failures = Vec::new();
    for case in REFERENCE_SUITE {
        let pos = Position::from_fen(case.fen).unwrap();
        let got = perft_parallel(&pos, case.depth);
        if got != case.nodes {
            failures.push(format!(
                "{} depth {}: expected {} got {}",
                case.fen, case.depth, case.nodes, got
            ));
        }
    }
    assert!(failures.is_empty(), "{}", failures.join("\n"));
}
