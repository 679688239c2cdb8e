use criterion::{black_box, criterion_group, criterion_main, Criterion};
use chess_movegen::bitboard::attack_tables;
use chess_movegen::movegen::generate_legal;
use chess_movegen::movelist::MoveList;
use chess_movegen::perft::{perft, perft_parallel};
use chess_movegen::position::Position;

const SEB_FEN: &str = "r3k2r/p1ppqpb1/Bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPB1PPP/R3K2R b KQkq - 0 1";
const KIWIPETE_FEN: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

pub fn bench_legal_moves_from_start(c: &mut Criterion) {
    let pos = Position::startpos();
    c.bench_function("legal moves from start", |b| {
        b.iter(|| {
            let mut list = MoveList::new();
            generate_legal(black_box(&pos), &mut list);
            list.len()
        })
    });
}

pub fn bench_legal_moves_from_seb(c: &mut Criterion) {
    let pos = Position::from_fen(SEB_FEN).unwrap();
    c.bench_function("legal moves from seb", |b| {
        b.iter(|| black_box(&pos).legal_moves().len())
    });
}

pub fn bench_make_unmake(c: &mut Criterion) {
    let mut pos = Position::from_fen(KIWIPETE_FEN).unwrap();
    let moves = pos.legal_moves();
    c.bench_function("make/unmake every kiwipete move", |b| {
        b.iter(|| {
            for mv in &moves {
                pos.make_move(black_box(mv));
                pos.unmake_move(mv);
            }
        })
    });
}

pub fn bench_magic_lookup(c: &mut Criterion) {
    let tables = attack_tables();
    let occupied = Position::from_fen(KIWIPETE_FEN).unwrap().occupied();
    c.bench_function("queen attacks on every square", |b| {
        b.iter(|| {
            (0..64u8).fold(0u64, |acc, sq| acc ^ tables.queen_attacks(sq, black_box(occupied)))
        })
    });
}

pub fn bench_perft(c: &mut Criterion) {
    let mut group = c.benchmark_group("perft");
    group.sample_size(10);

    let mut start = Position::startpos();
    group.bench_function("start 4 ply", |b| b.iter(|| perft(&mut start, black_box(4))));

    let mut kiwipete = Position::from_fen(KIWIPETE_FEN).unwrap();
    group.bench_function("kiwipete 3 ply", |b| {
        b.iter(|| perft(&mut kiwipete, black_box(3)))
    });
    group.bench_function("kiwipete 4 ply parallel", |b| {
        b.iter(|| perft_parallel(&kiwipete, black_box(4)))
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_legal_moves_from_start,
    bench_legal_moves_from_seb,
    bench_make_unmake,
    bench_magic_lookup,
    bench_perft,
);
criterion_main!(benches);
