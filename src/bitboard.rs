//! Bitboard representation and precomputed attack tables for fast move generation.
//!
//! A bitboard is a 64-bit integer where each bit represents a square on the chess board.
//! Square indexing: a1 = 0, b1 = 1, ..., h1 = 7, a2 = 8, ..., h8 = 63
//! This corresponds to: square_index = rank * 8 + file where rank/file are 0-indexed.
//!
//! Magic bitboards are used for O(1) sliding piece attack lookups. Each square has a
//! "magic number" that maps occupancy patterns to attack sets via a hash table. The magic
//! numbers are searched for when the tables are built and every candidate is checked
//! against a slow ray walk over all blocker subsets, so the lookup is exact.

use std::time::Instant;

use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::Color;

pub type Bitboard = u64;

pub const FILE_A: Bitboard = 0x0101_0101_0101_0101;
pub const FILE_B: Bitboard = FILE_A << 1;
pub const FILE_G: Bitboard = FILE_A << 6;
pub const FILE_H: Bitboard = FILE_A << 7;

pub const RANK_1: Bitboard = 0xFF;
pub const RANK_2: Bitboard = RANK_1 << 8;
pub const RANK_3: Bitboard = RANK_1 << 16;
pub const RANK_6: Bitboard = RANK_1 << 40;
pub const RANK_7: Bitboard = RANK_1 << 48;
pub const RANK_8: Bitboard = RANK_1 << 56;

/// Seed for the magic number search. Any seed works, a fixed one keeps start-up deterministic.
const MAGIC_SEED: u64 = 0x5EED_0F_B17B_0A4D;

/// Convert a square index to a bitboard with that single bit set
#[inline(always)]
pub const fn sq_to_bb(sq: u8) -> Bitboard {
    1u64 << sq
}

/// Index of the least significant set bit.
#[inline(always)]
pub fn lsb(bb: Bitboard) -> u8 {
    debug_assert!(bb != 0, "lsb of an empty bitboard");
    bb.trailing_zeros() as u8
}

/// Remove and return the least significant set bit.
#[inline(always)]
pub fn pop_lsb(bb: &mut Bitboard) -> u8 {
    let sq = lsb(*bb);
    *bb &= *bb - 1;
    sq
}

/// Iterate over set bits in a bitboard, returning square indices
pub struct BitboardIter(pub Bitboard);

impl Iterator for BitboardIter {
    type Item = u8;

    #[inline(always)]
    fn next(&mut self) -> Option<Self::Item> {
        if self.0 == 0 {
            None
        } else {
            let sq = self.0.trailing_zeros() as u8;
            self.0 &= self.0 - 1; // Clear the lowest set bit
            Some(sq)
        }
    }
}

/// Squares attacked by every pawn in `pawns` moving in `color`'s direction.
#[inline(always)]
pub const fn pawn_attacks_bb(color: Color, pawns: Bitboard) -> Bitboard {
    match color {
        Color::White => (pawns & !FILE_A) << 7 | (pawns & !FILE_H) << 9,
        Color::Black => (pawns & !FILE_H) >> 7 | (pawns & !FILE_A) >> 9,
    }
}

const fn knight_attacks_bb(b: Bitboard) -> Bitboard {
    (b & !FILE_H) << 17
        | (b & !FILE_A) << 15
        | (b & !(FILE_G | FILE_H)) << 10
        | (b & !(FILE_A | FILE_B)) << 6
        | (b & !FILE_A) >> 17
        | (b & !FILE_H) >> 15
        | (b & !(FILE_A | FILE_B)) >> 10
        | (b & !(FILE_G | FILE_H)) >> 6
}

const fn king_attacks_bb(b: Bitboard) -> Bitboard {
    (b & !FILE_H) << 1
        | (b & !FILE_A) >> 1
        | b << 8
        | b >> 8
        | (b & !FILE_H) << 9
        | (b & !FILE_A) << 7
        | (b & !FILE_H) >> 7
        | (b & !FILE_A) >> 9
}

const ROOK_DIRECTIONS: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const BISHOP_DIRECTIONS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

/// Attacks along `directions` stopping at (and including) the first blocker.
fn sliding_attacks_slow(sq: u8, occupied: Bitboard, directions: &[(i8, i8); 4]) -> Bitboard {
    let rank = (sq >> 3) as i8;
    let file = (sq & 7) as i8;
    let mut attacks = 0u64;

    for &(dr, df) in directions {
        let mut r = rank + dr;
        let mut f = file + df;
        while (0..8).contains(&r) && (0..8).contains(&f) {
            let target = 1u64 << (r * 8 + f);
            attacks |= target;
            if occupied & target != 0 {
                break;
            }
            r += dr;
            f += df;
        }
    }
    attacks
}

/// Blocker-relevant squares: the empty-board rays minus the board edge at the end of each ray.
fn relevant_mask(sq: u8, directions: &[(i8, i8); 4]) -> Bitboard {
    let rank = (sq >> 3) as i8;
    let file = (sq & 7) as i8;
    let mut mask = 0u64;

    for &(dr, df) in directions {
        let mut r = rank + dr;
        let mut f = file + df;
        while (0..8).contains(&(r + dr)) && (0..8).contains(&(f + df)) {
            mask |= 1u64 << (r * 8 + f);
            r += dr;
            f += df;
        }
    }
    mask
}

/// Generate all subsets of a mask using Carry-Rippler technique
fn all_subsets(mask: Bitboard) -> impl Iterator<Item = Bitboard> {
    let mut subset = 0u64;
    let mut done = false;
    std::iter::from_fn(move || {
        if done {
            return None;
        }
        let current = subset;
        subset = subset.wrapping_sub(mask) & mask;
        if subset == 0 {
            done = true;
        }
        Some(current)
    })
}

/// One square's entry into the shared slider attack table.
#[derive(Debug, Clone, Copy, Default)]
struct Magic {
    mask: Bitboard,
    magic: u64,
    shift: u32,
    offset: usize,
}

impl Magic {
    #[inline(always)]
    fn index(&self, occupied: Bitboard) -> usize {
        self.offset + ((occupied & self.mask).wrapping_mul(self.magic) >> self.shift) as usize
    }
}

/// Search for a multiplier that maps every blocker subset of `mask` to a slot without
/// destructive collisions, and append the resulting attack table to `table`.
fn find_magic(
    sq: u8,
    directions: &[(i8, i8); 4],
    rng: &mut StdRng,
    table: &mut Vec<Bitboard>,
) -> Magic {
    let mask = relevant_mask(sq, directions);
    let bits = mask.count_ones();
    let size = 1usize << bits;
    let occupancies: Vec<Bitboard> = all_subsets(mask).collect();
    let attacks: Vec<Bitboard> = occupancies
        .iter()
        .map(|&occ| sliding_attacks_slow(sq, occ, directions))
        .collect();

    let mut slots = vec![0u64; size];
    // attempt number that last wrote each slot, so slots never need clearing
    let mut epoch = vec![0u32; size];
    let mut attempt = 0u32;

    loop {
        let magic = rng.gen::<u64>() & rng.gen::<u64>() & rng.gen::<u64>();
        if (mask.wrapping_mul(magic) & 0xFF00_0000_0000_0000).count_ones() < 6 {
            continue;
        }
        attempt += 1;

        let candidate = Magic {
            mask,
            magic,
            shift: 64 - bits,
            offset: 0,
        };
        let collision_free = occupancies.iter().zip(&attacks).all(|(&occ, &att)| {
            let idx = candidate.index(occ);
            if epoch[idx] != attempt {
                epoch[idx] = attempt;
                slots[idx] = att;
                true
            } else {
                slots[idx] == att
            }
        });

        if collision_free {
            let offset = table.len();
            table.extend_from_slice(&slots);
            return Magic { offset, ..candidate };
        }
    }
}

/// Precomputed attack tables
pub struct AttackTables {
    /// Knight attacks for each square
    pub knight: [Bitboard; 64],
    /// King attacks for each square
    pub king: [Bitboard; 64],
    /// Pawn attacks for each color and square: pawn[color as usize][square]
    pub pawn: [[Bitboard; 64]; 2],
    /// Bishop attacks on an empty board
    pub bishop_rays: [Bitboard; 64],
    /// Rook attacks on an empty board
    pub rook_rays: [Bitboard; 64],
    bishop_magics: [Magic; 64],
    rook_magics: [Magic; 64],
    /// Every square's slider attack table, concatenated
    slider_attacks: Vec<Bitboard>,
    /// Squares strictly between two aligned squares
    between: [[Bitboard; 64]; 64],
    /// Whole line through two aligned squares, edge to edge
    line: [[Bitboard; 64]; 64],
}

impl AttackTables {
    pub fn new() -> Self {
        let start = Instant::now();
        let mut rng = StdRng::seed_from_u64(MAGIC_SEED);

        let mut tables = AttackTables {
            knight: [0; 64],
            king: [0; 64],
            pawn: [[0; 64]; 2],
            bishop_rays: [0; 64],
            rook_rays: [0; 64],
            bishop_magics: [Magic::default(); 64],
            rook_magics: [Magic::default(); 64],
            slider_attacks: Vec::with_capacity(108_000),
            between: [[0; 64]; 64],
            line: [[0; 64]; 64],
        };

        for sq in 0..64u8 {
            let mask = sq_to_bb(sq);
            let i = sq as usize;
            tables.knight[i] = knight_attacks_bb(mask);
            tables.king[i] = king_attacks_bb(mask);
            tables.pawn[Color::White.index()][i] = pawn_attacks_bb(Color::White, mask);
            tables.pawn[Color::Black.index()][i] = pawn_attacks_bb(Color::Black, mask);
            tables.bishop_rays[i] = sliding_attacks_slow(sq, 0, &BISHOP_DIRECTIONS);
            tables.rook_rays[i] = sliding_attacks_slow(sq, 0, &ROOK_DIRECTIONS);
            tables.bishop_magics[i] =
                find_magic(sq, &BISHOP_DIRECTIONS, &mut rng, &mut tables.slider_attacks);
            tables.rook_magics[i] =
                find_magic(sq, &ROOK_DIRECTIONS, &mut rng, &mut tables.slider_attacks);
        }

        for a in 0..64u8 {
            for b in 0..64u8 {
                let ends = sq_to_bb(a) | sq_to_bb(b);
                let (ai, bi) = (a as usize, b as usize);
                // A rook and a bishop line never share two squares, so at most one branch applies.
                if tables.rook_rays[ai] & sq_to_bb(b) != 0 {
                    tables.between[ai][bi] =
                        tables.rook_attacks(a, ends) & tables.rook_attacks(b, ends);
                    tables.line[ai][bi] = (tables.rook_rays[ai] & tables.rook_rays[bi]) | ends;
                } else if tables.bishop_rays[ai] & sq_to_bb(b) != 0 {
                    tables.between[ai][bi] =
                        tables.bishop_attacks(a, ends) & tables.bishop_attacks(b, ends);
                    tables.line[ai][bi] =
                        (tables.bishop_rays[ai] & tables.bishop_rays[bi]) | ends;
                }
            }
        }

        log::debug!(
            "attack tables ready in {:?} ({} slider entries)",
            start.elapsed(),
            tables.slider_attacks.len()
        );
        tables
    }

    /// Get bishop attacks using magic lookup
    #[inline(always)]
    pub fn bishop_attacks(&self, sq: u8, occupied: Bitboard) -> Bitboard {
        debug_assert!(sq < 64, "square {sq} out of range");
        self.slider_attacks[self.bishop_magics[sq as usize].index(occupied)]
    }

    /// Get rook attacks using magic lookup
    #[inline(always)]
    pub fn rook_attacks(&self, sq: u8, occupied: Bitboard) -> Bitboard {
        debug_assert!(sq < 64, "square {sq} out of range");
        self.slider_attacks[self.rook_magics[sq as usize].index(occupied)]
    }

    /// Get queen attacks (combines bishop and rook)
    #[inline(always)]
    pub fn queen_attacks(&self, sq: u8, occupied: Bitboard) -> Bitboard {
        self.bishop_attacks(sq, occupied) | self.rook_attacks(sq, occupied)
    }

    #[inline(always)]
    pub fn pawn_attacks(&self, color: Color, sq: u8) -> Bitboard {
        self.pawn[color.index()][sq as usize]
    }

    #[inline(always)]
    pub fn between(&self, a: u8, b: u8) -> Bitboard {
        self.between[a as usize][b as usize]
    }

    #[inline(always)]
    pub fn line(&self, a: u8, b: u8) -> Bitboard {
        self.line[a as usize][b as usize]
    }
}

impl Default for AttackTables {
    fn default() -> Self {
        Self::new()
    }
}

/// Global attack tables (lazily initialized on first use, read-only afterwards)
pub static ATTACK_TABLES: Lazy<AttackTables> = Lazy::new(AttackTables::new);

/// Get the global attack tables, initializing if needed
#[inline]
pub fn attack_tables() -> &'static AttackTables {
    &ATTACK_TABLES
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::square;

    fn sq(name: &str) -> u8 {
        crate::types::square_from_algebraic(name).unwrap()
    }

    fn bb(names: &[&str]) -> Bitboard {
        names.iter().fold(0, |acc, n| acc | sq_to_bb(sq(n)))
    }

    #[test]
    fn test_knight_attacks() {
        // Knight on e4 should attack d2, f2, c3, g3, c5, g5, d6, f6
        let attacks = attack_tables().knight[sq("e4") as usize];
        assert_eq!(attacks, bb(&["d2", "f2", "c3", "g3", "c5", "g5", "d6", "f6"]));
    }

    #[test]
    fn test_knight_does_not_wrap() {
        assert_eq!(attack_tables().knight[sq("a1") as usize], bb(&["b3", "c2"]));
        assert_eq!(attack_tables().knight[sq("h4") as usize], bb(&["g2", "f3", "f5", "g6"]));
        assert_eq!(attack_tables().knight[sq("b8") as usize], bb(&["a6", "c6", "d7"]));
    }

    #[test]
    fn test_king_attacks() {
        assert_eq!(attack_tables().king[sq("e4") as usize].count_ones(), 8);
        assert_eq!(attack_tables().king[sq("a1") as usize], bb(&["a2", "b1", "b2"]));
        assert_eq!(attack_tables().king[sq("h5") as usize], bb(&["g4", "g5", "g6", "h4", "h6"]));
    }

    #[test]
    fn test_pawn_attacks() {
        let tables = attack_tables();
        assert_eq!(tables.pawn_attacks(Color::White, sq("e4")), bb(&["d5", "f5"]));
        assert_eq!(tables.pawn_attacks(Color::Black, sq("e5")), bb(&["d4", "f4"]));
        assert_eq!(tables.pawn_attacks(Color::White, sq("a2")), bb(&["b3"]));
        assert_eq!(tables.pawn_attacks(Color::Black, sq("h7")), bb(&["g6"]));
    }

    #[test]
    fn test_rook_attacks_empty_board() {
        // Should attack 14 squares (7 on rank, 7 on file)
        assert_eq!(attack_tables().rook_attacks(sq("e4"), 0).count_ones(), 14);
    }

    #[test]
    fn test_rook_attacks_with_blockers() {
        let attacks = attack_tables().rook_attacks(sq("e4"), bb(&["e2", "g4"]));
        // Should include e2 and g4 (can capture), but not squares beyond
        assert!(attacks & sq_to_bb(sq("e2")) != 0);
        assert!(attacks & sq_to_bb(sq("g4")) != 0);
        assert!(attacks & sq_to_bb(sq("e1")) == 0);
        assert!(attacks & sq_to_bb(sq("h4")) == 0);
    }

    #[test]
    fn test_bishop_attacks_with_blockers() {
        let attacks = attack_tables().bishop_attacks(sq("e4"), bb(&["c2", "g6"]));
        assert!(attacks & sq_to_bb(sq("c2")) != 0);
        assert!(attacks & sq_to_bb(sq("g6")) != 0);
        assert!(attacks & sq_to_bb(sq("b1")) == 0);
        assert!(attacks & sq_to_bb(sq("h7")) == 0);
    }

    #[test]
    fn test_queen_attacks() {
        // Should attack 27 squares (14 rook + 13 bishop)
        assert_eq!(attack_tables().queen_attacks(sq("e4"), 0).count_ones(), 27);
    }

    #[test]
    fn test_bitboard_iter() {
        let squares: Vec<u8> = BitboardIter(bb(&["a1", "h1", "h8"])).collect();
        assert_eq!(squares, vec![0, 7, 63]);
    }

    #[test]
    fn test_magic_matches_slow_walk() {
        let tables = attack_tables();
        let mut rng = StdRng::seed_from_u64(7);
        for s in 0..64u8 {
            for _ in 0..64 {
                let occupied = rng.gen::<u64>() & rng.gen::<u64>();
                assert_eq!(
                    tables.rook_attacks(s, occupied),
                    sliding_attacks_slow(s, occupied, &ROOK_DIRECTIONS),
                    "Rook mismatch at sq={}, occ={:#x}",
                    s,
                    occupied
                );
                assert_eq!(
                    tables.bishop_attacks(s, occupied),
                    sliding_attacks_slow(s, occupied, &BISHOP_DIRECTIONS),
                    "Bishop mismatch at sq={}, occ={:#x}",
                    s,
                    occupied
                );
            }
        }
    }

    #[test]
    fn test_between() {
        let tables = attack_tables();
        assert_eq!(tables.between(sq("a1"), sq("a4")), bb(&["a2", "a3"]));
        assert_eq!(tables.between(sq("a4"), sq("a1")), bb(&["a2", "a3"]));
        assert_eq!(tables.between(sq("c1"), sq("h6")), bb(&["d2", "e3", "f4", "g5"]));
        assert_eq!(tables.between(sq("b1"), sq("c1")), 0);
        // not aligned
        assert_eq!(tables.between(sq("a1"), sq("b3")), 0);
        assert_eq!(tables.between(sq("e4"), sq("e4")), 0);
    }

    #[test]
    fn test_between_is_symmetric() {
        let tables = attack_tables();
        for a in 0..64u8 {
            for b in 0..64u8 {
                assert_eq!(tables.between(a, b), tables.between(b, a));
            }
        }
    }

    #[test]
    fn test_line() {
        let tables = attack_tables();
        assert_eq!(tables.line(sq("b2"), sq("d4")), tables.bishop_rays[0] | sq_to_bb(0));
        assert_eq!(tables.line(square(3, 0), square(3, 5)), RANK_1 << 24);
        assert_eq!(tables.line(sq("a1"), sq("b3")), 0);
    }
}
