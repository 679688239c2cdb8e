use std::collections::HashSet;

use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::{CastleRights, Color, PieceType};

/// Seed used by the global key set.
const DEFAULT_SEED: u64 = 0x1234567890ABCDEF;

const SIDE_KEYS: usize = 2;
const CASTLE_KEYS: usize = 16;
const EN_PASSANT_KEYS: usize = 8;
const PIECE_KEYS: usize = 2 * 6 * 64;
const TOTAL_KEYS: usize = SIDE_KEYS + CASTLE_KEYS + EN_PASSANT_KEYS + PIECE_KEYS;

/// Zobrist hashing keys for chess positions.
/// These are pseudo-random u64 values XORed together to create a unique hash for each position.
/// Every key in the set is distinct from every other, across categories.
#[derive(Debug, Clone)]
pub struct ZobristKeys {
    /// One key per side to move
    side: [u64; SIDE_KEYS],
    /// One key per castling-rights value (all 16 combinations)
    castle: [u64; CASTLE_KEYS],
    /// Keys for en passant file (0-7 for files a-h)
    en_passant: [u64; EN_PASSANT_KEYS],
    /// Indexed as: pieces[color][piece_type][square]
    pieces: [[[u64; 64]; 6]; 2],
}

impl ZobristKeys {
    pub fn new() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }

    /// Draw a pool of distinct keys from a seeded generator and partition it.
    pub fn with_seed(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut seen = HashSet::with_capacity(TOTAL_KEYS);
        let mut pool = Vec::with_capacity(TOTAL_KEYS);
        while pool.len() < TOTAL_KEYS {
            let key: u64 = rng.gen();
            // zero would leave the hash unchanged
            if key != 0 && seen.insert(key) {
                pool.push(key);
            }
        }

        let mut keys = pool.into_iter();
        let mut next = || keys.next().unwrap_or_default();

        let mut zobrist = ZobristKeys {
            side: [0; SIDE_KEYS],
            castle: [0; CASTLE_KEYS],
            en_passant: [0; EN_PASSANT_KEYS],
            pieces: [[[0; 64]; 6]; 2],
        };
        zobrist.side.iter_mut().for_each(|k| *k = next());
        zobrist.castle.iter_mut().for_each(|k| *k = next());
        zobrist.en_passant.iter_mut().for_each(|k| *k = next());
        zobrist
            .pieces
            .iter_mut()
            .flatten()
            .flatten()
            .for_each(|k| *k = next());
        zobrist
    }

    #[inline(always)]
    pub fn side_key(&self, color: Color) -> u64 {
        self.side[color.index()]
    }

    #[inline(always)]
    pub fn castle_key(&self, rights: CastleRights) -> u64 {
        self.castle[rights.bits() as usize]
    }

    #[inline(always)]
    pub fn en_passant_key(&self, file: u8) -> u64 {
        debug_assert!(file < 8, "en passant file {file} out of range");
        self.en_passant[file as usize]
    }

    /// Get the key for a piece at a square
    #[inline(always)]
    pub fn piece_key(&self, color: Color, piece_type: PieceType, sq: u8) -> u64 {
        debug_assert!(sq < 64, "square {sq} out of range");
        self.pieces[color.index()][piece_type.index()][sq as usize]
    }

    #[inline(always)]
    pub fn toggle_side(&self, key: &mut u64, color: Color) {
        *key ^= self.side_key(color);
    }

    #[inline(always)]
    pub fn toggle_castle(&self, key: &mut u64, rights: CastleRights) {
        *key ^= self.castle_key(rights);
    }

    #[inline(always)]
    pub fn toggle_en_passant(&self, key: &mut u64, file: u8) {
        *key ^= self.en_passant_key(file);
    }

    #[inline(always)]
    pub fn toggle_piece(&self, key: &mut u64, color: Color, piece_type: PieceType, sq: u8) {
        *key ^= self.piece_key(color, piece_type, sq);
    }
}

impl Default for ZobristKeys {
    fn default() -> Self {
        Self::new()
    }
}

/// Global static Zobrist keys (initialized once)
pub static ZOBRIST_KEYS: Lazy<ZobristKeys> = Lazy::new(ZobristKeys::new);
