//! Stack-allocated move list for move generation.
//!
//! `MoveList` is a fixed-size array that avoids heap allocations during move
//! generation. Each perft node can create a MoveList on the stack (about 1KB)
//! instead of allocating a Vec on the heap.

use crate::types::Move;

/// Capacity of a move list. No legal position has more than 218 moves.
pub const MAX_MOVES: usize = 256;

/// Stack-allocated list of legal moves.
///
/// Moves are copied out by value (`get()`, `iter()`), so a list can be walked
/// while the position it came from is being mutated by make/unmake.
#[derive(Clone)]
pub struct MoveList {
    moves: [Move; MAX_MOVES],
    count: usize,
}

impl MoveList {
    #[inline(always)]
    pub const fn new() -> Self {
        Self {
            moves: [Move::NULL; MAX_MOVES],
            count: 0,
        }
    }

    /// Append a move. Overflow is a generator bug and only checked in debug builds.
    #[inline(always)]
    pub fn push(&mut self, mv: Move) {
        debug_assert!(self.count < MAX_MOVES, "MoveList overflow");
        self.moves[self.count] = mv;
        self.count += 1;
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Move at `idx`, copied out.
    #[inline(always)]
    pub fn get(&self, idx: usize) -> Move {
        debug_assert!(idx < self.count, "MoveList index out of bounds");
        self.moves[idx]
    }

    /// Forget every move; the backing array is left as is.
    #[inline(always)]
    pub fn clear(&mut self) {
        self.count = 0;
    }

    #[inline]
    pub fn contains(&self, mv: Move) -> bool {
        self.as_slice().contains(&mv)
    }

    #[inline(always)]
    pub fn as_slice(&self) -> &[Move] {
        &self.moves[..self.count]
    }

    /// Moves in generation order, by value.
    pub fn iter(&self) -> std::iter::Copied<std::slice::Iter<'_, Move>> {
        self.as_slice().iter().copied()
    }
}

impl Default for MoveList {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> IntoIterator for &'a MoveList {
    type Item = Move;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, Move>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl std::fmt::Debug for MoveList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MoveList")
            .field("count", &self.count)
            .field(
                "moves",
                &self.iter().map(|m| m.to_uci()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
