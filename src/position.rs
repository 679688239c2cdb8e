//! Mutable board state.
//!
//! `Position` keeps three redundant views of the board in sync: per-kind
//! bitboards (both colors), per-color occupancy, and a square array. Every
//! mutation goes through [`Position::place`] / [`Position::remove`] or the
//! key-aware setters so the Zobrist key is maintained incrementally.

use std::fmt;

use log::error;

use crate::bitboard::{
    lsb, pawn_attacks_bb, sq_to_bb, AttackTables, Bitboard, BitboardIter, ATTACK_TABLES,
};
use crate::fen::{self, FenError};
use crate::types::{
    file_of, rank_of, square_to_algebraic, CastleRights, Color, Move, MoveFlag, PieceType,
    STARTING_POSITION_FEN,
};
use crate::zobrist::{ZobristKeys, ZOBRIST_KEYS};

/// Capacity reserved for the undo stack.
pub const MAX_PLY: usize = 256;

const fn castle_rights_mask() -> [u8; 64] {
    let mut mask = [15u8; 64];
    mask[0] = 15 & !CastleRights::WHITE_QUEENSIDE;
    mask[4] = 15 & !(CastleRights::WHITE_KINGSIDE | CastleRights::WHITE_QUEENSIDE);
    mask[7] = 15 & !CastleRights::WHITE_KINGSIDE;
    mask[56] = 15 & !CastleRights::BLACK_QUEENSIDE;
    mask[60] = 15 & !(CastleRights::BLACK_KINGSIDE | CastleRights::BLACK_QUEENSIDE);
    mask[63] = 15 & !CastleRights::BLACK_KINGSIDE;
    mask
}

/// Castle rights that survive a move touching each square (as origin or destination).
const CASTLE_RIGHTS_MASK: [u8; 64] = castle_rights_mask();

/// Rook origin and destination for a castle, inferred from the king's destination.
#[inline(always)]
pub(crate) fn castle_rook_squares(king_to: u8) -> (u8, u8) {
    if file_of(king_to) == 6 {
        (king_to + 1, king_to - 1)
    } else {
        (king_to - 2, king_to + 1)
    }
}

/// Square of the pawn removed by an en passant capture landing on `to`.
#[inline(always)]
pub(crate) fn en_passant_victim(us: Color, to: u8) -> u8 {
    match us {
        Color::White => to - 8,
        Color::Black => to + 8,
    }
}

/// Everything `make_move` destroys and `unmake_move` needs back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UndoInfo {
    pub mv: Move,
    pub captured: Option<PieceType>,
    pub en_passant: Option<u8>,
    pub castle_rights: CastleRights,
    pub key: u64,
    pub halfmove_clock: u32,
}

#[derive(Clone)]
pub struct Position {
    /// Indexed by piece type, both colors merged
    piece_masks: [Bitboard; 6],
    /// Indexed by color
    occupancy: [Bitboard; 2],
    squares: [Option<PieceType>; 64],
    side_to_move: Color,
    castle_rights: CastleRights,
    en_passant: Option<u8>,
    halfmove_clock: u32,
    fullmove_number: u32,
    key: u64,
    /// Side-to-move pieces that are the only blocker between their king and an enemy slider
    pinned: Bitboard,
    /// The enemy sliders doing the pinning
    pinners: Bitboard,
    undo_stack: Vec<UndoInfo>,
    tables: &'static AttackTables,
    keys: &'static ZobristKeys,
}

impl Position {
    /// An empty board with white to move, using the global tables.
    pub fn empty() -> Self {
        Self::with_tables(&ATTACK_TABLES, &ZOBRIST_KEYS)
    }

    /// An empty board using caller-provided attack tables and keys.
    pub fn with_tables(tables: &'static AttackTables, keys: &'static ZobristKeys) -> Self {
        Self {
            piece_masks: [0; 6],
            occupancy: [0; 2],
            squares: [None; 64],
            side_to_move: Color::White,
            castle_rights: CastleRights::NONE,
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
            key: keys.side_key(Color::White) ^ keys.castle_key(CastleRights::NONE),
            pinned: 0,
            pinners: 0,
            undo_stack: Vec::with_capacity(MAX_PLY),
            tables,
            keys,
        }
    }

    pub fn startpos() -> Self {
        match fen::parse(STARTING_POSITION_FEN) {
            Ok(pos) => pos,
            Err(e) => panic!("starting position FEN rejected: {e}"),
        }
    }

    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        fen::parse(fen)
    }

    pub fn to_fen(&self) -> String {
        fen::write(self)
    }

    // =========================================================================
    // Mutators
    // =========================================================================

    /// Put a piece on an empty square.
    #[inline(always)]
    pub fn place(&mut self, color: Color, piece_type: PieceType, sq: u8) {
        debug_assert!(sq < 64, "square {sq} out of range");
        debug_assert!(
            self.squares[sq as usize].is_none(),
            "place on occupied square {}",
            square_to_algebraic(sq)
        );
        let bb = sq_to_bb(sq);
        self.occupancy[color.index()] |= bb;
        self.piece_masks[piece_type.index()] |= bb;
        self.squares[sq as usize] = Some(piece_type);
        self.keys.toggle_piece(&mut self.key, color, piece_type, sq);
    }

    /// Take `color`'s piece off `sq`.
    #[inline(always)]
    pub fn remove(&mut self, color: Color, sq: u8) {
        debug_assert!(sq < 64, "square {sq} out of range");
        debug_assert!(
            self.occupancy[color.index()] & sq_to_bb(sq) != 0,
            "no {} piece on {}",
            color.to_human(),
            square_to_algebraic(sq)
        );
        if let Some(piece_type) = self.squares[sq as usize].take() {
            let bb = sq_to_bb(sq);
            self.occupancy[color.index()] &= !bb;
            self.piece_masks[piece_type.index()] &= !bb;
            self.keys.toggle_piece(&mut self.key, color, piece_type, sq);
        }
    }

    pub fn set_side_to_move(&mut self, color: Color) {
        self.keys.toggle_side(&mut self.key, self.side_to_move);
        self.side_to_move = color;
        self.keys.toggle_side(&mut self.key, self.side_to_move);
    }

    pub fn set_castle_rights(&mut self, rights: CastleRights) {
        self.keys.toggle_castle(&mut self.key, self.castle_rights);
        self.castle_rights = rights;
        self.keys.toggle_castle(&mut self.key, self.castle_rights);
    }

    pub fn set_en_passant(&mut self, sq: Option<u8>) {
        if let Some(old) = self.en_passant {
            self.keys.toggle_en_passant(&mut self.key, file_of(old));
        }
        self.en_passant = sq;
        if let Some(new) = self.en_passant {
            self.keys.toggle_en_passant(&mut self.key, file_of(new));
        }
    }

    /// Counters do not take part in the key.
    pub fn set_move_counters(&mut self, halfmove_clock: u32, fullmove_number: u32) {
        self.halfmove_clock = halfmove_clock;
        self.fullmove_number = fullmove_number;
    }

    /// Apply a legal move.
    pub fn make_move(&mut self, mv: Move) {
        debug_assert!(self.is_valid(), "invalid position before make_move {mv}");

        let us = self.side_to_move;
        let them = !us;
        let moving = self.expect_piece(mv.from);
        let captured = match mv.flag {
            MoveFlag::EnPassantCapture => Some(PieceType::Pawn),
            _ => self.squares[mv.to as usize],
        };

        self.undo_stack.push(UndoInfo {
            mv,
            captured,
            en_passant: self.en_passant,
            castle_rights: self.castle_rights,
            key: self.key,
            halfmove_clock: self.halfmove_clock,
        });

        if let Some(ep) = self.en_passant.take() {
            self.keys.toggle_en_passant(&mut self.key, file_of(ep));
        }

        if captured.is_some() && mv.flag != MoveFlag::EnPassantCapture {
            self.remove(them, mv.to);
        }
        self.remove(us, mv.from);
        self.place(us, mv.flag.promotion().unwrap_or(moving), mv.to);

        match mv.flag {
            MoveFlag::EnPassantCapture => self.remove(them, en_passant_victim(us, mv.to)),
            MoveFlag::DoublePawnPush => {
                let ep = (mv.from + mv.to) / 2;
                self.en_passant = Some(ep);
                self.keys.toggle_en_passant(&mut self.key, file_of(ep));
            }
            MoveFlag::Castle => {
                let (rook_from, rook_to) = castle_rook_squares(mv.to);
                self.remove(us, rook_from);
                self.place(us, PieceType::Rook, rook_to);
            }
            MoveFlag::Regular | MoveFlag::Promotion(_) => {}
        }

        let rights = self
            .castle_rights
            .retain(CASTLE_RIGHTS_MASK[mv.from as usize] & CASTLE_RIGHTS_MASK[mv.to as usize]);
        if rights != self.castle_rights {
            self.set_castle_rights(rights);
        }

        if moving == PieceType::Pawn || captured.is_some() {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }
        if us == Color::Black {
            self.fullmove_number += 1;
        }

        self.set_side_to_move(them);
        self.refresh_pins();

        debug_assert!(self.is_valid(), "invalid position after make_move {mv}");
    }

    /// Revert the most recent `make_move`, which must have been `mv`.
    pub fn unmake_move(&mut self, mv: Move) {
        let undo = match self.undo_stack.pop() {
            Some(undo) => undo,
            None => panic!("unmake_move({mv}) with an empty undo stack"),
        };
        debug_assert_eq!(undo.mv, mv, "unmake_move out of order");

        let them = self.side_to_move;
        let us = !them;
        self.set_side_to_move(us);

        if us == Color::Black {
            self.fullmove_number -= 1;
        }
        self.halfmove_clock = undo.halfmove_clock;

        if undo.castle_rights != self.castle_rights {
            self.set_castle_rights(undo.castle_rights);
        }

        match mv.flag {
            MoveFlag::Castle => {
                let (rook_from, rook_to) = castle_rook_squares(mv.to);
                self.remove(us, rook_to);
                self.place(us, PieceType::Rook, rook_from);
            }
            MoveFlag::EnPassantCapture => {
                self.place(them, PieceType::Pawn, en_passant_victim(us, mv.to))
            }
            _ => {}
        }
        self.set_en_passant(undo.en_passant);

        let moved = match mv.flag {
            MoveFlag::Promotion(_) => PieceType::Pawn,
            _ => self.expect_piece(mv.to),
        };
        self.remove(us, mv.to);
        self.place(us, moved, mv.from);
        if mv.flag != MoveFlag::EnPassantCapture {
            if let Some(captured) = undo.captured {
                self.place(them, captured, mv.to);
            }
        }

        self.refresh_pins();

        debug_assert_eq!(self.key, undo.key, "incremental key diverged on unmake {mv}");
        debug_assert_eq!(self.compute_key(), undo.key, "stored key diverged on unmake {mv}");
        debug_assert!(self.is_valid(), "invalid position after unmake_move {mv}");
    }

    /// Recompute `pinned` / `pinners` for the side to move.
    ///
    /// Only enemy sliders on the king's empty-board rook or bishop rays can
    /// pin, so those are the only candidates walked.
    pub fn refresh_pins(&mut self) {
        self.pinned = 0;
        self.pinners = 0;

        let us = self.side_to_move;
        let them = !us;
        let king = self.piece_bb(us, PieceType::King);
        if king == 0 {
            return;
        }
        let king_sq = lsb(king);
        let occupied = self.occupied();

        let candidates = (self.tables.rook_rays[king_sq as usize]
            & self.pieces(them, &[PieceType::Rook, PieceType::Queen]))
            | (self.tables.bishop_rays[king_sq as usize]
                & self.pieces(them, &[PieceType::Bishop, PieceType::Queen]));

        for slider in BitboardIter(candidates) {
            let blockers = self.tables.between(king_sq, slider) & occupied;
            if blockers.count_ones() == 1 && blockers & self.occupancy[us.index()] != 0 {
                self.pinned |= blockers;
                self.pinners |= sq_to_bb(slider);
            }
        }
    }

    #[inline(always)]
    fn expect_piece(&self, sq: u8) -> PieceType {
        match self.squares[sq as usize] {
            Some(piece_type) => piece_type,
            None => panic!("no piece on {}", square_to_algebraic(sq)),
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    #[inline(always)]
    pub fn occupied(&self) -> Bitboard {
        self.occupancy[0] | self.occupancy[1]
    }

    #[inline(always)]
    pub fn empty_squares(&self) -> Bitboard {
        !self.occupied()
    }

    #[inline(always)]
    pub fn occupied_by(&self, color: Color) -> Bitboard {
        self.occupancy[color.index()]
    }

    /// Bitboard of one kind of piece for one color.
    #[inline(always)]
    pub fn piece_bb(&self, color: Color, piece_type: PieceType) -> Bitboard {
        self.piece_masks[piece_type.index()] & self.occupancy[color.index()]
    }

    /// Union of several kinds for one color.
    #[inline(always)]
    pub fn pieces(&self, color: Color, piece_types: &[PieceType]) -> Bitboard {
        piece_types
            .iter()
            .fold(0, |bb, pt| bb | self.piece_masks[pt.index()])
            & self.occupancy[color.index()]
    }

    #[inline(always)]
    pub fn piece_on(&self, sq: u8) -> Option<PieceType> {
        self.squares[sq as usize]
    }

    pub fn color_on(&self, sq: u8) -> Option<Color> {
        let bb = sq_to_bb(sq);
        if self.occupancy[0] & bb != 0 {
            Some(Color::White)
        } else if self.occupancy[1] & bb != 0 {
            Some(Color::Black)
        } else {
            None
        }
    }

    #[inline(always)]
    pub fn king_square(&self, color: Color) -> u8 {
        lsb(self.piece_bb(color, PieceType::King))
    }

    /// Pieces of `by` attacking `sq`, with sliders seeing through `occupied`.
    pub fn attackers_to(&self, sq: u8, by: Color, occupied: Bitboard) -> Bitboard {
        let t = self.tables;
        let s = sq as usize;
        (t.pawn[(!by).index()][s] & self.piece_bb(by, PieceType::Pawn))
            | (t.knight[s] & self.piece_bb(by, PieceType::Knight))
            | (t.king[s] & self.piece_bb(by, PieceType::King))
            | (t.bishop_attacks(sq, occupied)
                & self.pieces(by, &[PieceType::Bishop, PieceType::Queen]))
            | (t.rook_attacks(sq, occupied) & self.pieces(by, &[PieceType::Rook, PieceType::Queen]))
    }

    #[inline]
    pub fn is_attacked(&self, sq: u8, by: Color, occupied: Bitboard) -> bool {
        self.attackers_to(sq, by, occupied) != 0
    }

    /// Every square attacked by `by`, sliders seeing through `occupied`.
    pub fn attack_mask(&self, by: Color, occupied: Bitboard) -> Bitboard {
        let t = self.tables;
        let mut attacks = pawn_attacks_bb(by, self.piece_bb(by, PieceType::Pawn));
        for sq in BitboardIter(self.piece_bb(by, PieceType::Knight)) {
            attacks |= t.knight[sq as usize];
        }
        for sq in BitboardIter(self.pieces(by, &[PieceType::Bishop, PieceType::Queen])) {
            attacks |= t.bishop_attacks(sq, occupied);
        }
        for sq in BitboardIter(self.pieces(by, &[PieceType::Rook, PieceType::Queen])) {
            attacks |= t.rook_attacks(sq, occupied);
        }
        for sq in BitboardIter(self.piece_bb(by, PieceType::King)) {
            attacks |= t.king[sq as usize];
        }
        attacks
    }

    /// Enemy pieces giving check to the side to move.
    pub fn checkers(&self) -> Bitboard {
        let us = self.side_to_move;
        self.attackers_to(self.king_square(us), !us, self.occupied())
    }

    pub fn in_check(&self) -> bool {
        self.checkers() != 0
    }

    #[inline(always)]
    pub fn pinned(&self) -> Bitboard {
        self.pinned
    }

    #[inline(always)]
    pub fn pinners(&self) -> Bitboard {
        self.pinners
    }

    #[inline(always)]
    pub fn key(&self) -> u64 {
        self.key
    }

    #[inline(always)]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    #[inline(always)]
    pub fn castle_rights(&self) -> CastleRights {
        self.castle_rights
    }

    #[inline(always)]
    pub fn en_passant(&self) -> Option<u8> {
        self.en_passant
    }

    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    /// Number of moves currently made on top of the loaded position.
    pub fn ply(&self) -> usize {
        self.undo_stack.len()
    }

    #[inline(always)]
    pub fn tables(&self) -> &'static AttackTables {
        self.tables
    }

    /// Zobrist key recomputed from scratch.
    pub fn compute_key(&self) -> u64 {
        let mut key = self.keys.side_key(self.side_to_move) ^ self.keys.castle_key(self.castle_rights);
        if let Some(ep) = self.en_passant {
            key ^= self.keys.en_passant_key(file_of(ep));
        }
        for color in Color::ALL {
            for sq in BitboardIter(self.occupancy[color.index()]) {
                if let Some(piece_type) = self.squares[sq as usize] {
                    key ^= self.keys.piece_key(color, piece_type, sq);
                }
            }
        }
        key
    }

    /// Check the internal consistency of the board, logging the first failure.
    pub fn is_valid(&self) -> bool {
        let [white, black] = self.occupancy;
        if white & black != 0 {
            error!("squares occupied by both colors: {:#018x}", white & black);
            return false;
        }

        for sq in 0..64u8 {
            let bb = sq_to_bb(sq);
            let hits = PieceType::ALL
                .iter()
                .filter(|pt| self.piece_masks[pt.index()] & bb != 0)
                .count();
            let occupied = (white | black) & bb != 0;
            let consistent = match self.squares[sq as usize] {
                None => hits == 0 && !occupied,
                Some(pt) => hits == 1 && self.piece_masks[pt.index()] & bb != 0 && occupied,
            };
            if !consistent {
                error!(
                    "square {} disagrees: array {:?}, {} kind masks set, occupied {}",
                    square_to_algebraic(sq),
                    self.squares[sq as usize],
                    hits,
                    occupied
                );
                return false;
            }
        }

        for color in Color::ALL {
            let kings = self.piece_bb(color, PieceType::King).count_ones();
            if kings != 1 {
                error!("{} has {} kings", color.to_human(), kings);
                return false;
            }
        }

        if let Some(ep) = self.en_passant {
            let them = !self.side_to_move;
            let (rank, victim) = match them {
                Color::White => (2, ep.wrapping_add(8)),
                Color::Black => (5, ep.wrapping_sub(8)),
            };
            let valid = ep < 64
                && rank_of(ep) == rank
                && self.squares[ep as usize].is_none()
                && self.piece_bb(them, PieceType::Pawn) & sq_to_bb(victim) != 0;
            if !valid {
                error!("en passant square {} is inconsistent", square_to_algebraic(ep & 63));
                return false;
            }
        }

        if self.key != self.compute_key() {
            error!(
                "incremental key {:#018x} != computed {:#018x}",
                self.key,
                self.compute_key()
            );
            return false;
        }

        true
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::startpos()
    }
}

/// Positions compare equal when every piece of board state matches,
/// including the undo history.
impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.piece_masks == other.piece_masks
            && self.occupancy == other.occupancy
            && self.squares == other.squares
            && self.side_to_move == other.side_to_move
            && self.castle_rights == other.castle_rights
            && self.en_passant == other.en_passant
            && self.halfmove_clock == other.halfmove_clock
            && self.fullmove_number == other.fullmove_number
            && self.key == other.key
            && self.pinned == other.pinned
            && self.pinners == other.pinners
            && self.undo_stack == other.undo_stack
    }
}

impl Eq for Position {}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Position")
            .field("fen", &self.to_fen())
            .field("key", &format_args!("{:#018x}", self.key))
            .field("pinned", &format_args!("{:#018x}", self.pinned))
            .field("ply", &self.undo_stack.len())
            .finish()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in (0..8u8).rev() {
            write!(f, "{} ", rank + 1)?;
            for file in 0..8u8 {
                let sq = rank * 8 + file;
                let c = match (self.squares[sq as usize], self.color_on(sq)) {
                    (Some(pt), Some(Color::White)) => pt.to_char().to_ascii_uppercase(),
                    (Some(pt), _) => pt.to_char(),
                    (None, _) => '.',
                };
                write!(f, "{c} ")?;
            }
            writeln!(f)?;
        }
        writeln!(f, "  a b c d e f g h")?;
        writeln!(
            f,
            "{} to move, castling {}, en passant {}",
            self.side_to_move.to_human(),
            self.castle_rights,
            self.en_passant.map_or("-".to_string(), square_to_algebraic)
        )?;
        write!(f, "key {:#018x}", self.key)
    }
}
