//! Legal move generation.
//!
//! Moves are produced fully legal in one pass: king moves are checked against
//! the enemy attack mask with our king lifted off the board, checks restrict
//! every other piece to the checker and the squares between, and pinned
//! pieces are confined to the line through their king.

use crate::bitboard::{
    lsb, sq_to_bb, AttackTables, Bitboard, BitboardIter, FILE_A, FILE_H, RANK_1, RANK_3, RANK_6,
    RANK_8,
};
use crate::movelist::MoveList;
use crate::position::{castle_rook_squares, en_passant_victim, Position};
use crate::types::{CastleRights, Color, Move, MoveFlag, PieceType, Status, PIECES_CAN_PROMOTE_TO};

/// Attack pattern of a non-pawn, non-king piece kind.
trait PieceMoves {
    const KIND: PieceType;

    fn attacks(tables: &AttackTables, sq: u8, occupied: Bitboard) -> Bitboard;
}

struct Knight;
struct Bishop;
struct Rook;
struct Queen;

impl PieceMoves for Knight {
    const KIND: PieceType = PieceType::Knight;

    #[inline(always)]
    fn attacks(tables: &AttackTables, sq: u8, _occupied: Bitboard) -> Bitboard {
        tables.knight[sq as usize]
    }
}

impl PieceMoves for Bishop {
    const KIND: PieceType = PieceType::Bishop;

    #[inline(always)]
    fn attacks(tables: &AttackTables, sq: u8, occupied: Bitboard) -> Bitboard {
        tables.bishop_attacks(sq, occupied)
    }
}

impl PieceMoves for Rook {
    const KIND: PieceType = PieceType::Rook;

    #[inline(always)]
    fn attacks(tables: &AttackTables, sq: u8, occupied: Bitboard) -> Bitboard {
        tables.rook_attacks(sq, occupied)
    }
}

impl PieceMoves for Queen {
    const KIND: PieceType = PieceType::Queen;

    #[inline(always)]
    fn attacks(tables: &AttackTables, sq: u8, occupied: Bitboard) -> Bitboard {
        tables.queen_attacks(sq, occupied)
    }
}

#[inline(always)]
fn shift(bb: Bitboard, delta: i8) -> Bitboard {
    if delta >= 0 {
        bb << delta
    } else {
        bb >> -delta
    }
}

/// Push a pawn move, expanding arrivals on the last rank into four promotions.
#[inline(always)]
fn push_pawn_move(list: &mut MoveList, from: u8, to: u8) {
    if sq_to_bb(to) & (RANK_1 | RANK_8) != 0 {
        for piece_type in PIECES_CAN_PROMOTE_TO {
            list.push(Move::new(from, to, MoveFlag::Promotion(piece_type)));
        }
    } else {
        list.push(Move::new(from, to, MoveFlag::Regular));
    }
}

/// Generates every legal move of the side to move.
pub struct MoveGenerator<'a> {
    pos: &'a Position,
    tables: &'static AttackTables,
    us: Color,
    them: Color,
    king_sq: u8,
    occupied: Bitboard,
    friendly: Bitboard,
    enemy: Bitboard,
    pinned: Bitboard,
}

impl<'a> MoveGenerator<'a> {
    pub fn new(pos: &'a Position) -> Self {
        let us = pos.side_to_move();
        let them = !us;
        Self {
            pos,
            tables: pos.tables(),
            us,
            them,
            king_sq: pos.king_square(us),
            occupied: pos.occupied(),
            friendly: pos.occupied_by(us),
            enemy: pos.occupied_by(them),
            pinned: pos.pinned(),
        }
    }

    /// Append all legal moves to `list`.
    pub fn generate(&self, list: &mut MoveList) {
        let king_bb = sq_to_bb(self.king_sq);

        // sliders must see through the king, or it could step back along the checking ray
        let danger = self.pos.attack_mask(self.them, self.occupied ^ king_bb);
        for to in BitboardIter(self.tables.king[self.king_sq as usize] & !self.friendly & !danger) {
            list.push(Move::new(self.king_sq, to, MoveFlag::Regular));
        }

        let checkers = self.pos.attackers_to(self.king_sq, self.them, self.occupied);
        let valid = match checkers.count_ones() {
            0 => {
                self.castling_moves(list, danger);
                self.pinned_moves(list);
                !0
            }
            1 => checkers | self.tables.between(self.king_sq, lsb(checkers)),
            // double check: only the king can move
            _ => return,
        };

        self.piece_moves::<Knight>(list, valid);
        self.piece_moves::<Bishop>(list, valid);
        self.piece_moves::<Rook>(list, valid);
        self.piece_moves::<Queen>(list, valid);
        self.pawn_moves(list, valid);
        self.en_passant_moves(list, valid);
    }

    /// Moves of unpinned pieces of kind `P` onto `valid` squares.
    #[inline(always)]
    fn piece_moves<P: PieceMoves>(&self, list: &mut MoveList, valid: Bitboard) {
        let pieces = self.pos.piece_bb(self.us, P::KIND) & !self.pinned;
        for from in BitboardIter(pieces) {
            let targets = P::attacks(self.tables, from, self.occupied) & !self.friendly & valid;
            for to in BitboardIter(targets) {
                list.push(Move::new(from, to, MoveFlag::Regular));
            }
        }
    }

    /// Pushes and captures of unpinned pawns, set-wise.
    fn pawn_moves(&self, list: &mut MoveList, valid: Bitboard) {
        let pawns = self.pos.piece_bb(self.us, PieceType::Pawn) & !self.pinned;
        let empty = !self.occupied;
        let (up, double_rank, left, right) = match self.us {
            Color::White => (8i8, RANK_3, 7i8, 9i8),
            Color::Black => (-8i8, RANK_6, -9i8, -7i8),
        };

        let single = shift(pawns, up) & empty;
        let double = shift(single & double_rank, up) & empty & valid;
        for to in BitboardIter(single & valid) {
            push_pawn_move(list, (to as i8 - up) as u8, to);
        }
        for to in BitboardIter(double) {
            list.push(Move::new((to as i8 - 2 * up) as u8, to, MoveFlag::DoublePawnPush));
        }

        let targets = self.enemy & valid;
        for to in BitboardIter(shift(pawns & !FILE_A, left) & targets) {
            push_pawn_move(list, (to as i8 - left) as u8, to);
        }
        for to in BitboardIter(shift(pawns & !FILE_H, right) & targets) {
            push_pawn_move(list, (to as i8 - right) as u8, to);
        }
    }

    /// Moves of pinned pieces along the line joining them to the king.
    /// Only called when not in check, since a pinned piece can never resolve one.
    fn pinned_moves(&self, list: &mut MoveList) {
        let empty = !self.occupied;
        for from in BitboardIter(self.pinned) {
            let ray = self.tables.line(self.king_sq, from);
            match self.pos.piece_on(from) {
                Some(PieceType::Pawn) => {
                    let (up, double_rank) = match self.us {
                        Color::White => (8i8, RANK_3),
                        Color::Black => (-8i8, RANK_6),
                    };
                    let single = shift(sq_to_bb(from), up) & empty;
                    let double = shift(single & double_rank, up) & empty;
                    let captures = self.tables.pawn_attacks(self.us, from) & self.enemy;
                    for to in BitboardIter((single | captures) & ray) {
                        push_pawn_move(list, from, to);
                    }
                    for to in BitboardIter(double & ray) {
                        list.push(Move::new(from, to, MoveFlag::DoublePawnPush));
                    }
                }
                Some(PieceType::Bishop) => self.pinned_slider::<Bishop>(list, from, ray),
                Some(PieceType::Rook) => self.pinned_slider::<Rook>(list, from, ray),
                Some(PieceType::Queen) => self.pinned_slider::<Queen>(list, from, ray),
                // a pinned knight never has a move on its pin line
                _ => {}
            }
        }
    }

    #[inline(always)]
    fn pinned_slider<P: PieceMoves>(&self, list: &mut MoveList, from: u8, ray: Bitboard) {
        let targets = P::attacks(self.tables, from, self.occupied) & ray & !self.friendly;
        for to in BitboardIter(targets) {
            list.push(Move::new(from, to, MoveFlag::Regular));
        }
    }

    /// En passant captures. The capture removes two pawns from the board at
    /// once, so legality is settled by recomputing slider attacks on the king
    /// with the post-capture occupancy. That catches a discovered check along
    /// the shared rank, along a diagonal through the victim, and a capturing
    /// pawn that is itself pinned.
    fn en_passant_moves(&self, list: &mut MoveList, valid: Bitboard) {
        let Some(ep) = self.pos.en_passant() else {
            return;
        };
        let victim = en_passant_victim(self.us, ep);
        // in check, the capture must take the checker or land between it and the king
        if (sq_to_bb(ep) | sq_to_bb(victim)) & valid == 0 {
            return;
        }

        let diagonal = self.pos.pieces(self.them, &[PieceType::Bishop, PieceType::Queen]);
        let orthogonal = self.pos.pieces(self.them, &[PieceType::Rook, PieceType::Queen]);
        let capturers =
            self.tables.pawn_attacks(self.them, ep) & self.pos.piece_bb(self.us, PieceType::Pawn);
        for from in BitboardIter(capturers) {
            let occupied = (self.occupied ^ sq_to_bb(from) ^ sq_to_bb(victim)) | sq_to_bb(ep);
            let exposed = (self.tables.bishop_attacks(self.king_sq, occupied) & diagonal)
                | (self.tables.rook_attacks(self.king_sq, occupied) & orthogonal);
            if exposed == 0 {
                list.push(Move::new(from, ep, MoveFlag::EnPassantCapture));
            }
        }
    }

    /// Castling, only generated when not in check. The king may not pass
    /// through or land on an attacked square; the rook's path only has to be empty.
    fn castling_moves(&self, list: &mut MoveList, danger: Bitboard) {
        let rights = self.pos.castle_rights();
        let home = match self.us {
            Color::White => 4,
            Color::Black => 60,
        };
        if self.king_sq != home {
            return;
        }
        let rooks = self.pos.piece_bb(self.us, PieceType::Rook);

        for (right, king_to) in [
            (CastleRights::kingside(self.us), home + 2),
            (CastleRights::queenside(self.us), home - 2),
        ] {
            if !rights.contains(right) {
                continue;
            }
            let (rook_from, _) = castle_rook_squares(king_to);
            let king_path = self.tables.between(home, king_to) | sq_to_bb(king_to);
            let must_be_empty = self.tables.between(home, rook_from);
            if rooks & sq_to_bb(rook_from) != 0
                && self.occupied & must_be_empty == 0
                && danger & king_path == 0
            {
                list.push(Move::new(home, king_to, MoveFlag::Castle));
            }
        }
    }
}

/// Append every legal move of the side to move to `list`.
pub fn generate_legal(pos: &Position, list: &mut MoveList) {
    MoveGenerator::new(pos).generate(list);
}

impl Position {
    pub fn legal_moves(&self) -> MoveList {
        let mut list = MoveList::new();
        generate_legal(self, &mut list);
        list
    }

    /// `None` while the game goes on; otherwise checkmate or stalemate.
    pub fn status(&self) -> Option<Status> {
        if !self.legal_moves().is_empty() {
            return None;
        }
        if self.in_check() {
            Some(Status::Checkmate(!self.side_to_move()))
        } else {
            Some(Status::Stalemate)
        }
    }

    /// Resolve a long algebraic move (`e2e4`, `e7e8q`) against the legal moves.
    pub fn find_move(&self, uci: &str) -> Option<Move> {
        self.legal_moves().iter().find(|mv| mv.to_uci() == uci)
    }
}
