//! Bitboard chess move generation: magic attack tables, Zobrist hashing,
//! a make/unmake position and a check- and pin-aware legal move generator.

pub mod bitboard;
pub mod fen;
pub mod movegen;
pub mod movelist;
pub mod perft;
pub mod position;
pub mod types;
pub mod zobrist;

pub use fen::FenError;
pub use movelist::MoveList;
pub use position::Position;
pub use types::{CastleRights, Color, Move, MoveFlag, PieceType, Status};
