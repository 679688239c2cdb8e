//! FEN parsing and writing.
//!
//! The parser builds a [`Position`] through its public mutators only, so the
//! Zobrist key and pin masks come out exactly as incremental play would leave them.

use thiserror::Error;

use crate::position::Position;
use crate::types::{
    rank_of, square, square_from_algebraic, square_to_algebraic, CastleRights, Color, PieceType,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FenError {
    #[error("expected 4 to 6 fields, got {0}")]
    FieldCount(usize),
    #[error("invalid piece character '{0}'")]
    InvalidPiece(char),
    #[error("invalid piece placement: {0}")]
    InvalidPlacement(String),
    #[error("invalid side to move '{0}'")]
    InvalidSide(String),
    #[error("invalid castling field '{0}'")]
    InvalidCastling(String),
    #[error("invalid en passant square '{0}'")]
    InvalidEnPassant(String),
    #[error("invalid move counter '{0}'")]
    InvalidCounter(String),
    #[error("{0} must have exactly one king")]
    KingCount(&'static str),
}

/// Parse a FEN string. The halfmove and fullmove fields are optional and
/// default to `0` and `1`.
pub fn parse(fen: &str) -> Result<Position, FenError> {
    let fields: Vec<&str> = fen.split_whitespace().collect();
    if fields.len() < 4 || fields.len() > 6 {
        return Err(FenError::FieldCount(fields.len()));
    }

    let mut pos = Position::empty();
    parse_placement(&mut pos, fields[0])?;

    for color in Color::ALL {
        if pos.piece_bb(color, PieceType::King).count_ones() != 1 {
            return Err(FenError::KingCount(color.to_human()));
        }
    }

    let side = match fields[1] {
        "w" => Color::White,
        "b" => Color::Black,
        other => return Err(FenError::InvalidSide(other.to_string())),
    };
    pos.set_side_to_move(side);

    pos.set_castle_rights(parse_castling(fields[2])?);

    if fields[3] != "-" {
        let ep = square_from_algebraic(fields[3])
            .ok_or_else(|| FenError::InvalidEnPassant(fields[3].to_string()))?;
        // the square must lie behind an enemy pawn that just advanced two ranks
        let (rank, victim) = match side {
            Color::White => (5, ep.wrapping_sub(8)),
            Color::Black => (2, ep.wrapping_add(8)),
        };
        if rank_of(ep) != rank
            || pos.piece_on(ep).is_some()
            || pos.piece_on(victim) != Some(PieceType::Pawn)
            || pos.color_on(victim) != Some(!side)
        {
            return Err(FenError::InvalidEnPassant(fields[3].to_string()));
        }
        pos.set_en_passant(Some(ep));
    }

    let halfmove = parse_counter(fields.get(4).copied(), 0)?;
    let fullmove = parse_counter(fields.get(5).copied(), 1)?;
    pos.set_move_counters(halfmove, fullmove);

    pos.refresh_pins();
    Ok(pos)
}

fn parse_placement(pos: &mut Position, placement: &str) -> Result<(), FenError> {
    let ranks: Vec<&str> = placement.split('/').collect();
    if ranks.len() != 8 {
        return Err(FenError::InvalidPlacement(format!(
            "expected 8 ranks, got {}",
            ranks.len()
        )));
    }

    // FEN lists rank 8 first
    for (i, row) in ranks.iter().enumerate() {
        let rank = 7 - i as u8;
        let mut file = 0u8;
        for c in row.chars() {
            if let Some(skip) = c.to_digit(10) {
                if skip == 0 || skip > 8 {
                    return Err(FenError::InvalidPiece(c));
                }
                file += skip as u8;
            } else {
                let piece_type = PieceType::from_char(c).ok_or(FenError::InvalidPiece(c))?;
                if file >= 8 {
                    return Err(FenError::InvalidPlacement(format!(
                        "rank {} has more than 8 squares",
                        rank + 1
                    )));
                }
                pos.place(Color::from_case(c), piece_type, square(rank, file));
                file += 1;
            }
            if file > 8 {
                return Err(FenError::InvalidPlacement(format!(
                    "rank {} has more than 8 squares",
                    rank + 1
                )));
            }
        }
        if file != 8 {
            return Err(FenError::InvalidPlacement(format!(
                "rank {} has {} squares",
                rank + 1,
                file
            )));
        }
    }
    Ok(())
}

fn parse_castling(field: &str) -> Result<CastleRights, FenError> {
    let mut rights = CastleRights::NONE;
    if field == "-" {
        return Ok(rights);
    }
    for c in field.chars() {
        let right = match c {
            'K' => CastleRights::WHITE_KINGSIDE,
            'Q' => CastleRights::WHITE_QUEENSIDE,
            'k' => CastleRights::BLACK_KINGSIDE,
            'q' => CastleRights::BLACK_QUEENSIDE,
            _ => return Err(FenError::InvalidCastling(field.to_string())),
        };
        rights.insert(right);
    }
    Ok(rights)
}

fn parse_counter(field: Option<&str>, default: u32) -> Result<u32, FenError> {
    match field {
        None => Ok(default),
        Some(s) => s
            .parse()
            .map_err(|_| FenError::InvalidCounter(s.to_string())),
    }
}

/// Write the FEN string of a position.
pub fn write(pos: &Position) -> String {
    let mut fen = String::with_capacity(90);
    for rank in (0..8u8).rev() {
        let mut empty = 0;
        for file in 0..8u8 {
            let sq = square(rank, file);
            match (pos.piece_on(sq), pos.color_on(sq)) {
                (Some(piece_type), Some(color)) => {
                    if empty > 0 {
                        fen.push(char::from(b'0' + empty));
                        empty = 0;
                    }
                    let c = piece_type.to_char();
                    fen.push(match color {
                        Color::White => c.to_ascii_uppercase(),
                        Color::Black => c,
                    });
                }
                _ => empty += 1,
            }
        }
        if empty > 0 {
            fen.push(char::from(b'0' + empty));
        }
        if rank > 0 {
            fen.push('/');
        }
    }

    fen.push(' ');
    fen.push(pos.side_to_move().to_char());
    fen.push(' ');
    fen.push_str(&pos.castle_rights().to_string());
    fen.push(' ');
    match pos.en_passant() {
        Some(ep) => fen.push_str(&square_to_algebraic(ep)),
        None => fen.push('-'),
    }
    fen.push_str(&format!(" {} {}", pos.halfmove_clock(), pos.fullmove_number()));
    fen
}
