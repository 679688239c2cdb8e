use std::fmt;
use std::ops::Not;

pub const STARTING_POSITION_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub const ALL: [Color; 2] = [Color::White, Color::Black];

    pub fn from_char(c: char) -> Option<Color> {
        match c {
            'w' => Some(Color::White),
            'b' => Some(Color::Black),
            _ => None,
        }
    }

    pub fn from_case(c: char) -> Color {
        if c.is_uppercase() {
            Color::White
        } else {
            Color::Black
        }
    }

    #[inline(always)]
    pub fn other(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    #[inline(always)]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn to_char(self) -> char {
        match self {
            Color::White => 'w',
            Color::Black => 'b',
        }
    }

    pub fn to_human(&self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Black => "black",
        }
    }
}

impl Not for Color {
    type Output = Color;

    #[inline(always)]
    fn not(self) -> Color {
        self.other()
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
pub enum PieceType {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceType {
    pub const ALL: [PieceType; 6] = [
        PieceType::Pawn,
        PieceType::Knight,
        PieceType::Bishop,
        PieceType::Rook,
        PieceType::Queen,
        PieceType::King,
    ];

    pub fn from_char(c: char) -> Option<PieceType> {
        match c.to_ascii_lowercase() {
            'p' => Some(PieceType::Pawn),
            'n' => Some(PieceType::Knight),
            'b' => Some(PieceType::Bishop),
            'r' => Some(PieceType::Rook),
            'q' => Some(PieceType::Queen),
            'k' => Some(PieceType::King),
            _ => None,
        }
    }

    #[inline(always)]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Is the piece a sliding piece (one which can move multiple square in a given direction)
    pub fn is_sliding(&self) -> bool {
        matches!(self, PieceType::Bishop | PieceType::Rook | PieceType::Queen)
    }

    /// Lowercase letter used by FEN and UCI.
    pub fn to_char(&self) -> char {
        match self {
            Self::Pawn => 'p',
            Self::Knight => 'n',
            Self::Bishop => 'b',
            Self::Rook => 'r',
            Self::Queen => 'q',
            Self::King => 'k',
        }
    }

    pub fn to_human(&self) -> &'static str {
        match self {
            Self::Pawn => "pawn",
            Self::Knight => "knight",
            Self::Bishop => "bishop",
            Self::Rook => "rook",
            Self::Queen => "queen",
            Self::King => "king",
        }
    }
}

/// Order in which promotions are pushed onto the move list.
pub const PIECES_CAN_PROMOTE_TO: [PieceType; 4] = [
    PieceType::Queen,
    PieceType::Rook,
    PieceType::Bishop,
    PieceType::Knight,
];

/// Square index from 0-indexed rank and file.
#[inline(always)]
pub const fn square(rank: u8, file: u8) -> u8 {
    rank * 8 + file
}

#[inline(always)]
pub const fn rank_of(sq: u8) -> u8 {
    sq >> 3
}

#[inline(always)]
pub const fn file_of(sq: u8) -> u8 {
    sq & 7
}

/// Parse a square in algebraic notation (`"e4"`).
pub fn square_from_algebraic(s: &str) -> Option<u8> {
    let bytes = s.as_bytes();
    if bytes.len() != 2 {
        return None;
    }
    let file = bytes[0].wrapping_sub(b'a');
    let rank = bytes[1].wrapping_sub(b'1');
    if file < 8 && rank < 8 {
        Some(square(rank, file))
    } else {
        None
    }
}

pub fn square_to_algebraic(sq: u8) -> String {
    debug_assert!(sq < 64, "square {sq} out of range");
    format!("{}{}", (b'a' + file_of(sq)) as char, (b'1' + rank_of(sq)) as char)
}

/// The four castling rights packed into the low nibble.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Hash)]
pub struct CastleRights(u8);

impl CastleRights {
    pub const NONE: CastleRights = CastleRights(0);
    pub const WHITE_KINGSIDE: u8 = 1;
    pub const WHITE_QUEENSIDE: u8 = 2;
    pub const BLACK_KINGSIDE: u8 = 4;
    pub const BLACK_QUEENSIDE: u8 = 8;
    pub const ALL: CastleRights = CastleRights(15);

    pub const fn from_bits(bits: u8) -> CastleRights {
        CastleRights(bits & 15)
    }

    #[inline(always)]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline(always)]
    pub const fn contains(self, right: u8) -> bool {
        self.0 & right != 0
    }

    /// Keep only the rights present in `mask`.
    #[inline(always)]
    pub const fn retain(self, mask: u8) -> CastleRights {
        CastleRights(self.0 & mask)
    }

    pub fn insert(&mut self, right: u8) {
        self.0 |= right & 15;
    }

    pub const fn kingside(color: Color) -> u8 {
        match color {
            Color::White => Self::WHITE_KINGSIDE,
            Color::Black => Self::BLACK_KINGSIDE,
        }
    }

    pub const fn queenside(color: Color) -> u8 {
        match color {
            Color::White => Self::WHITE_QUEENSIDE,
            Color::Black => Self::BLACK_QUEENSIDE,
        }
    }
}

impl fmt::Display for CastleRights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return f.write_str("-");
        }
        for (right, c) in [
            (Self::WHITE_KINGSIDE, 'K'),
            (Self::WHITE_QUEENSIDE, 'Q'),
            (Self::BLACK_KINGSIDE, 'k'),
            (Self::BLACK_QUEENSIDE, 'q'),
        ] {
            if self.contains(right) {
                write!(f, "{c}")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Status {
    /// Contains the winning side
    Checkmate(Color),
    Stalemate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveFlag {
    Regular,
    /// Pawn advanced two ranks; sets the en passant square
    DoublePawnPush,
    EnPassantCapture,
    /// King moves two files, the rook is inferred from the king's destination
    Castle,
    /// Pawn promotion. Contains the piece promoted to
    Promotion(PieceType),
}

impl MoveFlag {
    pub fn is_castle(&self) -> bool {
        matches!(self, MoveFlag::Castle)
    }

    pub fn promotion(&self) -> Option<PieceType> {
        match self {
            MoveFlag::Promotion(p) => Some(*p),
            _ => None,
        }
    }
}

/// A fully legal move as produced by the generator. Capture information is
/// read from the board during `make_move`, not stored here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub from: u8,
    pub to: u8,
    pub flag: MoveFlag,
}

impl Move {
    pub const NULL: Move = Move {
        from: 0,
        to: 0,
        flag: MoveFlag::Regular,
    };

    #[inline(always)]
    pub const fn new(from: u8, to: u8, flag: MoveFlag) -> Self {
        Self { from, to, flag }
    }

    /// Long algebraic (UCI) form, e.g. `e2e4` or `e7e8q`.
    pub fn to_uci(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", square_to_algebraic(self.from), square_to_algebraic(self.to))?;
        if let Some(p) = self.flag.promotion() {
            write!(f, "{}", p.to_char())?;
        }
        Ok(())
    }
}
