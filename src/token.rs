use std::fmt;

/// The kind of a tree node. Every kind except [`TokenKind::Root`] and
/// [`TokenKind::None`] is produced from exactly one source character.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Synthetic kind of the tree's top node.
    Root,
    /// `+`
    Increment,
    /// `-`
    Decrement,
    /// `<`
    MoveLeft,
    /// `>`
    MoveRight,
    /// `.`
    Output,
    /// `,`
    Input,
    /// `[` ... `]`
    Loop,
    /// Sentinel for an unrecognized character. Never part of a valid tree.
    None,
}

impl TokenKind {
    /// Classifies a source byte. Bytes that don't open a node (including
    /// `]`) map to [`TokenKind::None`].
    pub fn of(byte: u8) -> TokenKind {
        SYMBOLS
            .get(&char::from(byte))
            .copied()
            .unwrap_or(TokenKind::None)
    }

    /// Returns the source character for kinds that have one. Loops are
    /// represented by their opening bracket.
    pub const fn symbol(self) -> Option<char> {
        match self {
            TokenKind::Increment => Some('+'),
            TokenKind::Decrement => Some('-'),
            TokenKind::MoveLeft => Some('<'),
            TokenKind::MoveRight => Some('>'),
            TokenKind::Output => Some('.'),
            TokenKind::Input => Some(','),
            TokenKind::Loop => Some('['),
            TokenKind::Root | TokenKind::None => None,
        }
    }

    /// Whether nodes of this kind may hold children.
    pub const fn is_container(self) -> bool {
        matches!(self, TokenKind::Root | TokenKind::Loop)
    }

    pub const fn name(self) -> &'static str {
        match self {
            TokenKind::Root => "root",
            TokenKind::Increment => "increment",
            TokenKind::Decrement => "decrement",
            TokenKind::MoveLeft => "move-left",
            TokenKind::MoveRight => "move-right",
            TokenKind::Output => "output",
            TokenKind::Input => "input",
            TokenKind::Loop => "loop",
            TokenKind::None => "none",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Characters that open a node. `]` is structural only and is absent here.
pub static SYMBOLS: phf::Map<char, TokenKind> = phf::phf_map! {
    '+' => TokenKind::Increment,
    '-' => TokenKind::Decrement,
    '<' => TokenKind::MoveLeft,
    '>' => TokenKind::MoveRight,
    '.' => TokenKind::Output,
    ',' => TokenKind::Input,
    '[' => TokenKind::Loop,
};

/// Whether the byte is one of the eight meaningful characters of the
/// language. Everything else is a comment.
pub fn is_symbol(byte: u8) -> bool {
    byte == b']' || SYMBOLS.contains_key(&char::from(byte))
}

/// A location in the source text.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Position {
    /// 1-based.
    pub line: u32,
    /// 1-based.
    pub column: u32,
    /// 0-based byte offset.
    pub offset: usize,
}

impl Position {
    pub const START: Position = Position {
        line: 1,
        column: 1,
        offset: 0,
    };

    pub const fn new(line: u32, column: u32, offset: usize) -> Position {
        Position {
            line,
            column,
            offset,
        }
    }

    /// Returns the position of the byte following `byte`, which must be the
    /// byte found at `self`.
    #[must_use]
    pub const fn advance(self, byte: u8) -> Position {
        if byte == b'\n' {
            Position {
                line: self.line + 1,
                column: 1,
                offset: self.offset + 1,
            }
        } else {
            Position {
                line: self.line,
                column: self.column + 1,
                offset: self.offset + 1,
            }
        }
    }

    pub fn wrap<T>(self, inner: T) -> Spanned<T> {
        Spanned { pos: self, inner }
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::START
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Position({self}, offset: {})", self.offset)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A value attached to the source position it originates from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spanned<T> {
    pub pos: Position,
    pub inner: T,
}

impl<T> Spanned<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> {
        Spanned {
            pos: self.pos,
            inner: f(self.inner),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Spanned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            write!(f, "{}: ", self.pos)?;
        }
        self.inner.fmt(f)
    }
}

impl<T: std::error::Error> std::error::Error for Spanned<T> {}
