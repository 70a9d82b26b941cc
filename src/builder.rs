use tracing::{debug, instrument};

use crate::{
    ast::{NodeId, Tree},
    token::{Position, Spanned, TokenKind},
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StructuralError {
    #[error("'[' is missing its closing ']'")]
    UnmatchedOpening,
    #[error("']' is missing its opening '['")]
    UnmatchedClosing,
}

pub type BuildResult = Result<Tree, Spanned<StructuralError>>;

/// Builds the program tree for `src`.
///
/// Brackets are validated over the whole input before any node is created,
/// so on error no tree (partial or otherwise) exists.
#[instrument(skip_all, fields(source_len = src.len()))]
pub fn build(src: &[u8]) -> BuildResult {
    let closes = pair_brackets(src)?;
    let tree = Builder::new(src, &closes).build();
    debug!(
        nodes = tree.node_count(),
        depth = tree.depth(),
        "built program tree"
    );
    Ok(tree)
}

/// Checks that every bracket in `src` is matched.
///
/// An unmatched `]` is reported at the first point where the depth goes
/// negative. Unclosed `[` are reported at the earliest one still open when
/// the input ends.
pub fn validate(src: &[u8]) -> Result<(), Spanned<StructuralError>> {
    pair_brackets(src).map(|_| ())
}

/// Returns the offset of the `]` matching the `[` at `open`, if any.
///
/// Restates the lookahead rule on its own: nested `[` raise a counter, `]`
/// lowers it or, at zero, is the match. [`build`] doesn't call this; it takes
/// every loop end from the same pre-pass as [`validate`], which counts the
/// same way in a single scan.
pub fn matching_close(src: &[u8], open: usize) -> Option<usize> {
    debug_assert_eq!(src.get(open), Some(&b'['));
    let mut depth = 0usize;
    for (offset, &byte) in src.iter().enumerate().skip(open + 1) {
        match byte {
            b'[' => depth += 1,
            b']' if depth == 0 => return Some(offset),
            b']' => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Depth-counting pre-pass. On success, returns the offset of each closing
/// bracket, ordered by the position of its opening bracket.
fn pair_brackets(src: &[u8]) -> Result<Vec<usize>, Spanned<StructuralError>> {
    let mut pos = Position::START;
    let mut closes = Vec::new();
    // (index into `closes`, position of the `[`)
    let mut open: Vec<(usize, Position)> = Vec::new();

    for &byte in src {
        match byte {
            b'[' => {
                open.push((closes.len(), pos));
                closes.push(usize::MAX);
            }
            b']' => match open.pop() {
                Some((slot, _)) => closes[slot] = pos.offset,
                None => return Err(pos.wrap(StructuralError::UnmatchedClosing)),
            },
            _ => {}
        }
        pos = pos.advance(byte);
    }

    match open.first() {
        Some(&(_, first)) => Err(first.wrap(StructuralError::UnmatchedOpening)),
        None => Ok(closes),
    }
}

struct Builder<'src> {
    src: &'src [u8],
    closes: &'src [usize],
    next_loop: usize,
    pos: Position,
    tree: Tree,
    frames: Vec<Frame>,
}

/// A loop whose body is being scanned.
struct Frame {
    node: NodeId,
    close: usize,
}

impl Builder<'_> {
    fn new<'src>(src: &'src [u8], closes: &'src [usize]) -> Builder<'src> {
        Builder {
            src,
            closes,
            next_loop: 0,
            pos: Position::START,
            tree: Tree::with_capacity(src.len() + 1),
            frames: Vec::with_capacity(16),
        }
    }

    /// Scans the source once. Loop bodies are scanned in place, with the
    /// enclosing loop on the frame stack, so positions come from the same
    /// cursor that drives construction.
    fn build(mut self) -> Tree {
        while let Some(&byte) = self.src.get(self.pos.offset) {
            if self.frames.last().is_some_and(|f| f.close == self.pos.offset) {
                self.frames.pop();
                self.bump(byte);
                continue;
            }
            match TokenKind::of(byte) {
                TokenKind::Loop => self.open_loop(),
                TokenKind::None => debug_assert_ne!(byte, b']', "stray `]` after validation"),
                kind => {
                    self.tree.push(self.parent(), kind, self.pos);
                }
            }
            self.bump(byte);
        }
        debug_assert!(self.frames.is_empty());
        self.tree
    }

    fn open_loop(&mut self) {
        let close = self.closes[self.next_loop];
        self.next_loop += 1;

        let node = self.tree.push(self.parent(), TokenKind::Loop, self.pos);
        self.frames.push(Frame { node, close });
    }

    fn parent(&self) -> NodeId {
        self.frames.last().map_or(NodeId::ROOT, |f| f.node)
    }

    fn bump(&mut self, byte: u8) {
        self.pos = self.pos.advance(byte);
    }
}
