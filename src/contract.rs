//! The meaning of a program tree, as operations over an abstract tape
//! machine.
//!
//! | Kind         | Effect                                             |
//! |--------------|----------------------------------------------------|
//! | `increment`  | `cell[head] += 1` (mod 256)                        |
//! | `decrement`  | `cell[head] -= 1` (mod 256)                        |
//! | `move-right` | `head += 1` (mod [`CELL_COUNT`])                   |
//! | `move-left`  | `head -= 1` (mod [`CELL_COUNT`])                   |
//! | `output`     | write `cell[head]` as one byte                     |
//! | `input`      | read one byte into `cell[head]`, see [`EofPolicy`] |
//! | `loop`       | while `cell[head] != 0`, run the children in order |
//! | `root`       | run the children in order, then stop               |
//!
//! Loops test their condition before every iteration, including the first.
//! Every backend, whether it interprets the tree or emits code for it, must
//! produce the same output bytes for the same input bytes.

use std::{fmt, str::FromStr};

use crate::{
    ast::{Event, Tree},
    token::{Position, TokenKind},
};

/// Number of cells on the tape. Head arithmetic wraps at this boundary.
pub const CELL_COUNT: usize = 1 << 16;

/// The abstract machine state: [`CELL_COUNT`] zeroed cells and a head at 0.
#[derive(Clone)]
pub struct Tape {
    cells: Box<[u8; CELL_COUNT]>,
    head: u16,
}

impl Tape {
    pub fn new() -> Tape {
        Tape {
            cells: Box::new([0; CELL_COUNT]),
            head: 0,
        }
    }

    pub fn increment(&mut self) {
        let cell = self.current_mut();
        *cell = cell.wrapping_add(1);
    }

    pub fn decrement(&mut self) {
        let cell = self.current_mut();
        *cell = cell.wrapping_sub(1);
    }

    pub fn move_right(&mut self) {
        self.head = self.head.wrapping_add(1);
    }

    pub fn move_left(&mut self) {
        self.head = self.head.wrapping_sub(1);
    }

    pub fn head(&self) -> u16 {
        self.head
    }

    pub fn set_head(&mut self, head: u16) {
        self.head = head;
    }

    pub fn current(&self) -> u8 {
        self.cells[usize::from(self.head)]
    }

    pub fn set_current(&mut self, value: u8) {
        *self.current_mut() = value;
    }

    pub fn get(&self, index: u16) -> u8 {
        self.cells[usize::from(index)]
    }

    fn current_mut(&mut self) -> &mut u8 {
        &mut self.cells[usize::from(self.head)]
    }
}

impl Default for Tape {
    fn default() -> Self {
        Tape::new()
    }
}

impl fmt::Debug for Tape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tape(head: {}, current: {})", self.head, self.current())
    }
}

/// What `input` stores when the input stream is exhausted.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum EofPolicy {
    /// Store 0.
    #[default]
    Zero,
    /// Leave the current cell untouched.
    Unchanged,
    /// Store 255 (the C `EOF` value truncated to a byte).
    Max,
}

impl EofPolicy {
    pub const ALL: &[EofPolicy] = &[EofPolicy::Zero, EofPolicy::Unchanged, EofPolicy::Max];

    /// Returns the new value of a cell holding `current` when input hits EOF.
    pub const fn on_eof(self, current: u8) -> u8 {
        match self {
            EofPolicy::Zero => 0,
            EofPolicy::Unchanged => current,
            EofPolicy::Max => u8::MAX,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            EofPolicy::Zero => "zero",
            EofPolicy::Unchanged => "unchanged",
            EofPolicy::Max => "max",
        }
    }
}

impl fmt::Display for EofPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EofPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EofPolicy::ALL
            .iter()
            .copied()
            .find(|policy| policy.name() == s)
            .ok_or_else(|| format!("unknown eof policy `{s}` (expected zero, unchanged or max)"))
    }
}

/// A consumer of the contract. [`translate`] calls these in program order.
///
/// Positions are those of the originating node, for backends that want to
/// annotate their output.
pub trait Translate {
    type Error;

    fn increment(&mut self, pos: Position) -> Result<(), Self::Error>;
    fn decrement(&mut self, pos: Position) -> Result<(), Self::Error>;
    fn move_left(&mut self, pos: Position) -> Result<(), Self::Error>;
    fn move_right(&mut self, pos: Position) -> Result<(), Self::Error>;
    fn output(&mut self, pos: Position) -> Result<(), Self::Error>;
    fn input(&mut self, pos: Position) -> Result<(), Self::Error>;

    /// Start of a loop: test the current cell and skip past the matching
    /// [`Translate::exit_loop`] if it is zero.
    fn enter_loop(&mut self, pos: Position) -> Result<(), Self::Error>;

    /// End of a loop body: go back to the test of the matching
    /// [`Translate::enter_loop`].
    fn exit_loop(&mut self, pos: Position) -> Result<(), Self::Error>;

    /// End of the program.
    fn finish(&mut self) -> Result<(), Self::Error>;
}

/// Drives `backend` over every node of `tree`, in program order.
pub fn translate<T: Translate>(tree: &Tree, backend: &mut T) -> Result<(), T::Error> {
    for event in tree.events() {
        match event {
            Event::Enter(id) => {
                let pos = tree.pos(id);
                match tree.kind(id) {
                    TokenKind::Root => assert_eq!(id, tree.root(), "nested root at {pos}"),
                    TokenKind::Increment => backend.increment(pos)?,
                    TokenKind::Decrement => backend.decrement(pos)?,
                    TokenKind::MoveLeft => backend.move_left(pos)?,
                    TokenKind::MoveRight => backend.move_right(pos)?,
                    TokenKind::Output => backend.output(pos)?,
                    TokenKind::Input => backend.input(pos)?,
                    TokenKind::Loop => backend.enter_loop(pos)?,
                    TokenKind::None => unreachable!("`none` node at {pos} in a built tree"),
                }
            }
            Event::Exit(id) => match tree.kind(id) {
                TokenKind::Loop => backend.exit_loop(tree.pos(id))?,
                TokenKind::Root => backend.finish()?,
                kind => unreachable!("{kind} node can't hold children"),
            },
        }
    }
    Ok(())
}
