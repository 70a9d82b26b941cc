use std::io::{self, Read, Write};

use tracing::{debug, instrument};

use crate::{
    ast::{NodeId, Tree},
    contract::{EofPolicy, Tape},
    token::TokenKind,
};

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("could not read input: {0}")]
    Read(#[source] io::Error),
    #[error("could not write output: {0}")]
    Write(#[source] io::Error),
}

/// Runs `tree` over `input`, returning everything it wrote.
pub fn run(tree: &Tree, input: &[u8], eof: EofPolicy) -> Result<Vec<u8>, RuntimeError> {
    let mut output = Vec::new();
    Interpreter::new(input, &mut output, eof).run(tree)?;
    Ok(output)
}

/// Executes program trees directly. This is the reference every other
/// backend is compared against.
pub struct Interpreter<R, W> {
    tape: Tape,
    input: R,
    output: W,
    eof: EofPolicy,
}

impl<R, W> Interpreter<R, W>
where
    R: Read,
    W: Write,
{
    pub fn new(input: R, output: W, eof: EofPolicy) -> Interpreter<R, W> {
        Interpreter {
            tape: Tape::new(),
            input,
            output,
            eof,
        }
    }

    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    pub fn tape_mut(&mut self) -> &mut Tape {
        &mut self.tape
    }

    /// Runs the whole program. The tape is left as the program left it, so a
    /// second call continues from that state.
    #[instrument(skip_all, fields(nodes = tree.node_count()))]
    pub fn run(&mut self, tree: &Tree) -> Result<(), RuntimeError> {
        let mut steps = 0u64;
        // Containers being executed, with the index of their next child.
        let mut frames: Vec<(NodeId, usize)> = vec![(tree.root(), 0)];

        while let Some((node, next)) = frames.last_mut() {
            let node = *node;
            if let Some(&child) = tree.children(node).get(*next) {
                *next += 1;
                steps += 1;
                match tree.kind(child) {
                    TokenKind::Increment => self.tape.increment(),
                    TokenKind::Decrement => self.tape.decrement(),
                    TokenKind::MoveLeft => self.tape.move_left(),
                    TokenKind::MoveRight => self.tape.move_right(),
                    TokenKind::Output => self.write()?,
                    TokenKind::Input => self.read()?,
                    TokenKind::Loop => {
                        if self.tape.current() != 0 {
                            frames.push((child, 0));
                        }
                    }
                    kind @ (TokenKind::Root | TokenKind::None) => {
                        unreachable!("{kind} node at {} in a built tree", tree.pos(child))
                    }
                }
            } else if tree.kind(node) == TokenKind::Loop && self.tape.current() != 0 {
                *next = 0;
            } else {
                frames.pop();
            }
        }

        self.output.flush().map_err(RuntimeError::Write)?;
        debug!(steps, head = self.tape.head(), "program finished");
        Ok(())
    }

    fn write(&mut self) -> Result<(), RuntimeError> {
        self.output
            .write_all(&[self.tape.current()])
            .map_err(RuntimeError::Write)
    }

    fn read(&mut self) -> Result<(), RuntimeError> {
        let mut byte = [0];
        loop {
            return match self.input.read(&mut byte) {
                Ok(0) => {
                    let value = self.eof.on_eof(self.tape.current());
                    self.tape.set_current(value);
                    Ok(())
                }
                Ok(_) => {
                    self.tape.set_current(byte[0]);
                    Ok(())
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => Err(RuntimeError::Read(e)),
            };
        }
    }
}
