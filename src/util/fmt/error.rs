use std::fmt;

use crate::{error::Error, token::Position, token::Spanned};

/// A user-facing error report, printed as `Error[line:column]: message`, or
/// `Error: message` when there is no source position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub pos: Option<Position>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(pos: Option<Position>, message: impl Into<String>) -> Diagnostic {
        Diagnostic {
            pos,
            message: message.into(),
        }
    }
}

impl From<&Error> for Diagnostic {
    fn from(error: &Error) -> Self {
        Diagnostic::new(error.position(), error.to_string())
    }
}

impl<E: fmt::Display> From<&Spanned<E>> for Diagnostic {
    fn from(error: &Spanned<E>) -> Self {
        Diagnostic::new(Some(error.pos), error.inner.to_string())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pos {
            Some(pos) => writeln!(f, "Error[{pos}]: {}", self.message),
            None => writeln!(f, "Error: {}", self.message),
        }
    }
}
