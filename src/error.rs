use std::{io, path::PathBuf, process::ExitStatus};

use crate::{builder::StructuralError, interp::RuntimeError, token::Position, token::Spanned};

/// Everything that can stop a compilation or a run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("missing input file")]
    MissingInput,

    #[error("invalid input file `{}`: {reason}", path.display())]
    InvalidInput { path: PathBuf, reason: &'static str },

    #[error("could not read `{}`: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Structural(#[from] Spanned<StructuralError>),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("could not open output file `{}`: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no default target for this host, pass `--target`")]
    MissingTarget,

    #[error("could not emit assembly: {0}")]
    Assembler(#[source] io::Error),

    #[error("could not find `{0}` for linking")]
    LinkerNotFound(String),

    #[error("unable to link the object file (`{cc}` {status})")]
    Link { cc: String, status: ExitStatus },
}

impl Error {
    /// Source position of the error, for errors that come from the program.
    pub fn position(&self) -> Option<Position> {
        match self {
            Error::Structural(e) => Some(e.pos),
            _ => None,
        }
    }
}
