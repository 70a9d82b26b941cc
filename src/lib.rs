/// The tree builder validates the brackets of a source text and maps it into
/// a program tree, recording the position of every instruction.
pub mod builder;

/// The contract every backend implements: what each node means when run.
pub mod contract;

/// The interpreter runs a program tree directly over a tape.
pub mod interp;

/// The code generator maps a program tree into x86-64 assembly.
pub mod codegen {
    mod interface;
    pub mod x86_64;
    pub mod x86_64_env;

    pub use interface::*;
}

pub mod ast;
pub mod error;
pub mod token;

pub mod util {
    pub mod fmt;
    #[cfg(test)]
    pub(crate) mod test_utils;
}

pub use error::Error;
