use std::{fmt, io, str::FromStr};

use tracing::{debug, instrument};

use crate::{
    ast::Tree,
    codegen::{x86_64::Generator, x86_64_env},
    contract::EofPolicy,
};

/// Writes the assembly for `tree` into `writer`.
#[instrument(skip_all, fields(target = %target, opt_level = %options.opt_level, eof = %options.eof))]
pub fn generate<W>(
    writer: W,
    target: Target,
    options: &CompileOptions,
    tree: &Tree,
) -> io::Result<()>
where
    W: io::Write,
{
    type DarwinGenerator<W> = Generator<W, x86_64_env::Darwin>;
    type LinuxGenerator<W> = Generator<W, x86_64_env::Linux>;

    let lines = match target {
        Target::x86_64_darwin => DarwinGenerator::new(writer, options).generate(tree)?,
        Target::x86_64_linux => LinuxGenerator::new(writer, options).generate(tree)?,
    };
    debug!(lines, "generated assembly");
    Ok(())
}

/// Convenience wrapper around [`generate`] that returns the assembly text.
pub fn generate_string(target: Target, options: &CompileOptions, tree: &Tree) -> String {
    let mut buf = Vec::with_capacity(tree.node_count() * 32 + 512);
    generate(&mut buf, target, options, tree).expect("writing to a Vec is infallible");
    String::from_utf8(buf).expect("generated assembly is ASCII")
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CompileOptions {
    pub opt_level: OptLevel,
    pub eof: EofPolicy,
}

#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Target {
    x86_64_darwin,
    x86_64_linux,
}

impl Target {
    pub const ALL: &[Target] = &[Target::x86_64_darwin, Target::x86_64_linux];

    pub const fn triple(&self) -> &'static str {
        match self {
            Target::x86_64_darwin => "x86_64-apple-darwin",
            Target::x86_64_linux => "x86_64-unknown-linux-gnu",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::x86_64_darwin => f.write_str("x86_64_darwin"),
            Target::x86_64_linux => f.write_str("x86_64_linux"),
        }
    }
}

/// How hard the generator tries. Every level produces the same observable
/// behaviour.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum OptLevel {
    /// One instruction per node.
    O0,
    /// Runs of cell or head updates are folded into a single instruction.
    O1,
    #[default]
    O2,
    O3,
}

impl OptLevel {
    pub const fn from_level(level: u8) -> Option<OptLevel> {
        match level {
            0 => Some(OptLevel::O0),
            1 => Some(OptLevel::O1),
            2 => Some(OptLevel::O2),
            3 => Some(OptLevel::O3),
            _ => None,
        }
    }

    pub const fn level(self) -> u8 {
        match self {
            OptLevel::O0 => 0,
            OptLevel::O1 => 1,
            OptLevel::O2 => 2,
            OptLevel::O3 => 3,
        }
    }

    pub const fn folds_runs(self) -> bool {
        !matches!(self, OptLevel::O0)
    }
}

impl fmt::Display for OptLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "O{}", self.level())
    }
}

impl FromStr for OptLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix('O').unwrap_or(s);
        digits
            .parse()
            .ok()
            .and_then(OptLevel::from_level)
            .ok_or_else(|| format!("invalid optimization level `{s}` (expected 0 to 3)"))
    }
}
