use std::{
    ffi::OsStr,
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use brain::{
    ast::Tree,
    builder,
    codegen::{self, CompileOptions, OptLevel},
    contract::EofPolicy,
    interp::Interpreter,
    util::fmt::{tree, Diagnostic},
    Error,
};
use clap::{Parser, ValueEnum};
use tracing::{debug, info};

mod link;
mod target;

#[derive(Parser)]
#[command(name = "brainc", version)]
#[command(about = "Compiler for the eight-symbol tape machine language", long_about = None)]
struct Cli {
    /// Program source, with a `.bf` extension
    input: Option<PathBuf>,

    /// Output path [default: the input's file stem, with `.s` for assembly]
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Emit::Exe)]
    emit: Emit,

    /// Interpret the program over stdin and stdout instead of compiling it
    #[arg(long, conflicts_with_all = ["output", "emit"])]
    run: bool,

    /// Optimization level
    #[arg(short = 'O', default_value_t = 2, value_parser = clap::value_parser!(u8).range(0..=3))]
    opt_level: u8,

    /// Target platform [default: the host, when supported]
    #[arg(long, value_enum)]
    target: Option<target::Target>,

    /// What input stores once stdin is exhausted
    #[arg(long, default_value_t = EofPolicy::Zero)]
    eof: EofPolicy,

    /// C compiler driver used to assemble and link
    #[arg(long, env = "BRAINC_CC", default_value = "cc")]
    cc: String,

    /// Log compiler internals to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Emit {
    /// A linked executable
    Exe,
    /// Assembly text
    Asm,
    /// The program tree
    Tree,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprint!("{}", Diagnostic::from(&error));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    // A subscriber may already be installed (tests); keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(io::stderr)
        .try_init();
}

fn run(cli: &Cli) -> Result<(), Error> {
    let input = cli.input.as_deref().ok_or(Error::MissingInput)?;
    check_input_file(input)?;
    let target = match cli.emit {
        Emit::Asm | Emit::Exe if !cli.run => {
            Some(resolve_target(cli.target, target::DEFAULT_TARGET)?)
        }
        _ => None,
    };
    let src = fs::read(input).map_err(|source| Error::Read {
        path: input.to_owned(),
        source,
    })?;
    let tree = builder::build(&src)?;
    info!(input = %input.display(), nodes = tree.node_count(), "program built");

    if cli.run {
        let stdin = io::stdin().lock();
        let stdout = io::stdout().lock();
        return Ok(Interpreter::new(stdin, stdout, cli.eof).run(&tree)?);
    }

    let Some(target) = target else {
        return emit_tree(cli.output.as_deref(), &tree);
    };
    match cli.emit {
        Emit::Tree => unreachable!("tree output needs no target"),
        Emit::Asm => {
            let output = cli
                .output
                .clone()
                .unwrap_or_else(|| default_output(input, Emit::Asm));
            let file = File::create(&output).map_err(|source| Error::Output {
                path: output.clone(),
                source,
            })?;
            emit_asm(BufWriter::new(file), cli, target, &tree)
        }
        Emit::Exe => {
            let output = cli
                .output
                .clone()
                .unwrap_or_else(|| default_output(input, Emit::Exe));
            let mut asm = tempfile::Builder::new()
                .prefix("brainc-")
                .suffix(".s")
                .tempfile()
                .map_err(Error::Assembler)?;
            emit_asm(BufWriter::new(asm.as_file_mut()), cli, target, &tree)?;
            debug!(asm = %asm.path().display(), "wrote temporary assembly");
            link::link(&cli.cc, opt_level(cli), asm.path(), &output)
        }
    }
}

/// The input must be an existing regular file with a `.bf` extension.
fn check_input_file(path: &Path) -> Result<(), Error> {
    let invalid = |reason| Error::InvalidInput {
        path: path.to_owned(),
        reason,
    };
    let metadata = fs::metadata(path).map_err(|_| invalid("no such file"))?;
    if !metadata.is_file() {
        return Err(invalid("not a regular file"));
    }
    if path.extension() != Some(OsStr::new("bf")) {
        return Err(invalid("expected a `.bf` extension"));
    }
    Ok(())
}

/// `<stem>` for executables, `<stem>.s` for assembly, in the current
/// directory.
fn default_output(input: &Path, emit: Emit) -> PathBuf {
    let Some(stem) = input.file_stem() else {
        return PathBuf::from("a.out");
    };
    let output = PathBuf::from(stem);
    match emit {
        Emit::Asm => output.with_extension("s"),
        Emit::Exe | Emit::Tree => output,
    }
}

fn emit_tree(output: Option<&Path>, program: &Tree) -> Result<(), Error> {
    let Some(path) = output else {
        let mut stdout = io::stdout().lock();
        return tree::print_tree(&mut stdout, program).map_err(|source| Error::Output {
            path: PathBuf::from("<stdout>"),
            source,
        });
    };
    let write = || {
        let mut w = BufWriter::new(File::create(path)?);
        tree::print_tree(&mut w, program)?;
        w.flush()
    };
    write().map_err(|source| Error::Output {
        path: path.to_owned(),
        source,
    })
}

/// The requested target, else the host's.
fn resolve_target(
    requested: Option<target::Target>,
    host: Option<target::Target>,
) -> Result<target::Target, Error> {
    requested.or(host).ok_or(Error::MissingTarget)
}

fn emit_asm(
    writer: impl Write,
    cli: &Cli,
    target: target::Target,
    tree: &Tree,
) -> Result<(), Error> {
    let options = CompileOptions {
        opt_level: opt_level(cli),
        eof: cli.eof,
    };
    codegen::generate(writer, target.into(), &options, tree).map_err(Error::Assembler)
}

fn opt_level(cli: &Cli) -> OptLevel {
    OptLevel::from_level(cli.opt_level).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["brainc", "hello.bf"]).unwrap();
        assert_eq!(cli.emit, Emit::Exe);
        assert_eq!(opt_level(&cli), OptLevel::O2);
        assert_eq!(cli.eof, EofPolicy::Zero);
        assert!(!cli.run);

        let args = ["brainc", "a.bf", "-O0", "--eof", "unchanged", "--emit", "asm"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.emit, Emit::Asm);
        assert_eq!(opt_level(&cli), OptLevel::O0);
        assert_eq!(cli.eof, EofPolicy::Unchanged);

        assert!(Cli::try_parse_from(["brainc", "a.bf", "-O4"]).is_err());
        assert!(Cli::try_parse_from(["brainc", "a.bf", "--run", "--emit", "asm"]).is_err());
    }

    #[test]
    fn test_check_input_file() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("prog.bf");
        fs::write(&good, "+.").unwrap();
        let wrong_ext = dir.path().join("prog.txt");
        fs::write(&wrong_ext, "+.").unwrap();

        assert!(check_input_file(&good).is_ok());
        let reason = |path: &Path| match check_input_file(path) {
            Err(Error::InvalidInput { reason, .. }) => reason,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(reason(&wrong_ext), "expected a `.bf` extension");
        assert_eq!(reason(&dir.path().join("missing.bf")), "no such file");
        assert_eq!(reason(dir.path()), "not a regular file");
    }

    #[test]
    fn test_resolve_target() {
        use target::Target;
        let linux = Some(Target::x86_64_linux);
        let darwin = Some(Target::x86_64_darwin);
        assert_eq!(resolve_target(darwin, linux).unwrap(), Target::x86_64_darwin);
        assert_eq!(resolve_target(None, linux).unwrap(), Target::x86_64_linux);
        let err = resolve_target(None, None).unwrap_err();
        assert_eq!(
            Diagnostic::from(&err).to_string(),
            "Error: no default target for this host, pass `--target`\n"
        );
    }

    #[test]
    fn test_default_output() {
        let input = Path::new("some/dir/hello.bf");
        assert_eq!(default_output(input, Emit::Exe), PathBuf::from("hello"));
        assert_eq!(default_output(input, Emit::Asm), PathBuf::from("hello.s"));
    }

    #[test]
    fn test_missing_input() {
        let cli = Cli::try_parse_from(["brainc"]).unwrap();
        let err = run(&cli).unwrap_err();
        assert_eq!(Diagnostic::from(&err).to_string(), "Error: missing input file\n");
    }

    #[test]
    fn test_structural_error_is_positioned() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.bf");
        fs::write(&path, "+\n [").unwrap();
        let cli = Cli::try_parse_from([OsStr::new("brainc"), path.as_os_str()]).unwrap();
        let err = run(&cli).unwrap_err();
        assert_eq!(
            Diagnostic::from(&err).to_string(),
            "Error[2:2]: '[' is missing its closing ']'\n"
        );
    }

    #[test]
    fn test_emit_asm_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("prog.bf");
        let output = dir.path().join("prog.s");
        fs::write(&input, "+[-].").unwrap();
        let cli = Cli::try_parse_from([
            OsStr::new("brainc"),
            input.as_os_str(),
            OsStr::new("--emit=asm"),
            OsStr::new("--target=x86_64_linux"),
            OsStr::new("-o"),
            output.as_os_str(),
        ])
        .unwrap();
        run(&cli).unwrap();
        let asm = fs::read_to_string(&output).unwrap();
        assert!(asm.starts_with(".intel_syntax noprefix\n"));
        assert!(asm.contains("call putchar@PLT"));
    }
}
