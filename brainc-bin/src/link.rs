use std::{io, path::Path, process::Command};

use brain::{codegen::OptLevel, Error};
use tracing::{debug, instrument};

/// Assembles and links `asm` into the executable `output` with the C compiler
/// driver `cc`, which also brings in the libc that provides `putchar` and
/// `getchar`.
#[instrument(skip_all, fields(cc = %cc, asm = %asm.display(), output = %output.display()))]
pub fn link(cc: &str, opt_level: OptLevel, asm: &Path, output: &Path) -> Result<(), Error> {
    let mut command = Command::new(cc);
    command
        .arg(format!("-O{}", opt_level.level()))
        .arg(asm)
        .arg("-o")
        .arg(output);
    debug!(?command, "invoking linker");

    let status = command.status().map_err(|e| match e.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
            Error::LinkerNotFound(cc.to_owned())
        }
        _ => Error::Assembler(e),
    })?;
    if status.success() {
        Ok(())
    } else {
        Err(Error::Link {
            cc: cc.to_owned(),
            status,
        })
    }
}
