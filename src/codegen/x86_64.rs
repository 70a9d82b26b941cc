use std::{format_args as f, io, marker::PhantomData};

use crate::{
    ast::Tree,
    codegen::{x86_64_env, CompileOptions},
    contract::{self, EofPolicy, Translate, CELL_COUNT},
    token::Position,
};

/// Current cell, addressed as tape base (`r12`) plus head (`r13`).
const CELL: &str = "byte ptr [r12 + r13]";

/// Emits Intel-syntax assembly for a program tree.
///
/// The tape lives in a zeroed data symbol; `r12` holds its address and `r13`
/// the head. Only the low 16 bits of `r13` are ever written after it is
/// cleared, so the head wraps at 65536 without masking.
pub struct Generator<W, E> {
    writer: W,
    options: CompileOptions,
    indent: bool,
    lines: usize,
    pending: Pending,
    /// Ids of the loops currently open.
    loops: Vec<usize>,
    next_loop: usize,
    next_input: usize,
    _env: PhantomData<E>,
}

/// A run of cell or head updates that has not been written yet.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Pending {
    None,
    Cell(u8),
    Head(u16),
}

impl<W, E> Generator<W, E>
where
    W: io::Write,
    E: x86_64_env::Env,
{
    pub fn new(writer: W, options: &CompileOptions) -> Generator<W, E> {
        Generator {
            writer,
            options: *options,
            indent: false,
            lines: 0,
            pending: Pending::None,
            loops: Vec::new(),
            next_loop: 0,
            next_input: 0,
            _env: PhantomData,
        }
    }

    /// Writes the whole program, returning the number of lines written.
    pub fn generate(mut self, tree: &Tree) -> io::Result<usize> {
        self.g_program_prologue()?;
        self.g_main(tree)?;
        self.g_data()?;
        self.writer.flush()?;
        Ok(self.lines)
    }
}

/// Target-specific functions.
impl<W, E> Generator<W, E>
where
    W: io::Write,
    E: x86_64_env::Env,
{
    fn g_program_prologue(&mut self) -> io::Result<()> {
        self.writer.write_all(E::GLOBAL_PROLOGUE.as_bytes())?;
        self.lines += E::GLOBAL_PROLOGUE.lines().count();
        Ok(())
    }

    fn g_main(&mut self, tree: &Tree) -> io::Result<()> {
        self.out(f!(".section {}", E::SECTION_TEXT))?;
        self.out(f!(".global {}", E::ENTRY_POINT))?;
        self.label(E::ENTRY_POINT)?;
        self.indented(|this| {
            this.g_main_prologue()?;
            // Ends with `finish`, which writes the epilogue.
            contract::translate(tree, this)
        })
    }

    /// Saves the callee-saved registers used for the tape. Three pushes after
    /// the return address leave the stack 16-byte aligned for libc calls.
    fn g_main_prologue(&mut self) -> io::Result<()> {
        self.out("push rbp")?;
        self.out("mov rbp, rsp")?;
        self.out("push r12")?;
        self.out("push r13")?;
        self.out(f!("lea r12, [rip + {}]", E::TAPE))?;
        self.out("xor r13d, r13d")
    }

    fn g_main_epilogue(&mut self) -> io::Result<()> {
        self.out("xor eax, eax")?;
        self.out("pop r13")?;
        self.out("pop r12")?;
        self.out("pop rbp")?;
        self.out("ret")
    }

    fn g_data(&mut self) -> io::Result<()> {
        self.out(E::tape_declaration(CELL_COUNT))
    }

    fn g_input(&mut self) -> io::Result<()> {
        self.out(f!("call {}", E::GETCHAR))?;
        let skip = self.next_input;
        self.next_input += 1;
        // getchar returns -1 on EOF; its low byte is already 255.
        match self.options.eof {
            EofPolicy::Max => self.out(f!("mov {CELL}, al")),
            EofPolicy::Zero => {
                self.out("cmp eax, -1")?;
                self.out(f!("jne {}input_{skip}", E::LOCAL_LABEL_PREFIX))?;
                self.out("xor eax, eax")?;
                self.label(f!("{}input_{skip}", E::LOCAL_LABEL_PREFIX))?;
                self.out(f!("mov {CELL}, al"))
            }
            EofPolicy::Unchanged => {
                self.out("cmp eax, -1")?;
                self.out(f!("je {}input_{skip}", E::LOCAL_LABEL_PREFIX))?;
                self.out(f!("mov {CELL}, al"))?;
                self.label(f!("{}input_{skip}", E::LOCAL_LABEL_PREFIX))
            }
        }
    }
}

/// Folding of cell and head updates.
impl<W, E> Generator<W, E>
where
    W: io::Write,
    E: x86_64_env::Env,
{
    fn bump_cell(&mut self, delta: u8) -> io::Result<()> {
        let acc = match self.pending {
            Pending::Cell(acc) => acc,
            _ => {
                self.flush()?;
                0
            }
        };
        self.pending = Pending::Cell(acc.wrapping_add(delta));
        self.flush_unless_folding()
    }

    fn bump_head(&mut self, delta: u16) -> io::Result<()> {
        let acc = match self.pending {
            Pending::Head(acc) => acc,
            _ => {
                self.flush()?;
                0
            }
        };
        self.pending = Pending::Head(acc.wrapping_add(delta));
        self.flush_unless_folding()
    }

    fn flush_unless_folding(&mut self) -> io::Result<()> {
        if self.options.opt_level.folds_runs() {
            Ok(())
        } else {
            self.flush()
        }
    }

    /// Writes the pending run, if any. Runs that cancel out write nothing.
    fn flush(&mut self) -> io::Result<()> {
        match std::mem::replace(&mut self.pending, Pending::None) {
            Pending::None | Pending::Cell(0) | Pending::Head(0) => Ok(()),
            Pending::Cell(1) => self.out(f!("inc {CELL}")),
            Pending::Cell(u8::MAX) => self.out(f!("dec {CELL}")),
            Pending::Cell(delta @ ..=128) => self.out(f!("add {CELL}, {delta}")),
            Pending::Cell(delta) => self.out(f!("sub {CELL}, {}", delta.wrapping_neg())),
            Pending::Head(1) => self.out("inc r13w"),
            Pending::Head(u16::MAX) => self.out("dec r13w"),
            Pending::Head(delta @ ..=0x8000) => self.out(f!("add r13w, {delta}")),
            Pending::Head(delta) => self.out(f!("sub r13w, {}", delta.wrapping_neg())),
        }
    }
}

impl<W, E> Translate for Generator<W, E>
where
    W: io::Write,
    E: x86_64_env::Env,
{
    type Error = io::Error;

    fn increment(&mut self, _pos: Position) -> io::Result<()> {
        self.bump_cell(1)
    }

    fn decrement(&mut self, _pos: Position) -> io::Result<()> {
        self.bump_cell(u8::MAX)
    }

    fn move_left(&mut self, _pos: Position) -> io::Result<()> {
        self.bump_head(u16::MAX)
    }

    fn move_right(&mut self, _pos: Position) -> io::Result<()> {
        self.bump_head(1)
    }

    fn output(&mut self, _pos: Position) -> io::Result<()> {
        self.flush()?;
        self.out(f!("movzx edi, {CELL}"))?;
        self.out(f!("call {}", E::PUTCHAR))
    }

    fn input(&mut self, _pos: Position) -> io::Result<()> {
        self.flush()?;
        self.g_input()
    }

    fn enter_loop(&mut self, pos: Position) -> io::Result<()> {
        self.flush()?;
        let id = self.next_loop;
        self.next_loop += 1;
        self.loops.push(id);
        self.label(f!("{}loop_start_{id}", E::LOCAL_LABEL_PREFIX))?;
        self.out(f!("# loop at {pos}"))?;
        self.out(f!("cmp {CELL}, 0"))?;
        self.out(f!("je {}loop_end_{id}", E::LOCAL_LABEL_PREFIX))
    }

    fn exit_loop(&mut self, _pos: Position) -> io::Result<()> {
        self.flush()?;
        let Some(id) = self.loops.pop() else {
            unreachable!("loop exit without a matching entry");
        };
        self.out(f!("jmp {}loop_start_{id}", E::LOCAL_LABEL_PREFIX))?;
        self.label(f!("{}loop_end_{id}", E::LOCAL_LABEL_PREFIX))
    }

    fn finish(&mut self) -> io::Result<()> {
        self.flush()?;
        self.g_main_epilogue()
    }
}

/// Utility functions.
impl<W, E> Generator<W, E>
where
    W: io::Write,
    E: x86_64_env::Env,
{
    /// Prints a line.
    fn out(&mut self, f: impl std::fmt::Display) -> io::Result<()> {
        let indent = if self.indent { "    " } else { "" };
        self.lines += 1;
        writeln!(self.writer, "{indent}{f}")
    }

    /// Prints a label, never indented.
    fn label(&mut self, name: impl std::fmt::Display) -> io::Result<()> {
        self.lines += 1;
        writeln!(self.writer, "{name}:")
    }

    /// Prints an empty line.
    fn out_line(&mut self) -> io::Result<()> {
        self.lines += 1;
        writeln!(self.writer)
    }

    /// Writes in an indented block that is finished with an empty line.
    fn indented<T>(&mut self, f: impl FnOnce(&mut Self) -> io::Result<T>) -> io::Result<T> {
        self.indent = true;
        let res = f(self);
        self.indent = false;
        let res = res?;
        self.out_line()?;
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        builder::build,
        codegen::{generate_string, OptLevel, Target},
    };
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn asm(src: &str, target: Target, opt_level: OptLevel, eof: EofPolicy) -> String {
        let tree = build(src.as_bytes()).unwrap();
        let options = CompileOptions { opt_level, eof };
        generate_string(target, &options, &tree)
    }

    /// Instructions between the prologue and the epilogue.
    fn body(src: &str, opt_level: OptLevel) -> Vec<String> {
        let asm = asm(src, Target::x86_64_linux, opt_level, EofPolicy::Zero);
        asm.lines()
            .skip_while(|line| line.trim() != "xor r13d, r13d")
            .skip(1)
            .take_while(|line| line.trim() != "xor eax, eax")
            .map(|line| line.trim().to_string())
            .collect()
    }

    #[test]
    fn test_linux_program() {
        let expected = indoc! {r#"
            .intel_syntax noprefix
            .section .note.GNU-stack,"",@progbits

            .section .text
            .global main
            main:
                push rbp
                mov rbp, rsp
                push r12
                push r13
                lea r12, [rip + tape]
                xor r13d, r13d
                inc byte ptr [r12 + r13]
            .Lloop_start_0:
                # loop at 1:2
                cmp byte ptr [r12 + r13], 0
                je .Lloop_end_0
                dec byte ptr [r12 + r13]
                jmp .Lloop_start_0
            .Lloop_end_0:
                movzx edi, byte ptr [r12 + r13]
                call putchar@PLT
                xor eax, eax
                pop r13
                pop r12
                pop rbp
                ret

            .local tape
            .comm tape,65536,16
        "#};
        let actual = asm("+[-].", Target::x86_64_linux, OptLevel::O2, EofPolicy::Zero);
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_darwin_symbols() {
        let actual = asm(",[.,]", Target::x86_64_darwin, OptLevel::O2, EofPolicy::Zero);
        assert!(actual.starts_with(".intel_syntax noprefix\n\n"));
        assert!(actual.contains(".section __TEXT,__text,regular,pure_instructions\n"));
        assert!(actual.contains(".global _main\n_main:\n"));
        assert!(actual.contains("lea r12, [rip + _tape]"));
        assert!(actual.contains("call _getchar"));
        assert!(actual.contains("call _putchar"));
        assert!(actual.contains("\nLloop_start_0:\n"));
        assert!(actual.contains("\nLinput_1:\n"));
        assert!(actual.ends_with(".zerofill __DATA,__bss,_tape,65536,4\n"));
        assert!(!actual.contains(".L"));
    }

    #[test]
    fn test_runs_are_folded() {
        assert_eq!(
            body("+++>>--<", OptLevel::O1),
            [
                "add byte ptr [r12 + r13], 3",
                "add r13w, 2",
                "sub byte ptr [r12 + r13], 2",
                "dec r13w",
            ]
        );
        assert_eq!(body("+-<>", OptLevel::O2), Vec::<String>::new());
        assert_eq!(body(&"+".repeat(200), OptLevel::O3), ["sub byte ptr [r12 + r13], 56"]);
        assert_eq!(body(&"+".repeat(256), OptLevel::O1), Vec::<String>::new());
        assert_eq!(body(&"<".repeat(3), OptLevel::O1), ["sub r13w, 3"]);
    }

    #[test]
    fn test_runs_do_not_cross_loops() {
        assert_eq!(
            body("+[+]+", OptLevel::O2),
            [
                "inc byte ptr [r12 + r13]",
                ".Lloop_start_0:",
                "# loop at 1:2",
                "cmp byte ptr [r12 + r13], 0",
                "je .Lloop_end_0",
                "inc byte ptr [r12 + r13]",
                "jmp .Lloop_start_0",
                ".Lloop_end_0:",
                "inc byte ptr [r12 + r13]",
            ]
        );
    }

    #[test]
    fn test_no_folding_at_o0() {
        assert_eq!(
            body("++>-<", OptLevel::O0),
            [
                "inc byte ptr [r12 + r13]",
                "inc byte ptr [r12 + r13]",
                "inc r13w",
                "dec byte ptr [r12 + r13]",
                "dec r13w",
            ]
        );
    }

    #[test]
    fn test_input_eof_policies() {
        let input = |eof| {
            let asm = asm(",", Target::x86_64_linux, OptLevel::O2, eof);
            asm.lines()
                .skip_while(|line| !line.contains("call getchar@PLT"))
                .skip(1)
                .take_while(|line| line.trim() != "xor eax, eax")
                .map(|line| line.trim().to_string())
                .collect::<Vec<_>>()
        };
        assert_eq!(input(EofPolicy::Max), ["mov byte ptr [r12 + r13], al"]);
        assert_eq!(
            input(EofPolicy::Unchanged),
            [
                "cmp eax, -1",
                "je .Linput_0",
                "mov byte ptr [r12 + r13], al",
                ".Linput_0:",
            ]
        );
    }

    #[test]
    fn test_input_eof_zero() {
        let asm = asm(",", Target::x86_64_linux, OptLevel::O2, EofPolicy::Zero);
        assert!(asm.contains(indoc! {"
                call getchar@PLT
                cmp eax, -1
                jne .Linput_0
                xor eax, eax
            .Linput_0:
                mov byte ptr [r12 + r13], al
        "}));
    }

    #[test]
    fn test_deep_nesting() {
        let depth = 10_000;
        let src = format!("{}{}", "[".repeat(depth), "]".repeat(depth));
        let asm = asm(&src, Target::x86_64_linux, OptLevel::O2, EofPolicy::Zero);
        assert!(asm.contains(".Lloop_start_9999:\n"));
        assert_eq!(asm.matches("jmp .Lloop_start_").count(), depth);
    }
}
