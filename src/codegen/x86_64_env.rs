pub trait Env {
    const ENTRY_POINT: &str;

    const GLOBAL_PROLOGUE: &str;

    const SECTION_TEXT: &str;

    /// Prefix that keeps a label out of the object's symbol table.
    const LOCAL_LABEL_PREFIX: &str;

    const TAPE: &str;
    const PUTCHAR: &str;
    const GETCHAR: &str;

    /// Directives reserving `size` zeroed bytes under [`Env::TAPE`].
    fn tape_declaration(size: usize) -> String;
}

impl Env for Darwin {
    const ENTRY_POINT: &str = "_main";

    const GLOBAL_PROLOGUE: &str = ".intel_syntax noprefix\n\n";

    const SECTION_TEXT: &str = "__TEXT,__text,regular,pure_instructions";

    const LOCAL_LABEL_PREFIX: &str = "L";

    const TAPE: &str = "_tape";
    const PUTCHAR: &str = "_putchar";
    const GETCHAR: &str = "_getchar";

    fn tape_declaration(size: usize) -> String {
        format!(".zerofill __DATA,__bss,{},{size},4", Self::TAPE)
    }
}

impl Env for Linux {
    const ENTRY_POINT: &str = "main";

    const GLOBAL_PROLOGUE: &str = concat!(
        ".intel_syntax noprefix\n",
        ".section .note.GNU-stack,\"\",@progbits\n\n",
    );

    const SECTION_TEXT: &str = ".text";

    const LOCAL_LABEL_PREFIX: &str = ".L";

    const TAPE: &str = "tape";
    const PUTCHAR: &str = "putchar@PLT";
    const GETCHAR: &str = "getchar@PLT";

    fn tape_declaration(size: usize) -> String {
        format!(".local {tape}\n.comm {tape},{size},16", tape = Self::TAPE)
    }
}

pub struct Darwin;

pub struct Linux;
