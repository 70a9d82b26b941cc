use brain::{
    builder,
    codegen::{self, CompileOptions, OptLevel, Target},
    contract::EofPolicy,
    interp,
};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

static HELLO: &str = include_str!("../../programs/hello.bf");
static DIGITS: &str = include_str!("../../programs/digits.bf");

fn criterion_benchmark(c: &mut Criterion) {
    let hello = builder::build(HELLO.as_bytes()).unwrap();
    let digits = builder::build(DIGITS.as_bytes()).unwrap();

    c.bench_function("interp hello", |b| {
        b.iter(|| interp::run(black_box(&hello), b"", EofPolicy::Zero).unwrap());
    });
    c.bench_function("interp digits", |b| {
        b.iter(|| interp::run(black_box(&digits), b"", EofPolicy::Zero).unwrap());
    });

    let mut buf = Vec::with_capacity(64 * 1024);
    for opt_level in [OptLevel::O0, OptLevel::O2] {
        let options = CompileOptions {
            opt_level,
            eof: EofPolicy::Zero,
        };
        c.bench_function(&format!("codegen hello {opt_level}"), |b| {
            b.iter(|| {
                buf.clear();
                codegen::generate(&mut buf, Target::x86_64_linux, &options, black_box(&hello))
                    .unwrap();
            });
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
