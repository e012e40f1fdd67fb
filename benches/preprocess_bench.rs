//! Preprocessing, hashing and key construction throughput.
#![allow(missing_docs, unused_results, clippy::unwrap_used)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use feviz_gl::cache::{hash_sources, ProgramRequest};
use feviz_gl::shader::{ShaderPreprocessor, Substitutions};

const SHAPE: &str = "\
{include interpolation.inc}
uniform samplerBuffer coefficients;
const int ORDER = {ORDER};
const int COMPONENTS = {COMPONENTS};
void main() {
    float v = evaluate(ORDER, COMPONENTS);
}
";

fn shader_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("mesh.vert"), SHAPE.repeat(20)).unwrap();
    std::fs::write(
        dir.path().join("interpolation.inc"),
        "float evaluate(int order, int comps) { return {ORDER}.0; }\n".repeat(50),
    )
    .unwrap();
    dir
}

fn preprocess_benchmark(c: &mut Criterion) {
    let dir = shader_dir();
    let mut pre = ShaderPreprocessor::new(dir.path());
    let subs = Substitutions::new().with("ORDER", 3).with("COMPONENTS", 1);

    c.bench_function("read_source_with_rescan", |b| {
        b.iter(|| black_box(pre.read_source(black_box("mesh.vert"), &subs).unwrap()))
    });

    let code = SHAPE.repeat(20);
    c.bench_function("preprocess_str", |b| {
        b.iter(|| black_box(pre.preprocess_str(black_box(&code), &subs)))
    });
}

fn hash_benchmark(c: &mut Criterion) {
    let dir = shader_dir();
    let mut pre = ShaderPreprocessor::new(dir.path());
    let subs = Substitutions::new().with("ORDER", 3).with("COMPONENTS", 1);
    let sources = vec![pre.load("mesh.vert", &subs).unwrap()];

    c.bench_function("hash_sources", |b| {
        b.iter(|| black_box(hash_sources(black_box(&sources), Some("vendor|renderer|4.6"))))
    });

    let request = ProgramRequest::new(["mesh.vert", "mesh.frag", "mesh.geom"])
        .with_feedback(["position", "index"])
        .with_substitution("ORDER", 3)
        .with_substitution("COMPONENTS", 1);
    c.bench_function("program_key", |b| b.iter(|| black_box(request.key())));
}

criterion_group!(benches, preprocess_benchmark, hash_benchmark);
criterion_main!(benches);
