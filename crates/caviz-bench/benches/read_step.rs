//! Criterion benchmarks for index loading and whole-step reads.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use caviz_bench::{reference_profile, stress_profile, Profile};
use caviz_core::StepId;
use caviz_stage::{DataFormat, LoadPolicy, Stage, StageReader};

fn bench_read(c: &mut Criterion, name: &str, profile: &Profile) {
    let stage = profile.run.load_stage();
    let reader = StageReader::new(&stage, profile.run.config()).unwrap();
    let steps = reader.available_steps().unwrap();
    let mut grid = profile.grid();

    c.bench_function(name, |b| {
        let mut i = 0;
        b.iter(|| {
            let step = steps[i % steps.len()];
            i += 1;
            let frame = reader.read_step(black_box(step), &mut grid).unwrap();
            black_box(frame.lines.len());
        });
    });
}

fn bench_read_text(c: &mut Criterion) {
    let profile = reference_profile(DataFormat::Text).unwrap();
    bench_read(c, "read_step_text_2x2", &profile);
}

fn bench_read_binary(c: &mut Criterion) {
    let profile = reference_profile(DataFormat::Binary).unwrap();
    bench_read(c, "read_step_binary_2x2", &profile);
}

fn bench_read_stress(c: &mut Criterion) {
    let profile = stress_profile(DataFormat::Binary).unwrap();
    bench_read(c, "read_step_binary_4x4", &profile);
}

fn bench_load_all(c: &mut Criterion) {
    let profile = stress_profile(DataFormat::Text).unwrap();
    let config = profile.run.config();

    c.bench_function("load_all_4x4", |b| {
        b.iter(|| {
            let mut stage = Stage::prepare(config.node_x, config.node_y);
            let report = stage.load_all(config, LoadPolicy::AbortOnError).unwrap();
            black_box(report.loaded.len());
        });
    });
}

fn bench_single_step(c: &mut Criterion) {
    let profile = reference_profile(DataFormat::Text).unwrap();
    let stage = profile.run.load_stage();
    let reader = StageReader::new(&stage, profile.run.config()).unwrap();
    let mut grid = profile.grid();

    c.bench_function("read_first_step_text_2x2", |b| {
        b.iter(|| {
            reader.read_step(StepId(0), &mut grid).unwrap();
        });
    });
}

criterion_group!(
    benches,
    bench_read_text,
    bench_read_binary,
    bench_read_stress,
    bench_load_all,
    bench_single_step
);
criterion_main!(benches);
