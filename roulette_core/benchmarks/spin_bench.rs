use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use roulette_core::{Catalog, GeneratorOptions, KillValidator, Ruleset, SpinGenerator};

fn bench_generate(c: &mut Criterion) {
    let catalog = Catalog::builtin();
    let mut group = c.benchmark_group("spin_generate");

    for mission in catalog.iter() {
        group.bench_with_input(
            BenchmarkId::new("default", &mission.codename),
            mission,
            |b, mission| {
                let mut generator = SpinGenerator::with_seed(0x5eed);
                generator.set_mission(mission.clone());
                b.iter(|| generator.generate().expect("generate"));
            },
        );

        group.bench_with_input(
            BenchmarkId::new("distinct", &mission.codename),
            mission,
            |b, mission| {
                let mut generator = SpinGenerator::with_seed(0x5eed);
                generator.set_ruleset(Ruleset {
                    enable_extreme: true,
                    ..Ruleset::default()
                });
                generator.set_options(GeneratorOptions {
                    distinct_conditions: true,
                    ..GeneratorOptions::default()
                });
                generator.set_mission(mission.clone());
                b.iter(|| generator.generate().expect("generate"));
            },
        );
    }

    group.finish();
}

fn bench_reroll_and_validate(c: &mut Criterion) {
    let catalog = Catalog::builtin();
    let mission = catalog.get("Berlin").expect("builtin mission").clone();
    let mut generator = SpinGenerator::with_seed(11);
    generator.set_mission(mission.clone());
    let spin = generator.generate().expect("generate");

    c.bench_function("spin_regenerate_target/Berlin", |b| {
        b.iter_batched(
            || spin.clone(),
            |mut spin| {
                for target in mission.target_ids() {
                    generator
                        .regenerate_target(&mut spin, target)
                        .expect("reroll");
                }
                spin
            },
            BatchSize::SmallInput,
        );
    });

    c.bench_function("kill_validation_text/Berlin", |b| {
        let mut validator = KillValidator::new();
        validator.reset(spin.len());
        b.iter(|| validator.kill_validation_text(&spin));
    });
}

criterion_group!(spin_benches, bench_generate, bench_reroll_and_validate);
criterion_main!(spin_benches);
