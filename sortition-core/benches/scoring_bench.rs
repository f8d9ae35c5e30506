//! Criterion benchmarks for the scoring hot path.
//!
//! Benchmarks:
//! 1. Scoring a panel of 50 against four variables
//! 2. Building a candidate pool of 2000 records
//! 3. Drawing index sets from per-iteration seeds

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use sortition_core::{
    CandidatePoolBuilder, DegeneratePolicy, Individual, ListKind, PopulationProfile, ProfileRow,
    RawTable, RecordSchema, DrawSeeds, Scorer, DEFAULT_FRACTION_TOLERANCE,
};

// ── Helpers ──────────────────────────────────────────────────────────

const VARIABLES: [&str; 4] = ["Køn", "Etnicitet", "Uddannelse", "Alder"];

fn make_profile() -> PopulationProfile {
    let rows = vec![
        ProfileRow::new("Køn", "Mand", 0.49),
        ProfileRow::new("Køn", "Kvinde", 0.51),
        ProfileRow::new("Etnicitet", "Dansk", 0.84),
        ProfileRow::new("Etnicitet", "Vestlig", 0.06),
        ProfileRow::new("Etnicitet", "Ikke-vestlig", 0.10),
        ProfileRow::new("Uddannelse", "Grundskole", 0.25),
        ProfileRow::new("Uddannelse", "Gymnasial", 0.10),
        ProfileRow::new("Uddannelse", "Erhvervsfaglig", 0.30),
        ProfileRow::new("Uddannelse", "Videregående", 0.35),
        ProfileRow::new("Alder", "18-24", 0.11),
        ProfileRow::new("Alder", "25-34", 0.16),
        ProfileRow::new("Alder", "35-49", 0.23),
        ProfileRow::new("Alder", "50-64", 0.24),
        ProfileRow::new("Alder", "65-79", 0.19),
        ProfileRow::new("Alder", "80+", 0.07),
    ];
    PopulationProfile::from_rows(rows, DEFAULT_FRACTION_TOLERANCE).unwrap()
}

fn make_table(n: usize) -> RawTable {
    let sex = ["Mand", "Kvinde"];
    let eth = ["Dansk", "Vestlig", "Ikke-vestlig"];
    let edu = ["Grundskole", "Gymnasial", "Erhvervsfaglig", "Videregående"];
    let headers = ["Navn", "Køn", "Etnicitet", "Uddannelse", "Alder"]
        .iter()
        .map(|h| h.to_string())
        .collect();
    let rows = (0..n)
        .map(|i| {
            vec![
                format!("person-{i}"),
                sex[i % 2].to_string(),
                eth[(i / 2) % 3].to_string(),
                edu[(i / 3) % 4].to_string(),
                (18 + (i * 7) % 75).to_string(),
            ]
        })
        .collect();
    RawTable::new(headers, rows)
}

fn setup(n: usize) -> (PopulationProfile, RecordSchema, RawTable) {
    let profile = make_profile();
    let table = make_table(n);
    let schema = RecordSchema::new(&table.headers, &profile, &VARIABLES, "Alder").unwrap();
    (profile, schema, table)
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_scoring(c: &mut Criterion) {
    let (profile, schema, table) = setup(50);
    let sample: Vec<Individual> = schema.convert(&table, ListKind::Sample).unwrap();
    let scorer = Scorer::new(&profile, &schema, &VARIABLES, DegeneratePolicy::Abort).unwrap();

    c.bench_function("score_panel_50x4", |b| {
        b.iter(|| black_box(scorer.score(black_box(&sample))))
    });
}

fn bench_pool_build(c: &mut Criterion) {
    let (_, schema, table) = setup(2000);
    let always = RawTable::new(table.headers.clone(), table.rows[..5].to_vec());
    let veto = RawTable::new(table.headers.clone(), table.rows[5..20].to_vec());

    c.bench_function("pool_build_2000", |b| {
        b.iter(|| {
            CandidatePoolBuilder::new(&schema)
                .build(black_box(&table), &always, &veto, 50)
                .unwrap()
        })
    });
}

fn bench_draws(c: &mut Criterion) {
    let seeds = DrawSeeds::new(42);
    let mut group = c.benchmark_group("draw_indices");
    for pool_size in [500usize, 5000] {
        group.bench_with_input(BenchmarkId::from_parameter(pool_size), &pool_size, |b, &n| {
            let mut iteration = 0u64;
            b.iter(|| {
                iteration += 1;
                black_box(seeds.draw(iteration, n, 45))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_scoring, bench_pool_build, bench_draws);
criterion_main!(benches);
