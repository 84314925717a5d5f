//! Benchmarks for the adaptive-specialization pipeline.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use acr::instrument::classify_dimensions;
use acr::options::{
    Alternative, AlternativeKind, CParam, InitSignature, KernelOptions, MonitorSpec,
    Reduction, Selector, Strategy,
};
use acr::runtime::{classify_tiles, specialize, StrategyTable, TileGrid};
use acr::scop::Scop;

const SCOP_TEXT: &str = "\
context: [N] -> { : N >= 1 }
statement S0:
  domain: [N] -> { S0[i, j] : 0 <= i < N and 0 <= j < N }
  schedule: [N] -> { S0[i, j] -> [i, j] }
  body: A[i][j] = solve(A, i, j, N);
";

fn options() -> KernelOptions {
    KernelOptions {
        prefix: "bench".to_string(),
        grid_size: 8,
        init: InitSignature {
            return_type: "void".to_string(),
            name: "bench_init".to_string(),
            params: vec![
                CParam { ctype: "double**".to_string(), name: "A".to_string() },
                CParam { ctype: "int".to_string(), name: "N".to_string() },
            ],
        },
        monitor: MonitorSpec {
            array: "A".to_string(),
            dims: vec!["i".to_string(), "j".to_string()],
            extents: vec!["N".to_string(), "N".to_string()],
            reduction: Reduction::Max,
            filter: None,
        },
        alternatives: vec![
            Alternative {
                name: "exact".to_string(),
                kind: AlternativeKind::Function {
                    from: "solve".to_string(),
                    to: "solve".to_string(),
                },
            },
            Alternative {
                name: "approx".to_string(),
                kind: AlternativeKind::Function {
                    from: "solve".to_string(),
                    to: "solve_approx".to_string(),
                },
            },
        ],
        strategies: vec![
            Strategy { selector: Selector::Range(0, 127), alternative: "exact".to_string() },
            Strategy { selector: Selector::Range(128, 255), alternative: "approx".to_string() },
        ],
    }
}

/// Benchmark scop parsing speed.
fn bench_scop_parsing(c: &mut Criterion) {
    c.bench_function("parse_scop", |b| {
        b.iter(|| Scop::parse(black_box(SCOP_TEXT)).unwrap())
    });
}

/// Benchmark grid construction (paid once at init).
fn bench_grid_build(c: &mut Criterion) {
    c.bench_function("tile_grid_64x64_g8", |b| {
        b.iter(|| TileGrid::new(black_box(&[64, 64]), 8).unwrap())
    });
}

/// Benchmark a full classification cycle on a mixed buffer.
fn bench_classification(c: &mut Criterion) {
    let opts = options();
    let table = StrategyTable::build(&opts).unwrap();
    let grid = TileGrid::new(&[64, 64], 8).unwrap();
    let buffer: Vec<u8> = (0..grid.total_cells()).map(|i| (i % 256) as u8).collect();
    c.bench_function("classify_64x64_g8", |b| {
        b.iter(|| {
            classify_tiles(&grid, &table, Reduction::Max, black_box(&buffer)).unwrap()
        })
    });
}

/// Benchmark domain specialization from a fixed classification.
fn bench_specialization(c: &mut Criterion) {
    let scop = Scop::parse(SCOP_TEXT).unwrap();
    let opts = options();
    let analysis = classify_dimensions(&scop, &opts).unwrap();
    let table = StrategyTable::build(&opts).unwrap();
    let grid = TileGrid::new(&[32, 32], 8).unwrap();
    let buffer: Vec<u8> = (0..grid.total_cells()).map(|i| (i % 256) as u8).collect();
    let unions = classify_tiles(&grid, &table, Reduction::Max, &buffer).unwrap();
    c.bench_function("specialize_32x32_g8", |b| {
        b.iter(|| specialize(&scop, &analysis, &opts, black_box(&unions)))
    });
}

criterion_group!(
    benches,
    bench_scop_parsing,
    bench_grid_build,
    bench_classification,
    bench_specialization
);
criterion_main!(benches);
