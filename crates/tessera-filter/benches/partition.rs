use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use tessera_filter::{partition_cells, FilterPredicateSet, GateRange, NameFilter, ProteinGate};
use tessera_model::CellTable;
use tessera_test_utils::{sample_cells, sample_metadata};

fn bench_partition(c: &mut Criterion) {
    let mut group = c.benchmark_group("partition_cells");
    let metadata = sample_metadata();

    let predicates = FilterPredicateSet::new()
        .with_name_filter(NameFilter::clusters(["1", "3"]))
        .with_protein_gate(ProteinGate::new(
            "CD4",
            "CD8",
            GateRange::new(1_000.0, 90_000.0, 90_000.0, 1_000.0),
        ))
        .with_umap_gate(GateRange::new(0.0, 80_000.0, 0.0, -80_000.0));

    for size in [10_000usize, 100_000] {
        let cells: CellTable = Arc::from(sample_cells(size));

        group.bench_with_input(BenchmarkId::new("sequential", size), &cells, |b, cells| {
            b.iter(|| partition_cells(black_box(cells), &metadata, &predicates, usize::MAX))
        });

        group.bench_with_input(BenchmarkId::new("parallel", size), &cells, |b, cells| {
            b.iter(|| partition_cells(black_box(cells), &metadata, &predicates, 0))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_partition);
criterion_main!(benches);
