use criterion::{black_box, criterion_group, criterion_main, Criterion};
use soloword::planner::{MergePlanner, ProfileSegment};

fn leaves(n: usize) -> Vec<ProfileSegment> {
    let mut start = 0u64;
    (0..n)
        .map(|i| {
            // Uneven sizes so the DP has real decisions to make.
            let size = 1 + ((i * 2654435761) % 97) as u64;
            let seg = ProfileSegment {
                id: i as u64,
                start,
                end: start + size - 1,
                size,
            };
            start += size;
            seg
        })
        .collect()
}

fn bench_balanced(c: &mut Criterion) {
    for n in [64usize, 512] {
        let segs = leaves(n);
        c.bench_function(&format!("balanced_{}", n), |b| {
            b.iter(|| MergePlanner::balanced(black_box(&segs)).unwrap())
        });
    }
}

fn bench_io_optimal(c: &mut Criterion) {
    for n in [64usize, 256] {
        let segs = leaves(n);
        c.bench_function(&format!("io_optimal_{}", n), |b| {
            b.iter(|| MergePlanner::io_optimal(black_box(&segs)).unwrap())
        });
    }
}

criterion_group!(benches, bench_balanced, bench_io_optimal);
criterion_main!(benches);
