use criterion::*;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use thrasher::{Chain, ChainWalk, Geometry, MmapProvisioner, Provision, SequentialWalk, Traversal};

// Small enough to iterate quickly, large enough to leave a typical L2
fn geometry() -> Geometry {
    Geometry {
        cache_bytes: 1 << 20,
        line_size: 64,
        multiplier: 4,
    }
}

fn bench_pass(c: &mut Criterion) {
    let g = geometry();
    let mut group = c.benchmark_group("pass");
    group.throughput(Throughput::Bytes(g.region_bytes() as u64));

    group.bench_function(BenchmarkId::new("sequential", g.region_bytes()), |b| {
        let mut region = MmapProvisioner.provision(&g).unwrap();
        let mut walk = SequentialWalk::new(region.bytes_mut(), g.line_size);
        b.iter(|| black_box(walk.pass()))
    });

    group.bench_function(BenchmarkId::new("random", g.region_bytes()), |b| {
        let mut region = MmapProvisioner.provision(&g).unwrap();
        let mut rng = SmallRng::seed_from_u64(0);
        let chain = Chain::shuffled(&mut region, &mut rng).unwrap();
        let mut walk = ChainWalk::new(chain);
        b.iter(|| black_box(walk.pass()))
    });

    group.finish();
}

fn bench_shuffle(c: &mut Criterion) {
    let g = geometry();
    let mut group = c.benchmark_group("shuffle");

    group.bench_function(BenchmarkId::new("chain", g.lines()), |b| {
        let mut region = MmapProvisioner.provision(&g).unwrap();
        let mut rng = SmallRng::seed_from_u64(0);
        b.iter(|| {
            let chain = Chain::shuffled(&mut region, &mut rng).unwrap();
            black_box(chain.next(0))
        })
    });

    group.finish();
}

criterion_group!(benches, bench_pass, bench_shuffle);
criterion_main!(benches);
