use claimguard_core::core_region::{
    BlockAction, ClaimLimits, ManagerSettings, MemoryRegionStore, PlayerId, ProtectionContext,
    RegionManager, WorldCoordinate, WorldId,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use std::time::Duration;

const NO_TIERS: &[&str] = &[];

fn at(world: &str, x: i32, z: i32) -> WorldCoordinate {
    WorldCoordinate::new(WorldId::new(world), x, 64, z)
}

/// `count` non-overlapping claims laid out on a grid, split over two worlds
fn populated(count: usize) -> ProtectionContext {
    let settings = ManagerSettings {
        default_radius: 10,
        default_limit: None,
        ..ManagerSettings::default()
    };
    let manager = RegionManager::new(Arc::new(MemoryRegionStore::new()), settings);
    let ctx = ProtectionContext::new(Arc::new(manager), ClaimLimits::default(), None);

    for i in 0..count {
        let world = if i % 2 == 0 { "overworld" } else { "nether" };
        let x = (i as i32 % 100) * 25;
        let z = (i as i32 / 100) * 25;
        let owner = PlayerId::new(format!("player-{}", i));
        ctx.claim(&owner, at(world, x, z), NO_TIERS).unwrap();
    }
    ctx
}

fn bench_region_at(c: &mut Criterion) {
    let mut group = c.benchmark_group("region_at");
    group.measurement_time(Duration::from_secs(5));

    for count in [10usize, 100, 1000] {
        let ctx = populated(count);
        group.throughput(Throughput::Elements(1));

        group.bench_with_input(BenchmarkId::new("anchor", count), &count, |b, _| {
            let anchor = at("overworld", 0, 0);
            b.iter(|| black_box(ctx.manager().region_at(black_box(&anchor))));
        });

        group.bench_with_input(BenchmarkId::new("inside", count), &count, |b, _| {
            let inside = at("overworld", 4, -3);
            b.iter(|| black_box(ctx.manager().region_at(black_box(&inside))));
        });

        group.bench_with_input(BenchmarkId::new("miss", count), &count, |b, _| {
            let wilderness = at("overworld", -5000, -5000);
            b.iter(|| black_box(ctx.manager().region_at(black_box(&wilderness))));
        });
    }

    group.finish();
}

fn bench_check_block_action(c: &mut Criterion) {
    let mut group = c.benchmark_group("check_block_action");
    let ctx = populated(1000);
    let owner = PlayerId::new("player-0");
    let stranger = PlayerId::new("stranger");
    let target = at("overworld", 3, 3);

    group.bench_function("owner", |b| {
        b.iter(|| black_box(ctx.check_block_action(&owner, &target, BlockAction::Break, false)));
    });
    group.bench_function("stranger", |b| {
        b.iter(|| black_box(ctx.check_block_action(&stranger, &target, BlockAction::Break, false)));
    });

    group.finish();
}

criterion_group!(benches, bench_region_at, bench_check_block_action);
criterion_main!(benches);
