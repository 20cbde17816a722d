use aquarium_core::{AquariumConfig, Catalog, Entity, Vector2, World};
use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use std::time::Duration;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse::<T>().ok())
        .unwrap_or(default)
}

fn bench_world_steps(c: &mut Criterion) {
    let mut group = c.benchmark_group("world_step");
    group.sample_size(env_or("AQ_BENCH_SAMPLES", 30usize).max(10));
    group.warm_up_time(Duration::from_secs(env_or("AQ_BENCH_WARMUP_SECS", 2)));
    group.measurement_time(Duration::from_secs(env_or("AQ_BENCH_MEASURE_SECS", 10)));
    let steps: usize = env_or("AQ_BENCH_STEPS", 64usize).max(1);
    let populations: Vec<usize> = std::env::var("AQ_BENCH_FISH")
        .ok()
        .map(|s| {
            s.split(',')
                .filter_map(|t| t.trim().parse::<usize>().ok())
                .collect::<Vec<_>>()
        })
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| vec![20_usize, 200, 1000]);

    for &fish in &populations {
        group.bench_function(format!("steps{steps}_fish{fish}"), |b| {
            b.iter_batched(
                || {
                    let config = AquariumConfig {
                        width: 1280.0,
                        height: 960.0,
                        rng_seed: Some(0xBEEF),
                        max_fishes: fish,
                        history_capacity: 1,
                        ..AquariumConfig::default()
                    };
                    let mut world = World::new(config, Catalog::default()).expect("world");
                    world.populate();
                    for _ in 0..fish {
                        let entity = world.create_default_fish().expect("fish");
                        world.add_entity(entity);
                    }
                    for i in 0..fish / 4 {
                        let x = (i as f32 * 37.0) % 1200.0 - 600.0;
                        world.add_entity(Entity::food(Vector2::new(x, -400.0), 25.0, 3.0));
                    }
                    world
                },
                |mut world| {
                    for _ in 0..steps {
                        world.step();
                        world.render();
                    }
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_world_steps);
criterion_main!(benches);
