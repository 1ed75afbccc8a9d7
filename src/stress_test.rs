use crys_engine::{Config, Crystalizer, Keep, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use std::time::{Duration, Instant};

/// Statistics collected during stress testing
#[derive(Clone, Debug)]
pub struct StressTestStats {
    pub lineages: usize,
    pub rounds: usize,
    pub total_shards: usize,
    pub total_time: Duration,
    pub avg_harden_time: Duration,
    pub shards_per_second: f64,
}

impl StressTestStats {
    pub fn print(&self) {
        println!("\n╔════════════════════════════════════════════════════════════╗");
        println!("║              Stress Test Statistics                         ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║  Lineages:                  {:>30} ║", self.lineages);
        println!("║  Rounds per Lineage:        {:>30} ║", self.rounds);
        println!("║  Total Shards:              {:>30} ║", self.total_shards);
        println!("║  Total Time:                {:>29}s ║", format!("{:.3}", self.total_time.as_secs_f64()));
        println!("║  Average Harden Time:       {:>28}µs ║", format!("{:.2}", self.avg_harden_time.as_secs_f64() * 1_000_000.0));
        println!("║  Shards/Second:             {:>30.0} ║", self.shards_per_second);
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

fn sum(acc: i64, shard: &Value) -> i64 {
    acc + shard["value"].as_i64().unwrap_or(0)
}

fn random_keep(rng: &mut StdRng) -> Keep<Value> {
    match rng.gen_range(0..4) {
        0 => Keep::All,
        1 => Keep::Count(rng.gen_range(0..64)),
        2 => Keep::Max(vec![Keep::Count(rng.gen_range(0..16)), Keep::first(|s: &Value| s["id"].as_u64() == Some(7))]),
        _ => Keep::Min(vec![Keep::Count(rng.gen_range(16..64)), Keep::All]),
    }
}

/// Random appends, removals and head moves across independent lineages.
/// Every lineage checks its folded total against a plain running sum.
pub fn stress_test_lineages(lineages: usize, rounds: usize, batch: usize) -> StressTestStats {
    let mut rng = StdRng::seed_from_u64(42);
    let mut harden_times = Vec::new();
    let mut total_shards = 0;
    let start = Instant::now();

    for _ in 0..lineages {
        let config = Config::builder(0, sum)
            .keep(random_keep(&mut rng))
            .build()
            .expect("valid stress config");
        let mut c = Crystalizer::new(config);
        let mut expected = 0i64;
        let mut next_id = 0u64;

        for _ in 0..rounds {
            let size = rng.gen_range(1..=batch);
            let shards: Vec<Value> = (0..size)
                .map(|_| {
                    let value = rng.gen_range(-10..10);
                    expected += value;
                    next_id += 1;
                    json!({ "id": next_id, "value": value })
                })
                .collect();
            total_shards += shards.len();
            c = c.with_all(shards);

            let started = Instant::now();
            c = c.harden().expect("harden");
            harden_times.push(started.elapsed());

            assert_eq!(c.as_crystal().expect("as_crystal"), expected);

            if rng.gen_bool(0.1) {
                // Peek into the past without writing there.
                let peek = c.with_head_at(-rng.gen_range(0..4)).harden().expect("peek");
                peek.as_crystal().expect("peek crystal");
            }
        }
    }

    tracing::info!(lineages, rounds, total_shards, "lineage stress test finished");
    build_stats(lineages, rounds, total_shards, start.elapsed(), &harden_times)
}

/// A focused lineage that keeps appending while the focus stays put.
pub fn stress_test_focus(rounds: usize, batch: usize) -> StressTestStats {
    let mut rng = StdRng::seed_from_u64(7);
    let mut harden_times = Vec::new();
    let mut total_shards = 0;
    let start = Instant::now();

    let config = Config::builder(0, sum)
        .keep(Keep::Count(8))
        .build()
        .expect("valid stress config");
    let mut c = Crystalizer::new(config)
        .with_all((0..batch as u64).map(|id| json!({ "id": id, "value": 1 })))
        .focus(|s: &Value| s["id"].as_u64() == Some(3));
    let mut next_id = batch as u64;

    for _ in 0..rounds {
        let size = rng.gen_range(1..=batch) as u64;
        c = c.with_all((next_id..next_id + size).map(|id| json!({ "id": id, "value": 1 })));
        next_id += size;
        total_shards += size as usize;

        let started = Instant::now();
        c = c.harden().expect("harden");
        harden_times.push(started.elapsed());

        let last = c.last().expect("last");
        assert_eq!(last.and_then(|s| s["id"].as_u64()), Some(3));
    }

    tracing::info!(rounds, total_shards, "focus stress test finished");
    build_stats(1, rounds, total_shards, start.elapsed(), &harden_times)
}

/// Time a single harden over logs of doubling size.
pub fn stress_test_scaling(steps: u32, factor: usize) {
    let mut size = 1usize;
    for _ in 0..steps {
        match time_single_harden(size) {
            Ok(elapsed) => println!("  {:>10} shards  {:>12.3} ms", size, elapsed.as_secs_f64() * 1000.0),
            Err(e) => println!("  {:>10} shards  failed: {}", size, e),
        }
        size = size.saturating_mul(factor);
        if size > 1 << 20 {
            break;
        }
    }
}

fn time_single_harden(size: usize) -> Result<Duration> {
    let config = Config::builder(0, sum).keep(Keep::Count(size / 2)).build()?;
    let c = Crystalizer::new(config).with_all((0..size).map(|id| json!({ "id": id, "value": 1 })));

    let started = Instant::now();
    let c = c.harden()?;
    c.as_crystal()?;
    Ok(started.elapsed())
}

fn build_stats(
    lineages: usize,
    rounds: usize,
    total_shards: usize,
    total_time: Duration,
    harden_times: &[Duration],
) -> StressTestStats {
    let avg_harden_time = if harden_times.is_empty() {
        Duration::ZERO
    } else {
        harden_times.iter().sum::<Duration>() / harden_times.len() as u32
    };

    StressTestStats {
        lineages,
        rounds,
        total_shards,
        total_time,
        avg_harden_time,
        shards_per_second: total_shards as f64 / total_time.as_secs_f64().max(f64::EPSILON),
    }
}
