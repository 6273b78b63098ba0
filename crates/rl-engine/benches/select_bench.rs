//! Throughput of the select/reward loop.
//! Run with: cargo bench -p egreedy-rl-engine

use egreedy_core::types::EGreedyOptions;
use egreedy_rl_engine::EGreedy;

fn main() {
    let arms = 10;
    let options = EGreedyOptions::new().with_arms(arms).with_epsilon(0.1);
    let mut bandit = EGreedy::with_seed(options, 42).expect("valid bench options");

    // Warmup
    for _ in 0..1_000 {
        let arm = bandit.select();
        bandit.reward(arm, (arm % 2) as f64).expect("arm in range");
    }

    let iterations: u32 = 1_000_000;
    let start = std::time::Instant::now();

    for _ in 0..iterations {
        let arm = bandit.select();
        bandit.reward(arm, (arm % 2) as f64).expect("arm in range");
    }

    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations;

    println!("=== Select/Reward Benchmark ===");
    println!("Iterations:  {}", iterations);
    println!("Arms:        {}", arms);
    println!("Total time:  {:?}", elapsed);
    println!("Per round:   {:?}", per_iter);
    println!("Throughput:  {:.0} rounds/sec", iterations as f64 / elapsed.as_secs_f64());
}
