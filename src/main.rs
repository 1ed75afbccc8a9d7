use stress_test::{stress_test_focus, stress_test_lineages, stress_test_scaling};
use tracing_subscriber::EnvFilter;
pub mod stress_test;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    println!("\n\n╔════════════════════════════════════════════════════════════╗");
    println!("║            CRYSTALIZER STRESS TESTS                        ║");
    println!("╚════════════════════════════════════════════════════════════╝");

    // Test 1: a few lineages, small batches
    let stats = stress_test_lineages(4, 100, 8);
    stats.print();

    // Test 2: more lineages, larger batches
    let stats = stress_test_lineages(10, 500, 32);
    stats.print();

    // Test 3: focus pointer under churn
    let stats = stress_test_focus(200, 16);
    stats.print();

    // Test 4: scaling analysis
    println!("\n\n╔════════════════════════════════════════════════════════════╗");
    println!("║          SCALING ANALYSIS (Keep::Count)                    ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    stress_test_scaling(20, 2);

    println!("\n✓ All stress tests completed successfully!");
}
