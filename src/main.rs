use stress_test::{soak_churn, soak_reconcile, SoakStats};

fn main() {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(err) => {
            eprintln!("failed to start runtime: {err}");
            std::process::exit(2);
        }
    };
    let passed = rt.block_on(async_main());
    if !passed {
        std::process::exit(1);
    }
}

async fn async_main() -> bool {
    tmir_sdk::init_tracing("warn");

    println!("\n\n╔════════════════════════════════════════════════════════════╗");
    println!("║            TABLEMIRROR SOAK TESTS                          ║");
    println!("║  Started {:<50}║", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
    println!("╚════════════════════════════════════════════════════════════╝");

    let mut results: Vec<SoakStats> = Vec::new();

    // Test 1: few tables, short run
    results.push(soak_reconcile(4, 2_000).await);

    // Test 2: many tables, long run
    results.push(soak_reconcile(32, 50_000).await);

    // Test 3: connection churn
    results.push(soak_churn(200, 25).await);

    for stats in &results {
        stats.print();
    }

    let failed = results.iter().filter(|s| !s.passed()).count();
    if failed == 0 {
        println!("\n✓ All soak tests completed successfully!");
        true
    } else {
        println!("\n✗ {failed} soak test(s) reported invariant violations");
        false
    }
}
