use stress_test::{stress_test_counter, stress_test_scaling, stress_test_text};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn std::error::Error>> {
    println!("\n\n╔════════════════════════════════════════════════════════════╗");
    println!("║            SESSION CONVERGENCE STRESS TESTS                 ║");
    println!("╚════════════════════════════════════════════════════════════╝");

    let mut diverged = 0;

    // Test 1: text edits, small scale
    let stats = stress_test_text(3, 50, 7).await?;
    stats.print();
    diverged += usize::from(!stats.converged);

    // Test 2: text edits, medium scale
    let stats = stress_test_text(8, 150, 42).await?;
    stats.print();
    diverged += usize::from(!stats.converged);

    // Test 3: concurrent counter tasks
    let stats = stress_test_counter(6, 200).await?;
    stats.print();
    diverged += usize::from(!stats.converged);

    // Test 4: scaling analysis
    stress_test_scaling(12, 3).await?;

    tracing::info!(diverged, "stress runs finished");
    if diverged > 0 {
        return Err(format!("{} stress runs diverged", diverged).into());
    }
    println!("\n✓ All stress tests completed successfully!");
    Ok(())
}
