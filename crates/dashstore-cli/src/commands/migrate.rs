use super::Context;
use anyhow::Result;

pub fn run(context: &Context) -> Result<()> {
    let mut store = context.open_store()?;
    let mut runner = context.runner()?;

    let report = runner.run(&mut store)?;

    if report.is_noop() {
        println!("✅ Store is up to date");
        return Ok(());
    }

    for id in &report.applied {
        println!("  ✓ {}", id);
    }
    println!(
        "✅ Applied {} migration(s) to {}",
        report.applied.len(),
        context.store_path.display()
    );

    Ok(())
}
