use super::Context;
use anyhow::Result;

pub fn status(context: &Context) -> Result<()> {
    let store = context.open_store()?;
    let runner = context.runner()?;

    let marker = runner.read_marker(&store)?;
    let pending = runner.plan(&store)?;

    println!("Store:  {}", context.store_path.display());
    println!(
        "Marker: {}",
        marker.map_or_else(|| "<none>".to_string(), |id| id.to_string())
    );

    if pending.is_empty() {
        println!("No pending migrations");
    } else {
        println!("Pending ({}):", pending.len());
        for id in pending {
            println!("  - {}", id);
        }
    }

    Ok(())
}

pub fn list(context: &Context) -> Result<()> {
    let runner = context.runner()?;

    for registered in runner.registry().iter() {
        println!("{}  {}", registered.id, registered.description());
    }

    Ok(())
}
