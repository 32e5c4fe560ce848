use figbridge_core::{Config, Paths};
use figbridge_tools::remote::discovery;

/// Print the current discovery listing.
pub async fn run(port: Option<u16>) -> anyhow::Result<()> {
    let paths = Paths::new();
    let mut config = Config::load_or_default(&paths)?;
    if let Some(port) = port {
        config.remote.port = port;
    }
    let port = config.remote.port;

    let targets = discovery::fetch_targets(port).await;
    if targets.is_empty() {
        println!("No Figma tabs found on port {}.", port);
        println!(
            "Start the browser with --remote-debugging-port={} and open a Figma document.",
            port
        );
        return Ok(());
    }

    println!("Figma tabs on port {} ({} found):", port, targets.len());
    for (i, t) in targets.iter().enumerate() {
        println!("  {}. [{}] {}", i + 1, t.id, t.title);
        println!("     {}", t.url);
    }
    Ok(())
}
