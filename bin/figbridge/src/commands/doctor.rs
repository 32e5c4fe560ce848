use figbridge_core::{Config, Paths};
use figbridge_tools::remote::discovery;
use figbridge_tools::ToolRegistry;

/// Run full environment diagnostics.
pub async fn run() -> anyhow::Result<()> {
    let paths = Paths::new();

    println!();
    println!("figbridge doctor — Environment Diagnostics");
    println!("==========================================");
    println!();

    let mut ok_count = 0u32;
    let mut warn_count = 0u32;
    let mut err_count = 0u32;

    // --- 1. Config ---
    println!("Configuration");
    let config_exists = paths.config_file().exists();
    if config_exists {
        print_ok(
            "Config file exists",
            &paths.config_file().display().to_string(),
        );
        ok_count += 1;
    } else {
        print_warn(
            "Config file not found",
            "Defaults will be used; create ~/.figbridge/config.json to customize",
        );
        warn_count += 1;
    }

    let config = Config::load_or_default(&paths)?;
    println!("  Debugging port: {}", config.remote.port);
    println!();

    // --- 2. Debugging endpoint ---
    println!("Debugging endpoint");
    let targets = discovery::fetch_targets(config.remote.port).await;
    if targets.is_empty() {
        print_err(
            &format!("No Figma tab on port {}", config.remote.port),
            &format!(
                "Start the browser with --remote-debugging-port={} and open a Figma document",
                config.remote.port
            ),
        );
        err_count += 1;
    } else {
        print_ok(
            &format!("{} Figma tab(s) discoverable", targets.len()),
            &targets[0].title,
        );
        ok_count += 1;
    }
    println!();

    // --- 3. REST credential ---
    println!("Figma REST API");
    if config.figma_api_token().is_some() {
        print_ok("API token configured", "comment tools available");
        ok_count += 1;
    } else {
        print_warn(
            "No API token",
            "figma_get_comments / figma_post_comment will fail; set FIGMA_API_TOKEN",
        );
        warn_count += 1;
    }
    println!();

    // --- 4. Tool catalog ---
    println!("Tools");
    let registry = ToolRegistry::with_defaults();
    print_ok(
        &format!("{} tools registered", registry.tool_names().len()),
        "use `figbridge tools list` for the catalog",
    );
    ok_count += 1;
    println!();

    println!(
        "Summary: {} ok, {} warnings, {} errors",
        ok_count, warn_count, err_count
    );
    println!();

    Ok(())
}

fn print_ok(title: &str, detail: &str) {
    println!("  [ok]   {} ({})", title, detail);
}

fn print_warn(title: &str, detail: &str) {
    println!("  [warn] {} — {}", title, detail);
}

fn print_err(title: &str, detail: &str) {
    println!("  [err]  {} — {}", title, detail);
}
