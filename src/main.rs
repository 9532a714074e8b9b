use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use statehive::demo::{self, Shop};
use statehive::logging::init_tracing;
use statehive::StoreOptions;

#[derive(Parser, Debug)]
#[command(name = "statehive", version, about = "Run the shopping-cart store scenario")]
struct Cli {
    /// Report state writes made outside mutations.
    #[arg(long)]
    strict: bool,

    /// Store options file (TOML). Defaults to the user config directory.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log filter directive, e.g. `debug` or `statehive=trace`.
    #[arg(long, value_name = "FILTER", default_value = "info")]
    log: String,

    /// Simulated shop latency in milliseconds.
    #[arg(long, default_value_t = 100)]
    latency_ms: u64,

    /// Make the shop reject the checkout.
    #[arg(long)]
    fail_checkout: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log);

    let mut options = match &cli.config {
        Some(path) => StoreOptions::load_from(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => StoreOptions::load().context("loading store options")?,
    };
    if cli.strict {
        options.strict = true;
    }

    let shop = Shop::new(Duration::from_millis(cli.latency_ms)).reject_checkout(cli.fail_checkout);
    let store = demo::build_store(shop, options)?;

    match demo::run(&store).await {
        Ok(status) => tracing::info!(%status, "checkout finished"),
        Err(err) => tracing::error!(error = %format!("{:#}", err), "checkout failed"),
    }

    for diagnostic in store.diagnostics().snapshot() {
        tracing::warn!(error_type = diagnostic.error.error_type(), "{}", diagnostic.error);
    }

    println!("{}", serde_json::to_string_pretty(&store.state())?);
    Ok(())
}
