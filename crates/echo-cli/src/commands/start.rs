use std::sync::Arc;

use tracing::info;

use echo_channels::discord::DiscordChannel;
use echo_chronicle::ChronicleStore;
use echo_config::EchoConfig;
use echo_core::EchoError;
use echo_runtime::{Dispatcher, EchoRuntime};

pub(super) async fn cmd_start(config: EchoConfig) -> echo_core::Result<()> {
    let token = config
        .gateway
        .token
        .clone()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| {
            EchoError::Config(
                "no Discord token configured. Set gateway.token in echo.toml or export DISCORD_TOKEN"
                    .into(),
            )
        })?;

    println!("Echo v{}", env!("CARGO_PKG_VERSION"));
    println!("   Chronicle: {}", config.chronicle.db_path.display());
    match &config.oracle.api_url {
        Some(url) => println!("   Time oracle: {url}"),
        None => println!("   Time oracle: not configured (!time will report an error)"),
    }
    println!();

    // Without the Chronicle there is nothing to serve.
    let store = ChronicleStore::from_config(&config.chronicle)?;
    info!(entries = store.count()?, "chronicle ready");

    let dispatcher = Arc::new(Dispatcher::from_config(&config, store)?);
    let mut runtime = EchoRuntime::new(dispatcher);
    runtime.add_channel(Box::new(DiscordChannel::new(
        "discord".into(),
        token,
        config.gateway.intents,
    )));

    // Blocks until Ctrl+C
    runtime.run().await
}
