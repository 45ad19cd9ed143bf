use std::sync::Arc;

use echo_channels::console::ConsoleChannel;
use echo_chronicle::ChronicleStore;
use echo_config::EchoConfig;
use echo_runtime::{Dispatcher, EchoRuntime};

/// Run the dispatcher against stdin/stdout. Uses the same Chronicle and
/// collaborators as `start`, so entries logged here show up on Discord.
pub(super) async fn cmd_chat(config: EchoConfig) -> echo_core::Result<()> {
    let author = ConsoleChannel::local_author();

    println!("Echo Interactive Chat");
    println!("   Chatting as {}", author.display);
    println!("   Try !ping, !log <message>, !recall [n], !scrape <url>, !time <zone>");
    println!("   Ctrl+D or Ctrl+C to quit");
    println!();

    let store = ChronicleStore::from_config(&config.chronicle)?;
    let dispatcher = Arc::new(Dispatcher::from_config(&config, store)?);

    let mut runtime = EchoRuntime::new(dispatcher);
    runtime.add_channel(Box::new(ConsoleChannel::new("console".into(), author)));

    // Returns at end of input as well as on Ctrl+C
    runtime.run().await
}
