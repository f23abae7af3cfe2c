use frontdesk_console::config::ConsoleConfig;
use frontdesk_console::console::{self, ConsoleClient, ConsoleCommand};
use frontdesk_conversation::{Desk, DeskRunner, InMemoryStateStore};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // stdout carries transport calls, so logs go to stderr.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = ConsoleConfig::from_env().expect("failed to load configuration");
    let operator = config.operator();
    tracing::info!(operator = %operator, "Loaded configuration");

    let (client, calls) = ConsoleClient::channel();
    let client = Arc::new(client);
    let desk = Arc::new(Desk::new(
        InMemoryStateStore::new(),
        Arc::clone(&client),
        &config.desk,
    ));
    let runner = DeskRunner::spawn(Arc::clone(&desk), config.desk.lane_capacity);
    let printer = tokio::spawn(console::write_calls(calls, tokio::io::stdout()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, draining queued events");
                break;
            }
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read input");
                break;
            }
        };

        match console::parse_line(&line, &operator) {
            Ok(Some(ConsoleCommand::Submit(event))) => {
                if let Err(e) = runner.submit(event).await {
                    tracing::error!(error = %e, "Desk stopped accepting events");
                    break;
                }
            }
            Ok(Some(ConsoleCommand::RegisterContact { id, display_name })) => {
                tracing::debug!(contact = %id, "Registered display name");
                client.register_contact(id, display_name);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Skipping malformed input line"),
        }
    }

    runner.shutdown().await;

    // The printer stops once the last client handle is gone.
    drop(desk);
    drop(client);
    match printer.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "Failed to write output"),
        Err(e) => tracing::error!(error = %e, "Output task failed"),
    }
}
