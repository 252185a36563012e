//! Demo client that talks to the demo server for three seconds.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use pulsewire::{CancellationToken, Client};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pulsewire=info")),
        )
        .init();

    let token = CancellationToken::new();
    let (error_tx, mut error_rx) = mpsc::unbounded_channel();

    let client = Client::builder()
        .on_message(|msg| println!("Received from server: {}", String::from_utf8_lossy(&msg)))
        .error_sink(error_tx)
        .cancellation(token.clone())
        .build()?;

    tokio::spawn(async move {
        while let Some(error) = error_rx.recv().await {
            eprintln!("Client error: {error}");
        }
    });

    client.connect("127.0.0.1", 8080).await?;
    client.write(b"hello from client").await?;

    tokio::time::sleep(Duration::from_secs(3)).await;
    token.cancel();

    println!("Connected after cancel: {}", client.is_connected());
    Ok(())
}
