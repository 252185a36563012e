//! Demo server accepting at most two clients on port 8080.
//!
//! Run with `cargo run --example server`, then start one or more
//! `cargo run --example client` processes.

use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use pulsewire::Server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pulsewire=info")),
        )
        .init();

    let (error_tx, mut error_rx) = mpsc::unbounded_channel();

    let server = Server::builder()
        .max_clients(2)
        .on_message(|id, msg| {
            println!(
                "Server received message from connection {id}: {}",
                String::from_utf8_lossy(&msg)
            );
        })
        .on_connect(|id| println!("Client with ID {id} connected"))
        .on_disconnect(|id| println!("Client with ID {id} disconnected"))
        .error_sink(error_tx)
        .build()?;

    tokio::spawn(async move {
        while let Some(error) = error_rx.recv().await {
            eprintln!("Server error: {error}");
        }
    });

    let addr = server.start("0.0.0.0", 8080).await?;
    println!("Listening on {addr}, press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;
    server.stop().await;

    Ok(())
}
