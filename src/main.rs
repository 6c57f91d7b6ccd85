//! Topic poll server - Entry Point
//!
//! Offers every connected client two random topics at a time and tallies
//! their votes.

use log::{error, info};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

use topic_poll_server::error::PollServerError;
use topic_poll_server::error::handlers::handle_error;
use topic_poll_server::{Server, ServerConfig};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize the logger (env_logger picks up RUST_LOG environment variable)
    env_logger::init();

    info!("Launching poll server...");

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            handle_error(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), PollServerError> {
    let config = ServerConfig::load()?;
    let server = Server::bind(&config).await?;

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl-C"),
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
        signal.cancel();
    });

    server.run(shutdown).await;
    Ok(())
}
