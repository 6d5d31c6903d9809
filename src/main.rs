use clap::Parser;
use cml_temperature_map::cli::{args::Args, commands};
use std::process;
use tokio_util::sync::CancellationToken;

fn main() {
    let args = Args::parse();

    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Failed to create async runtime: {}", e);
        process::exit(1);
    });

    let result = runtime.block_on(async {
        // Shared with the scheduler, which only checks it between rounds
        let cancellation_token = CancellationToken::new();

        let shutdown_token = cancellation_token.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    eprintln!("\nReceived CTRL+C, finishing the current round before shutting down...");
                    shutdown_token.cancel();
                }
                Err(e) => eprintln!("Failed to install CTRL+C signal handler: {}", e),
            }
        });

        commands::run(args, cancellation_token).await
    });

    match result {
        Ok(_stats) => process::exit(0),
        Err(error) => {
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}
