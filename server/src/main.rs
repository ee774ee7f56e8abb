use clap::Parser;
use log::info;
use server::config::ServerArgs;
use server::network::Server;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Tip: Set RUST_LOG=info to see server logs");
    }

    let config = ServerArgs::parse().into_config();
    info!(
        "Starting server: port {}, seed {}, {}x{} board, turning rate {}, {} turns/s",
        config.port,
        config.seed,
        config.game.width,
        config.game.height,
        config.game.turning_rate,
        config.velocity
    );

    let mut server = Server::new(&config).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
