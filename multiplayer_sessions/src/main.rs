#[tokio::main]
async fn main() {
    // Delegate to the framework entry point; it owns tracing setup.
    if let Err(error) = multiplayer_sessions::run().await {
        tracing::error!(%error, "lan walkthrough failed");
        std::process::exit(1);
    }
}
