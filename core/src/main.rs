/// Convo - terminal demo of a direct-message conversation
use convo_core::cli_app;
use convo_core::config::LaunchOptions;
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they don't interleave with the transcript
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let options = LaunchOptions::from_args(&args)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    cli_app::run(options).await
}
