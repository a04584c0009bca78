use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    playguard_cli::cli::run().await
}
