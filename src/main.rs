use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    testpilot_cli::cli::run().await
}
