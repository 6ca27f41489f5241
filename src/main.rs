use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    bulk_batcher::app::run().await?;
    Ok(())
}
