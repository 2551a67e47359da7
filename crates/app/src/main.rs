use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = qrsign::app::run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
