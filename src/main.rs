#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = shala_rust::run().await {
        eprintln!("shala-rust fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
