#[tokio::main]
async fn main() -> anyhow::Result<()> {
    nexus_server::run().await
}
