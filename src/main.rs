#[tokio::main]
async fn main() -> anyhow::Result<()> {
    saldo_client::run().await
}
