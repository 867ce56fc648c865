#[tokio::main]
async fn main() -> anyhow::Result<()> {
    regpac_panel::host::run().await
}
