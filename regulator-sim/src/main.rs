#[tokio::main]
async fn main() -> anyhow::Result<()> {
    regpac_regulator_sim::host::run().await
}
