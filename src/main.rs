#[tokio::main]
async fn main() -> anyhow::Result<()> {
    overlay_bootstrap::node::run_cli().await
}
