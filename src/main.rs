use utxo_indexer::config;
use utxo_indexer::lifecycle;
use utxo_indexer::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    config::init_global_config()?;
    let cfg = config::get_global_config();
    telemetry::init_tracing(&cfg.log);

    tracing::info!("starting utxo-indexer");
    lifecycle::run(cfg.clone()).await?;
    Ok(())
}
