use std::sync::Arc;

use chain::HttpConnector;
use claimer::{claim_for_all, ClaimContext, ClaimOutcome};
use config::Config;
use logger::init_logger;
use signature::HttpSignatureFetcher;
use utils::read_account_records;

mod account;
mod chain;
mod claimer;
mod config;
mod constants;
mod contract;
mod error;
mod logger;
mod signature;
#[cfg(test)]
mod testing;
mod transaction;
mod utils;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let config = Config::read_default().await?;

    let _guard = init_logger(&config.log_dir);

    let records = read_account_records(&config.accounts_file).await?;
    let context = Arc::new(ClaimContext::load(&config).await?);

    let proxy = config.proxy.as_deref().map(reqwest::Proxy::all).transpose()?;
    let signatures = Arc::new(HttpSignatureFetcher::new(
        config.signature_api_url.clone(),
        proxy,
    ));
    let connector = HttpConnector::new(config.receipt_poll_interval());

    tracing::info!("Loaded {} accounts from {}", records.len(), config.accounts_file);

    let reports = claim_for_all(
        records,
        context,
        signatures,
        &connector,
        config.max_concurrent_claims,
    )
    .await;

    let confirmed = reports
        .iter()
        .inspect(|report| tracing::debug!("{}: {:?}", report.address, report.outcome))
        .filter(|report| matches!(report.outcome, ClaimOutcome::Confirmed { success: true, .. }))
        .count();

    tracing::info!("Batch finished: {confirmed} of {} claims confirmed", reports.len());

    Ok(())
}
