use std::{path::Path, time::Duration};

use alloy::primitives::Address;
use serde::Deserialize;

use crate::constants::{
    ACCOUNTS_FILE_PATH, CONFIG_FILE_PATH, DEFAULT_CHAIN, DISTRIBUTOR_CONTRACT_ADDRESS,
    EXPLORER_URL, LOG_DIR, RECEIPT_POLL_INTERVAL_MS, SIGNATURE_API_URL, TOKEN_CONTRACT_ADDRESS,
};

#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct Config {
    pub accounts_file: String,
    pub distributor_address: Address,
    pub token_address: Address,
    pub distributor_abi_file: Option<String>,
    pub token_abi_file: Option<String>,
    pub signature_api_url: String,
    pub chain_id: u64,
    pub explorer_url: String,
    pub log_dir: String,
    pub receipt_poll_interval_ms: u64,
    /// Unset means wait for a receipt indefinitely.
    pub receipt_timeout_secs: Option<u64>,
    /// Unset means every account is launched at once.
    pub max_concurrent_claims: Option<usize>,
    pub report_token_balance: bool,
    pub proxy: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            accounts_file: ACCOUNTS_FILE_PATH.to_string(),
            distributor_address: DISTRIBUTOR_CONTRACT_ADDRESS,
            token_address: TOKEN_CONTRACT_ADDRESS,
            distributor_abi_file: None,
            token_abi_file: None,
            signature_api_url: SIGNATURE_API_URL.to_string(),
            chain_id: DEFAULT_CHAIN as u64,
            explorer_url: EXPLORER_URL.to_string(),
            log_dir: LOG_DIR.to_string(),
            receipt_poll_interval_ms: RECEIPT_POLL_INTERVAL_MS,
            receipt_timeout_secs: None,
            max_concurrent_claims: None,
            report_token_balance: false,
            proxy: None,
        }
    }
}

impl Config {
    async fn read_from_file(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let cfg_str = tokio::fs::read_to_string(path).await?;
        Ok(toml::from_str(&cfg_str)?)
    }

    pub async fn read_default() -> eyre::Result<Self> {
        Self::read_from_file(CONFIG_FILE_PATH).await
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }

    pub fn receipt_timeout(&self) -> Option<Duration> {
        self.receipt_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;

    use super::*;

    #[test]
    fn empty_file_falls_back_to_defaults() {
        let config: Config = toml::from_str("").unwrap();

        assert_eq!(config.chain_id, 42161);
        assert_eq!(config.distributor_address, DISTRIBUTOR_CONTRACT_ADDRESS);
        assert_eq!(config.receipt_timeout(), None);
        assert_eq!(config.max_concurrent_claims, None);
        assert!(!config.report_token_balance);
    }

    #[test]
    fn screaming_snake_case_keys_override_defaults() {
        let config: Config = toml::from_str(
            r#"
            ACCOUNTS_FILE = "data/other.csv"
            TOKEN_ADDRESS = "0x000000000000000000000000000000000000dEaD"
            CHAIN_ID = 421614
            RECEIPT_TIMEOUT_SECS = 90
            MAX_CONCURRENT_CLAIMS = 8
            REPORT_TOKEN_BALANCE = true
            "#,
        )
        .unwrap();

        assert_eq!(config.accounts_file, "data/other.csv");
        assert_eq!(
            config.token_address,
            address!("000000000000000000000000000000000000dEaD")
        );
        assert_eq!(config.chain_id, 421614);
        assert_eq!(config.receipt_timeout(), Some(Duration::from_secs(90)));
        assert_eq!(config.max_concurrent_claims, Some(8));
        assert!(config.report_token_balance);
    }
}
