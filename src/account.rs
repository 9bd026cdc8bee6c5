use std::{fmt, str::FromStr};

use alloy::{network::EthereumWallet, primitives::Address, signers::local::PrivateKeySigner};
use reqwest::Url;
use zeroize::{Zeroize, Zeroizing};

use crate::error::ClaimError;

/// One row of the accounts file, exactly as read.
///
/// The key is wiped from memory whenever the record is dropped.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AccountRecord {
    pub private_key: Zeroizing<String>,
    pub http_rpc: String,
    pub referrer_address: String,
    pub max_gas_price: String,
    pub min_gas_limit: String,
}

impl fmt::Debug for AccountRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountRecord")
            .field("private_key", &key_hint(&self.private_key))
            .field("http_rpc", &self.http_rpc)
            .field("referrer_address", &self.referrer_address)
            .field("max_gas_price", &self.max_gas_price)
            .field("min_gas_limit", &self.min_gas_limit)
            .finish()
    }
}

/// Short, non-reversible identifier for a private key, safe for logs.
pub fn key_hint(private_key: &str) -> String {
    let key = private_key.trim();
    let key = key.strip_prefix("0x").unwrap_or(key);
    let prefix: String = key.chars().take(6).collect();

    format!("0x{prefix}...")
}

/// A validated claimant: signer identity plus its per-account limits.
pub struct ClaimAccount {
    wallet: EthereumWallet,
    address: Address,
    pub rpc_endpoint: Url,
    pub referrer: Address,
    pub gas_price_multiplier: u128,
    pub gas_limit: u64,
}

impl ClaimAccount {
    pub fn from_record(record: AccountRecord) -> Result<Self, ClaimError> {
        let AccountRecord {
            mut private_key,
            http_rpc,
            referrer_address,
            max_gas_price,
            min_gas_limit,
        } = record;

        let gas_price_multiplier = parse_positive::<u128>("max_gas_price", &max_gas_price)?;
        let gas_limit = parse_positive::<u64>("min_gas_limit", &min_gas_limit)?;

        let rpc_endpoint = Url::parse(http_rpc.trim()).map_err(|e| {
            ClaimError::Configuration(format!("http_rpc {:?} is not a valid url: {e}", http_rpc))
        })?;
        let referrer = Address::from_str(referrer_address.trim()).map_err(|e| {
            ClaimError::Configuration(format!(
                "referrer_address {referrer_address:?} is not a valid address: {e}"
            ))
        })?;

        let signer = derive_signer(&mut private_key)?;
        let address = signer.address();

        Ok(Self {
            wallet: EthereumWallet::new(signer),
            address,
            rpc_endpoint,
            referrer,
            gas_price_multiplier,
            gas_limit,
        })
    }

    /// Checksummed when displayed.
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn wallet(&self) -> &EthereumWallet {
        &self.wallet
    }
}

impl fmt::Debug for ClaimAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaimAccount")
            .field("address", &self.address)
            .field("rpc_endpoint", &self.rpc_endpoint.as_str())
            .field("referrer", &self.referrer)
            .field("gas_price_multiplier", &self.gas_price_multiplier)
            .field("gas_limit", &self.gas_limit)
            .finish_non_exhaustive()
    }
}

/// Parses the signer and wipes the raw key, whether or not it was valid.
fn derive_signer(private_key: &mut String) -> Result<PrivateKeySigner, ClaimError> {
    let hint = key_hint(private_key);
    let signer = PrivateKeySigner::from_str(private_key.trim());
    private_key.zeroize();

    // The signer error text is not forwarded since it may quote the key.
    signer.map_err(|_| {
        ClaimError::Configuration(format!("private key {hint} is not a valid secp256k1 key"))
    })
}

fn parse_positive<N>(field: &str, value: &str) -> Result<N, ClaimError>
where
    N: FromStr + Default + PartialEq,
{
    let parsed = value.trim().parse::<N>().map_err(|_| {
        ClaimError::Configuration(format!("{field} {value:?} is not a positive integer"))
    })?;

    if parsed == N::default() {
        return Err(ClaimError::Configuration(format!(
            "{field} must be greater than zero"
        )));
    }

    Ok(parsed)
}
