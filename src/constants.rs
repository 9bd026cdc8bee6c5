use alloy::primitives::{address, Address};
use alloy_chains::NamedChain;

pub const DISTRIBUTOR_CONTRACT_ADDRESS: Address =
    address!("21a2f6a0d2156bb069b3062e249072cec2da9320");
pub const TOKEN_CONTRACT_ADDRESS: Address = address!("1d987200df3b744cfa9c14f713f5334cb4bc4d5d");

pub const SIGNATURE_API_URL: &str = "https://rektarb.xyz/api/signature";
pub const EXPLORER_URL: &str = "https://arbiscan.io";

pub const DEFAULT_CHAIN: NamedChain = NamedChain::Arbitrum;

// Used when no ABI file is configured
pub const DISTRIBUTOR_INTERFACE: &[&str] =
    &["function claim(uint256 nonce, bytes signature, address referrer) external"];
pub const TOKEN_INTERFACE: &[&str] = &[
    "function balanceOf(address account) external view returns (uint256)",
    "function transfer(address to, uint256 amount) external returns (bool)",
];

pub const CLAIM_METHOD: &str = "claim";
pub const BALANCE_OF_METHOD: &str = "balanceOf";

// FILES
pub const CONFIG_FILE_PATH: &str = "data/config.toml";
pub const ACCOUNTS_FILE_PATH: &str = "data/accounts.csv";
pub const LOG_DIR: &str = "logs";
pub const LOG_FILE_PREFIX: &str = "claimer.log";

pub const RECEIPT_POLL_INTERVAL_MS: u64 = 1000;
