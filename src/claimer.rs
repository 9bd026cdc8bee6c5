use std::{sync::Arc, time::Duration};

use alloy::{
    dyn_abi::DynSolValue,
    primitives::{Address, TxHash, U256},
};
use tokio::{sync::Semaphore, task::JoinSet};

use crate::{
    account::{key_hint, AccountRecord, ClaimAccount},
    chain::{ChainClient, ChainConnector},
    config::Config,
    constants::{BALANCE_OF_METHOD, DISTRIBUTOR_INTERFACE, TOKEN_INTERFACE},
    contract::ContractDescriptor,
    error::ClaimError,
    signature::{ClaimSignature, SignatureSource},
    transaction::{bid_gas_price, build_claim_transaction, GasEnvelope},
};

/// How a single account's claim attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    NotEligible,
    /// Accepted by the node, but no receipt arrived before the deadline.
    Submitted(TxHash),
    Confirmed { tx_hash: TxHash, success: bool },
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimStage {
    FetchingSignature,
    BuildingTransaction,
    Signing,
    Submitting,
    AwaitingReceipt,
    ReportingBalance,
}

/// Process-wide, read-only inputs shared by every claim task.
#[derive(Debug, Clone)]
pub struct ClaimContext {
    pub distributor: ContractDescriptor,
    pub token: ContractDescriptor,
    pub chain_id: u64,
    pub explorer_url: String,
    pub receipt_timeout: Option<Duration>,
    pub report_token_balance: bool,
}

impl ClaimContext {
    pub async fn load(config: &Config) -> eyre::Result<Self> {
        let distributor = ContractDescriptor::load_or_default(
            config.distributor_address,
            config.distributor_abi_file.as_deref(),
            DISTRIBUTOR_INTERFACE,
        )
        .await?;
        let token = ContractDescriptor::load_or_default(
            config.token_address,
            config.token_abi_file.as_deref(),
            TOKEN_INTERFACE,
        )
        .await?;

        Ok(Self {
            distributor,
            token,
            chain_id: config.chain_id,
            explorer_url: config.explorer_url.clone(),
            receipt_timeout: config.receipt_timeout(),
            report_token_balance: config.report_token_balance,
        })
    }

    fn tx_url(&self, tx_hash: TxHash) -> String {
        format!("{}/tx/{tx_hash}", self.explorer_url)
    }
}

/// Drives one account through a single claim attempt. No step is retried.
pub struct ClaimOrchestrator {
    account: ClaimAccount,
    chain: Arc<dyn ChainClient>,
    signatures: Arc<dyn SignatureSource>,
    context: Arc<ClaimContext>,
}

impl ClaimOrchestrator {
    pub fn new(
        record: AccountRecord,
        context: Arc<ClaimContext>,
        signatures: Arc<dyn SignatureSource>,
        connector: &dyn ChainConnector,
    ) -> Result<Self, ClaimError> {
        let account = ClaimAccount::from_record(record)?;
        let chain = connector.connect(&account.rpc_endpoint)?;

        Ok(Self {
            account,
            chain,
            signatures,
            context,
        })
    }

    pub fn address(&self) -> Address {
        self.account.address()
    }

    pub async fn run(self) -> ClaimOutcome {
        let mut stage = ClaimStage::FetchingSignature;

        let outcome = match self.claim(&mut stage).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    "Error claiming for {} while {stage:?}: {e}",
                    self.address()
                );
                ClaimOutcome::Failed(e.to_string())
            }
        };

        self.log_outcome(&outcome);

        outcome
    }

    async fn claim(&self, stage: &mut ClaimStage) -> Result<ClaimOutcome, ClaimError> {
        let address = self.address();

        let (claim_nonce, signature) = match self.signatures.fetch_signature(address).await? {
            ClaimSignature::NotEligible => return Ok(ClaimOutcome::NotEligible),
            ClaimSignature::Eligible { nonce, signature } => (nonce, signature),
        };

        *stage = ClaimStage::BuildingTransaction;
        let (nonce, base_gas_price) = tokio::try_join!(
            self.chain.get_transaction_count(address),
            self.chain.get_gas_price()
        )?;
        let gas_price = bid_gas_price(base_gas_price, self.account.gas_price_multiplier)?;

        let pending_tx = build_claim_transaction(
            address,
            &self.context.distributor,
            claim_nonce,
            &signature,
            self.account.referrer,
            GasEnvelope {
                gas_limit: self.account.gas_limit,
                gas_price,
                nonce,
                chain_id: self.context.chain_id,
            },
        )?;
        tracing::debug!(
            "Built claim for {address}: nonce {nonce}, gas price {gas_price}, gas limit {}",
            pending_tx.gas_limit
        );

        *stage = ClaimStage::Signing;
        let payload = pending_tx.sign(self.account.wallet()).await?;

        *stage = ClaimStage::Submitting;
        let tx_hash = self.chain.send_raw_transaction(&payload).await?;
        tracing::info!(
            "Claim submitted for {address}: {}",
            self.context.tx_url(tx_hash)
        );

        *stage = ClaimStage::AwaitingReceipt;
        let receipt = match self.context.receipt_timeout {
            Some(deadline) => {
                match tokio::time::timeout(deadline, self.chain.wait_for_receipt(tx_hash)).await {
                    Ok(receipt) => receipt?,
                    Err(_) => return Ok(ClaimOutcome::Submitted(tx_hash)),
                }
            }
            None => self.chain.wait_for_receipt(tx_hash).await?,
        };

        if receipt.status && self.context.report_token_balance {
            *stage = ClaimStage::ReportingBalance;
            match self.token_balance().await {
                Ok(balance) => tracing::info!("{address} now holds {balance} tokens"),
                Err(e) => tracing::warn!("Could not read token balance of {address}: {e}"),
            }
        }

        Ok(ClaimOutcome::Confirmed {
            tx_hash: receipt.transaction_hash,
            success: receipt.status,
        })
    }

    async fn token_balance(&self) -> Result<U256, ClaimError> {
        let token = &self.context.token;

        let input = token.encode_call(BALANCE_OF_METHOD, &[DynSolValue::Address(self.address())])?;
        let output = self.chain.call(token.address, input).await?;

        token
            .decode_output(BALANCE_OF_METHOD, &output)?
            .first()
            .and_then(DynSolValue::as_uint)
            .map(|(balance, _)| balance)
            .ok_or_else(|| ClaimError::Encoding("balanceOf returned no uint".to_string()))
    }

    fn log_outcome(&self, outcome: &ClaimOutcome) {
        let address = self.address();

        match outcome {
            ClaimOutcome::NotEligible => tracing::warn!("{address} Not eligible"),
            ClaimOutcome::Submitted(tx_hash) => tracing::warn!(
                "No receipt for {address} before the deadline: {}",
                self.context.tx_url(*tx_hash)
            ),
            ClaimOutcome::Confirmed {
                tx_hash,
                success: true,
            } => tracing::info!(
                "Claim successful for {address} {}",
                self.context.tx_url(*tx_hash)
            ),
            ClaimOutcome::Confirmed {
                tx_hash,
                success: false,
            } => tracing::warn!(
                "Claim failed for {address} {}",
                self.context.tx_url(*tx_hash)
            ),
            // Already logged together with the failing stage
            ClaimOutcome::Failed(_) => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimReport {
    pub address: Address,
    pub outcome: ClaimOutcome,
}

/// Runs one claim per record concurrently and waits for all of them.
///
/// Records that fail validation are logged and skipped. `max_concurrent`
/// caps how many claims are in flight at once; `None` launches every
/// account immediately.
pub async fn claim_for_all(
    records: Vec<AccountRecord>,
    context: Arc<ClaimContext>,
    signatures: Arc<dyn SignatureSource>,
    connector: &dyn ChainConnector,
    max_concurrent: Option<usize>,
) -> Vec<ClaimReport> {
    let limiter = max_concurrent.map(|permits| Arc::new(Semaphore::new(permits.max(1))));

    let mut handles = JoinSet::new();

    for record in records {
        let key = key_hint(&record.private_key);

        let orchestrator =
            match ClaimOrchestrator::new(record, context.clone(), signatures.clone(), connector) {
                Ok(orchestrator) => orchestrator,
                Err(e) => {
                    tracing::error!("Error creating {key}: {e}");
                    continue;
                }
            };

        let limiter = limiter.clone();

        handles.spawn(async move {
            let _permit = match limiter {
                Some(limiter) => limiter.acquire_owned().await.ok(),
                None => None,
            };

            let address = orchestrator.address();
            (address, orchestrator.run().await)
        });
    }

    tracing::info!("Launched {} claims", handles.len());

    let mut reports = Vec::with_capacity(handles.len());

    while let Some(res) = handles.join_next().await {
        match res {
            Ok((address, outcome)) => reports.push(ClaimReport { address, outcome }),
            Err(e) => tracing::error!("Claim task did not finish: {e}"),
        }
    }

    reports
}
