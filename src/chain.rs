use std::{marker::PhantomData, sync::Arc, time::Duration};

use alloy::{
    network::{Ethereum, ReceiptResponse, TransactionBuilder},
    primitives::{Address, Bytes, TxHash},
    providers::{PendingTransactionBuilder, PendingTransactionError, Provider, ProviderBuilder},
    rpc::{client::ClientBuilder, types::TransactionRequest},
    transports::{RpcError, Transport, TransportErrorKind},
};
use async_trait::async_trait;
use reqwest::Url;

use crate::error::ClaimError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimReceipt {
    pub transaction_hash: TxHash,
    pub status: bool,
}

/// Node RPC used by one claim. Every method is a single round trip,
/// except `wait_for_receipt` which polls until the node has a receipt.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn get_transaction_count(&self, address: Address) -> Result<u64, ClaimError>;

    async fn get_gas_price(&self) -> Result<u128, ClaimError>;

    async fn send_raw_transaction(&self, payload: &[u8]) -> Result<TxHash, ClaimError>;

    /// Never gives up on its own; callers wanting a deadline wrap it.
    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<ClaimReceipt, ClaimError>;

    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, ClaimError>;
}

/// Opens a chain client for an account's configured endpoint.
pub trait ChainConnector: Send + Sync {
    fn connect(&self, rpc_endpoint: &Url) -> Result<Arc<dyn ChainClient>, ClaimError>;
}

/// Receipts are polled at the poll interval of the provider's client.
pub struct RpcChainClient<P, T> {
    provider: P,
    _transport: PhantomData<fn() -> T>,
}

impl<P, T> RpcChainClient<P, T>
where
    P: Provider<T, Ethereum>,
    T: Transport + Clone,
{
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            _transport: PhantomData,
        }
    }
}

/// The node's own message when it sent one, the transport error otherwise.
fn node_message(err: RpcError<TransportErrorKind>) -> String {
    match err {
        RpcError::ErrorResp(payload) => payload.message.to_string(),
        other => other.to_string(),
    }
}

#[async_trait]
impl<P, T> ChainClient for RpcChainClient<P, T>
where
    P: Provider<T, Ethereum> + 'static,
    T: Transport + Clone,
{
    async fn get_transaction_count(&self, address: Address) -> Result<u64, ClaimError> {
        self.provider
            .get_transaction_count(address)
            .await
            .map_err(|e| ClaimError::Rpc(format!("eth_getTransactionCount: {}", node_message(e))))
    }

    async fn get_gas_price(&self) -> Result<u128, ClaimError> {
        self.provider
            .get_gas_price()
            .await
            .map_err(|e| ClaimError::Rpc(format!("eth_gasPrice: {}", node_message(e))))
    }

    async fn send_raw_transaction(&self, payload: &[u8]) -> Result<TxHash, ClaimError> {
        let pending_tx = self
            .provider
            .send_raw_transaction(payload)
            .await
            .map_err(|e| ClaimError::Submission(node_message(e)))?;

        Ok(*pending_tx.tx_hash())
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<ClaimReceipt, ClaimError> {
        let receipt = PendingTransactionBuilder::new(self.provider.root(), tx_hash)
            .get_receipt()
            .await
            .map_err(|e| match e {
                PendingTransactionError::TransportError(e) => {
                    ClaimError::Confirmation(node_message(e))
                }
                other => ClaimError::Confirmation(other.to_string()),
            })?;

        Ok(ClaimReceipt {
            transaction_hash: tx_hash,
            status: ReceiptResponse::status(&receipt),
        })
    }

    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, ClaimError> {
        let tx_request = TransactionRequest::default().with_to(to).with_input(input);

        self.provider
            .call(&tx_request)
            .await
            .map_err(|e| ClaimError::Rpc(format!("eth_call: {}", node_message(e))))
    }
}

/// Plain HTTP connections, one per account endpoint, without retries.
pub struct HttpConnector {
    poll_interval: Duration,
}

impl HttpConnector {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }
}

impl ChainConnector for HttpConnector {
    fn connect(&self, rpc_endpoint: &Url) -> Result<Arc<dyn ChainClient>, ClaimError> {
        let client = ClientBuilder::default()
            .http(rpc_endpoint.clone())
            .with_poll_interval(self.poll_interval);
        let provider = ProviderBuilder::new().on_client(client);

        Ok(Arc::new(RpcChainClient::new(provider)))
    }
}
