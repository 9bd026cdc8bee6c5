use alloy::{
    dyn_abi::DynSolValue,
    eips::eip2718::Encodable2718,
    hex,
    network::{EthereumWallet, TransactionBuilder},
    primitives::{Address, Bytes, U256},
    rpc::types::TransactionRequest,
};

use crate::{constants::CLAIM_METHOD, contract::ContractDescriptor, error::ClaimError};

/// Gas and nonce resolved from the chain right before building.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasEnvelope {
    pub gas_limit: u64,
    pub gas_price: u128,
    pub nonce: u64,
    pub chain_id: u64,
}

/// A fully assembled, still unsigned claim transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransaction {
    pub from: Address,
    pub to: Address,
    pub gas_limit: u64,
    pub gas_price: u128,
    pub nonce: u64,
    pub chain_id: u64,
    pub input: Bytes,
}

impl PendingTransaction {
    pub fn to_request(&self) -> TransactionRequest {
        TransactionRequest::default()
            .with_from(self.from)
            .with_to(self.to)
            .with_input(self.input.clone())
            .with_nonce(self.nonce)
            .with_chain_id(self.chain_id)
            .with_gas_limit(self.gas_limit)
            .with_gas_price(self.gas_price)
    }

    /// Signs locally and returns the EIP-2718 encoded payload.
    pub async fn sign(&self, wallet: &EthereumWallet) -> Result<Bytes, ClaimError> {
        let signed_transaction = self
            .to_request()
            .build(wallet)
            .await
            .map_err(|e| ClaimError::Encoding(format!("signing failed: {e}")))?;

        Ok(signed_transaction.encoded_2718().into())
    }
}

/// The account's bid: the node's suggestion times its multiplier.
pub fn bid_gas_price(base_gas_price: u128, multiplier: u128) -> Result<u128, ClaimError> {
    base_gas_price.checked_mul(multiplier).ok_or_else(|| {
        ClaimError::Encoding(format!(
            "gas price {base_gas_price} * {multiplier} overflows"
        ))
    })
}

/// The distributor takes the signature as the UTF-8 text the oracle returned,
/// so the hex is only checked here, never decoded into the call.
pub fn signature_bytes(signature: &str) -> Result<Vec<u8>, ClaimError> {
    let decoded = hex::decode(signature)
        .map_err(|e| ClaimError::Encoding(format!("signature is not valid hex: {e}")))?;

    if decoded.is_empty() {
        return Err(ClaimError::Encoding("signature is empty".to_string()));
    }

    Ok(signature.as_bytes().to_vec())
}

pub fn build_claim_transaction(
    from: Address,
    distributor: &ContractDescriptor,
    claim_nonce: U256,
    signature: &str,
    referrer: Address,
    envelope: GasEnvelope,
) -> Result<PendingTransaction, ClaimError> {
    let signature = signature_bytes(signature)?;

    let input = distributor.encode_call(
        CLAIM_METHOD,
        &[
            DynSolValue::Uint(claim_nonce, 256),
            DynSolValue::Bytes(signature),
            DynSolValue::Address(referrer),
        ],
    )?;

    Ok(PendingTransaction {
        from,
        to: distributor.address,
        gas_limit: envelope.gas_limit,
        gas_price: envelope.gas_price,
        nonce: envelope.nonce,
        chain_id: envelope.chain_id,
        input,
    })
}
