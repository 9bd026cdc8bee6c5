use std::path::Path;

use alloy::{
    dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt},
    json_abi::{Function, JsonAbi},
    primitives::{Address, Bytes},
};

use crate::error::ClaimError;

/// A deployed contract and the interface used to talk to it.
///
/// Built once at startup and shared read-only by every claim task.
#[derive(Debug, Clone)]
pub struct ContractDescriptor {
    pub address: Address,
    pub abi: JsonAbi,
}

impl ContractDescriptor {
    pub fn new(address: Address, abi: JsonAbi) -> Self {
        Self { address, abi }
    }

    /// Builds the interface from human-readable signatures.
    pub fn from_signatures(address: Address, signatures: &[&str]) -> eyre::Result<Self> {
        let abi = JsonAbi::parse(signatures.iter().copied())?;
        Ok(Self::new(address, abi))
    }

    pub async fn load(address: Address, path: impl AsRef<Path>) -> eyre::Result<Self> {
        let abi_str = tokio::fs::read_to_string(path).await?;
        let abi: JsonAbi = serde_json::from_str(&abi_str)?;
        Ok(Self::new(address, abi))
    }

    pub async fn load_or_default(
        address: Address,
        path: Option<&str>,
        fallback: &[&str],
    ) -> eyre::Result<Self> {
        match path {
            Some(path) => Self::load(address, path).await,
            None => Self::from_signatures(address, fallback),
        }
    }

    fn function(&self, method: &str) -> Result<&Function, ClaimError> {
        self.abi
            .function(method)
            .and_then(|overloads| overloads.first())
            .ok_or_else(|| {
                ClaimError::Encoding(format!(
                    "contract {} has no '{method}' method",
                    self.address
                ))
            })
    }

    /// Selector-prefixed calldata for `method(args)`.
    pub fn encode_call(&self, method: &str, args: &[DynSolValue]) -> Result<Bytes, ClaimError> {
        let input = self
            .function(method)?
            .abi_encode_input(args)
            .map_err(|e| ClaimError::Encoding(format!("{method}: {e}")))?;

        Ok(input.into())
    }

    pub fn decode_output(&self, method: &str, data: &[u8]) -> Result<Vec<DynSolValue>, ClaimError> {
        self.function(method)?
            .abi_decode_output(data, true)
            .map_err(|e| ClaimError::Encoding(format!("{method} output: {e}")))
    }
}
