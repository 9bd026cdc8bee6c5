//! In-memory doubles for the oracle and the node.

use std::{
    collections::{HashMap, HashSet},
    str::FromStr,
    sync::{Arc, Mutex},
};

use alloy::{
    consensus::{TxEnvelope, TxLegacy},
    eips::eip2718::Decodable2718,
    primitives::{Address, Bytes, TxHash, U256},
    signers::local::PrivateKeySigner,
};
use async_trait::async_trait;
use reqwest::Url;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};
use zeroize::Zeroizing;

use crate::{
    account::AccountRecord,
    chain::{ChainClient, ChainConnector, ClaimReceipt},
    error::ClaimError,
    signature::{ClaimSignature, SignatureSource},
};

pub fn test_key(index: u64) -> String {
    format!("0x{index:064x}")
}

pub fn test_address(index: u64) -> Address {
    PrivateKeySigner::from_str(&test_key(index))
        .expect("test key to be valid")
        .address()
}

pub fn test_record(index: u64) -> AccountRecord {
    AccountRecord {
        private_key: Zeroizing::new(test_key(index)),
        http_rpc: "http://localhost:8545".to_string(),
        referrer_address: "0x000000000000000000000000000000000000dEaD".to_string(),
        max_gas_price: "2".to_string(),
        min_gas_limit: "300000".to_string(),
    }
}

pub fn eligible(nonce: u64) -> ClaimSignature {
    ClaimSignature::Eligible {
        nonce: U256::from(nonce),
        signature: format!("0x{}", "ab".repeat(65)),
    }
}

/// Decodes a signed legacy payload, returning the transaction and its signer.
pub fn decode_legacy(payload: &[u8]) -> (TxLegacy, Address) {
    match TxEnvelope::decode_2718(&mut &payload[..]).expect("payload to decode") {
        TxEnvelope::Legacy(signed) => {
            let signer = signed.recover_signer().expect("signature to recover");
            (signed.tx().clone(), signer)
        }
        other => panic!("expected a legacy transaction, got {other:?}"),
    }
}

/// Answers per claimant; unknown claimants are not eligible.
#[derive(Default)]
pub struct ScriptedSignatures {
    answers: HashMap<Address, Result<ClaimSignature, ClaimError>>,
    hanging: HashSet<Address>,
    requests: Mutex<Vec<Address>>,
}

impl ScriptedSignatures {
    pub fn with(mut self, claimant: Address, answer: Result<ClaimSignature, ClaimError>) -> Self {
        self.answers.insert(claimant, answer);
        self
    }

    /// The request for this claimant never completes.
    pub fn hang(mut self, claimant: Address) -> Self {
        self.hanging.insert(claimant);
        self
    }

    pub fn requests(&self) -> Vec<Address> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SignatureSource for ScriptedSignatures {
    async fn fetch_signature(&self, claimant: Address) -> Result<ClaimSignature, ClaimError> {
        self.requests.lock().unwrap().push(claimant);

        if self.hanging.contains(&claimant) {
            std::future::pending::<()>().await;
        }

        self.answers
            .get(&claimant)
            .cloned()
            .unwrap_or(Ok(ClaimSignature::NotEligible))
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChainCalls {
    pub nonce_queries: Vec<Address>,
    pub gas_price_queries: usize,
    pub submitted: Vec<Bytes>,
    pub receipt_waits: Vec<TxHash>,
    pub eth_calls: Vec<(Address, Bytes)>,
}

/// A node with fixed answers that records every request.
pub struct MockChain {
    pub nonce: u64,
    pub gas_price: u128,
    pub submit_error: Option<String>,
    pub receipt_status: bool,
    pub receipt_hangs: bool,
    pub call_result: Result<Bytes, ClaimError>,
    pub(crate) calls: Mutex<ChainCalls>,
}

impl Default for MockChain {
    fn default() -> Self {
        Self {
            nonce: 5,
            gas_price: 10,
            submit_error: None,
            receipt_status: true,
            receipt_hangs: false,
            call_result: Ok(Bytes::copy_from_slice(&U256::from(1000).to_be_bytes::<32>())),
            calls: Mutex::new(ChainCalls::default()),
        }
    }
}

impl MockChain {
    pub fn calls(&self) -> ChainCalls {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn get_transaction_count(&self, address: Address) -> Result<u64, ClaimError> {
        self.calls.lock().unwrap().nonce_queries.push(address);
        Ok(self.nonce)
    }

    async fn get_gas_price(&self) -> Result<u128, ClaimError> {
        self.calls.lock().unwrap().gas_price_queries += 1;
        Ok(self.gas_price)
    }

    async fn send_raw_transaction(&self, payload: &[u8]) -> Result<TxHash, ClaimError> {
        if let Some(reason) = &self.submit_error {
            return Err(ClaimError::Submission(reason.clone()));
        }

        let payload = Bytes::copy_from_slice(payload);
        let tx_hash = alloy::primitives::keccak256(&payload);
        self.calls.lock().unwrap().submitted.push(payload);

        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<ClaimReceipt, ClaimError> {
        self.calls.lock().unwrap().receipt_waits.push(tx_hash);

        if self.receipt_hangs {
            std::future::pending::<()>().await;
        }

        Ok(ClaimReceipt {
            transaction_hash: tx_hash,
            status: self.receipt_status,
        })
    }

    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, ClaimError> {
        self.calls.lock().unwrap().eth_calls.push((to, input));
        self.call_result.clone()
    }
}

/// Hands out one shared node per endpoint; unknown endpoints get `fallback`.
pub struct MockConnector {
    pub fallback: Arc<MockChain>,
    pub nodes: HashMap<String, Arc<MockChain>>,
}

impl MockConnector {
    pub fn new(fallback: Arc<MockChain>) -> Self {
        Self {
            fallback,
            nodes: HashMap::new(),
        }
    }

    pub fn with_node(mut self, rpc_endpoint: &str, node: Arc<MockChain>) -> Self {
        let rpc_endpoint = Url::parse(rpc_endpoint).expect("endpoint to be a url");
        self.nodes.insert(rpc_endpoint.to_string(), node);
        self
    }
}

impl ChainConnector for MockConnector {
    fn connect(&self, rpc_endpoint: &Url) -> Result<Arc<dyn ChainClient>, ClaimError> {
        let node = self
            .nodes
            .get(rpc_endpoint.as_str())
            .unwrap_or(&self.fallback)
            .clone();

        Ok(node)
    }
}

/// Serves a single HTTP exchange on a local port.
///
/// Returns the base url and a handle resolving to the raw request text.
/// `respond` gets that request and picks the status line and JSON body.
pub async fn serve_once<F>(respond: F) -> (String, JoinHandle<String>)
where
    F: FnOnce(&str) -> (&'static str, String) + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("local port to bind");
    let base_url = format!("http://{}", listener.local_addr().expect("bound address"));

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("client to connect");
        let request = read_request(&mut stream).await;
        let (status, body) = respond(&request);

        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        stream
            .write_all(response.as_bytes())
            .await
            .expect("response to be written");
        let _ = stream.shutdown().await;

        request
    });

    (base_url, handle)
}

/// The body of a raw request read by [`serve_once`].
pub fn request_body(request: &str) -> &str {
    request.split_once("\r\n\r\n").map_or("", |(_, body)| body)
}

async fn read_request(stream: &mut TcpStream) -> String {
    let mut raw = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let read = stream.read(&mut chunk).await.expect("request to be readable");
        if read == 0 {
            break;
        }
        raw.extend_from_slice(&chunk[..read]);

        let text = String::from_utf8_lossy(&raw);
        if let Some(head_end) = text.find("\r\n\r\n") {
            let body_len = text[..head_end]
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);

            if raw.len() >= head_end + 4 + body_len {
                break;
            }
        }
    }

    String::from_utf8_lossy(&raw).into_owned()
}
