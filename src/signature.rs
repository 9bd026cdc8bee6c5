use std::collections::HashMap;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Client, Method, Proxy, StatusCode,
};
use serde::{Deserialize, Serialize};

use crate::error::ClaimError;

/// What the signing oracle said about one claimant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimSignature {
    NotEligible,
    Eligible {
        /// Claim nonce issued by the oracle, unrelated to the account nonce.
        nonce: U256,
        /// Signature text as returned; the claim call carries it verbatim.
        signature: String,
    },
}

#[async_trait]
pub trait SignatureSource: Send + Sync {
    async fn fetch_signature(&self, claimant: Address) -> Result<ClaimSignature, ClaimError>;
}

#[derive(Clone)]
pub struct RequestParams<'a, S: Serialize> {
    pub url: &'a str,
    pub method: Method,
    pub body: Option<S>,
    pub query_args: Option<HashMap<&'a str, &'a str>>,
}

/// Sends one request on a fresh client, dropped again on every exit path.
///
/// The status is handed back with the body instead of being turned into an
/// error, since some services answer with a meaningful body on a 4xx.
pub async fn send_http_request(
    request_params: &RequestParams<'_, impl Serialize>,
    headers: Option<&HeaderMap>,
    proxy: Option<&Proxy>,
) -> Result<(StatusCode, String), ClaimError> {
    let client = match proxy {
        Some(proxy) => Client::builder().proxy(proxy.clone()).build()?,
        None => Client::new(),
    };

    let mut request = client.request(request_params.method.clone(), request_params.url);

    if let Some(params) = &request_params.query_args {
        request = request.query(&params);
    }

    if let Some(body) = &request_params.body {
        request = request.json(&body);
    }

    if let Some(headers) = headers {
        request = request.headers(headers.clone());
    }

    let response = request
        .send()
        .await
        .inspect_err(|e| tracing::debug!("Request failed: {}", e))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .inspect_err(|e| tracing::debug!("Failed to retrieve response text: {}", e))?;

    Ok((status, text))
}

/// The oracle at `POST {url}?userAddress=<address>`.
pub struct HttpSignatureFetcher {
    url: String,
    proxy: Option<Proxy>,
}

impl HttpSignatureFetcher {
    pub fn new(url: impl Into<String>, proxy: Option<Proxy>) -> Self {
        Self {
            url: url.into(),
            proxy,
        }
    }
}

#[async_trait]
impl SignatureSource for HttpSignatureFetcher {
    async fn fetch_signature(&self, claimant: Address) -> Result<ClaimSignature, ClaimError> {
        tracing::debug!("Requesting claim signature for {claimant}");

        let user_address = claimant.to_string();
        let query_args = [("userAddress", user_address.as_str())].into_iter().collect();

        let request_params = RequestParams::<()> {
            url: &self.url,
            method: Method::POST,
            body: None,
            query_args: Some(query_args),
        };

        let (status, response) =
            send_http_request(&request_params, Some(&get_headers()), self.proxy.as_ref()).await?;

        match parse_signature_response(&response) {
            Ok(signature) => {
                if !status.is_success() {
                    tracing::debug!("Oracle answered {status} with a signature response");
                }
                Ok(signature)
            }
            Err(ClaimError::Fetch(e)) if !status.is_success() => {
                Err(ClaimError::Fetch(format!("oracle answered {status}: {e}")))
            }
            Err(e) => Err(e),
        }
    }
}

#[derive(Deserialize)]
struct SignatureResponse {
    signature: Option<String>,
    nonce: Option<ClaimNonce>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ClaimNonce {
    Text(String),
    Number(u64),
}

pub fn parse_signature_response(response_text: &str) -> Result<ClaimSignature, ClaimError> {
    let response: SignatureResponse = serde_json::from_str(response_text)
        .map_err(|e| ClaimError::Fetch(format!("malformed signature response: {e}")))?;

    let signature = match response.signature {
        Some(signature) if !signature.is_empty() => signature,
        _ => return Ok(ClaimSignature::NotEligible),
    };

    let nonce = match response.nonce {
        Some(ClaimNonce::Number(nonce)) => U256::from(nonce),
        Some(ClaimNonce::Text(nonce)) => U256::from_str_radix(nonce.trim(), 10)
            .map_err(|e| ClaimError::Fetch(format!("claim nonce {nonce:?} is not an integer: {e}")))?,
        None => return Err(ClaimError::Fetch("'nonce' field is missing".to_string())),
    };

    Ok(ClaimSignature::Eligible { nonce, signature })
}

fn get_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();

    headers.insert(
        HeaderName::from_static("accept"),
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers.insert(
        HeaderName::from_static("accept-language"),
        HeaderValue::from_static("en-US,en;q=0.9"),
    );
    headers.insert(
        HeaderName::from_static("origin"),
        HeaderValue::from_static("https://rektarb.xyz"),
    );
    headers.insert(
        HeaderName::from_static("referer"),
        HeaderValue::from_static("https://rektarb.xyz/"),
    );
    headers.insert(
        HeaderName::from_static("user-agent"),
        HeaderValue::from_static("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36"),
    );

    headers
}
