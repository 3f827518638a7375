//! Fee-payer relay client.
//!
//! Wallets without enough SOL for fees hand their partially-signed
//! transactions to a relay whose key is set as fee payer. The relay either
//! forwards them itself (and answers with signatures) or co-signs them and
//! hands them back for the client to submit.

use std::str::FromStr;

use anchor_lang::prelude::Pubkey;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use log::{debug, info, warn};
use serde::Deserialize;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;

use crate::error::{Result, WidgetError};

/// Encoding of serialized transactions in the relay request body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayEncoding {
    #[default]
    Hex,
    Base64,
}

impl RelayEncoding {
    pub fn encode(&self, transaction: &Transaction) -> Result<String> {
        let bytes = bincode::serialize(transaction)
            .map_err(|e| WidgetError::Signing(format!("cannot serialize transaction: {}", e)))?;
        Ok(match self {
            RelayEncoding::Hex => hex::encode(bytes),
            RelayEncoding::Base64 => BASE64.encode(bytes),
        })
    }
}

/// What the relay did with one submitted transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum RelaySubmission {
    /// The relay broadcast it.
    Sent(Signature),
    /// The relay co-signed it; the caller broadcasts.
    CoSigned(Transaction),
}

impl RelaySubmission {
    fn parse(item: &str) -> Result<Self> {
        let item = item.trim().trim_matches('"');
        if let Ok(signature) = Signature::from_str(item) {
            return Ok(RelaySubmission::Sent(signature));
        }
        let bytes = BASE64
            .decode(item)
            .map_err(|_| WidgetError::Schema(format!("unrecognized relay response: {}", item)))?;
        let transaction: Transaction = bincode::deserialize(&bytes)
            .map_err(|e| WidgetError::Schema(format!("invalid co-signed transaction: {}", e)))?;
        Ok(RelaySubmission::CoSigned(transaction))
    }
}

/// Parse a relay response body.
///
/// Accepts a bare value, a JSON string or a JSON array of strings; each value
/// is either a base58 signature or a base64 transaction.
pub fn parse_relay_response(body: &str) -> Result<Vec<RelaySubmission>> {
    let body = body.trim();
    if body.is_empty() {
        return Err(WidgetError::Schema("Failed to sign transaction on backend".to_string()));
    }
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Array(items)) => items
            .iter()
            .map(|item| match item.as_str() {
                Some(s) => RelaySubmission::parse(s),
                None => Err(WidgetError::Schema(format!("unexpected relay item: {}", item))),
            })
            .collect(),
        Ok(serde_json::Value::String(item)) => Ok(vec![RelaySubmission::parse(&item)?]),
        _ => Ok(vec![RelaySubmission::parse(body)?]),
    }
}

#[async_trait]
pub trait FeeRelay: Send + Sync {
    /// Public key the relay pays fees from.
    async fn fee_payer(&self) -> Result<Pubkey>;

    /// Submit transactions already signed by every party except the relay.
    async fn submit(&self, transactions: &[Transaction]) -> Result<Vec<RelaySubmission>>;
}

/// Relay reachable over HTTP at a single URL.
pub struct HttpRelayClient {
    http: reqwest::Client,
    url: String,
    encoding: RelayEncoding,
}

impl HttpRelayClient {
    pub fn new(url: impl Into<String>, encoding: RelayEncoding) -> Self {
        Self::with_client(reqwest::Client::new(), url, encoding)
    }

    pub fn with_client(http: reqwest::Client, url: impl Into<String>, encoding: RelayEncoding) -> Self {
        Self {
            http,
            url: url.into(),
            encoding,
        }
    }

    /// JSON array body posted to the relay.
    pub fn request_body(&self, transactions: &[Transaction]) -> Result<String> {
        let encoded = transactions
            .iter()
            .map(|tx| self.encoding.encode(tx))
            .collect::<Result<Vec<_>>>()?;
        serde_json::to_string(&encoded).map_err(|e| WidgetError::Schema(e.to_string()))
    }
}

fn unavailable(err: reqwest::Error) -> WidgetError {
    WidgetError::RelayUnavailable(err.to_string())
}

#[async_trait]
impl FeeRelay for HttpRelayClient {
    async fn fee_payer(&self) -> Result<Pubkey> {
        let response = self.http.get(&self.url).send().await.map_err(unavailable)?;
        let status = response.status();
        let body = response.text().await.map_err(unavailable)?;
        if !status.is_success() {
            return Err(WidgetError::RelayRejected {
                status: status.as_u16(),
                body,
            });
        }
        let key = body.trim().trim_matches('"');
        Pubkey::from_str(key).map_err(|e| WidgetError::Schema(format!("invalid fee payer key: {}", e)))
    }

    async fn submit(&self, transactions: &[Transaction]) -> Result<Vec<RelaySubmission>> {
        let body = self.request_body(transactions)?;
        debug!("posting {} transactions to the fee payer relay", transactions.len());

        let response = self
            .http
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(body)
            .send()
            .await
            .map_err(unavailable)?;
        let status = response.status();
        let body = response.text().await.map_err(unavailable)?;
        if !status.is_success() {
            warn!("Unable to sign request on the backend ({})", status);
            return Err(WidgetError::RelayRejected {
                status: status.as_u16(),
                body,
            });
        }

        let submissions = parse_relay_response(&body)?;
        info!("fee payer relay accepted {} transactions", submissions.len());
        Ok(submissions)
    }
}

/// Relay key and client, fetched once per session.
pub struct FeePaymentData<R> {
    pub fee_payer: Pubkey,
    pub relay: R,
}

impl<R: FeeRelay> FeePaymentData<R> {
    pub async fn fetch(relay: R) -> Result<Self> {
        let fee_payer = relay.fee_payer().await?;
        info!("fee payer relay key: {}", fee_payer);
        Ok(Self { fee_payer, relay })
    }
}
