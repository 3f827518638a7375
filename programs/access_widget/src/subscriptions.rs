//! Off-chain subscription records.
//!
//! The subscription API mirrors locked positions (stakes, bonds and forever
//! bonds) per owner and pool. Responses are validated strictly: unknown fields
//! and wrong types are rejected rather than ignored.

use std::str::FromStr;

use anchor_lang::prelude::Pubkey;
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Deserializer};

use crate::error::{Result, WidgetError};

fn pubkey_from_str<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Pubkey, D::Error> {
    let s = String::deserialize(deserializer)?;
    Pubkey::from_str(&s).map_err(serde::de::Error::custom)
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct OffchainSubscription {
    #[serde(default)]
    pub asset_id: Option<String>,
    #[serde(deserialize_with = "pubkey_from_str")]
    pub owner: Pubkey,
    #[serde(deserialize_with = "pubkey_from_str")]
    pub pool: Pubkey,
    #[serde(default)]
    pub locked: Option<u64>,
    #[serde(default)]
    pub bonds: Option<u64>,
    #[serde(default)]
    pub forever: Option<u64>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl OffchainSubscription {
    /// Everything this record keeps locked, saturating.
    pub fn total_locked(&self) -> u64 {
        [self.locked, self.bonds, self.forever]
            .into_iter()
            .flatten()
            .fold(0u64, u64::saturating_add)
    }
}

/// Validate a subscription API response body.
pub fn parse_subscriptions(body: &str) -> Result<Vec<OffchainSubscription>> {
    serde_json::from_str(body).map_err(|e| WidgetError::Schema(e.to_string()))
}

/// Total locked in `pool` across `subscriptions`.
pub fn locked_total(subscriptions: &[OffchainSubscription], pool: &Pubkey) -> u64 {
    subscriptions
        .iter()
        .filter(|s| &s.pool == pool)
        .map(OffchainSubscription::total_locked)
        .fold(0u64, u64::saturating_add)
}

pub struct SubscriptionClient {
    http: reqwest::Client,
    base_url: String,
}

impl SubscriptionClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn url_for(&self, owner: &Pubkey) -> String {
        format!("{}/subscriptions/{}", self.base_url.trim_end_matches('/'), owner)
    }

    /// Subscriptions held by `owner`; an owner unknown to the API has none.
    pub async fn fetch(&self, owner: &Pubkey) -> Result<Vec<OffchainSubscription>> {
        let response = self.http.get(self.url_for(owner)).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            debug!("no subscriptions for {}", owner);
            return Ok(Vec::new());
        }
        let body = response.error_for_status()?.text().await?;
        parse_subscriptions(&body)
    }
}
