//! Widget configuration.
//!
//! A [`WidgetConfig`] is assembled from the options the host page passes to
//! `init` and from the deployment environment. Required values are checked
//! in a fixed order and the first missing one is reported.

use std::str::FromStr;

use anchor_lang::prelude::Pubkey;
use serde::Deserialize;

use crate::constants::DEFAULT_MIN_FEE_BALANCE;
use crate::error::{Result, WidgetError};
use crate::relay::RelayEncoding;
use crate::rewards::RewardFormula;

pub const DEFAULT_CLASS_PREFIX: &str = "acs__";

/// Options passed by the host page, camelCase as in the embed snippet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedOptions {
    pub pool_id: Option<String>,
    pub pool_name: Option<String>,
    pub class_prefix: Option<String>,
    pub min_fee_balance: Option<u64>,
    pub max_priority_fee_lamports: Option<u64>,
    pub relay_encoding: Option<RelayEncoding>,
    /// `"truncated"` (default) or `"rounded"`.
    pub reward_formula: Option<String>,
}

impl EmbedOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| WidgetError::InvalidOption {
            name: "init",
            reason: e.to_string(),
        })
    }
}

/// Deployment settings read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub rpc_url: String,
    pub program_id: Pubkey,
    pub fee_payer_url: String,
    pub unstake_base_url: String,
    pub get_acs_url: String,
    pub subscriptions_url: Option<String>,
}

impl Environment {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source; empty values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &'static str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(WidgetError::MissingEnv(key));

        let rpc_url = require("SOLANA_RPC_URL")?;
        let program_id = parse_pubkey("PROGRAM_ID", &require("PROGRAM_ID")?)?;
        let fee_payer_url = require("FEE_PAYER_URL")?;
        let unstake_base_url = require("UNSTAKE_BASE_URL")?;
        let get_acs_url = require("GET_ACS_URL")?;

        Ok(Self {
            rpc_url,
            program_id,
            fee_payer_url,
            unstake_base_url,
            get_acs_url,
            subscriptions_url: get("SUBSCRIPTIONS_URL"),
        })
    }
}

fn parse_pubkey(name: &'static str, value: &str) -> Result<Pubkey> {
    Pubkey::from_str(value.trim()).map_err(|e| WidgetError::InvalidOption {
        name,
        reason: e.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetConfig {
    pub pool_id: Pubkey,
    pub pool_name: String,
    pub class_prefix: String,
    pub rpc_url: String,
    pub program_id: Pubkey,
    pub fee_payer_url: String,
    pub unstake_base_url: String,
    pub get_acs_url: String,
    pub subscriptions_url: Option<String>,
    /// Below this native balance the fee-payer relay pays for transactions.
    pub min_fee_balance: u64,
    pub max_priority_fee_lamports: u64,
    pub relay_encoding: RelayEncoding,
    pub reward_formula: RewardFormula,
}

impl WidgetConfig {
    pub fn new(options: EmbedOptions, env: Environment) -> Result<Self> {
        let pool_id = options
            .pool_id
            .filter(|v| !v.trim().is_empty())
            .ok_or(WidgetError::MissingOption("poolId"))?;
        let pool_id = parse_pubkey("poolId", &pool_id)?;
        let pool_name = options
            .pool_name
            .filter(|v| !v.trim().is_empty())
            .ok_or(WidgetError::MissingOption("poolName"))?;

        let reward_formula = match options.reward_formula.as_deref() {
            None | Some("truncated") => RewardFormula::TRUNCATED_32,
            Some("rounded") => RewardFormula::ROUNDED_31,
            Some(other) => {
                return Err(WidgetError::InvalidOption {
                    name: "rewardFormula",
                    reason: format!("unknown formula '{}'", other),
                })
            }
        };

        Ok(Self {
            pool_id,
            pool_name,
            class_prefix: options
                .class_prefix
                .unwrap_or_else(|| DEFAULT_CLASS_PREFIX.to_string()),
            rpc_url: env.rpc_url,
            program_id: env.program_id,
            fee_payer_url: env.fee_payer_url,
            unstake_base_url: env.unstake_base_url,
            get_acs_url: env.get_acs_url,
            subscriptions_url: env.subscriptions_url,
            min_fee_balance: options.min_fee_balance.unwrap_or(DEFAULT_MIN_FEE_BALANCE),
            max_priority_fee_lamports: options.max_priority_fee_lamports.unwrap_or(0),
            relay_encoding: options.relay_encoding.unwrap_or_default(),
            reward_formula,
        })
    }

    pub fn from_embed_json(json: &str, env: Environment) -> Result<Self> {
        Self::new(EmbedOptions::from_json(json)?, env)
    }

    /// Link to the unstake page of the configured pool.
    pub fn unstake_url(&self) -> String {
        format!("{}/{}", self.unstake_base_url.trim_end_matches('/'), self.pool_id)
    }
}
