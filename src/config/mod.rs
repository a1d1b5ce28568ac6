//! Environment-driven configuration.
//!
//! Everything the relayer needs comes from environment variables (a local
//! `.env` is loaded at startup). Required values error out at boot with the
//! variable name; tunables fall back to defaults from [`crate::constants`].

use std::env;

use alloy::primitives::Address;
use thiserror::Error;

use crate::constants::{
    DEFAULT_EXECUTION_SCHEDULE, DEFAULT_MAX_RETRIES, DEFAULT_PAGE_SIZE,
    DEFAULT_RECONCILIATION_SCHEDULE, DEFAULT_TREASURY_SCHEDULE, DEFAULT_VERIFICATION_SCHEDULE,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("Invalid value for {var}: {reason}")]
    InvalidValue { var: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct RelayerConfig {
    /// Name of the connected chain as registered with the hub.
    pub chain_name: String,
    pub chain_id: u64,
    pub rpc_url: String,
    pub rpc_timeout_seconds: u64,
    pub redis_url: String,
    /// Base URL of the protocol hub API.
    pub hub_url: String,
    pub hub_api_key: String,
    /// Hex private key of the relayer account.
    pub relayer_private_key: String,
    pub gateway_address: Address,
    pub gas_service_address: Address,
    pub its_address: Address,
    /// Wrapped-native token held by the gas service, when the chain has one.
    pub wrapped_token_address: Option<Address>,
    pub operator_webhook_url: Option<String>,
    pub operator_webhook_secret: Option<String>,
    pub page_size: u32,
    pub max_retries: u32,
    /// When set, messages whose gas budget cannot cover the estimated cost
    /// are failed instead of attempted.
    pub strict_budget_check: bool,
    pub execution_schedule: String,
    pub reconciliation_schedule: String,
    pub verification_schedule: String,
    pub treasury_schedule: String,
}

fn required(var: &str) -> Result<String, ConfigError> {
    env::var(var).map_err(|_| ConfigError::MissingEnv(var.to_string()))
}

fn required_address(var: &str) -> Result<Address, ConfigError> {
    required(var)?
        .parse::<Address>()
        .map_err(|e| ConfigError::InvalidValue {
            var: var.to_string(),
            reason: e.to_string(),
        })
}

fn optional_address(var: &str) -> Result<Option<Address>, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw
            .parse::<Address>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                var: var.to_string(),
                reason: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

fn parsed_or<T: std::str::FromStr>(var: &str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            var: var.to_string(),
            reason: format!("cannot parse {:?}", raw),
        }),
        Err(_) => Ok(default),
    }
}

fn string_or(var: &str, default: &str) -> String {
    env::var(var).unwrap_or_else(|_| default.to_string())
}

impl RelayerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            chain_name: required("CHAIN_NAME")?,
            chain_id: parsed_or("CHAIN_ID", 0u64).and_then(|id| {
                if id == 0 {
                    Err(ConfigError::MissingEnv("CHAIN_ID".to_string()))
                } else {
                    Ok(id)
                }
            })?,
            rpc_url: required("RPC_URL")?,
            rpc_timeout_seconds: parsed_or("RPC_TIMEOUT_SECONDS", 30)?,
            redis_url: required("REDIS_URL")?,
            hub_url: required("HUB_URL")?,
            hub_api_key: required("HUB_API_KEY")?,
            relayer_private_key: required("RELAYER_PRIVATE_KEY")?,
            gateway_address: required_address("GATEWAY_ADDRESS")?,
            gas_service_address: required_address("GAS_SERVICE_ADDRESS")?,
            its_address: required_address("ITS_ADDRESS")?,
            wrapped_token_address: optional_address("WRAPPED_TOKEN_ADDRESS")?,
            operator_webhook_url: env::var("OPERATOR_WEBHOOK_URL").ok(),
            operator_webhook_secret: env::var("OPERATOR_WEBHOOK_SECRET").ok(),
            page_size: parsed_or("PAGE_SIZE", DEFAULT_PAGE_SIZE)?,
            max_retries: parsed_or("MAX_RETRIES", DEFAULT_MAX_RETRIES)?,
            strict_budget_check: parsed_or("STRICT_BUDGET_CHECK", false)?,
            execution_schedule: string_or("EXECUTION_SCHEDULE", DEFAULT_EXECUTION_SCHEDULE),
            reconciliation_schedule: string_or(
                "RECONCILIATION_SCHEDULE",
                DEFAULT_RECONCILIATION_SCHEDULE,
            ),
            verification_schedule: string_or(
                "VERIFICATION_SCHEDULE",
                DEFAULT_VERIFICATION_SCHEDULE,
            ),
            treasury_schedule: string_or("TREASURY_SCHEDULE", DEFAULT_TREASURY_SCHEDULE),
        })
    }
}
