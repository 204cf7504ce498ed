//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Contract addresses are well-formed (checksummed when mixed case)
//! - RPC URLs parse and use an HTTP scheme
//! - Value ranges (intervals > 0, known log level)
//!
//! # Design Decisions
//! - Returns all issues, not just the first
//! - Pure function: CoordinatorConfig → Result<(), Vec<ConfigIssue>>

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::CoordinatorConfig;
use crate::validation::parse_address;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// One semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ConfigIssue {
    pub field: String,
    pub message: String,
}

impl ConfigIssue {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

fn check_address(issues: &mut Vec<ConfigIssue>, field: &str, value: &str) {
    if value.is_empty() {
        issues.push(ConfigIssue::new(field, "address is required"));
    } else if parse_address(value).is_none() {
        issues.push(ConfigIssue::new(
            field,
            format!("'{value}' is not a valid address"),
        ));
    }
}

fn check_rpc_url(issues: &mut Vec<ConfigIssue>, field: &str, value: &str) {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => issues.push(ConfigIssue::new(
            field,
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => issues.push(ConfigIssue::new(field, format!("invalid URL: {e}"))),
    }
}

fn check_positive(issues: &mut Vec<ConfigIssue>, field: &str, value: u64) {
    if value == 0 {
        issues.push(ConfigIssue::new(field, "must be greater than zero"));
    }
}

/// Validates `config`, collecting every issue.
pub fn validate_config(config: &CoordinatorConfig) -> Result<(), Vec<ConfigIssue>> {
    let mut issues = Vec::new();

    let contracts = &config.contracts;
    check_address(&mut issues, "contracts.token_address", &contracts.token_address);
    check_address(&mut issues, "contracts.spender_address", &contracts.spender_address);
    check_address(&mut issues, "contracts.source_wallet", &contracts.source_wallet);
    check_address(&mut issues, "contracts.recipient_address", &contracts.recipient_address);

    let refresh = &config.refresh;
    check_positive(
        &mut issues,
        "refresh.connection_poll_interval_ms",
        refresh.connection_poll_interval_ms,
    );

    let chain = &config.blockchain;
    check_rpc_url(&mut issues, "blockchain.rpc_url", &chain.rpc_url);
    for (i, url) in chain.failover_urls.iter().enumerate() {
        check_rpc_url(&mut issues, &format!("blockchain.failover_urls[{i}]"), url);
    }
    check_positive(&mut issues, "blockchain.chain_id", chain.chain_id);
    check_positive(&mut issues, "blockchain.rpc_timeout_secs", chain.rpc_timeout_secs);
    check_positive(&mut issues, "blockchain.confirmation_poll_ms", chain.confirmation_poll_ms);
    if let Some(secs) = chain.confirmation_timeout_secs {
        check_positive(&mut issues, "blockchain.confirmation_timeout_secs", secs);
    }

    let obs = &config.observability;
    if !LOG_LEVELS.contains(&obs.log_level.to_lowercase().as_str()) {
        issues.push(ConfigIssue::new(
            "observability.log_level",
            format!("unknown level '{}'", obs.log_level),
        ));
    }
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        issues.push(ConfigIssue::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", obs.metrics_address),
        ));
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}
