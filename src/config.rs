//! Relay Configuration
//!
//! Settings read from the environment:
//!
//! | variable                      | default                  |
//! |-------------------------------|--------------------------|
//! | `SUBSTRATE_RPC_URL`           | `http://127.0.0.1:9944`  |
//! | `SUBSTRATE_RPC_TIMEOUT_SECS`  | `15`                     |
//! | `SUBSTRATE_MORTALITY_PERIOD`  | `64` (`0`/`immortal`)    |
//! | `SUBSTRATE_NONCE_POLICY`      | `zero-when-absent`       |
//! | `SUBSTRATE_TIP`               | `0`                      |
//! | `SUBSTRATE_SS58_PREFIX`       | `42`                     |
//! | `SUBSTRATE_SIGNED_EXTENSIONS` | node template list       |

use crate::error::{RelayError, RelayResult};
use crate::log_warn;
use crate::tx::era::{MAX_PERIOD, MIN_PERIOD};
use crate::tx::payload::{default_signed_extensions, Mortality, NoncePolicy, PayloadConfig};
use crate::types::{MAX_SS58_PREFIX, SUBSTRATE_SS58_PREFIX};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9944";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_MORTALITY_PERIOD: u64 = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    pub rpc_url: String,
    pub request_timeout_secs: u64,
    pub mortality: Mortality,
    pub nonce_policy: NoncePolicy,
    pub tip: u128,
    pub signed_extensions: Vec<String>,
    pub ss58_prefix: u16,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            mortality: Mortality::Mortal(DEFAULT_MORTALITY_PERIOD),
            nonce_policy: NoncePolicy::default(),
            tip: 0,
            signed_extensions: default_signed_extensions(),
            ss58_prefix: SUBSTRATE_SS58_PREFIX,
        }
    }
}

impl RelayConfig {
    /// Read from process environment, then validate
    pub fn from_env() -> RelayResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read through an arbitrary variable lookup, then validate
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> RelayResult<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup("SUBSTRATE_RPC_URL") {
            config.rpc_url = url.trim().to_string();
        }
        if let Some(secs) = lookup("SUBSTRATE_RPC_TIMEOUT_SECS") {
            config.request_timeout_secs = parse_number("SUBSTRATE_RPC_TIMEOUT_SECS", &secs)?;
        }
        if let Some(period) = lookup("SUBSTRATE_MORTALITY_PERIOD") {
            config.mortality = parse_mortality(&period)?;
        }
        if let Some(policy) = lookup("SUBSTRATE_NONCE_POLICY") {
            config.nonce_policy = NoncePolicy::from_name(&policy).ok_or_else(|| {
                RelayError::invalid_input(format!("SUBSTRATE_NONCE_POLICY: unknown policy '{}'", policy))
            })?;
        }
        if let Some(tip) = lookup("SUBSTRATE_TIP") {
            config.tip = parse_number("SUBSTRATE_TIP", &tip)?;
        }
        if let Some(prefix) = lookup("SUBSTRATE_SS58_PREFIX") {
            config.ss58_prefix = parse_number("SUBSTRATE_SS58_PREFIX", &prefix)?;
        }
        if let Some(list) = lookup("SUBSTRATE_SIGNED_EXTENSIONS") {
            config.signed_extensions = list
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        config.validate()?;
        Ok(config)
    }

    /// Check ranges and normalize the endpoint. `ws://` and `wss://` become
    /// `http://` and `https://`.
    pub fn validate(&mut self) -> RelayResult<()> {
        let mut parsed = Url::parse(&self.rpc_url)
            .map_err(|e| RelayError::invalid_input(format!("Invalid RPC URL '{}': {}", self.rpc_url, e)))?;

        let http_scheme = match parsed.scheme() {
            "http" | "ws" => "http",
            "https" | "wss" => "https",
            other => {
                return Err(RelayError::invalid_input(format!("Unsupported RPC URL scheme: {}", other)));
            }
        };
        if parsed.scheme() != http_scheme && parsed.set_scheme(http_scheme).is_err() {
            return Err(RelayError::invalid_input(format!("Cannot rewrite RPC URL scheme of {}", self.rpc_url)));
        }

        if http_scheme == "http" {
            let local = matches!(parsed.host_str(), Some("localhost") | Some("127.0.0.1") | Some("[::1]"));
            if !local {
                log_warn!("config", "Plain HTTP to a remote node", rpc_url = parsed);
            }
        }
        self.rpc_url = parsed.to_string().trim_end_matches('/').to_string();

        if self.request_timeout_secs == 0 {
            return Err(RelayError::invalid_input("Request timeout must be at least 1 second"));
        }
        if let Mortality::Mortal(period) = self.mortality {
            if period < MIN_PERIOD {
                return Err(RelayError::invalid_input(format!(
                    "Mortality period {} is below the minimum of {}",
                    period, MIN_PERIOD
                )));
            }
            if period > MAX_PERIOD {
                log_warn!("config", "Mortality period clamped", requested = period, period = MAX_PERIOD);
            }
        }
        if self.ss58_prefix > MAX_SS58_PREFIX {
            return Err(RelayError::invalid_input(format!(
                "SS58 prefix {} exceeds {}",
                self.ss58_prefix, MAX_SS58_PREFIX
            )));
        }
        if self.signed_extensions.iter().any(|e| e.trim().is_empty()) {
            return Err(RelayError::invalid_input("Signed extension names must not be empty"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Settings handed to the payload builder
    pub fn payload_config(&self) -> PayloadConfig {
        PayloadConfig {
            mortality: self.mortality,
            nonce_policy: self.nonce_policy,
            tip: self.tip,
            signed_extensions: self.signed_extensions.clone(),
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> RelayResult<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| RelayError::invalid_input(format!("{}: invalid value '{}': {}", key, value, e)))
}

fn parse_mortality(value: &str) -> RelayResult<Mortality> {
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("immortal") || trimmed == "0" {
        return Ok(Mortality::Immortal);
    }
    Ok(Mortality::Mortal(parse_number("SUBSTRATE_MORTALITY_PERIOD", trimmed)?))
}
