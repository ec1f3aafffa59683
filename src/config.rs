//! Environment-driven configuration. Every knob has a default suited to a
//! local `testrpc -d` node, so a bare invocation works out of the box.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::abi::Address;

/// The first deterministic account of `testrpc -d`. Transactions are sent
/// from unlocked node accounts, so no key material lives here.
const DEFAULT_DEPLOYER: &str = "0x90f8bf6a479f320ead074411a4b0e7944ea8c9c1";

#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_url: String,
    pub abi_file: String,
    pub evm_file: String,
    pub gas_budget: u64,
    pub deployer: Address,
    pub test_deadline: Option<Duration>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let rpc_url =
            env::var("ETH_RPC_URL").unwrap_or_else(|_| "http://localhost:8545".to_string());
        let abi_file = env::var("ABI_FILE").unwrap_or_else(|_| "erc20_abi.json".to_string());
        let evm_file = env::var("EVM_FILE").unwrap_or_else(|_| "erc20_evm.dat".to_string());

        let gas_budget = env::var("GAS_BUDGET")
            .unwrap_or_else(|_| "4000000".to_string())
            .parse::<u64>()
            .context("Invalid GAS_BUDGET")?;

        let deployer = Address::from_str(
            &env::var("DEPLOYER_ADDRESS").unwrap_or_else(|_| DEFAULT_DEPLOYER.to_string()),
        )
        .context("Invalid DEPLOYER_ADDRESS")?;

        let deadline_seconds = env::var("TEST_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| "300".to_string())
            .parse::<u64>()
            .context("Invalid TEST_TIMEOUT_SECONDS")?;
        // Zero disables the per-test deadline entirely
        let test_deadline = (deadline_seconds > 0).then(|| Duration::from_secs(deadline_seconds));

        let config = Self {
            rpc_url,
            abi_file,
            evm_file,
            gas_budget,
            deployer,
            test_deadline,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.rpc_url.starts_with("http://") && !self.rpc_url.starts_with("https://") {
            anyhow::bail!("ETH_RPC_URL must be an http(s) endpoint, got {}", self.rpc_url);
        }
        if self.gas_budget == 0 {
            anyhow::bail!("GAS_BUDGET must be positive");
        }
        Ok(())
    }
}

/// Install the process-wide tracing subscriber. Verbosity comes from the
/// numeric `DEBUG` variable (0..=3), with `RUST_LOG` taking precedence
/// when set.
pub fn init_tracing(default_directive: &str) {
    let directive = debug_directive(env::var("DEBUG").ok().as_deref(), default_directive);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// `DEBUG=0` is summary-only output; each step up adds a level.
fn debug_directive<'a>(debug: Option<&str>, default: &'a str) -> &'a str {
    match debug {
        Some("0") => "warn",
        Some("1") => "info",
        Some("2") => "debug",
        Some("3") => "trace",
        Some(_) => "info",
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_deployer_parses() {
        let addr = Address::from_str(DEFAULT_DEPLOYER).unwrap();
        assert_eq!(addr.to_string(), DEFAULT_DEPLOYER);
    }

    #[test]
    fn debug_levels_map_onto_directives() {
        assert_eq!(debug_directive(Some("0"), "warn"), "warn");
        assert_eq!(debug_directive(Some("1"), "warn"), "info");
        assert_eq!(debug_directive(Some("2"), "warn"), "debug");
        assert_eq!(debug_directive(Some("3"), "warn"), "trace");
        assert_eq!(debug_directive(Some("junk"), "warn"), "info");
        assert_eq!(debug_directive(None, "warn"), "warn");
    }

    #[test]
    fn validate_rejects_bad_scheme() {
        let config = Config {
            rpc_url: "ws://localhost:8545".to_string(),
            abi_file: "erc20_abi.json".to_string(),
            evm_file: "erc20_evm.dat".to_string(),
            gas_budget: 4_000_000,
            deployer: Address::from_str(DEFAULT_DEPLOYER).unwrap(),
            test_deadline: None,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_gas() {
        let config = Config {
            rpc_url: "http://localhost:8545".to_string(),
            abi_file: "erc20_abi.json".to_string(),
            evm_file: "erc20_evm.dat".to_string(),
            gas_budget: 0,
            deployer: Address::from_str(DEFAULT_DEPLOYER).unwrap(),
            test_deadline: None,
        };
        assert!(config.validate().is_err());
    }
}
