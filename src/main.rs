use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::info;

use erc20_harness::abi::{self, Abi};
use erc20_harness::config::{self, Config};
use erc20_harness::orchestrator::Orchestrator;
use erc20_harness::rpc::HttpTransport;
use erc20_harness::suite;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    config::init_tracing("warn");

    let config = Config::from_env()?;
    info!("target node: {}", config.rpc_url);

    // An optional first argument narrows the run to matching test names
    let queue = match std::env::args().nth(1) {
        Some(pattern) => {
            let re = Regex::new(&pattern)
                .with_context(|| format!("Invalid test filter pattern: {pattern}"))?;
            suite::all_tests()
                .into_iter()
                .filter(|case| re.is_match(case.name))
                .collect()
        }
        None => suite::all_tests(),
    };

    let abi = Rc::new(Abi::load(Path::new(&config.abi_file))?);
    let bytecode = abi::load_bytecode(Path::new(&config.evm_file))?;
    let transport = Rc::new(HttpTransport::new(config.rpc_url.clone()));

    let orchestrator = Orchestrator::new(
        transport,
        abi,
        bytecode,
        config.deployer,
        config.gas_budget,
        config.test_deadline,
    );
    let summary = orchestrator.run(&queue).await;

    if !summary.all_passed() {
        std::process::exit(1);
    }
    Ok(())
}
