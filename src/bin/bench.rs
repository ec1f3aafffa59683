use std::path::Path;
use std::rc::Rc;

use anyhow::Result;
use tracing::info;

use erc20_harness::abi::{self, Abi};
use erc20_harness::bench;
use erc20_harness::config::{self, Config};
use erc20_harness::rpc::HttpTransport;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    config::init_tracing("warn");

    let config = Config::from_env()?;
    info!("target node: {}", config.rpc_url);

    // An optional first argument points at an alternative compiled contract
    let evm_file = std::env::args().nth(1).unwrap_or(config.evm_file.clone());

    let abi = Rc::new(Abi::load(Path::new(&config.abi_file))?);
    let bytecode = abi::load_bytecode(Path::new(&evm_file))?;
    let transport = Rc::new(HttpTransport::new(config.rpc_url.clone()));

    bench::run_benchmark(
        transport,
        abi,
        &bytecode,
        config.deployer,
        config.gas_budget,
    )
    .await
}
