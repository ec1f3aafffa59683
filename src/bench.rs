//! Gas benchmark. Deploys one instance and drives a fixed transaction
//! script over it, reporting the gas consumed by each step. Read-only
//! operations are deliberately submitted as transactions so they get
//! metered like everything else.

use std::rc::Rc;

use anyhow::Result;
use num_bigint::BigUint;
use tracing::{info, warn};

use crate::abi::{Abi, Address, Token};
use crate::rpc::Transport;
use crate::session::Session;
use crate::suite::{ADDR0, ADDR1, ADDR2};

fn addr(a: Address) -> Token {
    Token::Address(a)
}

fn uint(v: u64) -> Token {
    Token::Uint(BigUint::from(v))
}

/// One scripted step: a named operation, its arguments, and the account it
/// is submitted from. The transferFrom steps go out from the approved
/// spender, not the owner; everything else from the deployer.
struct BenchStep {
    label: &'static str,
    from: Address,
    method: &'static str,
    args: Vec<Token>,
}

fn script(deployer: Address) -> Vec<BenchStep> {
    vec![
        BenchStep { label: "name()", from: deployer, method: "name", args: vec![] },
        BenchStep { label: "symbol()", from: deployer, method: "symbol", args: vec![] },
        BenchStep { label: "decimals()", from: deployer, method: "decimals", args: vec![] },
        BenchStep { label: "totalSupply()", from: deployer, method: "totalSupply", args: vec![] },
        BenchStep {
            label: "transfer(100)",
            from: deployer,
            method: "transfer",
            args: vec![addr(ADDR1), uint(100)],
        },
        BenchStep {
            label: "transfer(100) again",
            from: deployer,
            method: "transfer",
            args: vec![addr(ADDR1), uint(100)],
        },
        BenchStep {
            label: "balanceOf()",
            from: deployer,
            method: "balanceOf",
            args: vec![addr(ADDR1)],
        },
        BenchStep {
            label: "approve(100)",
            from: deployer,
            method: "approve",
            args: vec![addr(ADDR1), uint(100)],
        },
        BenchStep {
            label: "transferFrom(42)",
            from: ADDR1,
            method: "transferFrom",
            args: vec![addr(ADDR0), addr(ADDR2), uint(42)],
        },
        BenchStep {
            label: "transferFrom(42) again",
            from: ADDR1,
            method: "transferFrom",
            args: vec![addr(ADDR0), addr(ADDR2), uint(42)],
        },
        BenchStep {
            label: "approve(0)",
            from: deployer,
            method: "approve",
            args: vec![addr(ADDR1), uint(0)],
        },
        BenchStep {
            label: "allowance()",
            from: deployer,
            method: "allowance",
            args: vec![addr(ADDR1), addr(ADDR2)],
        },
    ]
}

pub async fn run_benchmark(
    transport: Rc<dyn Transport>,
    abi: Rc<Abi>,
    bytecode: &[u8],
    deployer: Address,
    gas_budget: u64,
) -> Result<()> {
    let session = Session::deploy(transport, abi, bytecode, deployer, gas_budget).await?;
    println!("deploy: {} gas", session.deploy_receipt.gas_used);

    for step in script(deployer) {
        match session.send_named(step.from, step.method, &step.args).await {
            Ok(record) => {
                println!("{}: {} gas", step.label, record.receipt.gas_used);
                info!("{} ok, tx {}", step.label, record.receipt.transaction_hash);
            }
            Err(e) => {
                println!("{}: failed ({e})", step.label);
                warn!("{} failed: {}", step.label, e);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use crate::testkit::{test_abi, MockChain};
    use num_bigint::BigUint;

    #[test]
    fn transfer_from_steps_are_sent_by_the_spender() {
        let steps = script(ADDR0);
        for step in &steps {
            if step.method == "transferFrom" {
                assert_eq!(step.from, ADDR1);
            } else {
                assert_eq!(step.from, ADDR0);
            }
        }
        assert_eq!(
            steps.iter().filter(|s| s.method == "transferFrom").count(),
            2
        );
    }

    #[tokio::test]
    async fn spender_can_spend_an_approved_allowance() {
        let chain = Rc::new(MockChain::new());
        let session = Session::deploy(chain, Rc::new(test_abi()), &[0x60, 0x00], ADDR0, 4_000_000)
            .await
            .unwrap();
        session.approve(ADDR0, ADDR1, BigUint::from(100u8)).await.unwrap();

        // The owner holds no allowance on itself; only the spender may pull
        let args = [addr(ADDR0), addr(ADDR2), uint(42)];
        assert!(session.send_named(ADDR0, "transferFrom", &args).await.is_err());
        let record = session.send_named(ADDR1, "transferFrom", &args).await.unwrap();
        assert!(record.receipt.gas_used > 0);
        assert_eq!(
            session.balance_of(ADDR2).await.unwrap(),
            BigUint::from(42u8)
        );
    }

    #[tokio::test]
    async fn script_runs_to_completion() {
        let chain = Rc::new(MockChain::new());
        run_benchmark(
            chain.clone(),
            Rc::new(crate::testkit::test_abi()),
            &[0x60, 0x00],
            ADDR0,
            4_000_000,
        )
        .await
        .unwrap();
        assert_eq!(chain.deployed_count(), 1);
    }
}
