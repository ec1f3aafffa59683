//! Subject session: one freshly deployed, zero-state token instance.
//!
//! A session is created immediately before its test case runs, lives only
//! for that test, and is never shared, so no two test cases can observe each
//! other's state mutations. Deployment resolves exactly once, with the
//! terminal receipt; the transport absorbs any intermediate pending
//! notification internally.

use std::rc::Rc;

use num_bigint::BigUint;
use tracing::debug;

use crate::abi::{self, Abi, Address, DecodedEvent, Token};
use crate::error::HarnessError;
use crate::rpc::{Receipt, Transport, TxRequest};

/// A confirmed state-mutating call: the receipt plus the events it emitted,
/// decoded against the declared interface.
#[derive(Debug)]
pub struct TxRecord {
    pub receipt: Receipt,
    pub events: Vec<DecodedEvent>,
}

pub type TxResult = Result<TxRecord, HarnessError>;

/// Handle to one deployed instance, exposing its declared operations.
pub struct Session {
    transport: Rc<dyn Transport>,
    abi: Rc<Abi>,
    pub address: Address,
    pub deploy_receipt: Receipt,
    gas_budget: u64,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("address", &self.address)
            .field("deploy_receipt", &self.deploy_receipt)
            .field("gas_budget", &self.gas_budget)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Deploy a fresh instance. Failure here is fatal to the owning test
    /// only; the orchestrator records it and moves on.
    pub async fn deploy(
        transport: Rc<dyn Transport>,
        abi: Rc<Abi>,
        bytecode: &[u8],
        deployer: Address,
        gas_budget: u64,
    ) -> Result<Self, HarnessError> {
        if bytecode.is_empty() {
            return Err(HarnessError::Deployment("empty bytecode payload".into()));
        }
        let receipt = transport
            .deploy(deployer, bytecode, gas_budget)
            .await
            .map_err(|e| HarnessError::Deployment(e.to_string()))?;
        let address = receipt.contract_address.ok_or_else(|| {
            HarnessError::Deployment("receipt carries no instance address".into())
        })?;
        debug!("contract deployed to {}", address);
        Ok(Self {
            transport,
            abi,
            address,
            deploy_receipt: receipt,
            gas_budget,
        })
    }

    async fn query(&self, method: &str, args: &[Token]) -> Result<Vec<u8>, HarnessError> {
        let func = self
            .abi
            .function(method)
            .ok_or_else(|| HarnessError::CallFailed(format!("undeclared operation {method}")))?;
        let data = abi::encode_call(func, args)?;
        debug!("query {} on {}", method, self.address);
        self.transport.call(self.address, &data).await
    }

    /// Issue a declared operation as a transaction and wait for its receipt.
    /// Also used by the benchmark script to put a gas figure on constant
    /// functions.
    pub async fn send_named(&self, from: Address, method: &str, args: &[Token]) -> TxResult {
        let func = self
            .abi
            .function(method)
            .ok_or_else(|| HarnessError::CallFailed(format!("undeclared operation {method}")))?;
        let data = abi::encode_call(func, args)?;
        debug!("send {} from {}", method, from);
        let receipt = self
            .transport
            .send_transaction(&TxRequest::call(from, self.address, data, self.gas_budget))
            .await?;
        let events = self.abi.decode_events(&receipt.logs);
        Ok(TxRecord { receipt, events })
    }

    // ------------------------------------------------------------------
    // Declared queries

    pub async fn name(&self) -> Result<String, HarnessError> {
        abi::decode_string(&self.query("name", &[]).await?)
    }

    pub async fn symbol(&self) -> Result<String, HarnessError> {
        abi::decode_string(&self.query("symbol", &[]).await?)
    }

    pub async fn decimals(&self) -> Result<BigUint, HarnessError> {
        abi::decode_uint(&self.query("decimals", &[]).await?)
    }

    pub async fn total_supply(&self) -> Result<BigUint, HarnessError> {
        abi::decode_uint(&self.query("totalSupply", &[]).await?)
    }

    pub async fn balance_of(&self, owner: Address) -> Result<BigUint, HarnessError> {
        abi::decode_uint(&self.query("balanceOf", &[Token::Address(owner)]).await?)
    }

    pub async fn allowance(
        &self,
        owner: Address,
        spender: Address,
    ) -> Result<BigUint, HarnessError> {
        abi::decode_uint(
            &self
                .query(
                    "allowance",
                    &[Token::Address(owner), Token::Address(spender)],
                )
                .await?,
        )
    }

    // ------------------------------------------------------------------
    // Declared transactions

    pub async fn transfer(&self, from: Address, to: Address, amount: BigUint) -> TxResult {
        self.send_named(from, "transfer", &[Token::Address(to), Token::Uint(amount)])
            .await
    }

    pub async fn approve(&self, from: Address, spender: Address, amount: BigUint) -> TxResult {
        self.send_named(
            from,
            "approve",
            &[Token::Address(spender), Token::Uint(amount)],
        )
        .await
    }

    pub async fn transfer_from(
        &self,
        sender: Address,
        from: Address,
        to: Address,
        amount: BigUint,
    ) -> TxResult {
        self.send_named(
            sender,
            "transferFrom",
            &[
                Token::Address(from),
                Token::Address(to),
                Token::Uint(amount),
            ],
        )
        .await
    }

    // ------------------------------------------------------------------
    // Raw surface, bypassing the declared encoding, for malformed-payload
    // and undeclared-selector tests.

    pub async fn raw_call(&self, data: &[u8]) -> Result<Vec<u8>, HarnessError> {
        debug!("raw call on {} ({} bytes)", self.address, data.len());
        self.transport.call(self.address, data).await
    }

    pub async fn raw_send(&self, from: Address, data: Vec<u8>, value: BigUint) -> TxResult {
        debug!("raw send to {} ({} bytes)", self.address, data.len());
        let receipt = self
            .transport
            .send_transaction(&TxRequest {
                from,
                to: Some(self.address),
                data,
                value,
                gas: self.gas_budget,
            })
            .await?;
        let events = self.abi.decode_events(&receipt.logs);
        Ok(TxRecord { receipt, events })
    }

    /// Event-log retrieval scoped to this instance's address.
    pub async fn logs(&self) -> Result<Vec<DecodedEvent>, HarnessError> {
        let raw = self.transport.get_logs(self.address).await?;
        Ok(self.abi.decode_events(&raw))
    }
}
