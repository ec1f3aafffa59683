//! In-memory `Transport` implementation for harness self-tests.
//!
//! `MockChain` emulates the documented behavior of the subject token
//! contract: genesis supply to the deployer, reverts on insufficient
//! balance or allowance, zero-amount no-ops without events, rejection of
//! malformed calldata and attached value. The orchestrator, session,
//! and suite can thus be exercised without a live node.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use async_trait::async_trait;
use num_bigint::BigUint;
use num_traits::Zero;

use crate::abi::{self, Abi, Address, RawLog};
use crate::error::HarnessError;
use crate::rpc::{Receipt, Transport, TxRequest};

/// Genesis balance credited to the deployer of every mock instance.
pub const GENESIS_SUPPLY: u64 = 100;
pub const TOKEN_SYMBOL: &str = "LLL";
pub const TOKEN_NAME: &str = "LLL Coin - love to code in LLL.";

/// The subject's declared call surface, as the suite expects it.
pub const TEST_ABI_JSON: &str = r#"[
    {"type":"function","name":"name","inputs":[],"outputs":[{"name":"","type":"string"}],"constant":true},
    {"type":"function","name":"symbol","inputs":[],"outputs":[{"name":"","type":"string"}],"constant":true},
    {"type":"function","name":"decimals","inputs":[],"outputs":[{"name":"","type":"uint256"}],"constant":true},
    {"type":"function","name":"totalSupply","inputs":[],"outputs":[{"name":"","type":"uint256"}],"constant":true},
    {"type":"function","name":"balanceOf","inputs":[{"name":"_owner","type":"address"}],"outputs":[{"name":"","type":"uint256"}],"constant":true},
    {"type":"function","name":"allowance","inputs":[{"name":"_owner","type":"address"},{"name":"_spender","type":"address"}],"outputs":[{"name":"","type":"uint256"}],"constant":true},
    {"type":"function","name":"transfer","inputs":[{"name":"_to","type":"address"},{"name":"_value","type":"uint256"}],"outputs":[{"name":"","type":"bool"}]},
    {"type":"function","name":"approve","inputs":[{"name":"_spender","type":"address"},{"name":"_value","type":"uint256"}],"outputs":[{"name":"","type":"bool"}]},
    {"type":"function","name":"transferFrom","inputs":[{"name":"_from","type":"address"},{"name":"_to","type":"address"},{"name":"_value","type":"uint256"}],"outputs":[{"name":"","type":"bool"}]},
    {"type":"event","name":"Transfer","inputs":[{"name":"_from","type":"address","indexed":true},{"name":"_to","type":"address","indexed":true},{"name":"_value","type":"uint256","indexed":false}]},
    {"type":"event","name":"Approval","inputs":[{"name":"_owner","type":"address","indexed":true},{"name":"_spender","type":"address","indexed":true},{"name":"_value","type":"uint256","indexed":false}]}
]"#;

pub fn test_abi() -> Abi {
    Abi::from_json(TEST_ABI_JSON).expect("embedded ABI fixture is valid")
}

struct TokenInstance {
    balances: HashMap<Address, BigUint>,
    allowances: HashMap<(Address, Address), BigUint>,
    logs: Vec<RawLog>,
}

struct MockState {
    instances: HashMap<Address, TokenInstance>,
    deployed: u8,
    tx_counter: u64,
}

/// One simulated backing runtime, shared by every session a test run
/// deploys against it. Each deployment gets its own isolated instance.
pub struct MockChain {
    state: RefCell<MockState>,
    fail_next_deploy: Cell<bool>,
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(MockState {
                instances: HashMap::new(),
                deployed: 0,
                tx_counter: 0,
            }),
            fail_next_deploy: Cell::new(false),
        }
    }

    /// Make the next deployment fail, for exercising the fail-fast path.
    pub fn fail_next_deploy(&self) {
        self.fail_next_deploy.set(true);
    }

    /// How many instances have been deployed so far.
    pub fn deployed_count(&self) -> u8 {
        self.state.borrow().deployed
    }

    fn next_tx_hash(state: &mut MockState) -> String {
        state.tx_counter += 1;
        format!("0x{:064x}", state.tx_counter)
    }
}

#[async_trait(?Send)]
impl Transport for MockChain {
    async fn call(&self, to: Address, data: &[u8]) -> Result<Vec<u8>, HarnessError> {
        let mut state = self.state.borrow_mut();
        let instance = state
            .instances
            .get_mut(&to)
            .ok_or_else(|| HarnessError::CallFailed(format!("no contract at {to}")))?;
        // from is irrelevant for the read-only surface
        let (ret, _logs, _gas) = dispatch(instance, Address([0u8; 20]), to, data)?;
        Ok(ret)
    }

    async fn send_transaction(&self, tx: &TxRequest) -> Result<Receipt, HarnessError> {
        if !tx.value.is_zero() {
            return Err(HarnessError::CallFailed(
                "contract does not accept value".into(),
            ));
        }
        let to = tx
            .to
            .ok_or_else(|| HarnessError::CallFailed("transaction without recipient".into()))?;

        let mut state = self.state.borrow_mut();
        let tx_hash = Self::next_tx_hash(&mut state);
        let instance = state
            .instances
            .get_mut(&to)
            .ok_or_else(|| HarnessError::CallFailed(format!("no contract at {to}")))?;

        let (_ret, logs, gas_used) = dispatch(instance, tx.from, to, &tx.data)?;
        instance.logs.extend(logs.iter().cloned());

        Ok(Receipt {
            transaction_hash: tx_hash,
            contract_address: None,
            gas_used,
            logs,
        })
    }

    async fn deploy(
        &self,
        from: Address,
        bytecode: &[u8],
        _gas: u64,
    ) -> Result<Receipt, HarnessError> {
        if self.fail_next_deploy.replace(false) {
            return Err(HarnessError::Deployment("simulated deploy failure".into()));
        }
        if bytecode.is_empty() {
            return Err(HarnessError::Deployment("empty bytecode".into()));
        }

        let mut state = self.state.borrow_mut();
        state.deployed += 1;
        let mut address = Address([0u8; 20]);
        address.0[0] = 0xc0;
        address.0[19] = state.deployed;

        let mut balances = HashMap::new();
        balances.insert(from, BigUint::from(GENESIS_SUPPLY));
        state.instances.insert(
            address,
            TokenInstance {
                balances,
                allowances: HashMap::new(),
                logs: Vec::new(),
            },
        );

        let tx_hash = Self::next_tx_hash(&mut state);
        Ok(Receipt {
            transaction_hash: tx_hash,
            contract_address: Some(address),
            gas_used: 500_000 + bytecode.len() as u64,
            logs: Vec::new(),
        })
    }

    async fn get_logs(&self, address: Address) -> Result<Vec<RawLog>, HarnessError> {
        let state = self.state.borrow();
        let instance = state
            .instances
            .get(&address)
            .ok_or_else(|| HarnessError::CallFailed(format!("no contract at {address}")))?;
        Ok(instance.logs.clone())
    }
}

type ExecOutput = (Vec<u8>, Vec<RawLog>, u64);

fn dispatch(
    instance: &mut TokenInstance,
    from: Address,
    at: Address,
    data: &[u8],
) -> Result<ExecOutput, HarnessError> {
    if data.len() < 4 {
        return Err(HarnessError::CallFailed("calldata too short".into()));
    }
    let sel: [u8; 4] = data[..4].try_into().expect("length checked");
    let args = &data[4..];

    let gas = 21_000 + 68 * data.len() as u64;

    if sel == abi::selector("name()") {
        expect_args(args, 0)?;
        return Ok((encode_string(TOKEN_NAME), Vec::new(), gas));
    }
    if sel == abi::selector("symbol()") {
        expect_args(args, 0)?;
        return Ok((encode_string(TOKEN_SYMBOL), Vec::new(), gas));
    }
    if sel == abi::selector("decimals()") {
        expect_args(args, 0)?;
        return Ok((word(&BigUint::zero()), Vec::new(), gas));
    }
    if sel == abi::selector("totalSupply()") {
        expect_args(args, 0)?;
        return Ok((word(&BigUint::from(GENESIS_SUPPLY)), Vec::new(), gas));
    }
    if sel == abi::selector("balanceOf(address)") {
        expect_args(args, 1)?;
        let owner = arg_address(args, 0)?;
        let balance = instance.balances.get(&owner).cloned().unwrap_or_default();
        return Ok((word(&balance), Vec::new(), gas));
    }
    if sel == abi::selector("allowance(address,address)") {
        expect_args(args, 2)?;
        let owner = arg_address(args, 0)?;
        let spender = arg_address(args, 1)?;
        let allowance = instance
            .allowances
            .get(&(owner, spender))
            .cloned()
            .unwrap_or_default();
        return Ok((word(&allowance), Vec::new(), gas));
    }
    if sel == abi::selector("transfer(address,uint256)") {
        expect_args(args, 2)?;
        let to = arg_address(args, 0)?;
        let value = arg_uint(args, 1);
        let (logs, extra) = do_transfer(instance, at, from, to, &value)?;
        return Ok((word(&BigUint::from(1u8)), logs, gas + extra));
    }
    if sel == abi::selector("approve(address,uint256)") {
        expect_args(args, 2)?;
        let spender = arg_address(args, 0)?;
        let value = arg_uint(args, 1);
        if value > BigUint::from(GENESIS_SUPPLY) {
            return Err(HarnessError::CallFailed(
                "approval exceeds total supply".into(),
            ));
        }
        let current = instance
            .allowances
            .get(&(from, spender))
            .cloned()
            .unwrap_or_default();
        // Changing a live allowance requires passing through zero
        if !current.is_zero() && !value.is_zero() {
            return Err(HarnessError::CallFailed(
                "non-zero allowance must be reset first".into(),
            ));
        }
        instance.allowances.insert((from, spender), value.clone());
        let log = event_log(at, "Approval(address,address,uint256)", from, spender, &value);
        return Ok((word(&BigUint::from(1u8)), vec![log], gas + 5_000));
    }
    if sel == abi::selector("transferFrom(address,address,uint256)") {
        expect_args(args, 3)?;
        let owner = arg_address(args, 0)?;
        let to = arg_address(args, 1)?;
        let value = arg_uint(args, 2);
        // Zero-amount transferFrom is a no-op even without approval
        if value.is_zero() {
            return Ok((word(&BigUint::from(1u8)), Vec::new(), gas));
        }
        let allowance = instance
            .allowances
            .get(&(owner, from))
            .cloned()
            .unwrap_or_default();
        if value > allowance {
            return Err(HarnessError::CallFailed("insufficient allowance".into()));
        }
        let (logs, extra) = do_transfer(instance, at, owner, to, &value)?;
        instance
            .allowances
            .insert((owner, from), allowance - &value);
        return Ok((word(&BigUint::from(1u8)), logs, gas + extra));
    }

    Err(HarnessError::CallFailed(format!(
        "undeclared selector 0x{}",
        hex::encode(sel)
    )))
}

fn do_transfer(
    instance: &mut TokenInstance,
    at: Address,
    from: Address,
    to: Address,
    value: &BigUint,
) -> Result<(Vec<RawLog>, u64), HarnessError> {
    // Zero-amount transfers succeed without touching state or emitting
    if value.is_zero() {
        return Ok((Vec::new(), 0));
    }
    let from_balance = instance.balances.get(&from).cloned().unwrap_or_default();
    if *value > from_balance {
        return Err(HarnessError::CallFailed("insufficient balance".into()));
    }
    // First credit to a fresh account costs a new storage slot
    let extra = if instance.balances.contains_key(&to) {
        5_000
    } else {
        25_000
    };
    instance.balances.insert(from, from_balance - value);
    let to_balance = instance.balances.entry(to).or_default();
    *to_balance += value;
    let log = event_log(at, "Transfer(address,address,uint256)", from, to, value);
    Ok((vec![log], extra))
}

fn event_log(
    at: Address,
    signature: &str,
    indexed_a: Address,
    indexed_b: Address,
    value: &BigUint,
) -> RawLog {
    RawLog {
        address: at,
        topics: vec![
            abi::keccak256(signature.as_bytes()),
            abi::word_from_address(&indexed_a),
            abi::word_from_address(&indexed_b),
        ],
        data: word(value).to_vec(),
    }
}

fn expect_args(args: &[u8], count: usize) -> Result<(), HarnessError> {
    if args.len() != count * 32 {
        return Err(HarnessError::CallFailed(format!(
            "malformed calldata: expected {} argument word(s), got {} bytes",
            count,
            args.len()
        )));
    }
    Ok(())
}

fn arg_word(args: &[u8], index: usize) -> &[u8] {
    &args[index * 32..(index + 1) * 32]
}

fn arg_address(args: &[u8], index: usize) -> Result<Address, HarnessError> {
    let w = arg_word(args, index);
    if w[..12].iter().any(|b| *b != 0) {
        return Err(HarnessError::CallFailed("malformed address argument".into()));
    }
    let mut a = [0u8; 20];
    a.copy_from_slice(&w[12..]);
    Ok(Address(a))
}

fn arg_uint(args: &[u8], index: usize) -> BigUint {
    BigUint::from_bytes_be(arg_word(args, index))
}

fn word(v: &BigUint) -> Vec<u8> {
    abi::word_from_uint(v).to_vec()
}

fn encode_string(s: &str) -> Vec<u8> {
    let mut out = word(&BigUint::from(32u8));
    out.extend_from_slice(&abi::word_from_uint(&BigUint::from(s.len())));
    let mut tail = s.as_bytes().to_vec();
    tail.resize(s.len().div_ceil(32) * 32, 0);
    out.extend_from_slice(&tail);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        let mut a = [0u8; 20];
        a[19] = n;
        Address(a)
    }

    async fn deployed(chain: &MockChain) -> Address {
        chain
            .deploy(addr(1), b"\x60\x60", 4_000_000)
            .await
            .unwrap()
            .contract_address
            .unwrap()
    }

    fn call_data(signature: &str, args: &[[u8; 32]]) -> Vec<u8> {
        let mut data = abi::selector(signature).to_vec();
        for w in args {
            data.extend_from_slice(w);
        }
        data
    }

    #[tokio::test]
    async fn test_isolated_instances() {
        let chain = MockChain::new();
        let first = deployed(&chain).await;
        let second = deployed(&chain).await;
        assert_ne!(first, second);

        // Drain the first instance; the second still holds genesis state
        let transfer = call_data(
            "transfer(address,uint256)",
            &[
                abi::word_from_address(&addr(2)),
                abi::word_from_uint(&BigUint::from(GENESIS_SUPPLY)),
            ],
        );
        chain
            .send_transaction(&TxRequest::call(addr(1), first, transfer, 4_000_000))
            .await
            .unwrap();

        let balance = call_data(
            "balanceOf(address)",
            &[abi::word_from_address(&addr(1))],
        );
        let drained = chain.call(first, &balance).await.unwrap();
        assert_eq!(BigUint::from_bytes_be(&drained), BigUint::zero());
        let fresh = chain.call(second, &balance).await.unwrap();
        assert_eq!(BigUint::from_bytes_be(&fresh), BigUint::from(GENESIS_SUPPLY));
    }

    #[tokio::test]
    async fn test_truncated_and_padded_calldata_revert() {
        let chain = MockChain::new();
        let at = deployed(&chain).await;
        let good = call_data(
            "transfer(address,uint256)",
            &[
                abi::word_from_address(&addr(2)),
                abi::word_from_uint(&BigUint::from(1u8)),
            ],
        );

        let mut truncated = good.clone();
        truncated.pop();
        let err = chain
            .send_transaction(&TxRequest::call(addr(1), at, truncated, 4_000_000))
            .await
            .unwrap_err();
        assert!(matches!(err, HarnessError::CallFailed(_)));

        let mut padded = good.clone();
        padded.push(0);
        assert!(chain
            .send_transaction(&TxRequest::call(addr(1), at, padded, 4_000_000))
            .await
            .is_err());

        // The well-formed template itself goes through
        assert!(chain
            .send_transaction(&TxRequest::call(addr(1), at, good, 4_000_000))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_attached_value_is_rejected() {
        let chain = MockChain::new();
        let at = deployed(&chain).await;
        let mut tx = TxRequest::call(
            addr(1),
            at,
            call_data(
                "transfer(address,uint256)",
                &[
                    abi::word_from_address(&addr(2)),
                    abi::word_from_uint(&BigUint::from(1u8)),
                ],
            ),
            4_000_000,
        );
        tx.value = BigUint::from(1u8);
        assert!(chain.send_transaction(&tx).await.is_err());
    }

    #[tokio::test]
    async fn test_allowance_bookkeeping() {
        let chain = MockChain::new();
        let at = deployed(&chain).await;
        let approve = call_data(
            "approve(address,uint256)",
            &[
                abi::word_from_address(&addr(2)),
                abi::word_from_uint(&BigUint::from(83u8)),
            ],
        );
        chain
            .send_transaction(&TxRequest::call(addr(1), at, approve, 4_000_000))
            .await
            .unwrap();

        let spend = call_data(
            "transferFrom(address,address,uint256)",
            &[
                abi::word_from_address(&addr(1)),
                abi::word_from_address(&addr(3)),
                abi::word_from_uint(&BigUint::from(42u8)),
            ],
        );
        chain
            .send_transaction(&TxRequest::call(addr(2), at, spend.clone(), 4_000_000))
            .await
            .unwrap();

        let allowance = call_data(
            "allowance(address,address)",
            &[
                abi::word_from_address(&addr(1)),
                abi::word_from_address(&addr(2)),
            ],
        );
        let left = chain.call(at, &allowance).await.unwrap();
        assert_eq!(BigUint::from_bytes_be(&left), BigUint::from(41u8));

        // 42 > 41: second spend fails and changes nothing
        assert!(chain
            .send_transaction(&TxRequest::call(addr(2), at, spend, 4_000_000))
            .await
            .is_err());
        let left = chain.call(at, &allowance).await.unwrap();
        assert_eq!(BigUint::from_bytes_be(&left), BigUint::from(41u8));
    }
}
