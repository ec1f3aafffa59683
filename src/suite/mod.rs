//! The registered test cases and their shared context.
//!
//! Tests are declared in a static registration table, ordered; the
//! orchestrator selects from it with the CLI's name filter and consumes
//! each entry exactly once. Every assertion carries its owning test's
//! recorder explicitly; nothing is inferred from ambient state.

mod allowances;
mod calldata;
mod constants;
mod events;
mod smoke;
mod transfers;

use futures_util::future::LocalBoxFuture;
use num_bigint::BigUint;

use crate::abi::Address;
use crate::check::{Check, Observed, Recorder, Verdict};
use crate::error::HarnessError;
use crate::session::{Session, TxResult};

// Token parameters the subject is deployed with
pub const TOTAL_SUPPLY: u64 = 100;
pub const DECIMALS: u64 = 0;
pub const SYMBOL: &str = "LLL";
pub const NAME: &str = "LLL Coin - love to code in LLL.";

// The well-known accounts generated by `testrpc -d`
pub const ADDR0: Address = Address([
    0x90, 0xf8, 0xbf, 0x6a, 0x47, 0x9f, 0x32, 0x0e, 0xad, 0x07, 0x44, 0x11, 0xa4, 0xb0, 0xe7,
    0x94, 0x4e, 0xa8, 0xc9, 0xc1,
]);
pub const ADDR1: Address = Address([
    0xff, 0xcf, 0x8f, 0xde, 0xe7, 0x2a, 0xc1, 0x1b, 0x5c, 0x54, 0x24, 0x28, 0xb3, 0x5e, 0xef,
    0x57, 0x69, 0xc4, 0x09, 0xf0,
]);
pub const ADDR2: Address = Address([
    0x22, 0xd4, 0x91, 0xbd, 0xe2, 0x30, 0x3f, 0x2f, 0x43, 0x32, 0x5b, 0x21, 0x08, 0xd2, 0x6f,
    0x1e, 0xab, 0xa1, 0xe3, 0x2b,
]);

pub fn uint(v: u64) -> BigUint {
    BigUint::from(v)
}

/// A test body: borrows the context for the duration of its asynchronous
/// work. Plain function pointers keep the registry a static table.
pub type TestBody = for<'a> fn(&'a TestCtx) -> LocalBoxFuture<'a, ()>;

/// A named test case. Immutable once registered.
#[derive(Clone, Copy)]
pub struct TestCase {
    pub name: &'static str,
    pub body: TestBody,
}

/// Everything a running test gets to touch: its own fresh session and its
/// own recorder.
pub struct TestCtx {
    pub session: Session,
    pub recorder: Recorder,
}

impl TestCtx {
    pub fn new(test_name: &str, session: Session) -> Self {
        Self {
            session,
            recorder: Recorder::new(test_name),
        }
    }

    pub fn into_verdict(self) -> Verdict {
        self.recorder.finalize()
    }

    // Assertion helpers: compare-and-record, one per result kind.

    pub fn expect_str(&self, result: Result<String, HarnessError>, want: &str) {
        self.recorder
            .record(&Check::Str(want.to_string()), &Observed::str_result(result));
    }

    pub fn expect_uint(&self, result: Result<BigUint, HarnessError>, want: BigUint) {
        self.recorder
            .record(&Check::Uint(want), &Observed::uint_result(result));
    }

    pub fn expect_word(&self, result: Result<Vec<u8>, HarnessError>, want: BigUint) {
        self.recorder
            .record(&Check::Word(want), &Observed::bytes_result(result));
    }

    pub fn expect_ok(&self, result: TxResult) {
        self.recorder
            .record(&Check::Succeeds, &Observed::tx_result(result));
    }

    pub fn expect_reverted(&self, result: TxResult) {
        self.recorder
            .record(&Check::Fails, &Observed::tx_result(result));
    }

    pub fn expect_call_fails(&self, result: Result<Vec<u8>, HarnessError>) {
        self.recorder
            .record(&Check::Fails, &Observed::bytes_result(result));
    }

    pub fn expect_no_event(&self, result: TxResult) {
        self.recorder
            .record(&Check::Emits(false), &Observed::tx_result(result));
    }

    pub fn expect_event(&self, result: TxResult, name: &str, fields: &[(&str, String)]) {
        let check = Check::Event {
            name: name.to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        };
        self.recorder.record(&check, &Observed::tx_result(result));
    }
}

/// The static registration table, in execution order.
pub fn all_tests() -> Vec<TestCase> {
    vec![
        // Constant functions
        TestCase { name: "t1_constants", body: constants::t1_constants },
        TestCase { name: "t1_balances", body: constants::t1_balances },
        TestCase { name: "t1_allowances", body: constants::t1_allowances },
        // Input validation
        TestCase { name: "t2_call_invalid_function", body: calldata::t2_call_invalid_function },
        TestCase { name: "t2_send_ether_to_transfer", body: calldata::t2_send_ether_to_transfer },
        TestCase { name: "t2_low_level_transfer", body: calldata::t2_low_level_transfer },
        TestCase { name: "t2_too_little_call_data", body: calldata::t2_too_little_call_data },
        TestCase { name: "t2_too_much_call_data", body: calldata::t2_too_much_call_data },
        TestCase { name: "t2_invalid_address", body: calldata::t2_invalid_address },
        // Smoke tests on transfer(), approve(), transferFrom()
        TestCase { name: "t3_transfer", body: smoke::t3_transfer },
        TestCase { name: "t3_transfer_too_much", body: smoke::t3_transfer_too_much },
        TestCase { name: "t3_approve", body: smoke::t3_approve },
        TestCase { name: "t3_approve_too_much", body: smoke::t3_approve_too_much },
        TestCase { name: "t3_transfer_from_no_approval", body: smoke::t3_transfer_from_no_approval },
        TestCase { name: "t3_transfer_from_no_approval_zero", body: smoke::t3_transfer_from_no_approval_zero },
        // End-to-end scenarios
        TestCase { name: "t4_valid_transfer", body: transfers::t4_valid_transfer },
        TestCase { name: "t4_invalid_transfer", body: transfers::t4_invalid_transfer },
        TestCase { name: "t4_multiple_transfers", body: transfers::t4_multiple_transfers },
        TestCase { name: "t4_multiple_approve", body: allowances::t4_multiple_approve },
        TestCase { name: "t4_transfer_from", body: allowances::t4_transfer_from },
        TestCase { name: "t4_multiple_allowances_1", body: allowances::t4_multiple_allowances_1 },
        TestCase { name: "t4_multiple_allowances_2", body: allowances::t4_multiple_allowances_2 },
        TestCase { name: "t4_symmetric_allowances", body: allowances::t4_symmetric_allowances },
        // Events
        TestCase { name: "t5_transfer_event", body: events::t5_transfer_event },
        TestCase { name: "t5_zero_transfer_no_event", body: events::t5_zero_transfer_no_event },
        TestCase { name: "t5_approve_event", body: events::t5_approve_event },
        TestCase { name: "t5_transfer_from_event", body: events::t5_transfer_from_event },
        TestCase { name: "t5_zero_transfer_from_no_event", body: events::t5_zero_transfer_from_no_event },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_names_are_unique() {
        let tests = all_tests();
        let mut names: Vec<&str> = tests.iter().map(|t| t.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), tests.len());
    }

    #[test]
    fn test_well_known_accounts() {
        assert_eq!(ADDR0.to_string(), "0x90f8bf6a479f320ead074411a4b0e7944ea8c9c1");
        assert_eq!(ADDR1.to_string(), "0xffcf8fdee72ac11b5c542428b35eef5769c409f0");
        assert_eq!(ADDR2.to_string(), "0x22d491bde2303f2f43325b2108d26f1eaba1e32b");
    }
}
