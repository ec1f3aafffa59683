//! Comparator and assertion recorder.
//!
//! `compare` is the pure classification function over the result kinds the
//! suite asserts on; `Recorder` accumulates the boolean outcomes of one
//! running test and folds them into a single verdict. A failing
//! sub-assertion is diagnosed with expected vs. actual at `warn` level and
//! never stops the chain.

use std::cell::RefCell;
use std::fmt;

use num_bigint::BigUint;
use tracing::{debug, warn};

use crate::abi::word_from_uint;
use crate::error::HarnessError;
use crate::session::TxRecord;

/// Expected outcome of one sub-assertion.
#[derive(Debug, Clone)]
pub enum Check {
    /// Structural equality on a decoded string.
    Str(String),
    /// Arbitrary-precision integer equality; token amounts never pass
    /// through floating point.
    Uint(BigUint),
    /// Raw return bytes equal the integer encoded as a fixed-width 32-byte
    /// big-endian word.
    Word(BigUint),
    /// The call produced a receipt and no error.
    Succeeds,
    /// The call was rejected or reverted.
    Fails,
    /// The call emitted at least one declared event (`true`) or none at all
    /// (`false`).
    Emits(bool),
    /// An event with this name exists and every listed field matches
    /// exactly.
    Event {
        name: String,
        fields: Vec<(String, String)>,
    },
}

/// What actually came back from the subject.
#[derive(Debug)]
pub enum Observed {
    Str(String),
    Uint(BigUint),
    Bytes(Vec<u8>),
    Tx(TxRecord),
    Failure(HarnessError),
}

impl Observed {
    pub fn str_result(r: Result<String, HarnessError>) -> Self {
        match r {
            Ok(v) => Observed::Str(v),
            Err(e) => Observed::Failure(e),
        }
    }

    pub fn uint_result(r: Result<BigUint, HarnessError>) -> Self {
        match r {
            Ok(v) => Observed::Uint(v),
            Err(e) => Observed::Failure(e),
        }
    }

    pub fn bytes_result(r: Result<Vec<u8>, HarnessError>) -> Self {
        match r {
            Ok(v) => Observed::Bytes(v),
            Err(e) => Observed::Failure(e),
        }
    }

    pub fn tx_result(r: Result<TxRecord, HarnessError>) -> Self {
        match r {
            Ok(v) => Observed::Tx(v),
            Err(e) => Observed::Failure(e),
        }
    }
}

/// Classify `observed` against `check`. Pure; shape mismatches (asserting a
/// value against a failed call, or success against a query) compare false
/// rather than erroring.
pub fn compare(check: &Check, observed: &Observed) -> bool {
    match (check, observed) {
        (Check::Str(want), Observed::Str(got)) => got == want,
        (Check::Uint(want), Observed::Uint(got)) => got == want,
        (Check::Word(want), Observed::Bytes(got)) => got.as_slice() == word_from_uint(want),
        (Check::Succeeds, Observed::Tx(rec)) => !rec.receipt.transaction_hash.is_empty(),
        (Check::Fails, Observed::Failure(_)) => true,
        (Check::Emits(want), Observed::Tx(rec)) => !rec.events.is_empty() == *want,
        (Check::Event { name, fields }, Observed::Tx(rec)) => {
            match rec.events.iter().find(|ev| ev.name == *name) {
                Some(ev) => fields
                    .iter()
                    .all(|(key, want)| ev.field(key) == Some(want.as_str())),
                None => false,
            }
        }
        _ => false,
    }
}

/// One recorded sub-assertion outcome.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub index: usize,
    pub pass: bool,
    pub detail: String,
}

/// Aggregate verdict of one test case, folded with logical AND once all of
/// its asynchronous activity has drained. Immutable thereafter.
#[derive(Debug, Clone)]
pub struct Verdict {
    pub test_name: String,
    pub pass: bool,
    pub pass_count: usize,
    pub fail_count: usize,
}

impl Verdict {
    /// Verdict for a test whose session never came up: failed, body never
    /// ran.
    pub fn deployment_failure(test_name: &str) -> Self {
        Self {
            test_name: test_name.to_string(),
            pass: false,
            pass_count: 0,
            fail_count: 1,
        }
    }
}

/// Accumulates outcomes for the currently running test. Carries its owning
/// test's name explicitly; nothing is inferred from ambient state.
pub struct Recorder {
    test_name: String,
    outcomes: RefCell<Vec<Outcome>>,
}

impl Recorder {
    pub fn new(test_name: &str) -> Self {
        Self {
            test_name: test_name.to_string(),
            outcomes: RefCell::new(Vec::new()),
        }
    }

    /// Compare, diagnose on failure, append. Returns the pass flag so a
    /// caller can branch on it, though the suite never needs to.
    pub fn record(&self, check: &Check, observed: &Observed) -> bool {
        let pass = compare(check, observed);
        let mut outcomes = self.outcomes.borrow_mut();
        let index = outcomes.len();
        if pass {
            debug!("[{}] assertion #{} passed", self.test_name, index);
        } else {
            warn!("*** Failure in test {}", self.test_name);
            warn!("  Expected: {:?}", check);
            warn!("  Got:      {:?}", observed);
        }
        outcomes.push(Outcome {
            index,
            pass,
            detail: format!("expected {check:?}, got {observed:?}"),
        });
        pass
    }

    /// Append an unconditional failure (deadline exceeded, harness-level
    /// fault) that did not come out of the comparator.
    pub fn record_failure(&self, detail: impl fmt::Display) {
        let mut outcomes = self.outcomes.borrow_mut();
        let index = outcomes.len();
        warn!("*** Failure in test {}: {}", self.test_name, detail);
        outcomes.push(Outcome {
            index,
            pass: false,
            detail: detail.to_string(),
        });
    }

    /// Fold all recorded outcomes into the verdict. A test that recorded
    /// nothing finalizes as passing; that matches the observed harness
    /// behavior and is flagged rather than corrected (see DESIGN.md).
    pub fn finalize(self) -> Verdict {
        let outcomes = self.outcomes.into_inner();
        if outcomes.is_empty() {
            warn!("test {} recorded no assertions", self.test_name);
        }
        let pass_count = outcomes.iter().filter(|o| o.pass).count();
        let fail_count = outcomes.len() - pass_count;
        Verdict {
            test_name: self.test_name,
            pass: fail_count == 0,
            pass_count,
            fail_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::Receipt;

    fn tx_record(events: Vec<crate::abi::DecodedEvent>) -> TxRecord {
        TxRecord {
            receipt: Receipt {
                transaction_hash: "0x1".into(),
                contract_address: None,
                gas_used: 21000,
                logs: Vec::new(),
            },
            events,
        }
    }

    fn transfer_event(value: &str) -> crate::abi::DecodedEvent {
        crate::abi::DecodedEvent {
            name: "Transfer".into(),
            fields: vec![
                ("_from".into(), "0xaa".into()),
                ("_to".into(), "0xbb".into()),
                ("_value".into(), value.into()),
            ],
        }
    }

    #[test]
    fn test_compare_values() {
        let uint = |v: u64| BigUint::from(v);
        assert!(compare(
            &Check::Str("LLL".into()),
            &Observed::Str("LLL".into())
        ));
        assert!(!compare(
            &Check::Str("LLL".into()),
            &Observed::Str("XXX".into())
        ));
        assert!(compare(&Check::Uint(uint(100)), &Observed::Uint(uint(100))));
        assert!(!compare(&Check::Uint(uint(100)), &Observed::Uint(uint(99))));
        // A failed query never satisfies a value expectation
        assert!(!compare(
            &Check::Uint(uint(0)),
            &Observed::Failure(HarnessError::CallFailed("boom".into()))
        ));
    }

    #[test]
    fn test_compare_fixed_width_word() {
        let want = Check::Word(BigUint::from(100u8));
        let mut bytes = vec![0u8; 32];
        bytes[31] = 100;
        assert!(compare(&want, &Observed::Bytes(bytes.clone())));
        bytes.push(0);
        assert!(!compare(&want, &Observed::Bytes(bytes)));
    }

    #[test]
    fn test_compare_success_and_failure() {
        assert!(compare(&Check::Succeeds, &Observed::Tx(tx_record(vec![]))));
        assert!(!compare(
            &Check::Succeeds,
            &Observed::Failure(HarnessError::CallFailed("revert".into()))
        ));
        assert!(compare(
            &Check::Fails,
            &Observed::Failure(HarnessError::CallFailed("revert".into()))
        ));
        assert!(!compare(&Check::Fails, &Observed::Tx(tx_record(vec![]))));
    }

    #[test]
    fn test_compare_events() {
        let with_event = Observed::Tx(tx_record(vec![transfer_event("42")]));
        let without = Observed::Tx(tx_record(vec![]));

        assert!(compare(&Check::Emits(true), &with_event));
        assert!(compare(&Check::Emits(false), &without));
        assert!(!compare(&Check::Emits(false), &with_event));

        let matching = Check::Event {
            name: "Transfer".into(),
            fields: vec![("_value".into(), "42".into()), ("_from".into(), "0xaa".into())],
        };
        assert!(compare(&matching, &with_event));

        let wrong_value = Check::Event {
            name: "Transfer".into(),
            fields: vec![("_value".into(), "43".into())],
        };
        assert!(!compare(&wrong_value, &with_event));

        let wrong_name = Check::Event {
            name: "Approval".into(),
            fields: vec![],
        };
        assert!(!compare(&wrong_name, &with_event));
        assert!(!compare(&matching, &without));
    }

    #[test]
    fn test_recorder_folds_with_and() {
        let recorder = Recorder::new("t_example");
        recorder.record(&Check::Uint(BigUint::from(1u8)), &Observed::Uint(BigUint::from(1u8)));
        recorder.record(&Check::Uint(BigUint::from(2u8)), &Observed::Uint(BigUint::from(3u8)));
        recorder.record(&Check::Succeeds, &Observed::Tx(tx_record(vec![])));
        let verdict = recorder.finalize();
        assert!(!verdict.pass);
        assert_eq!(verdict.pass_count, 2);
        assert_eq!(verdict.fail_count, 1);
        assert_eq!(verdict.test_name, "t_example");
    }

    #[test]
    fn test_recorder_with_no_assertions_passes() {
        let verdict = Recorder::new("t_empty").finalize();
        assert!(verdict.pass);
        assert_eq!(verdict.pass_count, 0);
        assert_eq!(verdict.fail_count, 0);
    }

    #[test]
    fn test_record_failure() {
        let recorder = Recorder::new("t_stalled");
        recorder.record_failure("test deadline exceeded");
        let verdict = recorder.finalize();
        assert!(!verdict.pass);
        assert_eq!(verdict.fail_count, 1);
    }
}
