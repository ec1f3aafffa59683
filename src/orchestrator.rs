//! Runs the selected test cases one after another, each against a freshly
//! deployed contract instance, and folds the verdicts into a run summary.

use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::abi::{Abi, Address};
use crate::check::Verdict;
use crate::rpc::Transport;
use crate::session::Session;
use crate::suite::{TestCase, TestCtx};

/// Final tally of one run. The process exit status is derived from
/// `failed` alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub passed: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

pub struct Orchestrator {
    transport: Rc<dyn Transport>,
    abi: Rc<Abi>,
    bytecode: Vec<u8>,
    deployer: Address,
    gas_budget: u64,
    test_deadline: Option<Duration>,
}

impl Orchestrator {
    pub fn new(
        transport: Rc<dyn Transport>,
        abi: Rc<Abi>,
        bytecode: Vec<u8>,
        deployer: Address,
        gas_budget: u64,
        test_deadline: Option<Duration>,
    ) -> Self {
        Self {
            transport,
            abi,
            bytecode,
            deployer,
            gas_budget,
            test_deadline,
        }
    }

    /// Run every queued test in registration order. Tests never overlap;
    /// each gets its own contract instance, so no state leaks between them.
    pub async fn run(&self, queue: &[TestCase]) -> RunSummary {
        if queue.len() == 1 {
            println!("Running 1 test.");
        } else {
            println!("Running {} tests.", queue.len());
        }

        let mut summary = RunSummary { passed: 0, failed: 0 };
        for case in queue {
            let verdict = self.run_one(case).await;
            if verdict.pass {
                println!("{}: PASSED", verdict.test_name);
                summary.passed += 1;
            } else {
                println!("{}: FAILED", verdict.test_name);
                summary.failed += 1;
            }
        }

        println!(
            "  Tests passed: {}. Tests failed: {}.\n",
            summary.passed, summary.failed
        );
        summary
    }

    async fn run_one(&self, case: &TestCase) -> Verdict {
        info!("starting test {}", case.name);
        let session = match Session::deploy(
            self.transport.clone(),
            self.abi.clone(),
            &self.bytecode,
            self.deployer,
            self.gas_budget,
        )
        .await
        {
            Ok(session) => session,
            Err(e) => {
                warn!("*** Failure in test {}: deployment failed: {}", case.name, e);
                return Verdict::deployment_failure(case.name);
            }
        };
        debug!(
            "test {} runs against instance {}",
            case.name, session.address
        );

        let cx = TestCtx::new(case.name, session);
        match self.test_deadline {
            Some(deadline) => {
                if tokio::time::timeout(deadline, (case.body)(&cx)).await.is_err() {
                    cx.recorder.record_failure(format!(
                        "test deadline of {}s exceeded, aborting the body",
                        deadline.as_secs()
                    ));
                }
            }
            None => (case.body)(&cx).await,
        }
        cx.into_verdict()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suite;
    use crate::testkit::MockChain;
    use futures_util::future::LocalBoxFuture;

    fn orchestrator(chain: Rc<MockChain>) -> Orchestrator {
        Orchestrator::new(
            chain,
            Rc::new(crate::testkit::test_abi()),
            vec![0x60, 0x00],
            suite::ADDR0,
            4_000_000,
            Some(Duration::from_secs(30)),
        )
    }

    fn passing_body(cx: &TestCtx) -> LocalBoxFuture<'_, ()> {
        Box::pin(async move {
            cx.expect_uint(
                cx.session.total_supply().await,
                suite::uint(suite::TOTAL_SUPPLY),
            );
        })
    }

    fn failing_body(cx: &TestCtx) -> LocalBoxFuture<'_, ()> {
        Box::pin(async move {
            cx.expect_uint(cx.session.total_supply().await, suite::uint(7));
        })
    }

    fn empty_body(_cx: &TestCtx) -> LocalBoxFuture<'_, ()> {
        Box::pin(async move {})
    }

    fn stalled_body(_cx: &TestCtx) -> LocalBoxFuture<'_, ()> {
        Box::pin(std::future::pending())
    }

    #[tokio::test]
    async fn tallies_pass_and_fail() {
        let chain = Rc::new(MockChain::new());
        let queue = [
            TestCase { name: "passes", body: passing_body },
            TestCase { name: "fails", body: failing_body },
        ];
        let summary = orchestrator(chain).run(&queue).await;
        assert_eq!(summary, RunSummary { passed: 1, failed: 1 });
        assert!(!summary.all_passed());
    }

    #[tokio::test]
    async fn each_test_gets_a_fresh_instance() {
        let chain = Rc::new(MockChain::new());
        let queue = [
            TestCase { name: "one", body: passing_body },
            TestCase { name: "two", body: passing_body },
        ];
        orchestrator(chain.clone()).run(&queue).await;
        assert_eq!(chain.deployed_count(), 2);
    }

    #[tokio::test]
    async fn deployment_failure_skips_the_body() {
        let chain = Rc::new(MockChain::new());
        chain.fail_next_deploy();
        let queue = [TestCase { name: "doomed", body: passing_body }];
        let summary = orchestrator(chain.clone()).run(&queue).await;
        assert_eq!(summary.failed, 1);
        assert_eq!(chain.deployed_count(), 0);
    }

    #[tokio::test]
    async fn body_without_assertions_passes() {
        let chain = Rc::new(MockChain::new());
        let queue = [TestCase { name: "empty", body: empty_body }];
        let summary = orchestrator(chain).run(&queue).await;
        assert_eq!(summary, RunSummary { passed: 1, failed: 0 });
    }

    #[tokio::test]
    async fn stalled_body_fails_on_deadline() {
        let chain = Rc::new(MockChain::new());
        let orchestrator = Orchestrator::new(
            chain,
            Rc::new(crate::testkit::test_abi()),
            vec![0x60, 0x00],
            suite::ADDR0,
            4_000_000,
            Some(Duration::from_millis(50)),
        );
        let queue = [TestCase { name: "stalled", body: stalled_body }];
        let summary = orchestrator.run(&queue).await;
        assert_eq!(summary, RunSummary { passed: 0, failed: 1 });
    }
}
