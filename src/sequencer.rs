//! Serial execution primitive for causally dependent asynchronous steps.
//!
//! Test bodies read a value, mutate, then re-read and compare; the
//! underlying calls carry no ordering of their own, so the chain has to be
//! driven explicitly. `run_serial` builds and awaits each step in strict
//! list order: step `i + 1` is not even constructed until step `i`'s future,
//! and every assertion it records, has fully settled. Steps funnel both
//! success and failure into their recorded outcome and then resolve; a step
//! whose future never resolves stalls the chain, and the orchestrator's
//! per-test deadline is the only backstop.

use futures_util::future::LocalBoxFuture;

/// One step of a serial chain. Deferred construction lets later steps
/// capture values produced by earlier ones.
pub type Step<'a> = Box<dyn FnOnce() -> LocalBoxFuture<'a, ()> + 'a>;

/// Box an async block into a [`Step`].
pub fn step<'a, F, Fut>(f: F) -> Step<'a>
where
    F: FnOnce() -> Fut + 'a,
    Fut: std::future::Future<Output = ()> + 'a,
{
    Box::new(move || -> LocalBoxFuture<'a, ()> { Box::pin(f()) })
}

/// Drive the steps strictly in list order. An empty list completes
/// immediately.
pub async fn run_serial(steps: Vec<Step<'_>>) {
    for step in steps {
        step().await;
    }
}
