//! Event emission checks. Successful nonzero movements emit exactly one
//! log with the expected decoded fields; zero-amount no-ops emit nothing.

use futures_util::future::LocalBoxFuture;

use crate::sequencer::{run_serial, step};

use super::{uint, TestCtx, ADDR0, ADDR1, ADDR2};

pub fn t5_transfer_event(cx: &TestCtx) -> LocalBoxFuture<'_, ()> {
    Box::pin(async move {
        let result = cx.session.transfer(ADDR0, ADDR1, uint(42)).await;
        cx.expect_event(
            result,
            "Transfer",
            &[
                ("_from", ADDR0.to_string()),
                ("_to", ADDR1.to_string()),
                ("_value", "42".to_string()),
            ],
        );
    })
}

pub fn t5_zero_transfer_no_event(cx: &TestCtx) -> LocalBoxFuture<'_, ()> {
    Box::pin(async move {
        let result = cx.session.transfer(ADDR0, ADDR1, uint(0)).await;
        cx.expect_no_event(result);
    })
}

pub fn t5_approve_event(cx: &TestCtx) -> LocalBoxFuture<'_, ()> {
    Box::pin(async move {
        let result = cx.session.approve(ADDR0, ADDR1, uint(50)).await;
        cx.expect_event(
            result,
            "Approval",
            &[
                ("_owner", ADDR0.to_string()),
                ("_spender", ADDR1.to_string()),
                ("_value", "50".to_string()),
            ],
        );
    })
}

pub fn t5_transfer_from_event(cx: &TestCtx) -> LocalBoxFuture<'_, ()> {
    Box::pin(async move {
        run_serial(vec![
            step(|| async {
                if let Err(e) = cx.session.approve(ADDR0, ADDR1, uint(50)).await {
                    cx.recorder.record_failure(format!("approve failed: {e}"));
                }
            }),
            step(|| async {
                let result = cx.session.transfer_from(ADDR1, ADDR0, ADDR2, uint(42)).await;
                cx.expect_event(
                    result,
                    "Transfer",
                    &[
                        ("_from", ADDR0.to_string()),
                        ("_to", ADDR2.to_string()),
                        ("_value", "42".to_string()),
                    ],
                );
            }),
        ])
        .await;
    })
}

pub fn t5_zero_transfer_from_no_event(cx: &TestCtx) -> LocalBoxFuture<'_, ()> {
    Box::pin(async move {
        run_serial(vec![
            // Zero amount is a no-op even with a live allowance in place
            step(|| async {
                if let Err(e) = cx.session.approve(ADDR0, ADDR1, uint(50)).await {
                    cx.recorder.record_failure(format!("approve failed: {e}"));
                }
            }),
            step(|| async {
                let result = cx.session.transfer_from(ADDR1, ADDR0, ADDR2, uint(0)).await;
                cx.expect_no_event(result);
            }),
        ])
        .await;
    })
}
