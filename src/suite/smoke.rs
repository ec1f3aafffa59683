//! Smoke tests on transfer(), approve() and transferFrom().

use futures_util::future::LocalBoxFuture;

use super::{uint, TestCtx, ADDR0, ADDR1, ADDR2, TOTAL_SUPPLY};

pub fn t3_transfer(cx: &TestCtx) -> LocalBoxFuture<'_, ()> {
    Box::pin(async move {
        let result = cx.session.transfer(ADDR0, ADDR1, uint(10)).await;
        cx.expect_ok(result);
    })
}

pub fn t3_transfer_too_much(cx: &TestCtx) -> LocalBoxFuture<'_, ()> {
    Box::pin(async move {
        // More than the whole supply can never be covered
        let result = cx.session.transfer(ADDR0, ADDR1, uint(TOTAL_SUPPLY + 1)).await;
        cx.expect_reverted(result);
    })
}

pub fn t3_approve(cx: &TestCtx) -> LocalBoxFuture<'_, ()> {
    Box::pin(async move {
        let result = cx.session.approve(ADDR0, ADDR1, uint(10)).await;
        cx.expect_ok(result);
    })
}

pub fn t3_approve_too_much(cx: &TestCtx) -> LocalBoxFuture<'_, ()> {
    Box::pin(async move {
        let result = cx.session.approve(ADDR0, ADDR1, uint(TOTAL_SUPPLY + 1)).await;
        cx.expect_reverted(result);
    })
}

pub fn t3_transfer_from_no_approval(cx: &TestCtx) -> LocalBoxFuture<'_, ()> {
    Box::pin(async move {
        let result = cx.session.transfer_from(ADDR1, ADDR0, ADDR2, uint(10)).await;
        cx.expect_reverted(result);
    })
}

pub fn t3_transfer_from_no_approval_zero(cx: &TestCtx) -> LocalBoxFuture<'_, ()> {
    Box::pin(async move {
        // Zero amount is a no-op and succeeds even without approval
        let result = cx.session.transfer_from(ADDR1, ADDR0, ADDR2, uint(0)).await;
        cx.expect_ok(result);
    })
}
