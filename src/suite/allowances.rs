//! Allowance lifecycle scenarios. The contract only lets an allowance
//! change between zero and a nonzero value, never directly from one
//! nonzero value to another, so these chains walk through the reset.

use std::cell::RefCell;

use futures_util::future::LocalBoxFuture;
use num_bigint::BigUint;
use num_traits::Zero;

use crate::sequencer::{run_serial, step};

use super::{uint, TestCtx, ADDR0, ADDR1, ADDR2};

pub fn t4_multiple_approve(cx: &TestCtx) -> LocalBoxFuture<'_, ()> {
    Box::pin(async move {
        run_serial(vec![
            step(|| async {
                cx.expect_uint(cx.session.allowance(ADDR0, ADDR1).await, uint(0));
            }),
            step(|| async {
                cx.expect_ok(cx.session.approve(ADDR0, ADDR1, uint(10)).await);
            }),
            step(|| async {
                cx.expect_uint(cx.session.allowance(ADDR0, ADDR1).await, uint(10));
            }),
            // Nonzero to nonzero is rejected
            step(|| async {
                cx.expect_reverted(cx.session.approve(ADDR0, ADDR1, uint(5)).await);
            }),
            step(|| async {
                cx.expect_uint(cx.session.allowance(ADDR0, ADDR1).await, uint(10));
            }),
            // Reset to zero, then the new value is accepted
            step(|| async {
                cx.expect_ok(cx.session.approve(ADDR0, ADDR1, uint(0)).await);
            }),
            step(|| async {
                cx.expect_uint(cx.session.allowance(ADDR0, ADDR1).await, uint(0));
            }),
            step(|| async {
                cx.expect_ok(cx.session.approve(ADDR0, ADDR1, uint(5)).await);
            }),
            step(|| async {
                cx.expect_uint(cx.session.allowance(ADDR0, ADDR1).await, uint(5));
            }),
        ])
        .await;
    })
}

pub fn t4_transfer_from(cx: &TestCtx) -> LocalBoxFuture<'_, ()> {
    Box::pin(async move {
        let addr0_start = RefCell::new(BigUint::zero());
        let addr2_start = RefCell::new(BigUint::zero());

        run_serial(vec![
            step(|| async {
                match cx.session.balance_of(ADDR0).await {
                    Ok(balance) => *addr0_start.borrow_mut() = balance,
                    Err(e) => cx.recorder.record_failure(format!("balanceOf failed: {e}")),
                }
            }),
            step(|| async {
                match cx.session.balance_of(ADDR2).await {
                    Ok(balance) => *addr2_start.borrow_mut() = balance,
                    Err(e) => cx.recorder.record_failure(format!("balanceOf failed: {e}")),
                }
            }),
            step(|| async {
                cx.expect_uint(cx.session.allowance(ADDR0, ADDR1).await, uint(0));
            }),
            // Without an allowance a nonzero transferFrom reverts
            step(|| async {
                cx.expect_reverted(
                    cx.session.transfer_from(ADDR1, ADDR0, ADDR2, uint(42)).await,
                );
            }),
            step(|| async {
                cx.expect_ok(cx.session.approve(ADDR0, ADDR1, uint(83)).await);
            }),
            step(|| async {
                cx.expect_uint(cx.session.allowance(ADDR0, ADDR1).await, uint(83));
            }),
            step(|| async {
                cx.expect_ok(cx.session.transfer_from(ADDR1, ADDR0, ADDR2, uint(42)).await);
            }),
            // Balances moved and the allowance shrank by the amount
            step(|| async {
                let want = addr0_start.borrow().clone() - uint(42);
                cx.expect_uint(cx.session.balance_of(ADDR0).await, want);
            }),
            step(|| async {
                let want = addr2_start.borrow().clone() + uint(42);
                cx.expect_uint(cx.session.balance_of(ADDR2).await, want);
            }),
            step(|| async {
                cx.expect_uint(cx.session.allowance(ADDR0, ADDR1).await, uint(41));
            }),
            // The remaining allowance no longer covers the same amount
            step(|| async {
                cx.expect_reverted(
                    cx.session.transfer_from(ADDR1, ADDR0, ADDR2, uint(42)).await,
                );
            }),
            step(|| async {
                let want = addr0_start.borrow().clone() - uint(42);
                cx.expect_uint(cx.session.balance_of(ADDR0).await, want);
            }),
            step(|| async {
                let want = addr2_start.borrow().clone() + uint(42);
                cx.expect_uint(cx.session.balance_of(ADDR2).await, want);
            }),
            step(|| async {
                cx.expect_uint(cx.session.allowance(ADDR0, ADDR1).await, uint(41));
            }),
        ])
        .await;
    })
}

pub fn t4_multiple_allowances_1(cx: &TestCtx) -> LocalBoxFuture<'_, ()> {
    Box::pin(async move {
        run_serial(vec![
            // Two owners grant the same spender independent allowances
            step(|| async {
                cx.expect_uint(cx.session.allowance(ADDR0, ADDR2).await, uint(0));
            }),
            step(|| async {
                cx.expect_uint(cx.session.allowance(ADDR1, ADDR2).await, uint(0));
            }),
            step(|| async {
                cx.expect_ok(cx.session.approve(ADDR0, ADDR2, uint(10)).await);
            }),
            step(|| async {
                cx.expect_ok(cx.session.approve(ADDR1, ADDR2, uint(20)).await);
            }),
            step(|| async {
                cx.expect_uint(cx.session.allowance(ADDR0, ADDR2).await, uint(10));
            }),
            step(|| async {
                cx.expect_uint(cx.session.allowance(ADDR1, ADDR2).await, uint(20));
            }),
        ])
        .await;
    })
}

pub fn t4_multiple_allowances_2(cx: &TestCtx) -> LocalBoxFuture<'_, ()> {
    Box::pin(async move {
        run_serial(vec![
            // One owner grants two spenders independent allowances
            step(|| async {
                cx.expect_uint(cx.session.allowance(ADDR0, ADDR1).await, uint(0));
            }),
            step(|| async {
                cx.expect_uint(cx.session.allowance(ADDR0, ADDR2).await, uint(0));
            }),
            step(|| async {
                cx.expect_ok(cx.session.approve(ADDR0, ADDR1, uint(10)).await);
            }),
            step(|| async {
                cx.expect_ok(cx.session.approve(ADDR0, ADDR2, uint(20)).await);
            }),
            step(|| async {
                cx.expect_uint(cx.session.allowance(ADDR0, ADDR1).await, uint(10));
            }),
            step(|| async {
                cx.expect_uint(cx.session.allowance(ADDR0, ADDR2).await, uint(20));
            }),
        ])
        .await;
    })
}

pub fn t4_symmetric_allowances(cx: &TestCtx) -> LocalBoxFuture<'_, ()> {
    Box::pin(async move {
        run_serial(vec![
            // Granting one direction must not grant the reverse
            step(|| async {
                cx.expect_uint(cx.session.allowance(ADDR0, ADDR1).await, uint(0));
            }),
            step(|| async {
                cx.expect_uint(cx.session.allowance(ADDR1, ADDR0).await, uint(0));
            }),
            step(|| async {
                cx.expect_ok(cx.session.approve(ADDR0, ADDR1, uint(10)).await);
            }),
            step(|| async {
                cx.expect_uint(cx.session.allowance(ADDR0, ADDR1).await, uint(10));
            }),
            step(|| async {
                cx.expect_uint(cx.session.allowance(ADDR1, ADDR0).await, uint(0));
            }),
        ])
        .await;
    })
}
