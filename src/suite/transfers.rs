//! End-to-end transfer scenarios: read balances, mutate, re-read and
//! compare against the remembered starting point. Every chain here is
//! causally dependent, so the steps go through the sequencer.

use std::cell::RefCell;

use futures_util::future::LocalBoxFuture;
use num_bigint::BigUint;
use num_traits::Zero;

use crate::sequencer::{run_serial, step};

use super::{uint, TestCtx, ADDR0, ADDR1};

pub fn t4_valid_transfer(cx: &TestCtx) -> LocalBoxFuture<'_, ()> {
    Box::pin(async move {
        let amount = uint(10);
        let addr0_start = RefCell::new(BigUint::zero());
        let addr1_start = RefCell::new(BigUint::zero());

        run_serial(vec![
            // Save initial balances
            step(|| async {
                match cx.session.balance_of(ADDR0).await {
                    Ok(balance) => *addr0_start.borrow_mut() = balance,
                    Err(e) => cx.recorder.record_failure(format!("balanceOf failed: {e}")),
                }
            }),
            step(|| async {
                match cx.session.balance_of(ADDR1).await {
                    Ok(balance) => *addr1_start.borrow_mut() = balance,
                    Err(e) => cx.recorder.record_failure(format!("balanceOf failed: {e}")),
                }
            }),
            // Successful transfer
            step(|| async {
                cx.expect_ok(cx.session.transfer(ADDR0, ADDR1, amount.clone()).await);
            }),
            // Check balances moved by exactly the amount
            step(|| async {
                let want = addr0_start.borrow().clone() - &amount;
                cx.expect_uint(cx.session.balance_of(ADDR0).await, want);
            }),
            step(|| async {
                let want = addr1_start.borrow().clone() + &amount;
                cx.expect_uint(cx.session.balance_of(ADDR1).await, want);
            }),
        ])
        .await;
    })
}

pub fn t4_invalid_transfer(cx: &TestCtx) -> LocalBoxFuture<'_, ()> {
    Box::pin(async move {
        let addr0_start = RefCell::new(BigUint::zero());
        let addr1_start = RefCell::new(BigUint::zero());

        run_serial(vec![
            step(|| async {
                match cx.session.balance_of(ADDR0).await {
                    Ok(balance) => *addr0_start.borrow_mut() = balance,
                    Err(e) => cx.recorder.record_failure(format!("balanceOf failed: {e}")),
                }
            }),
            step(|| async {
                match cx.session.balance_of(ADDR1).await {
                    Ok(balance) => *addr1_start.borrow_mut() = balance,
                    Err(e) => cx.recorder.record_failure(format!("balanceOf failed: {e}")),
                }
            }),
            // One more than the whole balance must revert
            step(|| async {
                let amount = addr0_start.borrow().clone() + 1u32;
                cx.expect_reverted(cx.session.transfer(ADDR0, ADDR1, amount).await);
            }),
            // A failed transfer leaves both balances untouched
            step(|| async {
                let want = addr0_start.borrow().clone();
                cx.expect_uint(cx.session.balance_of(ADDR0).await, want);
            }),
            step(|| async {
                let want = addr1_start.borrow().clone();
                cx.expect_uint(cx.session.balance_of(ADDR1).await, want);
            }),
        ])
        .await;
    })
}

pub fn t4_multiple_transfers(cx: &TestCtx) -> LocalBoxFuture<'_, ()> {
    Box::pin(async move {
        let amount = RefCell::new(BigUint::zero());
        let addr0_start = RefCell::new(BigUint::zero());
        let addr1_start = RefCell::new(BigUint::zero());

        run_serial(vec![
            // Save initial balances; two transfers of a third-plus-one fit,
            // a third one cannot
            step(|| async {
                match cx.session.balance_of(ADDR0).await {
                    Ok(balance) => {
                        *amount.borrow_mut() = &balance / uint(3) + uint(1);
                        *addr0_start.borrow_mut() = balance;
                    }
                    Err(e) => cx.recorder.record_failure(format!("balanceOf failed: {e}")),
                }
            }),
            step(|| async {
                match cx.session.balance_of(ADDR1).await {
                    Ok(balance) => *addr1_start.borrow_mut() = balance,
                    Err(e) => cx.recorder.record_failure(format!("balanceOf failed: {e}")),
                }
            }),
            // Two successful transfers and an unsuccessful one
            step(|| async {
                let value = amount.borrow().clone();
                cx.expect_ok(cx.session.transfer(ADDR0, ADDR1, value).await);
            }),
            step(|| async {
                let value = amount.borrow().clone();
                cx.expect_ok(cx.session.transfer(ADDR0, ADDR1, value).await);
            }),
            step(|| async {
                let value = amount.borrow().clone();
                cx.expect_reverted(cx.session.transfer(ADDR0, ADDR1, value).await);
            }),
            // Check balances
            step(|| async {
                let want = addr0_start.borrow().clone() - uint(2) * &*amount.borrow();
                cx.expect_uint(cx.session.balance_of(ADDR0).await, want);
            }),
            step(|| async {
                let want = addr1_start.borrow().clone() + uint(2) * &*amount.borrow();
                cx.expect_uint(cx.session.balance_of(ADDR1).await, want);
            }),
        ])
        .await;
    })
}
