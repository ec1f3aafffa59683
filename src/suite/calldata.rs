//! Input-validation tests: raw payloads that bypass the declared encoding.
//!
//! These deliberately hand-roll calldata so they can truncate, pad, and
//! corrupt it. A malformed call must classify as an operation failure with
//! no observable state change, never as an exception escaping the harness.

use futures_util::future::LocalBoxFuture;
use num_bigint::BigUint;
use num_traits::Zero;

use crate::abi::{self, Address};

use super::{uint, TestCtx, ADDR0, ADDR1, TOTAL_SUPPLY};

fn transfer_calldata(to: Address, amount: u64) -> Vec<u8> {
    let mut data = abi::selector("transfer(address,uint256)").to_vec();
    data.extend_from_slice(&abi::word_from_address(&to));
    data.extend_from_slice(&abi::word_from_uint(&uint(amount)));
    data
}

pub fn t2_call_invalid_function(cx: &TestCtx) -> LocalBoxFuture<'_, ()> {
    Box::pin(async move {
        // Good selector: totalSupply()
        let good = async {
            let result = cx.session.raw_call(&abi::selector("totalSupply()")).await;
            cx.expect_word(result, uint(TOTAL_SUPPLY));
        };
        // Undeclared selector classifies as a failure, not a crash
        let bad = async {
            let result = cx.session.raw_call(&[0x12, 0x34, 0x56, 0x78]).await;
            cx.expect_call_fails(result);
        };
        futures_util::join!(good, bad);
    })
}

pub fn t2_send_ether_to_transfer(cx: &TestCtx) -> LocalBoxFuture<'_, ()> {
    Box::pin(async move {
        // Any attempt to attach value must be rejected
        let result = cx
            .session
            .raw_send(ADDR0, transfer_calldata(ADDR1, 1), BigUint::from(1u8))
            .await;
        cx.expect_reverted(result);
    })
}

pub fn t2_low_level_transfer(cx: &TestCtx) -> LocalBoxFuture<'_, ()> {
    Box::pin(async move {
        // The template for the corruption tests below must itself work
        let result = cx
            .session
            .raw_send(ADDR0, transfer_calldata(ADDR1, 1), BigUint::zero())
            .await;
        cx.expect_ok(result);
    })
}

pub fn t2_too_little_call_data(cx: &TestCtx) -> LocalBoxFuture<'_, ()> {
    Box::pin(async move {
        let mut data = transfer_calldata(ADDR1, 1);
        data.pop();
        let result = cx.session.raw_send(ADDR0, data, BigUint::zero()).await;
        cx.expect_reverted(result);
    })
}

pub fn t2_too_much_call_data(cx: &TestCtx) -> LocalBoxFuture<'_, ()> {
    Box::pin(async move {
        let mut data = transfer_calldata(ADDR1, 1);
        data.push(0);
        let result = cx.session.raw_send(ADDR0, data, BigUint::zero()).await;
        cx.expect_reverted(result);
    })
}

pub fn t2_invalid_address(cx: &TestCtx) -> LocalBoxFuture<'_, ()> {
    Box::pin(async move {
        // Shift the address word right by a byte and jam 0x01 in front:
        // still 32 bytes, but no longer a valid address encoding
        let word = abi::word_from_address(&ADDR1);
        let mut data = abi::selector("transfer(address,uint256)").to_vec();
        data.push(0x01);
        data.extend_from_slice(&word[..31]);
        data.extend_from_slice(&abi::word_from_uint(&uint(1)));
        let result = cx.session.raw_send(ADDR0, data, BigUint::zero()).await;
        cx.expect_reverted(result);
    })
}
