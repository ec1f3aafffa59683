//! Constant-function tests: token parameters and genesis state.

use futures_util::future::LocalBoxFuture;

use super::{uint, TestCtx, ADDR0, ADDR1, ADDR2, DECIMALS, NAME, SYMBOL, TOTAL_SUPPLY};

pub fn t1_constants(cx: &TestCtx) -> LocalBoxFuture<'_, ()> {
    Box::pin(async move {
        // Independent queries; no ordering needed
        let symbol = async { cx.expect_str(cx.session.symbol().await, SYMBOL) };
        let name = async { cx.expect_str(cx.session.name().await, NAME) };
        let supply = async { cx.expect_uint(cx.session.total_supply().await, uint(TOTAL_SUPPLY)) };
        let decimals = async { cx.expect_uint(cx.session.decimals().await, uint(DECIMALS)) };
        futures_util::join!(symbol, name, supply, decimals);
    })
}

pub fn t1_balances(cx: &TestCtx) -> LocalBoxFuture<'_, ()> {
    Box::pin(async move {
        // The deployer holds the whole supply at genesis
        let owner = async { cx.expect_uint(cx.session.balance_of(ADDR0).await, uint(TOTAL_SUPPLY)) };
        let other = async { cx.expect_uint(cx.session.balance_of(ADDR1).await, uint(0)) };
        let third = async { cx.expect_uint(cx.session.balance_of(ADDR2).await, uint(0)) };
        futures_util::join!(owner, other, third);
    })
}

pub fn t1_allowances(cx: &TestCtx) -> LocalBoxFuture<'_, ()> {
    Box::pin(async move {
        cx.expect_uint(cx.session.allowance(ADDR1, ADDR2).await, uint(0));
    })
}
