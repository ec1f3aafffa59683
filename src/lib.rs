//! Integration-test and benchmark harness for an ERC20 token contract,
//! driven over Ethereum JSON-RPC against a local development node.

pub mod abi;
pub mod bench;
pub mod check;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod rpc;
pub mod sequencer;
pub mod session;
pub mod suite;
pub mod testkit;
