// SPDX-License-Identifier: AGPL-3.0-or-later

//! Client-side gateway for a Hyperledger Fabric member on Managed
//! Blockchain.
//!
//! The crate covers the full client lifecycle: CA enrollment with
//! secret-store-backed credential persistence, idempotent channel
//! initialization, and chaincode queries and invocations with an
//! all-or-nothing endorsement policy. A REST facade exposes the flows for
//! the fabcar sample network.

pub mod api;
pub mod ca;
pub mod channel;
pub mod config;
pub mod error;
pub mod fabric;
pub mod gateway;
pub mod identity;
pub mod models;
pub mod secrets;
pub mod state;
pub mod transaction;

#[cfg(test)]
pub(crate) mod testutil;
