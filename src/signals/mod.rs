// SPDX-License-Identifier: MPL-2.0

//! Native signal subscriptions

pub mod calldata;
pub mod connection;

pub use calldata::Calldata;
pub use connection::SignalConnection;
pub(crate) use connection::SignalOwner;
