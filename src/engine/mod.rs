//! The scenario execution engine.
//!
//! Ties the typed [`crate::scenario`] model to an actual TCP session: the
//! [`session`] module owns the socket and the receiver task, [`receiver`]
//! drains it into an inbound queue, and [`interpreter`] walks the scenario
//! steps against that session.

// SPDX-License-Identifier: AGPL-3.0-or-later

mod interpreter;
mod receiver;
mod session;

use crate::config::GlobalConfig;
use crate::scenario::Scenario;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Wire(#[from] crate::bgp::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("step {index}: connect requested while a connection is already open")]
    AlreadyConnected { index: usize },
    #[error("step {index}: {operation} requires an open connection")]
    NotConnected { index: usize, operation: &'static str },
    #[error("step {index}: expected {expected}, received {received} instead")]
    UnexpectedType {
        index: usize,
        expected: String,
        received: String,
    },
    #[error("step {index}: timed out after {waited:?} waiting for {expected}")]
    Timeout {
        index: usize,
        expected: String,
        waited: std::time::Duration,
    },
    #[error("step {index}: receive_nothing was interrupted by an incoming {received}")]
    UnexpectedArrival { index: usize, received: String },
    #[error("step {index}: receive_one_of_them timed out with no receive_nothing alternative")]
    OneOfThemTimeout { index: usize },
    #[error("step {index}: receive_one_of_them received {received}, matching none of the alternatives")]
    OneOfThemMismatch { index: usize, received: String },
}

/// Run a fully parsed scenario to completion.
///
/// Returns `Ok(())` on a clean run through every step; any fatal error
/// (I/O, framing, or an expectation violation) is returned as `Err` for the
/// caller to log and translate into a process exit code.
pub async fn run(global: &GlobalConfig, scenario: &Scenario) -> Result<(), Error> {
    let mut session = session::Session::new();
    let result =
        interpreter::execute(scenario.steps(), &mut session, &global.local, global.peer, 0).await;
    session.close().await;
    result
}
