//! Scripted BGP-4 peer driver.
//!
//! See [`engine::run`] for the entry point used by the `bgp-bully` binary.

// SPDX-License-Identifier: AGPL-3.0-or-later

pub mod bgp;
pub mod config;
pub mod engine;
pub mod scenario;
