//! Command line arguments parsing.
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
pub struct BgpBully {
    /// Scenario file to run
    #[arg(short = 'f', long = "config-file")]
    pub config_file: PathBuf,
    /// Verbose mode: log wire-level detail (marker mismatches, raw frames)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}
